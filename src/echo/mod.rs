//! WebSocket echo service.
//!
//! Every text message is answered with `"Echo: "` followed by the message.
//! Binary messages get the same prefix as raw bytes. Sessions run as tasks
//! on a single-threaded `tokio` runtime hosted by one dedicated thread, so
//! any number of clients share that thread.

use std::io;
use std::net::{SocketAddr, TcpListener as StdTcpListener};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::error::ProtocolError;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tracing::{debug, error, info, warn};

use crate::server::ServerError;

/// Prefix added to every echoed message.
pub const ECHO_PREFIX: &str = "Echo: ";

const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

/// A bound, not yet running, echo service.
#[derive(Debug)]
pub struct EchoService {
    listener: StdTcpListener,
    local_addr: SocketAddr,
}

impl EchoService {
    /// Binds the echo listener.
    ///
    /// Binding happens eagerly so that address conflicts surface at startup.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the address cannot be bound.
    pub fn bind(addr: &str) -> Result<Self, ServerError> {
        let listener = StdTcpListener::bind(addr).map_err(|e| ServerError::Bind {
            addr: addr.to_owned(),
            source: e,
        })?;
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;
        Ok(Self { listener, local_addr })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Starts the event loop on a dedicated thread named `echo`.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Runtime`] if the runtime or thread cannot be created.
    pub fn spawn(self) -> Result<JoinHandle<()>, ServerError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(ServerError::Runtime)?;

        thread::Builder::new()
            .name("echo".to_owned())
            .spawn(move || {
                if let Err(e) = runtime.block_on(serve(self.listener)) {
                    error!(error = %e, "echo service stopped");
                }
            })
            .map_err(ServerError::Runtime)
    }
}

async fn serve(listener: StdTcpListener) -> io::Result<()> {
    let listener = TcpListener::from_std(listener)?;
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                tokio::spawn(handle_session(stream, peer));
            }
            Err(e) => {
                warn!(error = %e, "echo accept failed");
                tokio::time::sleep(ACCEPT_BACKOFF).await;
            }
        }
    }
}

async fn handle_session(stream: TcpStream, peer: SocketAddr) {
    let mut ws = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            debug!(peer = %peer, error = %e, "echo handshake failed");
            return;
        }
    };
    info!(peer = %peer, "echo session opened");

    while let Some(frame) = ws.next().await {
        let reply = match frame {
            Ok(Message::Text(text)) => Message::text(echo_text(text.as_str())),
            Ok(Message::Binary(data)) => Message::binary(echo_bytes(&data)),
            // Ping, pong and close frames are answered by the protocol layer.
            Ok(_) => continue,
            Err(e) if is_disconnect(&e) => break,
            Err(e) => {
                warn!(peer = %peer, error = %e, "echo session failed");
                break;
            }
        };

        if let Err(e) = ws.send(reply).await {
            if !is_disconnect(&e) {
                warn!(peer = %peer, error = %e, "echo reply failed");
            }
            break;
        }
    }

    info!(peer = %peer, "echo session closed");
}

pub fn echo_text(message: &str) -> String {
    format!("{ECHO_PREFIX}{message}")
}

pub fn echo_bytes(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(ECHO_PREFIX.len() + data.len());
    out.extend_from_slice(ECHO_PREFIX.as_bytes());
    out.extend_from_slice(data);
    out
}

fn is_disconnect(e: &WsError) -> bool {
    match e {
        WsError::ConnectionClosed | WsError::AlreadyClosed => true,
        WsError::Protocol(ProtocolError::ResetWithoutClosingHandshake) => true,
        WsError::Io(err) => matches!(
            err.kind(),
            io::ErrorKind::ConnectionReset
                | io::ErrorKind::ConnectionAborted
                | io::ErrorKind::BrokenPipe
                | io::ErrorKind::UnexpectedEof
        ),
        _ => false,
    }
}
