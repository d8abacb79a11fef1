//! Thread-per-connection TCP server.
//!
//! The accept loop runs on the caller's thread and hands every accepted
//! stream to a new worker thread, which serves one request and closes the
//! connection. The echo service, when enabled, runs on its own thread.

use std::io;
use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::echo::EchoService;
use crate::router::Router;

pub mod connection;
pub mod shutdown;

pub use shutdown::Shutdown;

/// Errors produced by the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to start the echo runtime: {0}")]
    Runtime(#[source] io::Error),
}

/// How long the accept loop sleeps when no connection is pending.
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// The HTTP server.
///
/// # Examples
///
/// ```rust,no_run
/// use wirehttp::{Reply, Router, Server, ServerConfig};
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut router = Router::new();
///     router.register("GET /", |_req| Ok(Reply::new("Hello!")))?;
///
///     let server = Server::bind(&ServerConfig::default(), router)?;
///     server.shutdown_handle().install_signal_handlers()?;
///     server.run()?;
///     Ok(())
/// }
/// ```
pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
    router: Arc<Router>,
    read_timeout: Option<Duration>,
    echo: Option<EchoService>,
    shutdown: Shutdown,
}

impl Server {
    /// Binds the HTTP listener and, if enabled, the echo listener on `port + 1`.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if either address cannot be bound
    /// (e.g. port already in use, insufficient permissions), including when
    /// the HTTP port is `65535` and the echo service has no port left.
    pub fn bind(config: &ServerConfig, router: Router) -> Result<Self, ServerError> {
        let addr = config.http_addr();
        let listener = TcpListener::bind(&addr).map_err(|e| ServerError::Bind {
            addr: addr.clone(),
            source: e,
        })?;
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;

        let echo = if config.echo {
            // The echo port follows the configured port, or the one the OS
            // picked when the configured port is 0.
            let port = if config.port == 0 { local_addr.port() } else { config.port };
            let echo_addr = ServerConfig { port, ..config.clone() }
                .echo_addr()
                .ok_or_else(|| ServerError::Bind {
                    addr: format!("{}:{port}+1", config.host),
                    source: io::Error::new(io::ErrorKind::InvalidInput, "no port above the HTTP port"),
                })?;
            Some(EchoService::bind(&echo_addr)?)
        } else {
            None
        };

        Ok(Self {
            listener,
            local_addr,
            router: Arc::new(router),
            read_timeout: config.read_timeout,
            echo,
            shutdown: Shutdown::new(),
        })
    }

    /// Returns the local address the HTTP listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Returns the echo service address, if it is enabled.
    pub fn echo_addr(&self) -> Option<SocketAddr> {
        self.echo.as_ref().map(EchoService::local_addr)
    }

    /// A handle that stops [`run`](Self::run) when triggered.
    pub fn shutdown_handle(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// Starts the echo service and accepts connections until shutdown.
    ///
    /// Each connection is served on its own thread. Workers still running
    /// when shutdown is observed finish on their own; the echo service keeps
    /// running until the process exits.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Runtime`] if the echo service cannot start.
    pub fn run(self) -> Result<(), ServerError> {
        if let Some(echo) = self.echo {
            let addr = echo.local_addr();
            echo.spawn()?;
            info!(address = %addr, "echo service listening");
        }

        info!(address = %self.local_addr, "wirehttp listening");

        while !self.shutdown.is_triggered() {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    debug!(peer = %peer, "connection accepted");
                    let router = Arc::clone(&self.router);
                    let read_timeout = self.read_timeout;
                    let spawned = thread::Builder::new()
                        .name(format!("conn-{peer}"))
                        .spawn(move || {
                            if let Err(e) =
                                connection::handle_connection(stream, peer, &router, read_timeout)
                            {
                                warn!(peer = %peer, error = %e, "connection closed with error");
                            }
                        });
                    if let Err(e) = spawned {
                        error!(peer = %peer, error = %e, "failed to spawn connection worker");
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    error!(error = %e, "failed to accept connection");
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
            }
        }

        info!(address = %self.local_addr, "server stopped");
        Ok(())
    }
}
