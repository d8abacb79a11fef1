//! Per-connection worker: one read, one request, one response.

use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

use tracing::{debug, warn};

use crate::http::{Reply, Request, Response, StatusCode};
use crate::router::Router;

/// Size of the single read that must hold the whole request.
pub const READ_BUFFER_SIZE: usize = 2048;

/// Serves exactly one request on `stream`, then lets it close.
///
/// # Errors
///
/// Returns socket configuration and write errors. A peer that disconnects or
/// times out before sending anything is not an error.
pub fn handle_connection(
    mut stream: TcpStream,
    peer: SocketAddr,
    router: &Router,
    read_timeout: Option<Duration>,
) -> io::Result<()> {
    stream.set_nonblocking(false)?;
    stream.set_read_timeout(read_timeout)?;

    let mut buf = [0u8; READ_BUFFER_SIZE];
    let n = match stream.read(&mut buf) {
        Ok(0) => {
            debug!(peer = %peer, "connection closed before sending a request");
            return Ok(());
        }
        Ok(n) => n,
        Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
            debug!(peer = %peer, "read timed out");
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    let response = respond(&buf[..n], peer, router);
    stream.write_all(&response.into_bytes())?;
    stream.flush()
}

/// Parses `raw` and dispatches it, answering `400 Bad Request` if it does not parse.
pub fn respond(raw: &[u8], peer: SocketAddr, router: &Router) -> Response {
    let parsed = Request::parse(raw).and_then(Request::with_decoded_body);
    match parsed {
        Ok(request) => {
            let request = request.with_client_ip(peer.ip());
            debug!(peer = %peer, method = %request.method(), path = request.path(), "dispatching request");
            Response::from(router.dispatch(&request))
        }
        Err(e) => {
            warn!(peer = %peer, error = %e, "bad request");
            Response::from(Reply::from(("Bad Request", StatusCode::BAD_REQUEST)))
        }
    }
}
