//! Resolved server configuration.
//!
//! The library takes a [`ServerConfig`] value and never reads the process
//! environment; the binary builds one from command-line flags and
//! environment variables.

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 9090;
pub const DEFAULT_STATIC_DIR: &str = "static";
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Host name or address the HTTP listener binds to. The echo service
    /// binds the same host.
    pub host: String,
    /// HTTP port. The echo service listens on `port + 1`.
    pub port: u16,
    /// Root directory for static routes.
    pub static_dir: PathBuf,
    /// Deadline for reading a request; `None` waits forever.
    pub read_timeout: Option<Duration>,
    /// Whether to start the echo service.
    pub echo: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_owned(),
            port: DEFAULT_PORT,
            static_dir: PathBuf::from(DEFAULT_STATIC_DIR),
            read_timeout: Some(DEFAULT_READ_TIMEOUT),
            echo: true,
        }
    }
}

impl ServerConfig {
    /// `host:port` for the HTTP listener.
    pub fn http_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// `host:port+1` for the echo service, or `None` when `port` is `u16::MAX`.
    pub fn echo_addr(&self) -> Option<String> {
        self.port
            .checked_add(1)
            .map(|port| format!("{}:{port}", self.host))
    }
}
