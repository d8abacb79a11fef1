//! wirehttp: example server binary.
//!
//! Registers a handful of demo routes and serves them until SIGINT or SIGTERM.
//!
//! # Usage
//!
//! ```text
//! wirehttp [OPTIONS]
//!
//! Options:
//!   --host <HOST>                      Bind host [env: HOST] [default: localhost]
//!   --port <PORT>                      HTTP port; echo uses PORT+1 [env: PORT] [default: 9090]
//!   --static-dir <DIR>                 Static file root [env: STATIC_DIR] [default: static]
//!   --debug                            Debug-level logging [env: DEBUG]
//!   --read-timeout-secs <SECS>         Request read deadline, 0 disables [env: READ_TIMEOUT_SECS] [default: 30]
//!   --rate-limit <N>                   Requests per window on /api/data [env: RATE_LIMIT] [default: 100]
//!   --rate-window-secs <SECS>          Rate-limit window [env: RATE_WINDOW_SECS] [default: 60]
//!   --no-echo                          Do not start the WebSocket echo service
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use serde_json::{Value, json};
use tracing::info;
use tracing_subscriber::EnvFilter;

use wirehttp::http::ParsedBody;
use wirehttp::middleware::Logger;
use wirehttp::router::RouteError;
use wirehttp::security::{Cors, RateLimit, RateLimiter};
use wirehttp::{Chain, Reply, Router, Server, ServerConfig};

#[derive(Debug, Parser)]
#[command(name = "wirehttp", about = "Hand-rolled HTTP/1.x server with a WebSocket echo companion", version)]
struct Cli {
    #[arg(long, default_value = "localhost", env = "HOST")]
    host: String,

    /// HTTP port. The echo service listens on the next port.
    #[arg(long, default_value_t = 9090, env = "PORT")]
    port: u16,

    #[arg(long, default_value = "static", env = "STATIC_DIR")]
    static_dir: PathBuf,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(long, env = "DEBUG")]
    debug: bool,

    /// Seconds to wait for a request before closing the connection; 0 waits forever.
    #[arg(long, default_value_t = 30, env = "READ_TIMEOUT_SECS")]
    read_timeout_secs: u64,

    #[arg(long, default_value_t = 100, env = "RATE_LIMIT")]
    rate_limit: usize,

    #[arg(long, default_value_t = 60, env = "RATE_WINDOW_SECS")]
    rate_window_secs: u64,

    #[arg(long)]
    no_echo: bool,
}

impl Cli {
    fn server_config(&self) -> ServerConfig {
        ServerConfig {
            host: self.host.clone(),
            port: self.port,
            static_dir: self.static_dir.clone(),
            read_timeout: (self.read_timeout_secs > 0)
                .then(|| Duration::from_secs(self.read_timeout_secs)),
            echo: !self.no_echo,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let config = cli.server_config();
    let limiter = Arc::new(RateLimiter::new(
        cli.rate_limit,
        Duration::from_secs(cli.rate_window_secs),
    ));
    let router = routes(&config, limiter).context("invalid route table")?;

    let server = Server::bind(&config, router)?;
    server
        .shutdown_handle()
        .install_signal_handlers()
        .context("failed to install signal handlers")?;

    info!(
        http = %server.local_addr(),
        echo = ?server.echo_addr(),
        "starting wirehttp"
    );
    server.run()?;
    Ok(())
}

fn routes(config: &ServerConfig, limiter: Arc<RateLimiter>) -> Result<Router, RouteError> {
    let mut router = Router::with_static_root(&config.static_dir);
    router.before_all(Logger);

    router.register("GET /", |_req| Ok(Reply::new("Welcome to the server!")))?;

    router.register_with(
        "GET /api/data",
        Chain::new().with(Cors::new()).with(RateLimit::new(limiter)),
        |_req| Ok(json!({"message": "This is some API data"}).into()),
    )?;

    router.serve_static("/index.html", "index.html")?;

    router.register("POST /api/echo", |req| {
        let body = match req.parsed_body() {
            Some(ParsedBody::Json(value)) => value.clone(),
            Some(ParsedBody::Form(fields)) => json!(fields),
            Some(ParsedBody::Raw(text)) => Value::String(text.clone()),
            None => Value::Null,
        };
        Ok(json!({"received": body}).into())
    })?;

    Ok(router)
}
