//! # wirehttp
//!
//! A from-scratch HTTP/1.x server on raw TCP sockets, with declarative
//! `"VERB /path"` routes, composable middleware, sliding-window rate limiting
//! and a companion WebSocket echo service on the next port.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use serde_json::json;
//! use wirehttp::{Chain, Reply, Router, Server, ServerConfig};
//! use wirehttp::security::Cors;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut router = Router::new();
//!     router.register("GET /", |_req| Ok(Reply::new("Hello, World!")))?;
//!     router.register_with("GET /api/data", Chain::new().with(Cors::new()), |_req| {
//!         Ok(json!({"message": "hi"}).into())
//!     })?;
//!
//!     let server = Server::bind(&ServerConfig::default(), router)?;
//!     server.run()?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod echo;
pub mod http;
pub mod middleware;
pub mod router;
pub mod security;
pub mod server;
pub mod static_files;

pub use config::ServerConfig;
pub use echo::EchoService;
pub use http::{Headers, Method, Reply, Request, Response, StatusCode};
pub use middleware::{Chain, Handler, HandlerResult, Middleware};
pub use router::Router;
pub use server::{Server, ServerError, Shutdown};
