//! Security middleware: rate limiting and CORS.
//!
//! - [`RateLimiter`]: per-client sliding-window request counter.
//! - [`RateLimit`]: middleware answering `429` when the limiter rejects a client.
//! - [`Cors`]: `Access-Control-*` header injection.

pub mod cors;
pub mod rate_limit;

pub use cors::Cors;
pub use rate_limit::{RATE_LIMITED_MESSAGE, RateLimit, RateLimiter};
