//! Cross-Origin Resource Sharing headers for browser clients.

use std::sync::Arc;

use crate::http::Request;
use crate::middleware::{Handler, Middleware};

/// CORS middleware that appends `Access-Control-*` headers to every reply.
///
/// The inner handler always runs; its reply keeps its body and status and
/// gains the three headers below.
///
/// | Header                           | Default                              |
/// |----------------------------------|--------------------------------------|
/// | `Access-Control-Allow-Origin`    | `*`                                  |
/// | `Access-Control-Allow-Methods`   | `GET, POST, PUT, DELETE, OPTIONS`    |
/// | `Access-Control-Allow-Headers`   | `Content-Type`                       |
///
/// # Examples
///
/// ```
/// use wirehttp::security::Cors;
///
/// let cors = Cors::new()
///     .allow_origin("https://example.com")
///     .allow_method("PATCH")
///     .allow_header("X-Request-Id");
/// # let _ = cors;
/// ```
#[derive(Debug, Clone)]
pub struct Cors {
    origin: String,
    methods: Vec<String>,
    headers: Vec<String>,
}

impl Default for Cors {
    fn default() -> Self {
        Self::new()
    }
}

impl Cors {
    pub fn new() -> Self {
        Self {
            origin: "*".to_owned(),
            methods: ["GET", "POST", "PUT", "DELETE", "OPTIONS"]
                .into_iter()
                .map(str::to_owned)
                .collect(),
            headers: vec!["Content-Type".to_owned()],
        }
    }

    /// Replaces the allowed origin (`*` by default).
    #[must_use]
    pub fn allow_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    /// Adds an allowed method, sent verbatim in `Access-Control-Allow-Methods`.
    #[must_use]
    pub fn allow_method(mut self, method: impl Into<String>) -> Self {
        let method = method.into();
        if !self.methods.contains(&method) {
            self.methods.push(method);
        }
        self
    }

    /// Adds an allowed request header, sent verbatim in `Access-Control-Allow-Headers`.
    #[must_use]
    pub fn allow_header(mut self, header: impl Into<String>) -> Self {
        let header = header.into();
        if !self.headers.iter().any(|h| h.eq_ignore_ascii_case(&header)) {
            self.headers.push(header);
        }
        self
    }
}

impl Middleware for Cors {
    fn wrap(&self, next: Handler) -> Handler {
        let origin = self.origin.clone();
        let methods = self.methods.join(", ");
        let headers = self.headers.join(", ");

        Arc::new(move |request: &Request| {
            next(request)
                .with_header("Access-Control-Allow-Origin", origin.as_str())
                .with_header("Access-Control-Allow-Methods", methods.as_str())
                .with_header("Access-Control-Allow-Headers", headers.as_str())
        })
    }
}
