//! Route key validation.
//!
//! A route key is the string `"VERB /path"`. Keys are checked when they are
//! registered, so a typo fails at startup instead of silently never matching.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::http::Method;

static ROUTE_KEY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(GET|POST|PUT|DELETE|HEAD|OPTIONS|PATCH) /[^\s?]*$").expect("route key pattern compiles")
});

/// Errors raised while registering routes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("invalid route key {key:?}: expected \"VERB /path\" with VERB one of GET, POST, PUT, DELETE, HEAD, OPTIONS, PATCH")]
    InvalidKey { key: String },
}

/// A validated `"VERB /path"` route key.
///
/// # Examples
///
/// ```
/// use wirehttp::router::RouteKey;
/// use wirehttp::http::Method;
///
/// let key = RouteKey::parse("GET /api/data").unwrap();
/// assert_eq!(key.method(), Method::Get);
/// assert_eq!(key.path(), "/api/data");
/// assert!(RouteKey::parse("FETCH /api").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteKey {
    method: Method,
    path: String,
}

impl RouteKey {
    /// Validates `key` against the route key pattern.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::InvalidKey`] for anything other than a supported
    /// verb, one space, and a path starting with `/` containing no whitespace.
    /// A `?` is rejected too: requests are looked up by path with the query
    /// string removed, so such a key could never match.
    pub fn parse(key: &str) -> Result<Self, RouteError> {
        let invalid = || RouteError::InvalidKey {
            key: key.to_owned(),
        };
        let captures = ROUTE_KEY.captures(key).ok_or_else(invalid)?;
        let method = captures
            .get(1)
            .and_then(|m| m.as_str().parse().ok())
            .ok_or_else(invalid)?;
        let path = key[captures.get(1).map_or(0, |m| m.end()) + 1..].to_owned();
        Ok(Self { method, path })
    }

    pub fn new(method: Method, path: &str) -> Self {
        Self {
            method,
            path: path.to_owned(),
        }
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}
