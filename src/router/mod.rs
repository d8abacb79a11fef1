//! Request routing: map `"VERB /path"` keys to handler functions.
//!
//! [`Router`] owns the route table and the global ("before all") middleware
//! list of one server. Lookup is an exact match on verb and path: there are no
//! parameterized or wildcard segments, and the query string is not part of
//! the key.
//!
//! | Registration                     | Wrapping applied                               |
//! |----------------------------------|------------------------------------------------|
//! | [`Router::register_handler`]     | none, the handler is stored as given           |
//! | [`Router::register`]             | error guard                                    |
//! | [`Router::register_with`]        | error guard, then the route's [`Chain`]        |
//! | [`Router::before_all`]           | wraps every route at dispatch, outermost       |
//!
//! Registering a key that already exists replaces the earlier handler.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::http::{Method, Reply, Request, StatusCode};
use crate::middleware::{Chain, Handler, HandlerResult, Middleware, guard};
use crate::static_files::StaticFiles;

pub mod key;

pub use key::{RouteError, RouteKey};

/// HTTP request router that dispatches requests to registered handlers.
///
/// Build one before starting the server; once it is handed to
/// [`Server`](crate::Server) it is shared read-only by every worker thread.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use wirehttp::{Reply, Router};
///
/// # fn main() -> Result<(), wirehttp::router::RouteError> {
/// let mut router = Router::new();
/// router.register("GET /api/data", |_req| Ok(json!({"message": "hi"}).into()))?;
///
/// assert!(router.register("FETCH /nope", |_req| Ok(Reply::new(""))).is_err());
/// assert_eq!(router.len(), 1);
/// # Ok(())
/// # }
/// ```
pub struct Router {
    routes: HashMap<RouteKey, Handler>,
    before_all: Chain,
    static_files: StaticFiles,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    /// Creates an empty router whose static routes read from `./static`.
    pub fn new() -> Self {
        Self::with_static_root(crate::config::DEFAULT_STATIC_DIR)
    }

    /// Creates an empty router whose static routes read from `root`.
    pub fn with_static_root(root: impl Into<PathBuf>) -> Self {
        Self {
            routes: HashMap::new(),
            before_all: Chain::new(),
            static_files: StaticFiles::new(root),
        }
    }

    /// Stores `handler` under `key` without any wrapping.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::InvalidKey`] if `key` is not a valid route key.
    pub fn register_handler<F>(&mut self, key: &str, handler: F) -> Result<&mut Self, RouteError>
    where
        F: Fn(&Request) -> Reply + Send + Sync + 'static,
    {
        let key = RouteKey::parse(key)?;
        self.routes.insert(key, Arc::new(handler));
        Ok(self)
    }

    /// Registers a fallible route function behind the error guard.
    ///
    /// Errors and panics from `handler` are logged and answered with `500`.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::InvalidKey`] if `key` is not a valid route key.
    pub fn register<F>(&mut self, key: &str, handler: F) -> Result<&mut Self, RouteError>
    where
        F: Fn(&Request) -> HandlerResult + Send + Sync + 'static,
    {
        self.register_with(key, Chain::new(), handler)
    }

    /// Registers a fallible route function wrapped by `chain`.
    ///
    /// The first middleware in `chain` runs first; the error guard sits
    /// directly around `handler`, inside the chain.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::InvalidKey`] if `key` is not a valid route key.
    pub fn register_with<F>(
        &mut self,
        key: &str,
        chain: Chain,
        handler: F,
    ) -> Result<&mut Self, RouteError>
    where
        F: Fn(&Request) -> HandlerResult + Send + Sync + 'static,
    {
        let key = RouteKey::parse(key)?;
        let guarded = guard(&key.to_string(), handler);
        self.routes.insert(key, chain.wrap(guarded));
        Ok(self)
    }

    /// Adds a global middleware that runs on every request, ahead of any
    /// route-specific middleware, in the order added.
    pub fn before_all<M>(&mut self, middleware: M) -> &mut Self
    where
        M: Middleware + 'static,
    {
        self.before_all.push(middleware);
        self
    }

    /// Registers `GET url_path` to answer with `file_path` read from the static root.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::InvalidKey`] if `url_path` does not make a valid route key.
    pub fn serve_static(
        &mut self,
        url_path: &str,
        file_path: impl AsRef<Path>,
    ) -> Result<&mut Self, RouteError> {
        let files = self.static_files.clone();
        let file_path = file_path.as_ref().to_path_buf();
        self.register(&format!("GET {url_path}"), move |_req| {
            Ok(files.serve(&file_path))
        })
    }

    /// Returns the handler registered for exactly `method` and `path`.
    pub fn lookup(&self, method: Method, path: &str) -> Option<&Handler> {
        self.routes.get(&RouteKey::new(method, path))
    }

    /// Runs `request` through the global middleware and its route handler.
    ///
    /// Answers `404` with an empty body when no route matches.
    pub fn dispatch(&self, request: &Request) -> Reply {
        let Some(handler) = self.lookup(request.method(), request.path()) else {
            return Reply::empty(StatusCode::NOT_FOUND);
        };

        if self.before_all.is_empty() {
            handler(request)
        } else {
            self.before_all.wrap(Arc::clone(handler))(request)
        }
    }

    /// Returns the number of registered routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
