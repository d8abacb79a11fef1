//! Middleware pipeline: composable wrappers around request handlers.
//!
//! A middleware takes a [`Handler`] and returns a new [`Handler`] that may run
//! logic before and after the inner one, rewrite its [`Reply`], or answer on
//! its own without calling it at all.
//!
//! ## Core types
//!
//! - [`Handler`]: type-erased, cheaply-cloneable request handler.
//! - [`Middleware`]: trait implemented by all middleware; any
//!   `Fn(Handler) -> Handler` closure implements it.
//! - [`Chain`]: an ordered middleware list composed so that the first entry
//!   runs outermost.
//! - [`guard`]: turns a fallible route function into a [`Handler`] that logs
//!   failures and answers `500`.
//! - [`Logger`]: built-in request/response logger.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info};

use crate::http::{Reply, Request, StatusCode};

/// A type-erased, reference-counted request handler.
///
/// The [`Arc`] wrapper makes handlers cheap to clone, so middleware can capture
/// the handler it wraps and every worker thread can share the same route table.
pub type Handler = Arc<dyn Fn(&Request) -> Reply + Send + Sync + 'static>;

/// What route functions registered through [`Router::register`](crate::Router::register) return.
///
/// Any error converts into [`anyhow::Error`], so route code can use `?` freely.
pub type HandlerResult = anyhow::Result<Reply>;

/// Body sent to clients when a route function fails. Details stay in the log.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal Server Error";

/// Wraps a closure into a [`Handler`].
pub fn handler<F>(f: F) -> Handler
where
    F: Fn(&Request) -> Reply + Send + Sync + 'static,
{
    Arc::new(f)
}

/// The core trait for all middleware.
///
/// Implementors receive the next handler and return a handler that wraps it.
/// The returned handler may:
///
/// - **Pass through**: call `next(request)` and return its reply.
/// - **Short-circuit**: return a [`Reply`] without calling `next`.
/// - **Decorate**: call `next(request)` and return a modified reply.
///
/// Middleware is shared across worker threads, so it must be `Send + Sync`.
pub trait Middleware: Send + Sync {
    fn wrap(&self, next: Handler) -> Handler;
}

impl<F> Middleware for F
where
    F: Fn(Handler) -> Handler + Send + Sync,
{
    fn wrap(&self, next: Handler) -> Handler {
        self(next)
    }
}

/// An ordered list of middleware.
///
/// [`Chain::wrap`] applies the list in reverse, so for `[m1, m2, m3]` the
/// composed handler runs `m1` first, then `m2`, then `m3`, then the handler.
///
/// # Examples
///
/// ```
/// use wirehttp::http::Reply;
/// use wirehttp::middleware::{Chain, Logger, handler};
/// use wirehttp::security::Cors;
///
/// let chain = Chain::new().with(Logger).with(Cors::new());
/// let wrapped = chain.wrap(handler(|_req| Reply::new("ok")));
/// # let _ = wrapped;
/// ```
#[derive(Clone, Default)]
pub struct Chain {
    layers: Vec<Arc<dyn Middleware>>,
}

impl Chain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a middleware; it will run after those already in the chain.
    #[must_use]
    pub fn with<M>(mut self, middleware: M) -> Self
    where
        M: Middleware + 'static,
    {
        self.push(middleware);
        self
    }

    pub fn push<M>(&mut self, middleware: M)
    where
        M: Middleware + 'static,
    {
        self.layers.push(Arc::new(middleware));
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Composes the chain around `handler`, last middleware innermost.
    pub fn wrap(&self, handler: Handler) -> Handler {
        self.layers
            .iter()
            .rev()
            .fold(handler, |inner, middleware| middleware.wrap(inner))
    }
}

/// Converts a fallible route function into a [`Handler`].
///
/// Errors and panics raised by `f` are logged with the function's type name and
/// the route key, then answered with `500` and a generic body.
pub fn guard<F>(route: &str, f: F) -> Handler
where
    F: Fn(&Request) -> HandlerResult + Send + Sync + 'static,
{
    let name = std::any::type_name::<F>();
    let route = route.to_owned();

    Arc::new(move |request: &Request| {
        match panic::catch_unwind(AssertUnwindSafe(|| f(request))) {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => {
                let detail = format!("{e:#}");
                error!(handler = name, route = %route, error = %detail, "handler failed");
                internal_error()
            }
            Err(payload) => {
                error!(
                    handler = name,
                    route = %route,
                    panic = panic_message(payload.as_ref()),
                    "handler panicked"
                );
                internal_error()
            }
        }
    })
}

fn internal_error() -> Reply {
    Reply::from((INTERNAL_ERROR_MESSAGE, StatusCode::INTERNAL_SERVER_ERROR))
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

/// Built-in middleware that logs each request's method, path, status, and duration.
///
/// `Logger` never short-circuits; it always calls the inner handler.
pub struct Logger;

impl Middleware for Logger {
    fn wrap(&self, next: Handler) -> Handler {
        Arc::new(move |request: &Request| {
            let start = Instant::now();
            let reply = next(request);
            info!(
                method = %request.method(),
                path = request.path(),
                status = reply.status().as_u16(),
                elapsed = ?start.elapsed(),
                "request served"
            );
            reply
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::http::Payload;

    fn request() -> Request {
        Request::parse(b"GET /t HTTP/1.1\r\nHost: x\r\n\r\n").unwrap()
    }

    // Records its tag on the way in, then defers to the inner handler.
    fn tagger(tag: &'static str, log: Arc<Mutex<Vec<&'static str>>>) -> impl Middleware {
        move |next: Handler| -> Handler {
            let log = Arc::clone(&log);
            Arc::new(move |req: &Request| {
                log.lock().unwrap().push(tag);
                next(req)
            })
        }
    }

    #[test]
    fn chain_runs_first_middleware_outermost() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let inner_log = Arc::clone(&log);
        let chain = Chain::new()
            .with(tagger("m1", Arc::clone(&log)))
            .with(tagger("m2", Arc::clone(&log)))
            .with(tagger("m3", Arc::clone(&log)));

        let wrapped = chain.wrap(handler(move |_req| {
            inner_log.lock().unwrap().push("handler");
            Reply::new("done")
        }));
        wrapped(&request());

        assert_eq!(*log.lock().unwrap(), vec!["m1", "m2", "m3", "handler"]);
    }

    #[test]
    fn empty_chain_is_identity() {
        let wrapped = Chain::new().wrap(handler(|_req| Reply::new("plain")));
        assert_eq!(wrapped(&request()), Reply::new("plain"));
    }

    #[test]
    fn middleware_can_short_circuit() {
        let deny = |_next: Handler| -> Handler {
            Arc::new(|_req: &Request| Reply::empty(StatusCode::FORBIDDEN))
        };
        let wrapped = Chain::new()
            .with(deny)
            .wrap(handler(|_req| panic!("must not run")));
        assert_eq!(wrapped(&request()).status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn guard_turns_errors_into_generic_500() {
        let h = guard("GET /t", |_req: &Request| -> HandlerResult {
            anyhow::bail!("database password is hunter2")
        });
        let reply = h(&request());
        assert_eq!(reply.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(reply.payload(), &Payload::from(INTERNAL_ERROR_MESSAGE));
    }

    // Collects formatted log output for assertions.
    #[derive(Clone, Default)]
    struct CapturedLog(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLog {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for CapturedLog {
        type Writer = CapturedLog;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    impl CapturedLog {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    #[test]
    fn guard_logs_handler_name_and_error_detail() {
        fn failing_lookup(_req: &Request) -> HandlerResult {
            Err(anyhow::anyhow!("row 42 missing").context("user lookup failed"))
        }

        let log = CapturedLog::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(log.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::TRACE)
            .finish();

        let h = guard("GET /users", failing_lookup);
        let reply = tracing::subscriber::with_default(subscriber, || h(&request()));

        let output = log.contents();
        assert!(output.contains("ERROR"), "{output}");
        assert!(output.contains("handler="), "{output}");
        assert!(output.contains("failing_lookup"), "{output}");
        assert!(output.contains("GET /users"), "{output}");
        assert!(output.contains("user lookup failed: row 42 missing"), "{output}");

        assert_eq!(reply.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = String::from_utf8(reply.payload().clone().into_bytes()).unwrap();
        assert_eq!(body, INTERNAL_ERROR_MESSAGE);
        assert!(!body.contains("row 42"));
    }

    #[test]
    fn guard_catches_panics() {
        let h = guard("GET /t", |_req: &Request| -> HandlerResult { panic!("boom") });
        assert_eq!(h(&request()).status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn guard_passes_success_through() {
        let h = guard("GET /t", |_req: &Request| Ok(Reply::new("fine")));
        assert_eq!(h(&request()), Reply::new("fine"));
    }

    #[test]
    fn logger_preserves_reply() {
        let wrapped = Chain::new()
            .with(Logger)
            .wrap(handler(|_req| Reply::from(("x", StatusCode::ACCEPTED))));
        assert_eq!(wrapped(&request()).status(), StatusCode::ACCEPTED);
    }
}
