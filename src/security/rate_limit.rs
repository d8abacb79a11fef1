//! Sliding-window rate limiting.
//!
//! Every client has a queue of request timestamps. A check drops timestamps
//! older than the window and admits the request when fewer than `limit`
//! remain. Clients that stay idle for a whole window are evicted from the map
//! during a periodic sweep, so memory tracks recently active clients only.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::http::{Reply, Request, StatusCode};
use crate::middleware::{Handler, Middleware};

/// Default number of requests admitted per window.
pub const DEFAULT_LIMIT: usize = 100;

/// Default window length.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

/// Body of the `429` reply sent by [`RateLimit`].
pub const RATE_LIMITED_MESSAGE: &str = "Rate limit exceeded";

#[derive(Default)]
struct Window {
    clients: HashMap<String, VecDeque<Instant>>,
    last_sweep: Option<Instant>,
}

/// A per-client sliding-window rate limiter, safe to share between threads.
///
/// # Examples
///
/// ```
/// use std::time::{Duration, Instant};
/// use wirehttp::security::RateLimiter;
///
/// let limiter = RateLimiter::new(2, Duration::from_secs(60));
/// let now = Instant::now();
/// assert!(limiter.allow_at("10.0.0.1", now));
/// assert!(limiter.allow_at("10.0.0.1", now));
/// assert!(!limiter.allow_at("10.0.0.1", now));
/// assert!(limiter.allow_at("10.0.0.2", now));
/// ```
pub struct RateLimiter {
    limit: usize,
    window: Duration,
    state: Mutex<Window>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_LIMIT, DEFAULT_WINDOW)
    }
}

impl RateLimiter {
    pub fn new(limit: usize, window: Duration) -> Self {
        Self {
            limit,
            window,
            state: Mutex::new(Window::default()),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Records a request from `client` now, if the client is under its limit.
    pub fn allow(&self, client: &str) -> bool {
        self.allow_at(client, Instant::now())
    }

    /// Records a request from `client` at `now`, if the client is under its limit.
    ///
    /// A timestamp earlier than the client's latest one is clamped to it so
    /// the per-client sequence never goes backwards.
    pub fn allow_at(&self, client: &str, now: Instant) -> bool {
        let mut state = self.lock();
        self.sweep(&mut state, now);

        let timestamps = state.clients.entry(client.to_owned()).or_default();

        let now = timestamps.back().map_or(now, |&last| now.max(last));
        while let Some(&oldest) = timestamps.front() {
            if now.duration_since(oldest) < self.window {
                break;
            }
            timestamps.pop_front();
        }

        if timestamps.len() < self.limit {
            timestamps.push_back(now);
            true
        } else {
            false
        }
    }

    /// Number of clients currently held in memory.
    pub fn tracked_clients(&self) -> usize {
        self.lock().clients.len()
    }

    /// Removes every client with no request inside the window ending at `now`.
    pub fn evict_idle_at(&self, now: Instant) {
        let mut state = self.lock();
        self.evict(&mut state, now);
        state.last_sweep = Some(now);
    }

    fn lock(&self) -> MutexGuard<'_, Window> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // Runs an eviction pass at most once per window.
    fn sweep(&self, state: &mut Window, now: Instant) {
        match state.last_sweep {
            None => state.last_sweep = Some(now),
            Some(last) if now.saturating_duration_since(last) >= self.window => {
                self.evict(state, now);
                state.last_sweep = Some(now);
            }
            Some(_) => {}
        }
    }

    fn evict(&self, state: &mut Window, now: Instant) {
        let before = state.clients.len();
        let window = self.window;
        state.clients.retain(|_, timestamps| {
            timestamps
                .back()
                .is_some_and(|&last| now.saturating_duration_since(last) < window)
        });
        let evicted = before - state.clients.len();
        if evicted > 0 {
            debug!(evicted, remaining = state.clients.len(), "evicted idle rate-limit clients");
        }
    }
}

/// Middleware that rejects clients over their limit with `429 Rate limit exceeded`.
///
/// Clients are keyed by IP address. The limiter is shared, so one instance
/// can guard several routes with a single budget.
#[derive(Clone)]
pub struct RateLimit {
    limiter: Arc<RateLimiter>,
}

impl RateLimit {
    pub fn new(limiter: Arc<RateLimiter>) -> Self {
        Self { limiter }
    }
}

impl Middleware for RateLimit {
    fn wrap(&self, next: Handler) -> Handler {
        let limiter = Arc::clone(&self.limiter);
        Arc::new(move |request: &Request| {
            let client = request
                .client_ip()
                .map_or_else(|| "unknown".to_owned(), |ip| ip.to_string());
            if limiter.allow(&client) {
                next(request)
            } else {
                warn!(client = %client, path = request.path(), "rate limit exceeded");
                Reply::from((RATE_LIMITED_MESSAGE, StatusCode::TOO_MANY_REQUESTS))
            }
        })
    }
}
