// Sliding-window throttle for admin login attempts, keyed by client address.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

pub const LOGIN_MAX_ATTEMPTS: usize = 10;
pub const LOGIN_WINDOW: Duration = Duration::from_secs(15 * 60);

/// The client used up its attempts; the oldest one frees up after `retry_after`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Too many login attempts, retry in {}s", .retry_after.as_secs().max(1))]
pub struct Throttled {
    pub retry_after: Duration,
}

/// Shared between request handlers through `AppState`; clones see the same
/// attempt log.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    max_attempts: usize,
    window: Duration,
    attempts: Arc<Mutex<HashMap<String, VecDeque<Instant>>>>,
}

impl RateLimiter {
    pub fn new(max_attempts: usize, window: Duration) -> Self {
        Self {
            max_attempts,
            window,
            attempts: Arc::default(),
        }
    }

    pub fn for_logins() -> Self {
        Self::new(LOGIN_MAX_ATTEMPTS, LOGIN_WINDOW)
    }

    /// Record an attempt for `client`, or refuse it if the window is full.
    /// Refused attempts are not recorded.
    pub fn check_limit(&self, client: &str) -> Result<(), Throttled> {
        let now = Instant::now();
        let mut attempts = self.attempts.lock().unwrap_or_else(PoisonError::into_inner);
        // Drop clients whose attempts have all expired
        attempts.retain(|_, log| {
            self.prune(log, now);
            !log.is_empty()
        });
        let log = attempts.entry(client.to_string()).or_default();

        if log.len() >= self.max_attempts {
            let oldest = log.front().copied().unwrap_or(now);
            return Err(Throttled {
                retry_after: self.window.saturating_sub(now.duration_since(oldest)),
            });
        }
        log.push_back(now);
        Ok(())
    }

    /// Forget a client's attempts after a successful login.
    pub fn reset(&self, client: &str) {
        self.attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(client);
    }

    /// Attempts still inside the window.
    pub fn current_count(&self, client: &str) -> usize {
        let now = Instant::now();
        let mut attempts = self.attempts.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(log) = attempts.get_mut(client) else {
            return 0;
        };
        self.prune(log, now);
        let count = log.len();
        if count == 0 {
            attempts.remove(client);
        }
        count
    }

    fn prune(&self, log: &mut VecDeque<Instant>, now: Instant) {
        while log
            .front()
            .is_some_and(|t| now.duration_since(*t) >= self.window)
        {
            log.pop_front();
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::for_logins()
    }
}
