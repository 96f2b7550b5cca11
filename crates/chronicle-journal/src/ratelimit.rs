//! Sliding-window append rate limiting, keyed by project.
//!
//! Guards the rotation estimator from thrashing on pathologically bursty
//! agents: each append checks and records against a per-project window, and
//! over-limit requests fail with a `retry_after_seconds` computed from the
//! oldest timestamp still inside the window.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::debug;

use chronicle_contracts::error::{ChronicleError, ChronicleResult};

/// A per-project sliding-window counter.
pub struct AppendRateLimiter {
    limit: u32,
    window: Duration,
    windows: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl AppendRateLimiter {
    /// Allow `limit` appends per project within each sliding `window`.
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Check the project's window and record this append if admitted.
    ///
    /// Over-limit requests fail with `RateLimited`; `retry_after_seconds` is
    /// when the oldest recorded append will age out of the window, never
    /// less than 1.
    pub fn check_and_record(&self, project: &str) -> ChronicleResult<()> {
        let now = Instant::now();
        let mut windows = self.windows.lock().map_err(|_| ChronicleError::StoreFailed {
            reason: "rate limiter lock poisoned".to_string(),
        })?;
        let window = windows.entry(project.to_string()).or_default();

        // Age out timestamps that slid past the window.
        while let Some(oldest) = window.front() {
            if now.duration_since(*oldest) >= self.window {
                window.pop_front();
            } else {
                break;
            }
        }

        if window.len() >= self.limit as usize {
            let oldest = *window.front().expect("over-limit window cannot be empty");
            let until_free = self.window.saturating_sub(now.duration_since(oldest));
            let retry_after_seconds = (until_free.as_secs_f64().ceil() as u64).max(1);
            debug!(project, retry_after_seconds, "append rate limited");
            return Err(ChronicleError::RateLimited { retry_after_seconds });
        }

        window.push_back(now);
        Ok(())
    }
}
