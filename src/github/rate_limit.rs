//! Shared rate-limit state.
//!
//! One [`RateLimiter`] is shared by every worker of a scan. Each call reserves
//! one unit of quota under the lock; when the quota is exhausted the caller
//! holding the lock sleeps until the reset time, so the pool as a whole never
//! issues calls the remote would reject.

use super::transport::ResponseMeta;
use chrono::Utc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Slack added to the reset time before calling again.
const RESET_GRACE: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateLimitState {
    /// Calls left in the current window, if known.
    pub remaining: Option<u32>,
    /// Epoch seconds at which the window resets, if known.
    pub reset_at: Option<i64>,
}

impl RateLimitState {
    /// How long to wait before the next call, given the current epoch time.
    pub fn wait_needed(&self, now_epoch: i64) -> Option<Duration> {
        match (self.remaining, self.reset_at) {
            (Some(0), Some(reset)) if reset > now_epoch => {
                Some(Duration::from_secs((reset - now_epoch) as u64) + RESET_GRACE)
            }
            _ => None,
        }
    }

    /// Record the quota headers of a response.
    pub fn observe(&mut self, meta: &ResponseMeta) {
        if let Some(remaining) = meta.ratelimit_remaining {
            self.remaining = Some(remaining);
        }
        if let Some(reset) = meta.ratelimit_reset {
            self.reset_at = Some(reset);
        }
    }

    fn reserve(&mut self) {
        if let Some(remaining) = self.remaining.as_mut() {
            *remaining = remaining.saturating_sub(1);
        }
    }
}

#[derive(Debug, Default)]
pub struct RateLimiter {
    state: Mutex<RateLimitState>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for quota, then reserve one call.
    pub async fn acquire(&self) {
        let mut state = self.state.lock().await;
        if let Some(wait) = state.wait_needed(Utc::now().timestamp()) {
            info!(
                wait_secs = wait.as_secs(),
                "GitHub rate limit exhausted, sleeping until reset"
            );
            tokio::time::sleep(wait).await;
            state.remaining = None;
            state.reset_at = None;
        }
        state.reserve();
    }

    /// Update the shared state from a response's headers.
    pub async fn observe(&self, meta: &ResponseMeta) {
        let mut state = self.state.lock().await;
        state.observe(meta);
        debug!(
            remaining = ?state.remaining,
            reset_at = ?state.reset_at,
            "rate limit updated"
        );
    }

    pub async fn snapshot(&self) -> RateLimitState {
        *self.state.lock().await
    }
}
