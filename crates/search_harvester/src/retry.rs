use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Bounded retry for transport failures (timeouts, connection errors).
///
/// Pages that come back with a non-200 status are not retried here; they are
/// reported as failed pages and can be re-requested with
/// [`crate::PaginatedHarvester::fetch_pages`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_millis: u64,
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            backoff_millis: 0,
        }
    }

    /// Linear backoff: the n-th retry waits n times the base delay.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.backoff_millis.saturating_mul(u64::from(attempt)))
    }

    pub fn allows_another(&self, attempts_made: u32) -> bool {
        attempts_made < self.max_attempts.max(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_millis: 2000,
        }
    }
}
