//! Rate limiting between provider calls.
//!
//! The harvester calls [`DelayPolicy::wait`] before every request, the first one
//! included. The provider allows 5 calls per second and 1000 per day, so the
//! default is a fixed one-second pause.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::{sleep, sleep_until, Instant};

#[async_trait::async_trait]
pub trait DelayPolicy: Send {
    async fn wait(&mut self);
}

/// Never waits. Used by tests and for providers without a rate limit.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

#[async_trait::async_trait]
impl DelayPolicy for NoDelay {
    async fn wait(&mut self) {}
}

#[derive(Debug, Clone, Copy)]
pub struct FixedDelay {
    delay: Duration,
}

impl FixedDelay {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for FixedDelay {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

#[async_trait::async_trait]
impl DelayPolicy for FixedDelay {
    async fn wait(&mut self) {
        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }
    }
}

/// Allows bursts of up to `capacity` calls, then one call per `refill_interval`.
#[derive(Debug, Clone)]
pub struct TokenBucket {
    capacity: u32,
    tokens: u32,
    refill_interval: Duration,
    last_refill: Instant,
}

impl TokenBucket {
    pub fn new(capacity: u32, refill_interval: Duration) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            tokens: capacity,
            refill_interval,
            last_refill: Instant::now(),
        }
    }

    fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill);
        let earned = elapsed.as_nanos() / self.refill_interval.as_nanos();
        if earned > 0 {
            let earned = u32::try_from(earned).unwrap_or(u32::MAX);
            self.tokens = self.tokens.saturating_add(earned).min(self.capacity);
            self.last_refill += self.refill_interval.saturating_mul(earned);
        }
        // A full bucket does not bank time.
        if self.tokens == self.capacity {
            self.last_refill = now;
        }
    }
}

#[async_trait::async_trait]
impl DelayPolicy for TokenBucket {
    async fn wait(&mut self) {
        if self.refill_interval.is_zero() {
            return;
        }
        loop {
            self.refill(Instant::now());
            if self.tokens > 0 {
                self.tokens -= 1;
                return;
            }
            sleep_until(self.last_refill + self.refill_interval).await;
        }
    }
}

/// Serializable choice of delay policy, as it appears in configuration files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DelayPolicySettings {
    None,
    Fixed { millis: u64 },
    TokenBucket { capacity: u32, refill_millis: u64 },
}

impl Default for DelayPolicySettings {
    fn default() -> Self {
        DelayPolicySettings::Fixed { millis: 1000 }
    }
}

impl DelayPolicySettings {
    pub fn build(&self) -> Box<dyn DelayPolicy> {
        match self {
            DelayPolicySettings::None => Box::new(NoDelay),
            DelayPolicySettings::Fixed { millis } => {
                Box::new(FixedDelay::new(Duration::from_millis(*millis)))
            }
            DelayPolicySettings::TokenBucket {
                capacity,
                refill_millis,
            } => Box::new(TokenBucket::new(
                *capacity,
                Duration::from_millis(*refill_millis),
            )),
        }
    }
}
