//! Per-source minimum-interval enforcement.
//!
//! One logical limiter per source id; acquires for the same source are
//! serialized at least `min_interval` apart, acquires for different sources
//! never wait on each other. No fairness or back-pressure guarantee beyond
//! strict spacing — callers that need a harsher policy supply a larger
//! interval.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

pub struct RateLimiter {
    default_interval: Duration,
    intervals: HashMap<String, Duration>,
    /// Next instant at which each source may fire. The reservation is written
    /// while the lock is held, so concurrent callers of the same source queue
    /// behind each other instead of racing the timestamp.
    next_slot: Mutex<HashMap<String, Instant>>,
}

impl RateLimiter {
    pub fn new(default_interval: Duration) -> Self {
        Self {
            default_interval,
            intervals: HashMap::new(),
            next_slot: Mutex::new(HashMap::new()),
        }
    }

    /// Override the spacing for one source.
    pub fn with_interval(mut self, source_id: &str, interval: Duration) -> Self {
        self.intervals.insert(source_id.to_string(), interval);
        self
    }

    fn interval_for(&self, source_id: &str) -> Duration {
        self.intervals
            .get(source_id)
            .copied()
            .unwrap_or(self.default_interval)
    }

    /// Suspend until at least the source's interval has elapsed since the
    /// previous acquire for that source. Zero wait if already elapsed.
    pub async fn acquire(&self, source_id: &str) {
        let interval = self.interval_for(source_id);
        let wait = {
            let mut slots = self.next_slot.lock().await;
            let now = Instant::now();
            match slots.get(source_id) {
                Some(ready_at) => {
                    let wait = ready_at.saturating_duration_since(now);
                    slots.insert(source_id.to_string(), now + wait + interval);
                    wait
                }
                None => {
                    slots.insert(source_id.to_string(), now + interval);
                    Duration::ZERO
                }
            }
        };
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }
    }
}
