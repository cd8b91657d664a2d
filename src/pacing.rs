//! Request pacing for rate-limited APIs.
//!
//! A [`Pacer`] is a leaky bucket with capacity one: calls are spaced at least
//! `interval` apart, and time already spent on the previous request counts
//! toward the gap. It never reads rate-limit headers and never backs off.

use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug)]
pub struct Pacer {
    interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl Pacer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: Mutex::new(None),
        }
    }

    /// Wait until a request may be issued, then claim the slot.
    pub async fn pace(&self) {
        let wait = {
            let last = self
                .last
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            last.map(|at| (at + self.interval).saturating_duration_since(Instant::now()))
        };
        if let Some(wait) = wait.filter(|w| !w.is_zero()) {
            tracing::trace!(wait_ms = wait.as_millis() as u64, "Pacing request");
            tokio::time::sleep(wait).await;
        }
        *self
            .last
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(Instant::now());
    }
}
