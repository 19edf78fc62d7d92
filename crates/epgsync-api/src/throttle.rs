//! Per-provider request throttle.

use std::time::{Duration, Instant};

/// Enforces a minimum interval between consecutive upstream requests.
///
/// Shared behind a `tokio::sync::Mutex` so that concurrent batch fetches
/// queue up instead of bursting.
#[derive(Debug)]
pub struct RequestThrottle {
    /// Minimum interval between requests (zero disables throttling).
    min_interval: Duration,
    /// Last request timestamp.
    last_request: Option<Instant>,
    /// Requests let through so far.
    issued: u64,
}

impl RequestThrottle {
    /// Creates a new throttle.
    pub(crate) const fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request: None,
            issued: 0,
        }
    }

    /// Waits until the next request is allowed, then records it.
    pub async fn wait(&mut self) {
        if let Some(last) = self.last_request {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                let remaining = self.min_interval.saturating_sub(elapsed);
                tracing::trace!(
                    remaining_ms = u64::try_from(remaining.as_millis()).unwrap_or(u64::MAX),
                    "Throttling request"
                );
                tokio::time::sleep(remaining).await;
            }
        }

        self.last_request = Some(Instant::now());
        self.issued = self.issued.saturating_add(1);
    }

    /// Number of requests let through.
    pub const fn issued(&self) -> u64 {
        self.issued
    }
}
