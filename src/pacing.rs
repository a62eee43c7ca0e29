//! Shared rate-limit discipline: bounded retry with a fixed backoff, and
//! explicit pacing delays between sources, items and analyzer requests.
//!
//! Every collector goes through [`RetryPolicy::run`] so the transient /
//! permanent classification lives in one place.

use std::future::Future;
use std::time::{Duration, Instant};

use metrics::counter;
use tokio::time::sleep;
use tracing::{debug, error, warn};

use crate::error::CollectError;

/// Bounded retry with a fixed delay between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Zero behaves like one.
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// Run `op` until it succeeds, fails permanently, or the attempt budget
    /// is spent. Exhausted transient failures come back as
    /// [`CollectError::Permanent`].
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T, CollectError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, CollectError>>,
    {
        let max = self.max_attempts.max(1);
        let t0 = Instant::now();
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            match op(attempt).await {
                Ok(v) => return Ok(v),
                Err(CollectError::Transient(msg)) if attempt < max => {
                    counter!("collector_retries_total").increment(1);
                    warn!(
                        target: "collect",
                        label,
                        attempt,
                        max,
                        delay_ms = self.delay.as_millis() as u64,
                        error = %msg,
                        "transient failure; backing off"
                    );
                    sleep(self.delay).await;
                }
                Err(CollectError::Transient(msg)) => {
                    error!(
                        target: "collect",
                        label,
                        attempt,
                        elapsed_ms = t0.elapsed().as_millis() as u64,
                        error = %msg,
                        "retries exhausted"
                    );
                    return Err(CollectError::Permanent(format!(
                        "{label}: gave up after {attempt} attempts: {msg}"
                    )));
                }
                Err(other) => return Err(other),
            }
        }
    }
}

/// Explicit pacing delays. All zero in tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pacer {
    pub between_sources: Duration,
    pub between_items: Duration,
    pub between_requests: Duration,
}

impl Pacer {
    pub fn none() -> Self {
        Self::default()
    }

    /// Delay before the next source; skipped after the last one.
    pub async fn after_source(&self, index: usize, total: usize) {
        if index + 1 < total {
            pause(self.between_sources, "source").await;
        }
    }

    /// Delay before every item except the first.
    pub async fn before_item(&self, index: usize) {
        if index > 0 {
            pause(self.between_items, "item").await;
        }
    }

    /// Delay before every analyzer request except the first.
    pub async fn before_request(&self, index: usize) {
        if index > 0 {
            pause(self.between_requests, "request").await;
        }
    }
}

async fn pause(d: Duration, what: &'static str) {
    if d.is_zero() {
        return;
    }
    debug!(target: "pacing", what, delay_ms = d.as_millis() as u64, "pacing delay");
    sleep(d).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast(max: u32) -> RetryPolicy {
        RetryPolicy::new(max, Duration::ZERO)
    }

    #[tokio::test]
    async fn transient_failures_are_retried_until_success() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let out = fast(3)
            .run("t", move |_| async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(CollectError::Transient("timeout".into()))
                } else {
                    Ok(n)
                }
            })
            .await;
        assert_eq!(out, Ok(2));
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausted_transient_becomes_permanent() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let out: Result<(), _> = fast(2)
            .run("t", move |_| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(CollectError::Transient("timeout".into()))
            })
            .await;
        assert!(matches!(out, Err(CollectError::Permanent(_))));
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn permanent_failure_is_not_retried() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let out: Result<(), _> = fast(5)
            .run("t", move |_| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(CollectError::Permanent("not found".into()))
            })
            .await;
        assert_eq!(out, Err(CollectError::Permanent("not found".into())));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn pacer_skips_the_delay_only_at_the_edges() {
        use tokio::time::Instant;

        let pacer = Pacer {
            between_sources: Duration::from_secs(5),
            between_items: Duration::from_secs(2),
            between_requests: Duration::from_secs(3),
        };

        let start = Instant::now();
        pacer.after_source(1, 2).await;
        assert_eq!(start.elapsed(), Duration::ZERO);
        pacer.after_source(0, 2).await;
        assert_eq!(start.elapsed(), Duration::from_secs(5));

        let start = Instant::now();
        pacer.before_item(0).await;
        assert_eq!(start.elapsed(), Duration::ZERO);
        pacer.before_item(1).await;
        assert_eq!(start.elapsed(), Duration::from_secs(2));

        let start = Instant::now();
        pacer.before_request(0).await;
        assert_eq!(start.elapsed(), Duration::ZERO);
        pacer.before_request(2).await;
        assert_eq!(start.elapsed(), Duration::from_secs(3));

        let start = Instant::now();
        Pacer::none().after_source(0, 3).await;
        Pacer::none().before_item(4).await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
