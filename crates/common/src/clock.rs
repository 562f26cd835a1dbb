//! Clock abstraction for timed retries.
//!
//! Retry and polling loops take a [`Clock`] instead of calling
//! `tokio::time::sleep` directly, so tests can assert the exact delay
//! sequence without waiting in real time.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

/// Source of timed suspension for retry and polling loops.
#[async_trait]
pub trait Clock: Send + Sync {
    /// Suspends the current task for the given duration.
    async fn sleep(&self, duration: Duration);
}

/// Production clock backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Test clock that records requested sleeps and returns immediately.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    sleeps: Arc<Mutex<Vec<Duration>>>,
}

impl ManualClock {
    /// Creates a new manual clock with no recorded sleeps.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every sleep requested so far, in order.
    pub fn recorded(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }

    /// Returns the number of sleeps requested so far.
    pub fn sleep_count(&self) -> usize {
        self.sleeps.lock().unwrap().len()
    }
}

#[async_trait]
impl Clock for ManualClock {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn manual_clock_records_sleeps_in_order() {
        let clock = ManualClock::new();
        clock.sleep(Duration::from_secs(5)).await;
        clock.sleep(Duration::from_secs(10)).await;

        assert_eq!(
            clock.recorded(),
            vec![Duration::from_secs(5), Duration::from_secs(10)]
        );
        assert_eq!(clock.sleep_count(), 2);
    }

    #[tokio::test]
    async fn manual_clock_clones_share_recording() {
        let clock = ManualClock::new();
        let other = clock.clone();
        other.sleep(Duration::from_secs(2)).await;

        assert_eq!(clock.sleep_count(), 1);
    }
}
