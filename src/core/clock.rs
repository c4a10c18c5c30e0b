//! Injectable Clock Capability
//!
//! Timeout eligibility and the reconciliation retry loop both depend on
//! wall-clock time and on suspending between attempts. Passing a clock in
//! makes those paths unit-testable without real time passing.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// A source of wall-clock time plus a non-blocking sleep.
#[allow(async_fn_in_trait)]
pub trait Clock: Clone + Send + Sync {
    /// Current unix time in seconds.
    fn now_unix(&self) -> u64;

    /// Suspend the current task for `duration` without blocking the thread.
    async fn sleep(&self, duration: Duration);
}

/// Production clock: system time + tokio timers.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Test clock: time only moves when told to, and sleeps advance it
/// immediately instead of waiting.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    /// Create a manual clock starting at the given unix second.
    pub fn starting_at(unix_secs: u64) -> ManualClock {
        ManualClock {
            now: Arc::new(AtomicU64::new(unix_secs)),
        }
    }

    /// Advance the clock by `secs`.
    pub fn advance(&self, secs: u64) {
        self.now.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_unix(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }

    async fn sleep(&self, duration: Duration) {
        // Sleeping in tests is instantaneous but still observable as time.
        self.now.fetch_add(duration.as_secs(), Ordering::SeqCst);
        tokio::task::yield_now().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_manual_clock_advances() {
        let clock = ManualClock::starting_at(1_000);
        assert_eq!(clock.now_unix(), 1_000);

        clock.advance(30);
        assert_eq!(clock.now_unix(), 1_030);

        clock.sleep(Duration::from_secs(5)).await;
        assert_eq!(clock.now_unix(), 1_035);
    }

    #[tokio::test]
    async fn test_manual_clock_shared_across_clones() {
        let clock = ManualClock::starting_at(0);
        let other = clock.clone();
        clock.advance(10);
        assert_eq!(other.now_unix(), 10);
    }

    #[test]
    fn test_system_clock_is_nonzero() {
        assert!(SystemClock.now_unix() > 0);
    }
}
