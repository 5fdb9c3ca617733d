//! Backoff schedule and polling predicate.
//!
//! `BackoffSchedule` is pure data: a geometric delay progression with a cap.
//! It feeds both the retry handler (delay between failed attempts) and the
//! polling predicate (`poll_until`, delay between state checks). Sleeping
//! goes through the `Sleeper` trait so tests never wait on real time.

mod poll;

pub use poll::{default_swallowed, poll_until, CheckError, CheckFailure, PollBound, PollOptions};

use std::time::Duration;

use crate::cancel::CancelToken;

/// Default first delay between attempts.
pub const DEFAULT_INITIAL_PERIOD: Duration = Duration::from_millis(500);
/// Default upper bound on any single delay.
pub const DEFAULT_MAX_PERIOD: Duration = Duration::from_millis(5000);
/// Default geometric growth factor between consecutive delays.
pub const DEFAULT_GROWTH_FACTOR: f64 = 1.5;

/// Geometrically growing delay progression with a cap.
///
/// `delay_for_attempt(n) = min(initial_period * growth_factor^(n-1), max_period)`,
/// so delays are non-decreasing up to the cap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffSchedule {
    pub initial_period: Duration,
    pub max_period: Duration,
    pub growth_factor: f64,
}

impl Default for BackoffSchedule {
    fn default() -> Self {
        Self {
            initial_period: DEFAULT_INITIAL_PERIOD,
            max_period: DEFAULT_MAX_PERIOD,
            growth_factor: DEFAULT_GROWTH_FACTOR,
        }
    }
}

impl BackoffSchedule {
    pub fn new(initial_period: Duration, max_period: Duration) -> Self {
        Self {
            initial_period,
            max_period,
            growth_factor: DEFAULT_GROWTH_FACTOR,
        }
    }

    /// Growth factors below 1.0 would shrink delays; clamped to 1.0.
    pub fn with_growth_factor(mut self, factor: f64) -> Self {
        self.growth_factor = factor.max(1.0);
        self
    }

    /// Delay before retrying after the `attempt`-th failure (1-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let attempt = attempt.max(1);
        // Exponent capped so the f64 power cannot blow up for huge counters.
        let exponent = (attempt - 1).min(64) as i32;
        let raw_ms = self.initial_period.as_millis() as f64 * self.growth_factor.powi(exponent);
        let capped_ms = raw_ms.min(self.max_period.as_millis() as f64);
        Duration::from_millis(capped_ms as u64)
    }
}

/// Mockable time source for deterministic tests.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

/// Production sleeper: blocks the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Granularity at which a backoff sleep notices cancellation.
const CANCEL_CHECK_SLICE: Duration = Duration::from_millis(50);

/// Sleeps `total` in short slices, checking `cancel` between slices.
/// Returns false if cancellation was observed before the sleep finished.
pub fn sleep_with_cancel(sleeper: &dyn Sleeper, cancel: &CancelToken, total: Duration) -> bool {
    let mut remaining = total;
    while !remaining.is_zero() {
        if cancel.is_cancelled() {
            return false;
        }
        let slice = remaining.min(CANCEL_CHECK_SLICE);
        sleeper.sleep(slice);
        remaining = remaining.saturating_sub(slice);
    }
    !cancel.is_cancelled()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MockSleeper;

    #[test]
    fn delays_follow_growth_factor_then_cap() {
        let schedule = BackoffSchedule::default();
        // 500 * 1.5^(n-1), capped at 5000.
        assert_eq!(schedule.delay_for_attempt(1), Duration::from_millis(500));
        assert_eq!(schedule.delay_for_attempt(2), Duration::from_millis(750));
        assert_eq!(schedule.delay_for_attempt(3), Duration::from_millis(1125));
        assert_eq!(schedule.delay_for_attempt(4), Duration::from_millis(1687));
        assert_eq!(schedule.delay_for_attempt(5), Duration::from_millis(2531));
    }

    #[test]
    fn cap_applies_exactly_when_uncapped_value_exceeds_it() {
        let schedule = BackoffSchedule::default();
        // 500 * 1.5^5 = 3796.875 is still under the cap; 1.5^6 = 5695.3 is not.
        assert_eq!(schedule.delay_for_attempt(6), Duration::from_millis(3796));
        assert_eq!(schedule.delay_for_attempt(7), Duration::from_millis(5000));
        assert_eq!(schedule.delay_for_attempt(30), Duration::from_millis(5000));
    }

    #[test]
    fn delays_are_monotonically_non_decreasing() {
        let schedule = BackoffSchedule::new(Duration::from_millis(100), Duration::from_secs(2));
        let mut previous = Duration::ZERO;
        for attempt in 1..=20 {
            let delay = schedule.delay_for_attempt(attempt);
            assert!(delay >= previous, "attempt {attempt} shrank the delay");
            previous = delay;
        }
    }

    #[test]
    fn growth_factor_below_one_is_clamped() {
        let schedule = BackoffSchedule::default().with_growth_factor(0.5);
        assert_eq!(schedule.delay_for_attempt(1), schedule.delay_for_attempt(5));
    }

    #[test]
    fn sleep_with_cancel_sleeps_full_duration() {
        let sleeper = MockSleeper::new();
        let cancel = CancelToken::new();
        assert!(sleep_with_cancel(
            &sleeper,
            &cancel,
            Duration::from_millis(120)
        ));
        assert_eq!(sleeper.total_slept(), Duration::from_millis(120));
    }

    #[test]
    fn sleep_with_cancel_stops_when_cancelled() {
        let sleeper = MockSleeper::new();
        let cancel = CancelToken::new();
        cancel.cancel();
        assert!(!sleep_with_cancel(
            &sleeper,
            &cancel,
            Duration::from_millis(500)
        ));
        assert_eq!(sleeper.total_slept(), Duration::ZERO);
    }
}
