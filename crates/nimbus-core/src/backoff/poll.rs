//! Bounded poll-until-true predicate with geometric backoff.
//!
//! Used for "wait until the remote resource reaches the desired state"
//! loops. Which failure classes of the check are treated as "not yet
//! satisfied" (and swallowed) is explicit configuration, not convention.

use std::time::{Duration, Instant};

use super::{sleep_with_cancel, BackoffSchedule, Sleeper};
use crate::cancel::CancelToken;

/// How long the predicate keeps polling before giving up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollBound {
    /// Stop after this many invocations of the check.
    MaxAttempts(u32),
    /// Stop once this much wall-clock time has elapsed.
    Deadline(Duration),
}

/// Failure class reported by a poll check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckFailure {
    /// The checked operation itself failed (e.g. the probe request errored).
    Execution,
    /// The resource is in a state the check cannot evaluate yet.
    IllegalState,
    /// The checked operation was cancelled remotely.
    Cancelled,
    /// The checked operation timed out.
    Timeout,
    /// Anything else.
    Other,
}

/// Error raised by a poll check closure.
#[derive(Debug, thiserror::Error)]
#[error("poll check failed ({kind:?}): {message}")]
pub struct CheckError {
    pub kind: CheckFailure,
    pub message: String,
}

impl CheckError {
    pub fn new(kind: CheckFailure, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// The failure classes swallowed by default: the check not working yet is
/// the normal case while a remote resource converges.
pub fn default_swallowed() -> Vec<CheckFailure> {
    vec![
        CheckFailure::Execution,
        CheckFailure::IllegalState,
        CheckFailure::Cancelled,
        CheckFailure::Timeout,
    ]
}

/// Configuration for one polling loop.
#[derive(Debug, Clone)]
pub struct PollOptions {
    pub schedule: BackoffSchedule,
    pub bound: PollBound,
    /// Check failure classes treated as "not yet satisfied". Any failure
    /// class not listed here propagates out of `poll_until` immediately.
    pub swallowed: Vec<CheckFailure>,
}

impl PollOptions {
    pub fn new(schedule: BackoffSchedule, bound: PollBound) -> Self {
        Self {
            schedule,
            bound,
            swallowed: default_swallowed(),
        }
    }

    pub fn max_attempts(attempts: u32) -> Self {
        Self::new(BackoffSchedule::default(), PollBound::MaxAttempts(attempts))
    }

    pub fn deadline(limit: Duration) -> Self {
        Self::new(BackoffSchedule::default(), PollBound::Deadline(limit))
    }

    pub fn with_swallowed(mut self, swallowed: Vec<CheckFailure>) -> Self {
        self.swallowed = swallowed;
        self
    }
}

/// Repeatedly invokes `check` until it reports true, sleeping the schedule's
/// delay between invocations.
///
/// Returns `Ok(true)` on success, `Ok(false)` when the bound is exceeded or
/// `cancel` is set (including mid-sleep), and `Err` when the check raises a
/// failure class not listed in `options.swallowed`.
pub fn poll_until<F>(
    options: &PollOptions,
    cancel: &CancelToken,
    sleeper: &dyn Sleeper,
    mut check: F,
) -> Result<bool, CheckError>
where
    F: FnMut() -> Result<bool, CheckError>,
{
    let started = Instant::now();
    let mut attempt = 1u32;
    loop {
        if cancel.is_cancelled() {
            tracing::debug!(attempt, "polling cancelled");
            return Ok(false);
        }
        match check() {
            Ok(true) => return Ok(true),
            Ok(false) => {}
            Err(error) if options.swallowed.contains(&error.kind) => {
                tracing::debug!(attempt, kind = ?error.kind, "poll check not satisfied: {}", error.message);
            }
            Err(error) => return Err(error),
        }
        let exhausted = match options.bound {
            PollBound::MaxAttempts(max) => attempt >= max,
            PollBound::Deadline(limit) => started.elapsed() >= limit,
        };
        if exhausted {
            tracing::debug!(attempt, "polling bound exceeded");
            return Ok(false);
        }
        let delay = options.schedule.delay_for_attempt(attempt);
        if !sleep_with_cancel(sleeper, cancel, delay) {
            return Ok(false);
        }
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MockSleeper;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn tiny_schedule() -> BackoffSchedule {
        BackoffSchedule::new(Duration::from_millis(10), Duration::from_millis(40))
    }

    #[test]
    fn returns_true_when_check_succeeds() {
        let options =
            PollOptions::new(tiny_schedule(), PollBound::MaxAttempts(5));
        let calls = AtomicU32::new(0);
        let satisfied = poll_until(&options, &CancelToken::new(), &MockSleeper::new(), || {
            Ok(calls.fetch_add(1, Ordering::Relaxed) >= 2)
        })
        .unwrap();
        assert!(satisfied);
        assert_eq!(calls.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn attempt_bound_limits_number_of_checks() {
        let options =
            PollOptions::new(tiny_schedule(), PollBound::MaxAttempts(4));
        let calls = AtomicU32::new(0);
        let satisfied = poll_until(&options, &CancelToken::new(), &MockSleeper::new(), || {
            calls.fetch_add(1, Ordering::Relaxed);
            Ok(false)
        })
        .unwrap();
        assert!(!satisfied);
        assert_eq!(calls.load(Ordering::Relaxed), 4);
    }

    #[test]
    fn backoff_delays_between_checks_follow_schedule() {
        let options =
            PollOptions::new(tiny_schedule(), PollBound::MaxAttempts(4));
        let sleeper = MockSleeper::new();
        let _ = poll_until(&options, &CancelToken::new(), &sleeper, || Ok(false)).unwrap();
        // Three sleeps between four checks: 10, 15, 22 ms.
        assert_eq!(sleeper.total_slept(), Duration::from_millis(10 + 15 + 22));
    }

    #[test]
    fn deadline_bound_stops_polling() {
        let options = PollOptions::new(tiny_schedule(), PollBound::Deadline(Duration::ZERO));
        let calls = AtomicU32::new(0);
        let satisfied = poll_until(&options, &CancelToken::new(), &MockSleeper::new(), || {
            calls.fetch_add(1, Ordering::Relaxed);
            Ok(false)
        })
        .unwrap();
        assert!(!satisfied);
        // The check runs once before the deadline is consulted.
        assert_eq!(calls.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn swallowed_failures_keep_the_loop_going() {
        let options =
            PollOptions::new(tiny_schedule(), PollBound::MaxAttempts(3));
        let calls = AtomicU32::new(0);
        let satisfied = poll_until(&options, &CancelToken::new(), &MockSleeper::new(), || {
            if calls.fetch_add(1, Ordering::Relaxed) < 2 {
                Err(CheckError::new(CheckFailure::Execution, "probe failed"))
            } else {
                Ok(true)
            }
        })
        .unwrap();
        assert!(satisfied);
        assert_eq!(calls.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn unlisted_failure_class_propagates() {
        let options = PollOptions::new(tiny_schedule(), PollBound::MaxAttempts(5))
            .with_swallowed(vec![CheckFailure::Timeout]);
        let result = poll_until(&options, &CancelToken::new(), &MockSleeper::new(), || {
            Err(CheckError::new(CheckFailure::Execution, "hard failure"))
        });
        let error = result.unwrap_err();
        assert_eq!(error.kind, CheckFailure::Execution);
    }

    #[test]
    fn cancellation_before_check_reports_false() {
        let options =
            PollOptions::new(tiny_schedule(), PollBound::MaxAttempts(5));
        let cancel = CancelToken::new();
        cancel.cancel();
        let satisfied = poll_until(&options, &cancel, &MockSleeper::new(), || Ok(true)).unwrap();
        assert!(!satisfied);
    }

    #[test]
    fn cancellation_during_sleep_exits_promptly() {
        let options =
            PollOptions::new(tiny_schedule(), PollBound::MaxAttempts(5));
        let cancel = CancelToken::new();
        let cancel_in_sleep = cancel.clone();
        let sleeper = MockSleeper::with_callback(move || cancel_in_sleep.cancel());
        let calls = AtomicU32::new(0);
        let satisfied = poll_until(&options, &cancel, &sleeper, || {
            calls.fetch_add(1, Ordering::Relaxed);
            Ok(false)
        })
        .unwrap();
        assert!(!satisfied);
        assert_eq!(calls.load(Ordering::Relaxed), 1);
    }
}
