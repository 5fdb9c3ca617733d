//! Backoff-limited retry handler.

use std::sync::Arc;

use crate::backoff::{sleep_with_cancel, BackoffSchedule, Sleeper, ThreadSleeper};
use crate::cancel::CancelToken;
use crate::response::ApiResponse;
use crate::retry::state::CommandState;

/// Attempts per logical call when nothing else is configured.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Decides whether a failed attempt may be retried: bounded attempt count,
/// geometric backoff, and the failed response's body drained no matter what.
///
/// Carries no per-call state; everything mutable lives in the
/// `CommandState` it is handed, so one instance serves any number of
/// concurrent logical calls.
pub struct BackoffRetryHandler {
    max_attempts: u32,
    schedule: BackoffSchedule,
    sleeper: Arc<dyn Sleeper>,
}

impl Default for BackoffRetryHandler {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, BackoffSchedule::default())
    }
}

impl BackoffRetryHandler {
    pub fn new(max_attempts: u32, schedule: BackoffSchedule) -> Self {
        Self {
            max_attempts,
            schedule,
            sleeper: Arc::new(ThreadSleeper),
        }
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn schedule(&self) -> &BackoffSchedule {
        &self.schedule
    }

    /// Counts the failed attempt and, if budget remains, blocks for the
    /// scheduled delay and returns true. The failed response's body is
    /// fully drained before returning, regardless of the outcome.
    pub fn should_retry(
        &self,
        state: &mut CommandState,
        response: &mut ApiResponse,
        cancel: &CancelToken,
    ) -> bool {
        if let Err(error) = response.body.drain() {
            tracing::debug!("draining failed-response body: {}", error);
        }
        self.should_retry_failure(state, cancel)
    }

    /// Same decision for failures that produced no response (transport
    /// errors), where there is no body to drain.
    pub fn should_retry_failure(&self, state: &mut CommandState, cancel: &CancelToken) -> bool {
        let attempt = state.record_attempt();
        if attempt > self.max_attempts {
            tracing::debug!(attempt, max_attempts = self.max_attempts, "retry budget exhausted");
            return false;
        }
        let delay = self.schedule.delay_for_attempt(attempt);
        tracing::debug!(
            attempt,
            delay_ms = delay.as_millis() as u64,
            "backing off before retry"
        );
        sleep_with_cancel(self.sleeper.as_ref(), cancel, delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::ApiRequest;
    use crate::testutil::{response_with_status, tracked_response, MockSleeper};
    use std::time::Duration;

    fn state() -> CommandState {
        CommandState::new(ApiRequest::get(
            "https://api.cloud.example/v2/servers".parse().unwrap(),
        ))
    }

    fn handler(sleeper: Arc<MockSleeper>) -> BackoffRetryHandler {
        BackoffRetryHandler::new(DEFAULT_MAX_ATTEMPTS, BackoffSchedule::default())
            .with_sleeper(sleeper)
    }

    #[test]
    fn five_failures_retry_then_the_sixth_does_not() {
        let sleeper = Arc::new(MockSleeper::new());
        let handler = handler(Arc::clone(&sleeper));
        let mut state = state();
        let cancel = CancelToken::new();
        for call in 1..=5 {
            let mut response = response_with_status(400);
            assert!(
                handler.should_retry(&mut state, &mut response, &cancel),
                "call {call} should still be within budget"
            );
        }
        let mut response = response_with_status(400);
        assert!(!handler.should_retry(&mut state, &mut response, &cancel));
        assert_eq!(state.attempt_count(), 6);
    }

    #[test]
    fn imposed_delays_follow_the_schedule() {
        let sleeper = Arc::new(MockSleeper::new());
        let handler = handler(Arc::clone(&sleeper));
        let mut state = state();
        let cancel = CancelToken::new();
        let mut response = response_with_status(500);
        handler.should_retry(&mut state, &mut response, &cancel);
        assert_eq!(sleeper.total_slept(), Duration::from_millis(500));
        let mut response = response_with_status(500);
        handler.should_retry(&mut state, &mut response, &cancel);
        assert_eq!(sleeper.total_slept(), Duration::from_millis(500 + 750));
    }

    #[test]
    fn body_is_drained_even_when_budget_is_exhausted() {
        let sleeper = Arc::new(MockSleeper::new());
        let handler = BackoffRetryHandler::new(0, BackoffSchedule::default())
            .with_sleeper(sleeper);
        let mut state = state();
        let (mut response, drained) = tracked_response(400, b"connection would leak");
        assert!(!handler.should_retry(&mut state, &mut response, &CancelToken::new()));
        assert!(drained.load(std::sync::atomic::Ordering::Relaxed));
    }

    #[test]
    fn cancellation_during_backoff_reports_no_retry() {
        let cancel = CancelToken::new();
        let cancel_in_sleep = cancel.clone();
        let sleeper = Arc::new(MockSleeper::with_callback(move || cancel_in_sleep.cancel()));
        let handler = handler(sleeper);
        let mut state = state();
        let mut response = response_with_status(503);
        assert!(!handler.should_retry(&mut state, &mut response, &cancel));
        assert!(cancel.is_cancelled());
    }

    #[test]
    fn transport_failures_consume_the_same_budget() {
        let sleeper = Arc::new(MockSleeper::new());
        let handler = BackoffRetryHandler::new(2, BackoffSchedule::default())
            .with_sleeper(sleeper);
        let mut state = state();
        let cancel = CancelToken::new();
        assert!(handler.should_retry_failure(&mut state, &cancel));
        assert!(handler.should_retry_failure(&mut state, &cancel));
        assert!(!handler.should_retry_failure(&mut state, &cancel));
    }
}
