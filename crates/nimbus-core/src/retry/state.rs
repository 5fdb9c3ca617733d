//! Per-call mutable record shared by the executor and the retry handlers.

use crate::request::ApiRequest;
use crate::retry::error::ApiError;

/// State of one in-flight logical call. Owned exclusively by that call;
/// created fresh at its start and never reused. Counters only increase.
#[derive(Debug)]
pub struct CommandState {
    attempt_count: u32,
    redirect_count: u32,
    current_request: ApiRequest,
    last_failure: Option<ApiError>,
}

impl CommandState {
    pub fn new(request: ApiRequest) -> Self {
        Self {
            attempt_count: 0,
            redirect_count: 0,
            current_request: request,
            last_failure: None,
        }
    }

    /// Failed attempts counted against the retry budget.
    pub fn attempt_count(&self) -> u32 {
        self.attempt_count
    }

    pub fn redirect_count(&self) -> u32 {
        self.redirect_count
    }

    /// The request the next attempt will send. Redirects rewrite it in
    /// place via `current_request_mut`.
    pub fn current_request(&self) -> &ApiRequest {
        &self.current_request
    }

    pub fn current_request_mut(&mut self) -> &mut ApiRequest {
        &mut self.current_request
    }

    /// Counts one failed attempt; returns the new count.
    pub fn record_attempt(&mut self) -> u32 {
        self.attempt_count += 1;
        self.attempt_count
    }

    /// Counts one redirect; returns the new count. Never touches the
    /// attempt counter.
    pub fn record_redirect(&mut self) -> u32 {
        self.redirect_count += 1;
        self.redirect_count
    }

    pub fn set_last_failure(&mut self, failure: ApiError) {
        self.last_failure = Some(failure);
    }

    pub fn last_failure(&self) -> Option<&ApiError> {
        self.last_failure.as_ref()
    }
}
