//! Command executor: one logical call across bounded attempts.
//!
//! Drives the state machine
//! `Sending → AwaitingResponse → {Succeeded | Redirecting | Retrying | Failed}`:
//! a success-range status returns the response; a redirect status goes
//! through the redirection handler; any other status is decoded, classified,
//! and either delegated to the backoff handler or surfaced as a terminal
//! `ApiError`. Transport-level failures ride the same ladder. The loop
//! terminates because both the attempt and redirect counters are bounded.

use std::sync::Arc;
use std::time::{Duration, Instant};

use http::StatusCode;
use url::Url;

use crate::cancel::CancelToken;
use crate::config::NimbusConfig;
use crate::decode::{ErrorDecoder, ErrorDescriptor, SniffingErrorDecoder};
use crate::request::ApiRequest;
use crate::response::ApiResponse;
use crate::retry::{
    classify_transport, ApiError, BackoffRetryHandler, Classification, ClassifierChain,
    CommandState, ErrorKind, RedirectHandler,
};
use crate::transport::{Transport, TransportError};

/// Per-call observability: physical attempts dispatched, redirects
/// followed, wall-clock time spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallStats {
    pub attempts: u32,
    pub redirects: u32,
    pub elapsed: Duration,
}

/// What the executor decided to do about one failed attempt.
#[derive(Debug)]
pub enum RetryDecision {
    /// Re-send after the backoff delay that was just imposed.
    Retry { delay: Duration },
    /// Re-send against the rewritten endpoint, immediately.
    Redirect { target: Url },
    /// Terminal; surface to the caller.
    Fail(ApiError),
}

/// Executes logical calls. Holds only stateless collaborators, so one
/// executor serves any number of concurrent calls, each with its own
/// `CommandState`.
pub struct CommandExecutor {
    transport: Arc<dyn Transport>,
    decoder: Box<dyn ErrorDecoder>,
    chain: ClassifierChain,
    retry_handler: BackoffRetryHandler,
    redirect_handler: RedirectHandler,
}

impl CommandExecutor {
    /// Executor with stock collaborators and an empty transient-code set.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            decoder: Box::new(SniffingErrorDecoder),
            chain: ClassifierChain::standard(Vec::new()),
            retry_handler: BackoffRetryHandler::default(),
            redirect_handler: RedirectHandler::default(),
        }
    }

    pub fn from_config(config: &NimbusConfig, transport: Arc<dyn Transport>) -> Self {
        Self::new(transport)
            .with_chain(ClassifierChain::standard(
                config.classifier.transient_codes.iter().cloned(),
            ))
            .with_retry_handler(BackoffRetryHandler::new(
                config.retry.max_attempts,
                config.retry.schedule(),
            ))
            .with_redirect_handler(RedirectHandler::new(config.redirect.max_redirects))
    }

    pub fn with_decoder(mut self, decoder: Box<dyn ErrorDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn with_chain(mut self, chain: ClassifierChain) -> Self {
        self.chain = chain;
        self
    }

    pub fn with_retry_handler(mut self, handler: BackoffRetryHandler) -> Self {
        self.retry_handler = handler;
        self
    }

    pub fn with_redirect_handler(mut self, handler: RedirectHandler) -> Self {
        self.redirect_handler = handler;
        self
    }

    /// Executes one logical call to completion.
    pub fn execute(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        self.execute_with_stats(request, &CancelToken::new()).0
    }

    /// Like `execute`, also reporting per-call stats. The call observes
    /// `cancel` between attempts and during backoff sleeps.
    pub fn execute_with_stats(
        &self,
        request: ApiRequest,
        cancel: &CancelToken,
    ) -> (Result<ApiResponse, ApiError>, CallStats) {
        let started = Instant::now();
        let mut state = CommandState::new(request);
        let mut attempts = 0u32;
        let mut redirects = 0u32;

        let result = loop {
            if cancel.is_cancelled() {
                break Err(cancelled_error());
            }
            attempts += 1;
            tracing::debug!(
                attempt = attempts,
                method = %state.current_request().method,
                endpoint = %state.current_request().endpoint,
                "sending request"
            );
            let decision = match self.transport.send(state.current_request()) {
                Ok(response) if response.status.is_success() => break Ok(response),
                Ok(response) if response.status.is_redirection() => {
                    self.decide_redirect(&mut state, response)
                }
                Ok(response) => self.decide_failed_response(&mut state, response, cancel),
                Err(error) => self.decide_transport_failure(&mut state, error, cancel),
            };
            match decision {
                RetryDecision::Retry { delay } => {
                    tracing::debug!(delay_ms = delay.as_millis() as u64, "retrying");
                }
                RetryDecision::Redirect { target } => {
                    redirects += 1;
                    tracing::debug!(to = %target, "redirecting");
                }
                RetryDecision::Fail(error) => {
                    tracing::warn!(%error, attempts, "logical call failed");
                    break Err(error);
                }
            }
        };

        let stats = CallStats {
            attempts,
            redirects,
            elapsed: started.elapsed(),
        };
        tracing::debug!(
            attempts = stats.attempts,
            redirects = stats.redirects,
            elapsed_ms = stats.elapsed.as_millis() as u64,
            ok = result.is_ok(),
            "logical call finished"
        );
        (result, stats)
    }

    fn decide_redirect(&self, state: &mut CommandState, mut response: ApiResponse) -> RetryDecision {
        let followed = self.redirect_handler.should_retry(state, &response);
        // Bodies of abandoned responses never survive into the next attempt.
        if let Err(error) = response.body.drain() {
            tracing::debug!("draining redirect body: {}", error);
        }
        if followed {
            return RetryDecision::Redirect {
                target: state.current_request().endpoint.clone(),
            };
        }
        if state.redirect_count() > self.redirect_handler.max_redirects() {
            RetryDecision::Fail(
                ApiError::new(
                    ErrorKind::TooManyRedirects,
                    format!(
                        "redirect bound of {} exceeded",
                        self.redirect_handler.max_redirects()
                    ),
                )
                .with_status(response.status.as_u16()),
            )
        } else {
            RetryDecision::Fail(
                ApiError::new(
                    ErrorKind::Unknown,
                    "redirect response with missing or unresolvable Location",
                )
                .with_status(response.status.as_u16()),
            )
        }
    }

    fn decide_failed_response(
        &self,
        state: &mut CommandState,
        mut response: ApiResponse,
        cancel: &CancelToken,
    ) -> RetryDecision {
        let status = response.status;
        let raw_body = response.body.read_to_vec().unwrap_or_default();
        let descriptor = self.decoder.decode(status, &raw_body);

        // 401 is terminal no matter how the chain is configured.
        if status == StatusCode::UNAUTHORIZED {
            return RetryDecision::Fail(ApiError::from_descriptor(
                ErrorKind::AuthorizationFailure,
                &descriptor,
            ));
        }

        match self.chain.classify(&descriptor) {
            Classification::Transient => {
                state.set_last_failure(ApiError::from_descriptor(ErrorKind::Unknown, &descriptor));
                if self.retry_handler.should_retry(state, &mut response, cancel) {
                    RetryDecision::Retry {
                        delay: self
                            .retry_handler
                            .schedule()
                            .delay_for_attempt(state.attempt_count()),
                    }
                } else if cancel.is_cancelled() {
                    RetryDecision::Fail(cancelled_error())
                } else {
                    RetryDecision::Fail(retries_exhausted(state, &descriptor))
                }
            }
            Classification::Fatal(kind) => {
                RetryDecision::Fail(ApiError::from_descriptor(kind, &descriptor))
            }
        }
    }

    fn decide_transport_failure(
        &self,
        state: &mut CommandState,
        error: TransportError,
        cancel: &CancelToken,
    ) -> RetryDecision {
        state.set_last_failure(ApiError::new(ErrorKind::Unknown, error.to_string()));
        match classify_transport(&error) {
            Classification::Transient => {
                if self.retry_handler.should_retry_failure(state, cancel) {
                    RetryDecision::Retry {
                        delay: self
                            .retry_handler
                            .schedule()
                            .delay_for_attempt(state.attempt_count()),
                    }
                } else if cancel.is_cancelled() {
                    RetryDecision::Fail(cancelled_error())
                } else {
                    RetryDecision::Fail(ApiError::new(
                        ErrorKind::TooManyRetries,
                        format!(
                            "retry budget of {} exhausted; last failure: {}",
                            self.retry_handler.max_attempts(),
                            error
                        ),
                    ))
                }
            }
            Classification::Fatal(kind) => {
                RetryDecision::Fail(ApiError::new(kind, error.to_string()))
            }
        }
    }
}

fn cancelled_error() -> ApiError {
    ApiError::new(ErrorKind::IllegalState, "logical call cancelled")
}

fn retries_exhausted(state: &CommandState, descriptor: &ErrorDescriptor) -> ApiError {
    let mut error = ApiError::new(
        ErrorKind::TooManyRetries,
        match state.last_failure() {
            Some(last) => format!("remote kept failing transiently; last failure: {last}"),
            None => "remote kept failing transiently".to_string(),
        },
    );
    error.status = Some(descriptor.status.as_u16());
    error.provider_code = descriptor.provider_code.clone();
    error
}
