//! `nimbus wait <URL>` – poll an endpoint until it reaches the desired state.

use anyhow::{Context, Result};
use nimbus_core::backoff::{poll_until, CheckError, CheckFailure, PollBound, PollOptions, ThreadSleeper};
use nimbus_core::cancel::CancelToken;
use nimbus_core::config::NimbusConfig;
use nimbus_core::request::ApiRequest;
use nimbus_core::transport::{CurlTransport, Transport};
use std::time::Duration;
use url::Url;

pub fn run_wait(
    cfg: &NimbusConfig,
    url: &str,
    status: Option<u16>,
    timeout_secs: Option<u64>,
    max_attempts: Option<u32>,
) -> Result<()> {
    let endpoint: Url = url.parse().context("invalid URL")?;
    let transport = CurlTransport::from_config(&cfg.transport);

    let bound = match (timeout_secs, max_attempts) {
        (Some(secs), _) => PollBound::Deadline(Duration::from_secs(secs)),
        (None, Some(attempts)) => PollBound::MaxAttempts(attempts),
        (None, None) => PollBound::MaxAttempts(cfg.retry.max_attempts),
    };
    let options = PollOptions::new(cfg.retry.schedule(), bound);
    let cancel = CancelToken::new();

    let satisfied = poll_until(&options, &cancel, &ThreadSleeper, || {
        let request = ApiRequest::get(endpoint.clone());
        match transport.send(&request) {
            Ok(mut response) => {
                let _ = response.body.drain();
                tracing::debug!(status = %response.status, "probe response");
                let hit = match status {
                    Some(code) => response.status.as_u16() == code,
                    None => response.status.is_success(),
                };
                Ok(hit)
            }
            // Probe failures count as "not yet satisfied" and keep polling.
            Err(error) => Err(CheckError::new(CheckFailure::Execution, error.to_string())),
        }
    })?;

    if satisfied {
        println!("{url} reached desired state");
        Ok(())
    } else {
        anyhow::bail!("{url} did not reach desired state within the bound")
    }
}
