//! Redirection retry handler.

use http::header::{HOST, LOCATION};
use http::HeaderValue;
use url::Url;

use crate::response::ApiResponse;
use crate::retry::state::CommandState;

/// Redirects followed per logical call when nothing else is configured.
pub const DEFAULT_MAX_REDIRECTS: u32 = 5;

/// Decides whether to follow an HTTP redirect, rewriting the request in
/// place. No delay is imposed; redirects are not backed off. Stateless and
/// safe to share across concurrent logical calls.
#[derive(Debug, Clone, Copy)]
pub struct RedirectHandler {
    max_redirects: u32,
}

impl Default for RedirectHandler {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_REDIRECTS)
    }
}

impl RedirectHandler {
    pub fn new(max_redirects: u32) -> Self {
        Self { max_redirects }
    }

    pub fn max_redirects(&self) -> u32 {
        self.max_redirects
    }

    /// Counts the redirect and, if within bound and the target resolves,
    /// rewrites the request's endpoint (and its `Host` header, when the
    /// request carries one) and returns true.
    ///
    /// A relative `Location` resolves against the current endpoint's
    /// scheme/host/port; an absolute one replaces them outright.
    pub fn should_retry(&self, state: &mut CommandState, response: &ApiResponse) -> bool {
        let count = state.record_redirect();
        if count > self.max_redirects {
            tracing::debug!(count, max_redirects = self.max_redirects, "redirect bound exceeded");
            return false;
        }
        let Some(location) = response.header(LOCATION) else {
            tracing::debug!(status = %response.status, "redirect response without Location header");
            return false;
        };
        let target: Url = match state.current_request().endpoint.join(location) {
            Ok(target) => target,
            Err(error) => {
                tracing::debug!(location, "unresolvable redirect target: {}", error);
                return false;
            }
        };

        let request = state.current_request_mut();
        if request.headers.contains_key(HOST) {
            let Some(host) = host_header_value(&target) else {
                return false;
            };
            let Ok(value) = HeaderValue::from_str(&host) else {
                return false;
            };
            // A stale Host header must never survive the rewrite.
            request.headers.insert(HOST, value);
        }
        tracing::debug!(from = %request.endpoint, to = %target, "following redirect");
        request.endpoint = target;
        true
    }
}

/// `host` or `host:port` as it belongs in a Host header; the port only
/// appears when it is not the scheme default.
fn host_header_value(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::ApiRequest;
    use crate::testutil::redirect_response;
    use http::Method;

    fn state_with_host(endpoint: &str, host: Option<&str>) -> CommandState {
        let mut request = ApiRequest::new(Method::GET, endpoint.parse().unwrap());
        if let Some(host) = host {
            request
                .headers
                .insert(HOST, HeaderValue::from_str(host).unwrap());
        }
        CommandState::new(request)
    }

    #[test]
    fn relative_location_resolves_against_original_authority() {
        let handler = RedirectHandler::default();
        let mut state = state_with_host("https://api.cloud.example:8443/v2/servers/i-1", None);
        let response = redirect_response(302, "/v2/servers/i-2");
        assert!(handler.should_retry(&mut state, &response));
        assert_eq!(
            state.current_request().endpoint.as_str(),
            "https://api.cloud.example:8443/v2/servers/i-2"
        );
        assert_eq!(state.redirect_count(), 1);
        assert_eq!(state.attempt_count(), 0);
    }

    #[test]
    fn absolute_location_replaces_scheme_host_and_path() {
        let handler = RedirectHandler::default();
        let mut state = state_with_host("https://api.cloud.example/v2/servers", None);
        let response = redirect_response(301, "https://eu.cloud.example/v3/servers");
        assert!(handler.should_retry(&mut state, &response));
        assert_eq!(
            state.current_request().endpoint.as_str(),
            "https://eu.cloud.example/v3/servers"
        );
    }

    #[test]
    fn host_header_is_rewritten_for_new_host() {
        let handler = RedirectHandler::default();
        let mut state = state_with_host(
            "https://api.cloud.example/v2/servers",
            Some("api.cloud.example"),
        );
        let response = redirect_response(307, "https://eu.cloud.example:9443/v2/servers");
        assert!(handler.should_retry(&mut state, &response));
        assert_eq!(
            state.current_request().host_header(),
            Some("eu.cloud.example:9443")
        );
    }

    #[test]
    fn host_header_untouched_when_request_never_carried_one() {
        let handler = RedirectHandler::default();
        let mut state = state_with_host("https://api.cloud.example/v2/servers", None);
        let response = redirect_response(302, "https://eu.cloud.example/v2/servers");
        assert!(handler.should_retry(&mut state, &response));
        assert!(state.current_request().host_header().is_none());
    }

    #[test]
    fn redirect_bound_is_enforced() {
        let handler = RedirectHandler::new(2);
        let mut state = state_with_host("https://api.cloud.example/a", None);
        let response = redirect_response(302, "/b");
        assert!(handler.should_retry(&mut state, &response));
        assert!(handler.should_retry(&mut state, &response));
        assert!(!handler.should_retry(&mut state, &response));
        assert_eq!(state.redirect_count(), 3);
    }

    #[test]
    fn missing_location_header_is_not_followed() {
        let handler = RedirectHandler::default();
        let mut state = state_with_host("https://api.cloud.example/a", None);
        let response = crate::testutil::response_with_status(302);
        assert!(!handler.should_retry(&mut state, &response));
    }
}
