//! libcurl-backed transport.
//!
//! Uses one Easy handle per attempt: headers are collected with a header
//! callback and the body is buffered through a write callback. Redirect
//! following is left off so the executor sees 3xx responses itself.

use std::str;
use std::time::Duration;

use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};

use super::{Transport, TransportError};
use crate::config::TransportConfig;
use crate::request::ApiRequest;
use crate::response::{ApiResponse, Body};

/// Blocking transport over libcurl. Stateless apart from timeouts; safe to
/// share across concurrent logical calls.
#[derive(Debug, Clone, Copy)]
pub struct CurlTransport {
    connect_timeout: Duration,
    timeout: Duration,
}

impl Default for CurlTransport {
    fn default() -> Self {
        Self::from_config(&TransportConfig::default())
    }
}

impl CurlTransport {
    pub fn new(connect_timeout: Duration, timeout: Duration) -> Self {
        Self {
            connect_timeout,
            timeout,
        }
    }

    pub fn from_config(config: &TransportConfig) -> Self {
        Self::new(
            Duration::from_secs(config.connect_timeout_secs),
            Duration::from_secs(config.timeout_secs),
        )
    }
}

impl Transport for CurlTransport {
    fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        let mut easy = curl::easy::Easy::new();
        easy.url(request.endpoint.as_str()).map_err(setup_error)?;
        easy.custom_request(request.method.as_str())
            .map_err(setup_error)?;
        if request.method == Method::HEAD {
            easy.nobody(true).map_err(setup_error)?;
        }
        easy.connect_timeout(self.connect_timeout)
            .map_err(setup_error)?;
        easy.timeout(self.timeout).map_err(setup_error)?;
        if let Some(body) = &request.body {
            easy.post_fields_copy(body).map_err(setup_error)?;
        }

        let mut list = curl::easy::List::new();
        for (name, value) in request.headers.iter() {
            if let Ok(value) = value.to_str() {
                list.append(&format!("{}: {}", name.as_str(), value))
                    .map_err(setup_error)?;
            }
        }
        if !request.headers.is_empty() {
            easy.http_headers(list).map_err(setup_error)?;
        }

        let mut header_lines: Vec<String> = Vec::new();
        let mut body_buf: Vec<u8> = Vec::new();
        {
            let mut transfer = easy.transfer();
            transfer
                .header_function(|data| {
                    if let Ok(line) = str::from_utf8(data) {
                        header_lines.push(line.trim_end().to_string());
                    }
                    true
                })
                .map_err(setup_error)?;
            transfer
                .write_function(|data| {
                    body_buf.extend_from_slice(data);
                    Ok(data.len())
                })
                .map_err(setup_error)?;
            transfer
                .perform()
                .map_err(|e| perform_error(e, self.timeout))?;
        }

        let code = easy.response_code().map_err(setup_error)? as u16;
        let status = StatusCode::from_u16(code)
            .map_err(|_| TransportError::Other(format!("invalid HTTP status {code}")))?;
        let headers = parse_header_lines(&header_lines);
        Ok(ApiResponse::new(status, headers, Body::from_bytes(body_buf)))
    }
}

fn setup_error(error: curl::Error) -> TransportError {
    TransportError::Other(error.to_string())
}

/// Maps a transfer failure onto the transport taxonomy: timeouts and
/// connection-level failures are distinguishable because the retry ladder
/// treats them as transient.
fn perform_error(error: curl::Error, timeout: Duration) -> TransportError {
    if error.is_operation_timedout() {
        return TransportError::Timeout(timeout);
    }
    if error.is_couldnt_connect()
        || error.is_couldnt_resolve_host()
        || error.is_couldnt_resolve_proxy()
        || error.is_send_error()
        || error.is_recv_error()
        || error.is_got_nothing()
    {
        return TransportError::Connect(error.to_string());
    }
    TransportError::Other(error.to_string())
}

/// Parse collected header lines into a HeaderMap, skipping status lines.
fn parse_header_lines(lines: &[String]) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for line in lines {
        let line = line.trim();
        if line.is_empty() || line.starts_with("HTTP/") {
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            let name = match HeaderName::from_bytes(name.trim().as_bytes()) {
                Ok(name) => name,
                Err(_) => continue,
            };
            if let Ok(value) = HeaderValue::from_str(value.trim()) {
                headers.append(name, value);
            }
        }
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_header_lines_skips_status_and_blank_lines() {
        let lines = [
            "HTTP/1.1 302 Found".to_string(),
            "Location: /elsewhere".to_string(),
            "".to_string(),
            "Content-Length: 0".to_string(),
        ];
        let headers = parse_header_lines(&lines);
        assert_eq!(headers.get("location").unwrap(), "/elsewhere");
        assert_eq!(headers.get("content-length").unwrap(), "0");
    }

    #[test]
    fn parse_header_lines_keeps_repeated_headers() {
        let lines = [
            "Set-Cookie: a=1".to_string(),
            "Set-Cookie: b=2".to_string(),
        ];
        let headers = parse_header_lines(&lines);
        assert_eq!(headers.get_all("set-cookie").iter().count(), 2);
    }
}
