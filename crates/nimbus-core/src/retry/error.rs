//! Portable failure taxonomy surfaced to callers.

use std::fmt;

use crate::decode::ErrorDescriptor;

/// Provider-independent failure kind. Transient failures and redirects are
/// handled inside the executor and never appear here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum ErrorKind {
    #[error("resource not found")]
    ResourceNotFound,
    #[error("authorization failure")]
    AuthorizationFailure,
    #[error("insufficient resources")]
    InsufficientResources,
    #[error("illegal state")]
    IllegalState,
    #[error("unsupported operation")]
    UnsupportedOperation,
    #[error("illegal argument")]
    IllegalArgument,
    /// The redirect bound was exhausted; distinguishable from any
    /// provider-classified failure.
    #[error("too many redirects")]
    TooManyRedirects,
    /// The retry budget was exhausted on transient failures; the remote kept
    /// failing rather than rejecting the request.
    #[error("too many retries")]
    TooManyRetries,
    #[error("unknown failure")]
    Unknown,
}

/// Terminal outcome of a logical call: portable kind plus the original
/// status/code/message, carried verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub kind: ErrorKind,
    pub message: String,
    pub status: Option<u16>,
    pub provider_code: Option<String>,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
            provider_code: None,
        }
    }

    /// Terminal error preserving everything the decoded response said.
    pub fn from_descriptor(kind: ErrorKind, descriptor: &ErrorDescriptor) -> Self {
        Self {
            kind,
            message: descriptor.message.clone(),
            status: Some(descriptor.status.as_u16()),
            provider_code: descriptor.provider_code.clone(),
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)?;
        match (self.status, self.provider_code.as_deref()) {
            (Some(status), Some(code)) => write!(f, " (HTTP {status}, code {code})"),
            (Some(status), None) => write!(f, " (HTTP {status})"),
            (None, Some(code)) => write!(f, " (code {code})"),
            (None, None) => Ok(()),
        }
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;

    #[test]
    fn display_carries_kind_status_and_code() {
        let descriptor = ErrorDescriptor {
            status: StatusCode::NOT_FOUND,
            provider_code: Some("VolumeNotFound".to_string()),
            message: "no volume vol-1".to_string(),
            raw_body: String::new(),
        };
        let error = ApiError::from_descriptor(ErrorKind::ResourceNotFound, &descriptor);
        let text = error.to_string();
        assert!(text.contains("resource not found"));
        assert!(text.contains("no volume vol-1"));
        assert!(text.contains("HTTP 404"));
        assert!(text.contains("VolumeNotFound"));
    }

    #[test]
    fn display_without_status_is_plain() {
        let error = ApiError::new(ErrorKind::TooManyRetries, "gave up");
        assert_eq!(error.to_string(), "too many retries: gave up");
    }
}
