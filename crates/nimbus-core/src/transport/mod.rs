//! Transport seam: one physical request/response round trip.
//!
//! The executor never talks to the network directly; it goes through this
//! trait so the engine can be tested against scripted transports and reused
//! over whatever HTTP stack a binding brings.

mod curl;

pub use curl::CurlTransport;

use std::time::Duration;

use crate::request::ApiRequest;
use crate::response::ApiResponse;

/// Failure below the HTTP layer: the request never produced a response.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("transport I/O: {0}")]
    Io(#[from] std::io::Error),
    #[error("transport failure: {0}")]
    Other(String),
}

/// Sends one physical attempt. Implementations must not follow redirects;
/// the executor owns redirect handling.
pub trait Transport: Send + Sync {
    fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError>;
}
