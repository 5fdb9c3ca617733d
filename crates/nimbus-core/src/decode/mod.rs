//! Error-body decoding: failed response → `ErrorDescriptor`.
//!
//! Providers report errors as XML `<Error><Code>…</Code></Error>` documents
//! or JSON objects; the decoders extract a provider code and message for the
//! classifier chain. A body that fails to decode must not hide the original
//! HTTP status: the descriptor falls back to the status text plus a body
//! snippet, with the raw body preserved.

mod json;
mod xml;

pub use json::JsonErrorDecoder;
pub use xml::XmlErrorDecoder;

use http::StatusCode;

/// What a failed response said, decoded: immutable input to classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorDescriptor {
    pub status: StatusCode,
    /// Provider error code (e.g. `OperationAborted`), when the body had one.
    pub provider_code: Option<String>,
    pub message: String,
    pub raw_body: String,
}

/// Turns a failed response's status and raw body into a descriptor.
pub trait ErrorDecoder: Send + Sync {
    fn decode(&self, status: StatusCode, body: &[u8]) -> ErrorDescriptor;
}

/// Decoder that sniffs the body shape and delegates: `<` → XML, `{`/`[` →
/// JSON, anything else → status-text fallback.
#[derive(Debug, Clone, Copy, Default)]
pub struct SniffingErrorDecoder;

impl ErrorDecoder for SniffingErrorDecoder {
    fn decode(&self, status: StatusCode, body: &[u8]) -> ErrorDescriptor {
        match body.iter().copied().find(|b| !b.is_ascii_whitespace()) {
            Some(b'<') => XmlErrorDecoder.decode(status, body),
            Some(b'{') | Some(b'[') => JsonErrorDecoder.decode(status, body),
            _ => fallback_descriptor(status, body),
        }
    }
}

/// Maximum body prefix included in fallback messages.
const SNIPPET_LEN: usize = 200;

/// Descriptor for a body that yielded no provider code: the HTTP status and
/// a body snippet stand in, and the raw body is carried for the caller.
pub(crate) fn fallback_descriptor(status: StatusCode, body: &[u8]) -> ErrorDescriptor {
    let raw = String::from_utf8_lossy(body).into_owned();
    let snippet: String = raw.chars().take(SNIPPET_LEN).collect();
    let status_text = match status.canonical_reason() {
        Some(reason) => format!("HTTP {} {}", status.as_u16(), reason),
        None => format!("HTTP {}", status.as_u16()),
    };
    let message = if snippet.trim().is_empty() {
        status_text
    } else {
        format!("{}: {}", status_text, snippet.trim())
    };
    ErrorDescriptor {
        status,
        provider_code: None,
        message,
        raw_body: raw,
    }
}
