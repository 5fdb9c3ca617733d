//! XML error-body decoder (`<Error><Code>…</Code><Message>…</Message>`).

use http::StatusCode;

use super::{fallback_descriptor, ErrorDecoder, ErrorDescriptor};

/// Extracts `<Code>` and `<Message>` from provider error documents. Tag
/// scanning rather than a full parser: error payloads are small, flat, and
/// the surrounding document shape varies per provider (`<Error>`,
/// `<ErrorResponse>`, namespaced roots).
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlErrorDecoder;

impl ErrorDecoder for XmlErrorDecoder {
    fn decode(&self, status: StatusCode, body: &[u8]) -> ErrorDescriptor {
        let text = String::from_utf8_lossy(body);
        let code = extract_tag(&text, "Code");
        let message = extract_tag(&text, "Message");
        match code {
            Some(code) => {
                let message = message.unwrap_or_else(|| {
                    format!("HTTP {} ({})", status.as_u16(), code)
                });
                ErrorDescriptor {
                    status,
                    provider_code: Some(code),
                    message,
                    raw_body: text.into_owned(),
                }
            }
            None => fallback_descriptor(status, body),
        }
    }
}

/// First `<tag>…</tag>` text content, trimmed; None if absent or empty.
fn extract_tag(text: &str, tag: &str) -> Option<String> {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);
    let start = text.find(&open)? + open.len();
    let end = text[start..].find(&close)? + start;
    let value = text[start..end].trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
