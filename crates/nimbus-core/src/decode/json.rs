//! JSON error-body decoder.

use http::StatusCode;
use serde_json::Value;

use super::{fallback_descriptor, ErrorDecoder, ErrorDescriptor};

/// Accepts `{"code": …, "message": …}` at the top level or nested under an
/// `"error"` object, with either capitalization.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonErrorDecoder;

impl ErrorDecoder for JsonErrorDecoder {
    fn decode(&self, status: StatusCode, body: &[u8]) -> ErrorDescriptor {
        let parsed: Value = match serde_json::from_slice(body) {
            Ok(value) => value,
            Err(_) => return fallback_descriptor(status, body),
        };
        let object = parsed.get("error").unwrap_or(&parsed);
        let code = string_field(object, &["code", "Code"]);
        let message = string_field(object, &["message", "Message"]);
        match code {
            Some(code) => {
                let message = message.unwrap_or_else(|| {
                    format!("HTTP {} ({})", status.as_u16(), code)
                });
                ErrorDescriptor {
                    status,
                    provider_code: Some(code),
                    message,
                    raw_body: String::from_utf8_lossy(body).into_owned(),
                }
            }
            None => fallback_descriptor(status, body),
        }
    }
}

fn string_field(object: &Value, names: &[&str]) -> Option<String> {
    names
        .iter()
        .find_map(|name| object.get(*name))
        .and_then(Value::as_str)
        .map(str::to_string)
}
