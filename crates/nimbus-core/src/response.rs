//! Inbound response model with a drainable body stream.
//!
//! Failed-attempt bodies must be fully read and closed before the next
//! attempt goes out; `Body` makes that observable: once `drain` or
//! `read_to_vec` returns, the underlying stream has been consumed and
//! dropped.

use std::io::{self, Read};

use http::header::AsHeaderName;
use http::{HeaderMap, StatusCode};

/// Response body stream. Buffered transports hand over an in-memory reader;
/// test doubles can hand over instrumented readers.
pub struct Body {
    reader: Option<Box<dyn Read + Send>>,
}

impl Body {
    pub fn empty() -> Self {
        Self { reader: None }
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self::from_reader(Box::new(io::Cursor::new(bytes)))
    }

    pub fn from_reader(reader: Box<dyn Read + Send>) -> Self {
        Self {
            reader: Some(reader),
        }
    }

    /// Reads the remaining body into memory, consuming the stream.
    pub fn read_to_vec(&mut self) -> io::Result<Vec<u8>> {
        let mut buffer = Vec::new();
        if let Some(mut reader) = self.reader.take() {
            reader.read_to_end(&mut buffer)?;
        }
        Ok(buffer)
    }

    /// Reads the remaining body to EOF and drops the stream. Returns the
    /// number of bytes discarded. A no-op on an already-consumed body.
    pub fn drain(&mut self) -> io::Result<u64> {
        match self.reader.take() {
            Some(mut reader) => io::copy(&mut reader, &mut io::sink()),
            None => Ok(0),
        }
    }

    /// True once the stream has been consumed (or the body was empty).
    pub fn is_consumed(&self) -> bool {
        self.reader.is_none()
    }
}

impl std::fmt::Debug for Body {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Body")
            .field("consumed", &self.is_consumed())
            .finish()
    }
}

/// One provider API response.
#[derive(Debug)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Body,
}

impl ApiResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: Body) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Header value as a string, if present and valid UTF-8.
    pub fn header(&self, name: impl AsHeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }
}
