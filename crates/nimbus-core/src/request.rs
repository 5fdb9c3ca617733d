//! Outbound request model.
//!
//! A plain value type: the executor owns one per logical call (inside its
//! `CommandState`) and rewrites the endpoint when following redirects.

use http::header::HOST;
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use url::Url;

/// One provider API request: method, endpoint, headers, optional byte body.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub endpoint: Url,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

impl ApiRequest {
    pub fn new(method: Method, endpoint: Url) -> Self {
        Self {
            method,
            endpoint,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn get(endpoint: Url) -> Self {
        Self::new(Method::GET, endpoint)
    }

    pub fn put(endpoint: Url) -> Self {
        Self::new(Method::PUT, endpoint)
    }

    pub fn post(endpoint: Url) -> Self {
        Self::new(Method::POST, endpoint)
    }

    pub fn delete(endpoint: Url) -> Self {
        Self::new(Method::DELETE, endpoint)
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }

    /// Explicit `Host` header carried by this request, if any.
    pub fn host_header(&self) -> Option<&str> {
        self.headers.get(HOST).and_then(|value| value.to_str().ok())
    }
}
