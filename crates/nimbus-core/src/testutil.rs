//! Shared test doubles: recording sleeper, scripted transport, tracked bodies.

use std::collections::VecDeque;
use std::io::{self, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};

use crate::backoff::Sleeper;
use crate::request::ApiRequest;
use crate::response::{ApiResponse, Body};
use crate::retry::BackoffRetryHandler;
use crate::transport::{Transport, TransportError};

/// Sleeper that records requested durations instead of blocking. An
/// optional callback fires on every sleep (e.g. to cancel mid-backoff).
#[derive(Default)]
pub struct MockSleeper {
    slept: Mutex<Vec<Duration>>,
    callback: Option<Box<dyn Fn() + Send + Sync>>,
}

impl MockSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callback(callback: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            slept: Mutex::new(Vec::new()),
            callback: Some(Box::new(callback)),
        }
    }

    pub fn total_slept(&self) -> Duration {
        self.slept.lock().unwrap().iter().sum()
    }
}

impl Sleeper for MockSleeper {
    fn sleep(&self, duration: Duration) {
        self.slept.lock().unwrap().push(duration);
        if let Some(callback) = &self.callback {
            callback();
        }
    }
}

/// Retry handler with a recording sleeper and the stock schedule.
pub fn tiny_retry_handler(max_attempts: u32, sleeper: Arc<MockSleeper>) -> BackoffRetryHandler {
    BackoffRetryHandler::new(max_attempts, crate::backoff::BackoffSchedule::default())
        .with_sleeper(sleeper)
}

/// Reader that flips a flag once it has been read to EOF.
struct TrackingReader {
    inner: io::Cursor<Vec<u8>>,
    drained: Arc<AtomicBool>,
}

impl Read for TrackingReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n == 0 {
            self.drained.store(true, Ordering::Relaxed);
        }
        Ok(n)
    }
}

/// Body whose full consumption is observable.
pub struct TrackedBody;

impl TrackedBody {
    pub fn new(bytes: &[u8]) -> (Body, Arc<AtomicBool>) {
        let drained = Arc::new(AtomicBool::new(false));
        let reader = TrackingReader {
            inner: io::Cursor::new(bytes.to_vec()),
            drained: Arc::clone(&drained),
        };
        (Body::from_reader(Box::new(reader)), drained)
    }
}

pub fn response_with_status(status: u16) -> ApiResponse {
    ApiResponse::new(
        StatusCode::from_u16(status).unwrap(),
        HeaderMap::new(),
        Body::empty(),
    )
}

pub fn tracked_response(status: u16, body: &[u8]) -> (ApiResponse, Arc<AtomicBool>) {
    let (body, drained) = TrackedBody::new(body);
    (
        ApiResponse::new(StatusCode::from_u16(status).unwrap(), HeaderMap::new(), body),
        drained,
    )
}

pub fn redirect_response(status: u16, location: &str) -> ApiResponse {
    let mut headers = HeaderMap::new();
    headers.insert(
        http::header::LOCATION,
        HeaderValue::from_str(location).unwrap(),
    );
    ApiResponse::new(StatusCode::from_u16(status).unwrap(), headers, Body::empty())
}

type ScriptedReply = Result<(u16, Vec<(HeaderName, String)>, Body), TransportError>;

/// Transport that replays a scripted sequence of replies and records every
/// request it was asked to send.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<ScriptedReply>>,
    sent: Arc<Mutex<Vec<ApiRequest>>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_response(&self, status: u16, headers: &[(HeaderName, &str)], body: &[u8]) {
        self.push_response_with_body(status, headers, Body::from_bytes(body.to_vec()));
    }

    pub fn push_response_with_body(
        &self,
        status: u16,
        headers: &[(HeaderName, &str)],
        body: Body,
    ) {
        let headers = headers
            .iter()
            .map(|(name, value)| (name.clone(), value.to_string()))
            .collect();
        self.replies
            .lock()
            .unwrap()
            .push_back(Ok((status, headers, body)));
    }

    pub fn push_error(&self, error: TransportError) {
        self.replies.lock().unwrap().push_back(Err(error));
    }

    /// The requests sent so far, in order.
    pub fn sent(&self) -> Arc<Mutex<Vec<ApiRequest>>> {
        Arc::clone(&self.sent)
    }
}

impl Transport for ScriptedTransport {
    fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        self.sent.lock().unwrap().push(request.clone());
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .expect("scripted transport ran out of replies");
        reply.map(|(status, headers, body)| {
            let mut map = HeaderMap::new();
            for (name, value) in headers {
                map.append(name, HeaderValue::from_str(&value).unwrap());
            }
            ApiResponse::new(StatusCode::from_u16(status).unwrap(), map, body)
        })
    }
}
