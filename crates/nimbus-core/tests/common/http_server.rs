//! Minimal HTTP/1.1 server that replays scripted responses for integration
//! tests.
//!
//! Serves one scripted response per connection, in order, and records each
//! request head so tests can assert on method, path and headers. Responses
//! carry `Connection: close` so every attempt opens a fresh connection.

use std::collections::VecDeque;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Starts a server on an ephemeral port. Returns the base URL (e.g.
/// "http://127.0.0.1:12345/") and the recorded request heads. The server
/// runs until the scripted responses are exhausted or the process exits.
pub fn start(responses: Vec<Vec<u8>>) -> (String, Arc<Mutex<Vec<String>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&requests);
    thread::spawn(move || {
        let mut queue: VecDeque<Vec<u8>> = responses.into();
        for stream in listener.incoming().flatten() {
            let mut stream = stream;
            let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
            let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
            let mut buf = [0u8; 8192];
            let n = match stream.read(&mut buf) {
                Ok(0) => continue,
                Ok(n) => n,
                Err(_) => continue,
            };
            if let Ok(head) = std::str::from_utf8(&buf[..n]) {
                seen.lock().unwrap().push(head.to_string());
            }
            let Some(response) = queue.pop_front() else {
                break;
            };
            let _ = stream.write_all(&response);
        }
    });
    (format!("http://127.0.0.1:{}/", port), requests)
}

/// Builds one raw response, e.g. `response("409 Conflict", &[], b"...")`.
pub fn response(status: &str, extra_headers: &[(&str, &str)], body: &[u8]) -> Vec<u8> {
    let mut head = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n",
        status,
        body.len()
    );
    for (name, value) in extra_headers {
        head.push_str(&format!("{}: {}\r\n", name, value));
    }
    head.push_str("\r\n");
    let mut out = head.into_bytes();
    out.extend_from_slice(body);
    out
}
