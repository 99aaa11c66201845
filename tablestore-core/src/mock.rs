//! Scripted transport for testing.
//!
//! [`MockTransport`] returns a queue of pre-configured outcomes in order and
//! records every request it receives. Sleeps are recorded, not performed.
//!
//! ```rust
//! use tablestore_core::mock::MockTransport;
//! use tablestore_core::PipelineError;
//!
//! let transport = MockTransport::new()
//!     .with_error(PipelineError::service_request("connection refused"))
//!     .with_status(503)
//!     .with_status(200);
//! ```

use crate::error::{PipelineError, Result};
use crate::request::{Body, Request};
use crate::response::Response;
use crate::transport::{read_stream, Transport};
use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Method;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// A request as seen by the mock transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeenRequest {
    /// HTTP method.
    pub method: Method,
    /// URL at the time of sending.
    pub url: Url,
    /// Body bytes, streams read to the end.
    pub body: Vec<u8>,
    /// Header names and values that are valid UTF-8.
    pub headers: Vec<(String, String)>,
}

impl SeenRequest {
    /// Value of a recorded header.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A transport with scripted outcomes.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    outcomes: Arc<Mutex<VecDeque<Result<Response>>>>,
    requests: Arc<Mutex<Vec<SeenRequest>>>,
    sleeps: Arc<Mutex<Vec<Duration>>>,
}

impl MockTransport {
    /// Create a transport that answers 200 once its script is exhausted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response.
    #[must_use]
    pub fn with_response(self, response: Response) -> Self {
        self.outcomes.lock().push_back(Ok(response));
        self
    }

    /// Queue an empty response with the given status.
    #[must_use]
    pub fn with_status(self, status: u16) -> Self {
        self.with_response(Response::new(status))
    }

    /// Queue an error.
    #[must_use]
    pub fn with_error(self, error: PipelineError) -> Self {
        self.outcomes.lock().push_back(Err(error));
        self
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<SeenRequest> {
        self.requests.lock().clone()
    }

    /// Number of requests received.
    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Durations the pipeline asked to sleep for.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().clone()
    }

    /// Hosts of the received requests, in order.
    pub fn hosts(&self) -> Vec<String> {
        self.requests
            .lock()
            .iter()
            .map(|r| crate::location::netloc(&r.url))
            .collect()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: &mut Request) -> Result<Response> {
        let body = match &mut request.body {
            Body::Empty => Vec::new(),
            Body::Bytes(bytes) => bytes.to_vec(),
            Body::Stream(stream) => read_stream(stream)?,
        };
        let headers = request
            .headers
            .iter()
            .filter_map(|(n, v)| Some((n.as_str().to_string(), v.to_str().ok()?.to_string())))
            .collect();
        self.requests.lock().push(SeenRequest {
            method: request.method.clone(),
            url: request.url.clone(),
            body,
            headers,
        });

        self.outcomes
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(Response::new(200)))
    }

    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().push(duration);
    }
}
