//! Incoming response types and attempt history.

use crate::error::{ErrorPhase, PipelineError};
use crate::location::LocationMode;
use crate::request::Request;
use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::Method;
use url::Url;

/// An HTTP response travelling back through the pipeline.
#[derive(Debug, Clone, Default)]
pub struct Response {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: HeaderMap,
    /// Response body.
    pub body: Bytes,
    /// Location the final attempt was sent to.
    pub location_mode: Option<LocationMode>,
    /// Failed attempts that preceded this response, oldest first.
    pub history: Vec<RequestHistory>,
}

impl Response {
    /// Create a response with a status and no body.
    pub fn new(status: u16) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    /// Set the body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Add a header. Invalid names or values are ignored.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            reqwest::header::HeaderName::from_bytes(name.as_bytes()),
            reqwest::header::HeaderValue::from_str(value),
        ) {
            self.headers.insert(name, value);
        }
        self
    }

    /// Header value as a string, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Body decoded as UTF-8, lossily.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Check if this response should be retried when received from `mode`.
    ///
    /// Most 3xx/4xx responses are expected outcomes (conflicts, failed
    /// preconditions) and are returned as-is. A 404 from the secondary may be
    /// replication lag and a 408 is a timeout, so both are retried. Server
    /// errors are retried except 501 Not Implemented and 505 Version Not
    /// Supported.
    pub fn is_retry(&self, mode: LocationMode) -> bool {
        let status = self.status;
        if (300..500).contains(&status) {
            return (status == 404 && mode == LocationMode::Secondary) || status == 408;
        }
        if status >= 500 {
            return !matches!(status, 501 | 505);
        }
        false
    }
}

/// Outcome of a single failed attempt.
#[derive(Debug, Clone)]
pub enum AttemptOutcome {
    /// The attempt failed at the transport level.
    Error {
        /// Phase the failure happened in.
        phase: ErrorPhase,
        /// Error message.
        message: String,
    },
    /// The attempt received a retryable response.
    Response(Box<Response>),
}

/// Record of one attempt made by the retry policy.
#[derive(Debug, Clone)]
pub struct RequestHistory {
    /// Method of the attempted request.
    pub method: Method,
    /// URL the attempt was sent to.
    pub url: Url,
    /// What happened.
    pub outcome: AttemptOutcome,
}

impl RequestHistory {
    /// Record a transport-level failure.
    pub fn error(request: &Request, phase: ErrorPhase, error: &PipelineError) -> Self {
        Self {
            method: request.method.clone(),
            url: request.url.clone(),
            outcome: AttemptOutcome::Error {
                phase,
                message: error.to_string(),
            },
        }
    }

    /// Record a retryable response.
    pub fn response(request: &Request, response: &Response) -> Self {
        Self {
            method: request.method.clone(),
            url: request.url.clone(),
            outcome: AttemptOutcome::Response(Box::new(response.clone())),
        }
    }

    /// Status of the recorded response, if the attempt got one.
    pub fn status(&self) -> Option<u16> {
        match &self.outcome {
            AttemptOutcome::Response(response) => Some(response.status),
            AttemptOutcome::Error { .. } => None,
        }
    }
}
