//! HTTP transports.
//!
//! The [`Transport`] is the last link of a pipeline: it puts the request on
//! the wire and owns the clock used for backoff sleeps.

use crate::error::{PipelineError, Result};
use crate::request::{Body, Request};
use crate::response::Response;
use async_trait::async_trait;
use reqwest::Client;
use std::fmt;
use std::io::Read;
use std::time::Duration;
use tracing::debug;

/// Sends requests over the network.
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    /// Send the request and read the full response.
    ///
    /// Connection failures must be reported as
    /// [`PipelineError::ServiceRequest`] and failures after the request was
    /// sent as [`PipelineError::ServiceResponse`].
    async fn send(&self, request: &mut Request) -> Result<Response>;

    /// Wait before the next attempt.
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

impl From<reqwest::Error> for PipelineError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() {
            PipelineError::ServiceRequest {
                message: err.to_string(),
                source: Some(Box::new(err)),
            }
        } else if err.is_builder() {
            PipelineError::Configuration(err.to_string())
        } else {
            PipelineError::ServiceResponse {
                message: err.to_string(),
                source: Some(Box::new(err)),
            }
        }
    }
}

/// Transport backed by a [`reqwest::Client`].
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Create a transport with a default client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with a custom reqwest client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Create with a per-request timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PipelineError::configuration(e.to_string()))?;
        Ok(Self { client })
    }

    /// Get a reference to the underlying client.
    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &mut Request) -> Result<Response> {
        debug!(method = %request.method, url = %request.url, "Sending HTTP request");

        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone());
        builder = match &mut request.body {
            Body::Empty => builder,
            Body::Bytes(bytes) => builder.body(bytes.clone()),
            Body::Stream(stream) => builder.body(read_stream(stream)?),
        };

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        Ok(Response {
            status,
            headers,
            body,
            ..Response::default()
        })
    }
}

/// Read a stream body from its current position to the end.
pub(crate) fn read_stream<R: Read + ?Sized>(stream: &mut R) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    stream
        .read_to_end(&mut buf)
        .map_err(|e| PipelineError::InvalidBody(e.to_string()))?;
    Ok(buf)
}
