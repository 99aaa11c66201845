//! Per-request options.
//!
//! [`RequestOptions`] carries the caller's overrides for a single call. It
//! is fixed once the request enters the pipeline; policies read it and keep
//! their own mutable state in the [`Context`](crate::pipeline::Context).

use crate::error::PipelineError;
use crate::location::{LocationHosts, LocationMode};
use crate::pipeline::Context;
use crate::request::Request;
use crate::response::Response;
use std::fmt;
use std::sync::Arc;

/// Details passed to a retry hook before each retry.
#[derive(Debug)]
pub struct RetryEvent<'a> {
    /// Zero-based index of the retry about to be made.
    pub retry_count: u32,
    /// Location the retry will target.
    pub location_mode: LocationMode,
    /// The request, already rewritten for the retry.
    pub request: &'a Request,
    /// The retryable response, if the attempt got one.
    pub response: Option<&'a Response>,
    /// The error, if the attempt failed at the transport level.
    pub error: Option<&'a PipelineError>,
}

/// Callback invoked before each retry.
pub type RetryHook = Arc<dyn Fn(&RetryEvent<'_>) + Send + Sync>;

/// Callback invoked with each outgoing request.
pub type RequestHook = Arc<dyn Fn(&Request) + Send + Sync>;

/// Callback invoked with each response and the request context.
pub type ResponseHook = Arc<dyn Fn(&Response, &Context) + Send + Sync>;

/// Overrides for a single call.
#[derive(Clone, Default)]
pub struct RequestOptions {
    /// Total retry budget.
    pub retry_total: Option<i32>,
    /// Connect-phase error budget.
    pub retry_connect: Option<i32>,
    /// Response-phase error budget.
    pub retry_read: Option<i32>,
    /// Retryable status budget.
    pub retry_status: Option<i32>,
    /// Whether reads may fail over to the secondary.
    pub retry_to_secondary: Option<bool>,
    /// Starting location.
    pub location_mode: Option<LocationMode>,
    /// Endpoint hosts.
    pub hosts: Option<LocationHosts>,
    /// Retry hook.
    pub retry_hook: Option<RetryHook>,
    /// Pin the request to one location.
    pub use_location: Option<LocationMode>,
    /// Client request id to send instead of a generated one.
    pub client_request_id: Option<String>,
    /// Compute and verify Content-MD5.
    pub validate_content: bool,
    /// Enable request/response logging for this call.
    pub logging_enable: Option<bool>,
    /// Hook invoked with the outgoing request.
    pub raw_request_hook: Option<RequestHook>,
    /// Hook invoked with the final response.
    pub raw_response_hook: Option<ResponseHook>,
    /// Total size of a download in progress.
    pub data_stream_total: Option<u64>,
    /// Bytes downloaded so far.
    pub download_stream_current: Option<u64>,
    /// Bytes uploaded so far.
    pub upload_stream_current: Option<u64>,
}

impl fmt::Debug for RequestOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestOptions")
            .field("retry_total", &self.retry_total)
            .field("retry_connect", &self.retry_connect)
            .field("retry_read", &self.retry_read)
            .field("retry_status", &self.retry_status)
            .field("retry_to_secondary", &self.retry_to_secondary)
            .field("location_mode", &self.location_mode)
            .field("hosts", &self.hosts)
            .field("retry_hook", &self.retry_hook.is_some())
            .field("use_location", &self.use_location)
            .field("client_request_id", &self.client_request_id)
            .field("validate_content", &self.validate_content)
            .field("logging_enable", &self.logging_enable)
            .field("raw_request_hook", &self.raw_request_hook.is_some())
            .field("raw_response_hook", &self.raw_response_hook.is_some())
            .finish_non_exhaustive()
    }
}

impl RequestOptions {
    /// Create empty options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the total retry budget.
    #[must_use]
    pub fn retry_total(mut self, n: i32) -> Self {
        self.retry_total = Some(n);
        self
    }

    /// Set the connect-phase error budget.
    #[must_use]
    pub fn retry_connect(mut self, n: i32) -> Self {
        self.retry_connect = Some(n);
        self
    }

    /// Set the response-phase error budget.
    #[must_use]
    pub fn retry_read(mut self, n: i32) -> Self {
        self.retry_read = Some(n);
        self
    }

    /// Set the retryable status budget.
    #[must_use]
    pub fn retry_status(mut self, n: i32) -> Self {
        self.retry_status = Some(n);
        self
    }

    /// Allow or forbid failover to the secondary.
    #[must_use]
    pub fn retry_to_secondary(mut self, enabled: bool) -> Self {
        self.retry_to_secondary = Some(enabled);
        self
    }

    /// Set the starting location.
    #[must_use]
    pub fn location_mode(mut self, mode: LocationMode) -> Self {
        self.location_mode = Some(mode);
        self
    }

    /// Set the endpoint hosts.
    #[must_use]
    pub fn hosts(mut self, hosts: LocationHosts) -> Self {
        self.hosts = Some(hosts);
        self
    }

    /// Set a retry hook.
    #[must_use]
    pub fn retry_hook(mut self, hook: impl Fn(&RetryEvent<'_>) + Send + Sync + 'static) -> Self {
        self.retry_hook = Some(Arc::new(hook));
        self
    }

    /// Pin the request to a location.
    #[must_use]
    pub fn use_location(mut self, mode: LocationMode) -> Self {
        self.use_location = Some(mode);
        self
    }

    /// Send a specific client request id.
    #[must_use]
    pub fn client_request_id(mut self, id: impl Into<String>) -> Self {
        self.client_request_id = Some(id.into());
        self
    }

    /// Enable Content-MD5 validation.
    #[must_use]
    pub fn validate_content(mut self, enabled: bool) -> Self {
        self.validate_content = enabled;
        self
    }

    /// Enable or disable logging for this call.
    #[must_use]
    pub fn logging_enable(mut self, enabled: bool) -> Self {
        self.logging_enable = Some(enabled);
        self
    }

    /// Set the raw request hook.
    #[must_use]
    pub fn raw_request_hook(mut self, hook: impl Fn(&Request) + Send + Sync + 'static) -> Self {
        self.raw_request_hook = Some(Arc::new(hook));
        self
    }

    /// Set the raw response hook.
    #[must_use]
    pub fn raw_response_hook(
        mut self,
        hook: impl Fn(&Response, &Context) + Send + Sync + 'static,
    ) -> Self {
        self.raw_response_hook = Some(Arc::new(hook));
        self
    }

    /// Track progress of a download.
    #[must_use]
    pub fn download_progress(mut self, current: u64, total: Option<u64>) -> Self {
        self.download_stream_current = Some(current);
        self.data_stream_total = total;
        self
    }

    /// Track progress of an upload.
    #[must_use]
    pub fn upload_progress(mut self, current: u64) -> Self {
        self.upload_stream_current = Some(current);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_builder() {
        let options = RequestOptions::new()
            .retry_total(5)
            .retry_connect(1)
            .retry_to_secondary(true)
            .location_mode(LocationMode::Secondary)
            .client_request_id("abc");

        assert_eq!(options.retry_total, Some(5));
        assert_eq!(options.retry_connect, Some(1));
        assert_eq!(options.retry_read, None);
        assert_eq!(options.retry_to_secondary, Some(true));
        assert_eq!(options.location_mode, Some(LocationMode::Secondary));
        assert_eq!(options.client_request_id.as_deref(), Some("abc"));
    }

    #[test]
    fn test_debug_hides_hooks() {
        let options = RequestOptions::new().retry_hook(|_| {});
        let debug = format!("{:?}", options);
        assert!(debug.contains("retry_hook: true"));
    }
}
