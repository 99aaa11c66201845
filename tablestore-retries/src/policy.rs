//! Retry policy with secondary-location failover.
//!
//! [`TablesRetryPolicy`] sits in the pipeline and replays a request while
//! the service answers with a retryable status or the transport fails. Four
//! budgets are tracked per request (total, connect, read, status); a failure
//! is charged to `total` and to the budget of its class, and retrying stops
//! as soon as any budget drops below zero.

use crate::config::RetryConfig;
use crate::strategy::BackoffStrategy;
use async_trait::async_trait;
use std::io::{Seek, SeekFrom};
use std::sync::Arc;
use tablestore_core::http::Method;
use tablestore_core::location::set_netloc;
use tablestore_core::{
    Body, Context, ErrorPhase, LocationHosts, LocationMode, Next, PipelineError, Policy, Request,
    RequestHistory, Response, Result, RetryEvent, RetryHook,
};
use tracing::{debug, warn};

/// Mutable retry state for one request.
///
/// Built from the policy's [`RetryConfig`] and the call's options when the
/// request enters the policy, and dropped once it leaves.
#[derive(Clone)]
pub struct RetrySettings {
    /// Remaining total budget.
    pub total: i32,
    /// Remaining connect-phase budget.
    pub connect: i32,
    /// Remaining response-phase budget.
    pub read: i32,
    /// Remaining status budget.
    pub status: i32,
    /// Retries made so far.
    pub count: u32,
    /// Location the next attempt targets.
    pub mode: LocationMode,
    /// Endpoint hosts; failover needs both.
    pub hosts: Option<LocationHosts>,
    /// Whether failover is allowed.
    pub retry_to_secondary: bool,
    /// Stream offset to rewind to before a retry.
    pub body_position: Option<u64>,
    /// Failed attempts, oldest first.
    pub history: Vec<RequestHistory>,
    /// Callback invoked before each retry.
    pub hook: Option<RetryHook>,
}

impl std::fmt::Debug for RetrySettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetrySettings")
            .field("total", &self.total)
            .field("connect", &self.connect)
            .field("read", &self.read)
            .field("status", &self.status)
            .field("count", &self.count)
            .field("mode", &self.mode)
            .field("hosts", &self.hosts)
            .field("retry_to_secondary", &self.retry_to_secondary)
            .field("body_position", &self.body_position)
            .field("history_len", &self.history.len())
            .finish()
    }
}

impl RetrySettings {
    /// Whether any budget has been overdrawn.
    pub fn is_exhausted(&self) -> bool {
        [self.total, self.connect, self.read, self.status]
            .iter()
            .any(|&remaining| remaining < 0)
    }
}

/// What went wrong with an attempt.
#[derive(Debug, Clone, Copy)]
pub enum Failure<'a> {
    /// The transport failed.
    Error(&'a PipelineError),
    /// The service returned a retryable status.
    Status(&'a Response),
}

/// Retry policy for table service clients.
#[derive(Debug, Clone)]
pub struct TablesRetryPolicy {
    config: RetryConfig,
    backoff: Arc<dyn BackoffStrategy>,
}

impl Default for TablesRetryPolicy {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}

impl TablesRetryPolicy {
    /// Create a policy from a config.
    pub fn new(config: RetryConfig) -> Self {
        let backoff = config.backoff.build();
        Self { config, backoff }
    }

    /// Exponential retry with default parameters.
    pub fn exponential() -> Self {
        Self::new(RetryConfig::exponential())
    }

    /// Linear retry with default parameters.
    pub fn linear() -> Self {
        Self::new(RetryConfig::linear())
    }

    /// Replace the wait strategy.
    #[must_use]
    pub fn with_backoff(mut self, backoff: impl BackoffStrategy + 'static) -> Self {
        self.backoff = Arc::new(backoff);
        self
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Build the retry state for a request.
    ///
    /// A stream body's position is captured here; if it cannot be read the
    /// first attempt still goes out, but it will not be retried.
    pub fn configure_retries(&self, request: &mut Request, ctx: &Context) -> RetrySettings {
        let body_position = match &mut request.body {
            Body::Stream(stream) => match stream.stream_position() {
                Ok(position) => Some(position),
                Err(e) => {
                    debug!(error = %e, "Request body position unavailable, retries disabled");
                    None
                }
            },
            _ => None,
        };

        let options = &ctx.options;
        let location = &ctx.location;
        RetrySettings {
            total: options.retry_total.unwrap_or(self.config.retry_total),
            connect: options.retry_connect.unwrap_or(self.config.retry_connect),
            read: options.retry_read.unwrap_or(self.config.retry_read),
            status: options.retry_status.unwrap_or(self.config.retry_status),
            count: 0,
            mode: location
                .mode
                .or(options.location_mode)
                .unwrap_or_default(),
            hosts: location.hosts.clone().or_else(|| options.hosts.clone()),
            retry_to_secondary: !location.pinned
                && options
                    .retry_to_secondary
                    .unwrap_or(self.config.retry_to_secondary),
            body_position,
            history: Vec::new(),
            hook: options.retry_hook.clone(),
        }
    }

    /// Charge a failure to the budgets and prepare the request for a retry.
    ///
    /// Returns `true` if the request should be retried.
    pub fn increment(
        &self,
        settings: &mut RetrySettings,
        request: &mut Request,
        failure: Failure<'_>,
    ) -> bool {
        settings.total -= 1;

        match failure {
            Failure::Error(error) => match error.phase() {
                // The service never received the request.
                Some(ErrorPhase::Connect) => {
                    settings.connect -= 1;
                    settings
                        .history
                        .push(RequestHistory::error(request, ErrorPhase::Connect, error));
                }
                // The service may have started processing it.
                Some(ErrorPhase::Read) => {
                    settings.read -= 1;
                    settings
                        .history
                        .push(RequestHistory::error(request, ErrorPhase::Read, error));
                }
                None => {}
            },
            Failure::Status(response) => {
                settings.status -= 1;
                settings
                    .history
                    .push(RequestHistory::response(request, response));
            }
        }

        if settings.is_exhausted() {
            return false;
        }

        if request.method != Method::PUT && settings.retry_to_secondary {
            if let Err(e) = self.set_next_host_location(settings, request) {
                warn!(error = %e, "Cannot redirect request to alternate location");
                return false;
            }
        }

        if let Body::Stream(stream) = &mut request.body {
            let Some(position) = settings.body_position else {
                return false;
            };
            if let Err(e) = stream.seek(SeekFrom::Start(position)) {
                debug!(error = %e, "Request body cannot be rewound");
                return false;
            }
        }

        settings.count += 1;
        true
    }

    /// Point the request at the other location, if both are configured.
    fn set_next_host_location(
        &self,
        settings: &mut RetrySettings,
        request: &mut Request,
    ) -> Result<()> {
        let Some(hosts) = settings.hosts.as_ref().filter(|h| h.has_both()) else {
            return Ok(());
        };
        let mode = settings.mode.flip();
        if let Some(host) = hosts.get(mode) {
            set_netloc(&mut request.url, host)?;
            settings.mode = mode;
        }
        Ok(())
    }

    fn retry_hook(
        &self,
        settings: &RetrySettings,
        request: &Request,
        response: Option<&Response>,
        error: Option<&PipelineError>,
    ) {
        if let Some(hook) = &settings.hook {
            hook(&RetryEvent {
                retry_count: settings.count.saturating_sub(1),
                location_mode: settings.mode,
                request,
                response,
                error,
            });
        }
    }

    async fn sleep(&self, settings: &RetrySettings, ctx: &Context) {
        let backoff = self.backoff.backoff(settings.count);
        if backoff.is_zero() {
            return;
        }
        debug!(
            attempt = settings.count,
            wait_ms = backoff.as_millis() as u64,
            location = %settings.mode,
            "Waiting before retry"
        );
        ctx.sleep(backoff).await;
    }
}

#[async_trait]
impl Policy for TablesRetryPolicy {
    async fn send(
        &self,
        request: &mut Request,
        ctx: &mut Context,
        next: Next<'_>,
    ) -> Result<Response> {
        let mut settings = self.configure_retries(request, ctx);
        ctx.location.mode = Some(settings.mode);

        loop {
            match next.run(request, ctx).await {
                Ok(mut response) => {
                    if response.is_retry(settings.mode)
                        && self.increment(&mut settings, request, Failure::Status(&response))
                    {
                        ctx.location.mode = Some(settings.mode);
                        debug!(
                            status = response.status,
                            attempt = settings.count,
                            "Retrying after retryable status"
                        );
                        self.retry_hook(&settings, request, Some(&response), None);
                        self.sleep(&settings, ctx).await;
                        continue;
                    }

                    if response.is_retry(settings.mode) {
                        warn!(
                            status = response.status,
                            retries = settings.count,
                            "Retries exhausted, returning last response"
                        );
                    }
                    response.location_mode = Some(settings.mode);
                    if !settings.history.is_empty() {
                        response.history = std::mem::take(&mut settings.history);
                    }
                    return Ok(response);
                }
                Err(error) if error.is_service_error() => {
                    if self.increment(&mut settings, request, Failure::Error(&error)) {
                        ctx.location.mode = Some(settings.mode);
                        debug!(
                            error = %error,
                            attempt = settings.count,
                            "Retrying after transport error"
                        );
                        self.retry_hook(&settings, request, None, Some(&error));
                        self.sleep(&settings, ctx).await;
                        continue;
                    }
                    warn!(
                        error = %error,
                        retries = settings.count,
                        "Retries exhausted, returning error"
                    );
                    return Err(error);
                }
                Err(error) => return Err(error),
            }
        }
    }
}
