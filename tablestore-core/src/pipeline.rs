//! The policy chain.
//!
//! A [`Pipeline`] is an ordered list of [`Policy`] values in front of a
//! [`Transport`]. Each policy receives the request, may modify it, and calls
//! [`Next::run`] to pass it to the rest of the chain; the response comes back
//! through the same policies in reverse order.

use crate::error::Result;
use crate::location::{LocationHosts, LocationMode};
use crate::options::{RequestOptions, ResponseHook};
use crate::request::Request;
use crate::response::Response;
use crate::transport::Transport;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// A link in the pipeline that wraps the rest of the chain.
#[async_trait]
pub trait Policy: Send + Sync + fmt::Debug {
    /// Handle the request, usually by calling `next.run(request, ctx)`.
    async fn send(
        &self,
        request: &mut Request,
        ctx: &mut Context,
        next: Next<'_>,
    ) -> Result<Response>;
}

/// A policy that only looks at the request on the way out and the response
/// on the way back, without controlling how the chain is called.
pub trait SansIoPolicy: Send + Sync + fmt::Debug {
    /// Inspect or modify the outgoing request.
    fn on_request(&self, _request: &mut Request, _ctx: &mut Context) -> Result<()> {
        Ok(())
    }

    /// Inspect or modify the incoming response.
    fn on_response(
        &self,
        _request: &Request,
        _response: &mut Response,
        _ctx: &mut Context,
    ) -> Result<()> {
        Ok(())
    }
}

/// Adapts a [`SansIoPolicy`] into a [`Policy`].
#[derive(Debug, Clone)]
pub struct SansIo<P>(pub P);

#[async_trait]
impl<P: SansIoPolicy> Policy for SansIo<P> {
    async fn send(
        &self,
        request: &mut Request,
        ctx: &mut Context,
        next: Next<'_>,
    ) -> Result<Response> {
        self.0.on_request(request, ctx)?;
        let mut response = next.run(request, ctx).await?;
        self.0.on_response(request, &mut response, ctx)?;
        Ok(response)
    }
}

/// The remainder of the chain after the current policy.
///
/// `Next` is `Copy`, so a policy may run the rest of the chain several times.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    policies: &'a [Arc<dyn Policy>],
}

impl<'a> Next<'a> {
    /// Create a chain over the given policies.
    pub fn new(policies: &'a [Arc<dyn Policy>]) -> Self {
        Self { policies }
    }

    /// Send the request through the remaining policies and the transport.
    pub async fn run(self, request: &mut Request, ctx: &mut Context) -> Result<Response> {
        match self.policies.split_first() {
            Some((policy, rest)) => policy.send(request, ctx, Next::new(rest)).await,
            None => {
                let transport = Arc::clone(&ctx.transport);
                transport.send(request).await
            }
        }
    }
}

impl fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field("remaining", &self.policies.len())
            .finish()
    }
}

/// Location resolved for the current request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedLocation {
    /// Location the URL currently targets.
    pub mode: Option<LocationMode>,
    /// Endpoint hosts known to the client.
    pub hosts: Option<LocationHosts>,
    /// The caller pinned the request to one location.
    pub pinned: bool,
}

/// Byte counters for uploads and downloads split across requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamProgress {
    /// Total size of the data, if known.
    pub data_stream_total: Option<u64>,
    /// Bytes downloaded so far.
    pub download_stream_current: Option<u64>,
    /// Bytes uploaded so far.
    pub upload_stream_current: Option<u64>,
}

/// Per-request state shared by all policies of one [`Pipeline::send`].
pub struct Context {
    /// The caller's options for this call.
    pub options: RequestOptions,
    /// Location resolved by the hosts policy.
    pub location: ResolvedLocation,
    /// Content-MD5 validation is active.
    pub validate_content: bool,
    /// Content-MD5 computed for the request body.
    pub content_md5: Option<String>,
    /// Logging is enabled for this call.
    pub logging_enabled: bool,
    /// Stream progress counters.
    pub progress: StreamProgress,
    /// Response hook resolved for this call.
    pub response_hook: Option<ResponseHook>,
    transport: Arc<dyn Transport>,
}

impl Context {
    /// Create a context for one call.
    pub fn new(options: RequestOptions, transport: Arc<dyn Transport>) -> Self {
        Self {
            options,
            location: ResolvedLocation::default(),
            validate_content: false,
            content_md5: None,
            logging_enabled: false,
            progress: StreamProgress::default(),
            response_hook: None,
            transport,
        }
    }

    /// The transport at the end of the chain.
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Sleep using the transport's clock.
    pub async fn sleep(&self, duration: Duration) {
        self.transport.sleep(duration).await;
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("options", &self.options)
            .field("location", &self.location)
            .field("validate_content", &self.validate_content)
            .field("content_md5", &self.content_md5)
            .field("logging_enabled", &self.logging_enabled)
            .field("progress", &self.progress)
            .field("transport", &self.transport)
            .finish_non_exhaustive()
    }
}

/// An ordered chain of policies in front of a transport.
#[derive(Debug, Clone)]
pub struct Pipeline {
    policies: Vec<Arc<dyn Policy>>,
    transport: Arc<dyn Transport>,
}

impl Pipeline {
    /// Create a pipeline with no policies.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            policies: Vec::new(),
            transport,
        }
    }

    /// Append a policy.
    #[must_use]
    pub fn with_policy(mut self, policy: impl Policy + 'static) -> Self {
        self.policies.push(Arc::new(policy));
        self
    }

    /// Append a shared policy.
    #[must_use]
    pub fn with_shared_policy(mut self, policy: Arc<dyn Policy>) -> Self {
        self.policies.push(policy);
        self
    }

    /// Append a sans-I/O policy.
    #[must_use]
    pub fn with_sans_io(self, policy: impl SansIoPolicy + 'static) -> Self {
        self.with_policy(SansIo(policy))
    }

    /// Number of policies in the chain.
    pub fn len(&self) -> usize {
        self.policies.len()
    }

    /// Whether the chain has no policies.
    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    /// The transport at the end of the chain.
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Send a request through the chain.
    ///
    /// The request is borrowed mutably: policies may rewrite its URL and
    /// headers, and a stream body is consumed.
    pub async fn send(&self, request: &mut Request, options: RequestOptions) -> Result<Response> {
        let mut ctx = Context::new(options, Arc::clone(&self.transport));
        Next::new(&self.policies).run(request, &mut ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTransport;
    use reqwest::header::{HeaderName, HeaderValue};
    use url::Url;

    #[derive(Debug)]
    struct StampHeader(&'static str);

    impl SansIoPolicy for StampHeader {
        fn on_request(&self, request: &mut Request, _ctx: &mut Context) -> Result<()> {
            request.headers.append(
                HeaderName::from_static("x-order"),
                HeaderValue::from_static(self.0),
            );
            Ok(())
        }

        fn on_response(
            &self,
            _request: &Request,
            response: &mut Response,
            _ctx: &mut Context,
        ) -> Result<()> {
            response.headers.append(
                HeaderName::from_static("x-order"),
                HeaderValue::from_static(self.0),
            );
            Ok(())
        }
    }

    #[derive(Debug)]
    struct SendTwice;

    #[async_trait]
    impl Policy for SendTwice {
        async fn send(
            &self,
            request: &mut Request,
            ctx: &mut Context,
            next: Next<'_>,
        ) -> Result<Response> {
            next.run(request, ctx).await?;
            next.run(request, ctx).await
        }
    }

    fn request() -> Request {
        Request::get(Url::parse("https://acct.table.core/Tables").unwrap())
    }

    #[tokio::test]
    async fn test_policies_run_in_order() {
        let transport = Arc::new(MockTransport::new());
        let pipeline = Pipeline::new(transport.clone())
            .with_sans_io(StampHeader("outer"))
            .with_sans_io(StampHeader("inner"));

        let mut request = request();
        let response = pipeline.send(&mut request, RequestOptions::new()).await.unwrap();

        let sent: Vec<_> = request
            .headers
            .get_all("x-order")
            .iter()
            .map(|v| v.to_str().unwrap())
            .collect();
        assert_eq!(sent, vec!["outer", "inner"]);

        let received: Vec<_> = response
            .headers
            .get_all("x-order")
            .iter()
            .map(|v| v.to_str().unwrap())
            .collect();
        assert_eq!(received, vec!["inner", "outer"]);
    }

    #[tokio::test]
    async fn test_next_can_be_reused() {
        let transport = Arc::new(MockTransport::new());
        let pipeline = Pipeline::new(transport.clone()).with_policy(SendTwice);
        assert_eq!(pipeline.len(), 1);

        let mut request = request();
        pipeline.send(&mut request, RequestOptions::new()).await.unwrap();
        assert_eq!(transport.request_count(), 2);
    }

    #[tokio::test]
    async fn test_empty_pipeline_goes_to_transport() {
        let transport = Arc::new(MockTransport::new().with_status(204));
        let pipeline = Pipeline::new(transport.clone());
        assert!(pipeline.is_empty());

        let mut request = request();
        let response = pipeline.send(&mut request, RequestOptions::new()).await.unwrap();
        assert_eq!(response.status, 204);
    }
}
