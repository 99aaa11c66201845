//! Raw request and response callbacks.

use async_trait::async_trait;
use std::sync::Arc;
use tablestore_core::{
    Body, Context, Next, Policy, Request, RequestHook, Response, ResponseHook, Result,
    SansIoPolicy, StreamProgress,
};

/// Invokes a callback with every outgoing request.
///
/// A hook passed in the call's options replaces the policy's default.
#[derive(Clone, Default)]
pub struct RequestHookPolicy {
    hook: Option<RequestHook>,
}

impl RequestHookPolicy {
    /// Create a policy without a default hook.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default hook.
    #[must_use]
    pub fn with_hook(mut self, hook: impl Fn(&Request) + Send + Sync + 'static) -> Self {
        self.hook = Some(Arc::new(hook));
        self
    }
}

impl std::fmt::Debug for RequestHookPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestHookPolicy")
            .field("hook", &self.hook.is_some())
            .finish()
    }
}

impl SansIoPolicy for RequestHookPolicy {
    fn on_request(&self, request: &mut Request, ctx: &mut Context) -> Result<()> {
        let hook = ctx
            .options
            .raw_request_hook
            .as_ref()
            .or(self.hook.as_ref());
        if let Some(hook) = hook {
            hook(request);
        }
        Ok(())
    }
}

/// Tracks transfer progress and invokes a callback with every response.
///
/// Responses that the retry policy will replay do not count towards
/// progress. The hook is resolved once per call and reused for retries.
#[derive(Clone, Default)]
pub struct ResponseHookPolicy {
    hook: Option<ResponseHook>,
}

impl ResponseHookPolicy {
    /// Create a policy without a default hook.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default hook.
    #[must_use]
    pub fn with_hook(mut self, hook: impl Fn(&Response, &Context) + Send + Sync + 'static) -> Self {
        self.hook = Some(Arc::new(hook));
        self
    }
}

impl std::fmt::Debug for ResponseHookPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseHookPolicy")
            .field("hook", &self.hook.is_some())
            .finish()
    }
}

#[async_trait]
impl Policy for ResponseHookPolicy {
    async fn send(
        &self,
        request: &mut Request,
        ctx: &mut Context,
        next: Next<'_>,
    ) -> Result<Response> {
        let mut progress = StreamProgress {
            data_stream_total: ctx
                .progress
                .data_stream_total
                .or(ctx.options.data_stream_total),
            download_stream_current: ctx
                .progress
                .download_stream_current
                .or(ctx.options.download_stream_current),
            upload_stream_current: ctx
                .progress
                .upload_stream_current
                .or(ctx.options.upload_stream_current),
        };
        let hook = ctx
            .response_hook
            .clone()
            .or_else(|| ctx.options.raw_response_hook.clone())
            .or_else(|| self.hook.clone());

        let response = next.run(request, ctx).await?;

        let will_retry = response.is_retry(ctx.location.mode.unwrap_or_default());
        if !will_retry {
            if let Some(current) = progress.download_stream_current {
                let length = header_u64(response.header("content-length"));
                let current = current.saturating_add(length);
                progress.download_stream_current = Some(current);
                if progress.data_stream_total.is_none() {
                    progress.data_stream_total = Some(
                        response
                            .header("content-range")
                            .and_then(content_range_total)
                            .unwrap_or(current),
                    );
                }
            } else if let Some(current) = progress.upload_stream_current {
                progress.upload_stream_current =
                    Some(current.saturating_add(request_length(request)));
            }
        }
        ctx.progress = progress;

        if let Some(hook) = hook {
            hook(&response, &*ctx);
            ctx.response_hook = Some(hook);
        }
        Ok(response)
    }
}

/// Total size from a `Content-Range` value such as `bytes 0-99/1000`.
pub fn content_range_total(value: &str) -> Option<u64> {
    let (_, range) = value.split_once(' ')?;
    let (_, total) = range.split_once('/')?;
    total.trim().parse().ok()
}

fn header_u64(value: Option<&str>) -> u64 {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(0)
}

fn request_length(request: &Request) -> u64 {
    match request.header("content-length") {
        Some(value) => header_u64(Some(value)),
        None => match &request.body {
            Body::Bytes(bytes) => bytes.len() as u64,
            _ => 0,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;
    use tablestore_core::http::Url;
    use tablestore_core::{LocationMode, MockTransport, Pipeline, RequestOptions};
    use tablestore_retries::{BackoffConfig, RetryConfig, TablesRetryPolicy};

    fn url() -> Url {
        Url::parse("https://acct.table.core/Tables").unwrap()
    }

    #[test]
    fn test_content_range_total() {
        assert_eq!(content_range_total("bytes 0-99/1000"), Some(1000));
        assert_eq!(content_range_total("bytes 0-99/*"), None);
        assert_eq!(content_range_total("garbage"), None);
    }

    #[tokio::test]
    async fn test_request_hook_override() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let default_seen = seen.clone();
        let call_seen = seen.clone();
        let transport = Arc::new(MockTransport::new());
        let pipeline = Pipeline::new(transport.clone()).with_sans_io(
            RequestHookPolicy::new()
                .with_hook(move |_| default_seen.lock().unwrap().push("default")),
        );

        let mut request = Request::get(url());
        pipeline.send(&mut request, RequestOptions::new()).await.unwrap();
        let options = RequestOptions::new()
            .raw_request_hook(move |_| call_seen.lock().unwrap().push("call"));
        pipeline.send(&mut request, options).await.unwrap();

        assert_eq!(*seen.lock().unwrap(), vec!["default", "call"]);
    }

    #[tokio::test]
    async fn test_download_progress() {
        let transport = Arc::new(
            MockTransport::new().with_response(
                Response::new(206)
                    .with_header("content-length", "100")
                    .with_header("content-range", "bytes 0-99/1000"),
            ),
        );
        let pipeline = Pipeline::new(transport.clone()).with_policy(ResponseHookPolicy::new());

        let progress = Arc::new(Mutex::new(None));
        let recorded = progress.clone();
        let options = RequestOptions::new()
            .download_progress(0, None)
            .raw_response_hook(move |_, ctx| *recorded.lock().unwrap() = Some(ctx.progress));

        let mut request = Request::get(url());
        pipeline.send(&mut request, options).await.unwrap();

        let progress = progress.lock().unwrap().unwrap();
        assert_eq!(progress.download_stream_current, Some(100));
        assert_eq!(progress.data_stream_total, Some(1000));
    }

    #[tokio::test]
    async fn test_download_total_defaults_to_current() {
        let transport = Arc::new(
            MockTransport::new()
                .with_response(Response::new(200).with_header("content-length", "42")),
        );
        let pipeline = Pipeline::new(transport.clone()).with_policy(ResponseHookPolicy::new());

        let progress = Arc::new(Mutex::new(None));
        let recorded = progress.clone();
        let options = RequestOptions::new()
            .download_progress(10, None)
            .raw_response_hook(move |_, ctx| *recorded.lock().unwrap() = Some(ctx.progress));

        let mut request = Request::get(url());
        pipeline.send(&mut request, options).await.unwrap();

        let progress = progress.lock().unwrap().unwrap();
        assert_eq!(progress.download_stream_current, Some(52));
        assert_eq!(progress.data_stream_total, Some(52));
    }

    #[tokio::test]
    async fn test_upload_progress_skips_retried_responses() {
        let transport = Arc::new(MockTransport::new().with_status(503));
        let pipeline = Pipeline::new(transport.clone()).with_policy(ResponseHookPolicy::new());

        let progress = Arc::new(Mutex::new(Vec::new()));
        let recorded = progress.clone();
        let options = RequestOptions::new()
            .upload_progress(5)
            .raw_response_hook(move |response, ctx| {
                recorded
                    .lock()
                    .unwrap()
                    .push((response.status, ctx.progress.upload_stream_current))
            });

        let mut request = Request::put(url()).with_body("0123456789");
        pipeline.send(&mut request, options.clone()).await.unwrap();
        pipeline.send(&mut request, options).await.unwrap();

        assert_eq!(
            *progress.lock().unwrap(),
            vec![(503, Some(5)), (200, Some(15))]
        );
    }

    #[tokio::test]
    async fn test_retried_secondary_404_not_counted_as_progress() {
        let transport = Arc::new(
            MockTransport::new()
                .with_response(Response::new(404).with_header("content-length", "7"))
                .with_response(Response::new(200).with_header("content-length", "42")),
        );
        let retry = TablesRetryPolicy::new(RetryConfig::exponential().backoff(
            BackoffConfig::Linear {
                backoff: std::time::Duration::ZERO,
                random_jitter_range: std::time::Duration::ZERO,
            },
        ));
        let pipeline = Pipeline::new(transport.clone())
            .with_policy(retry)
            .with_policy(ResponseHookPolicy::new());

        let progress = Arc::new(Mutex::new(Vec::new()));
        let recorded = progress.clone();
        let options = RequestOptions::new()
            .location_mode(LocationMode::Secondary)
            .download_progress(0, None)
            .raw_response_hook(move |response, ctx| {
                recorded
                    .lock()
                    .unwrap()
                    .push((response.status, ctx.progress.download_stream_current))
            });

        let mut request = Request::get(url());
        let response = pipeline.send(&mut request, options).await.unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.history.len(), 1);
        assert_eq!(*progress.lock().unwrap(), vec![(404, Some(0)), (200, Some(42))]);
    }

    #[tokio::test]
    async fn test_progress_saturates_on_huge_lengths() {
        let transport = Arc::new(MockTransport::new().with_response(
            Response::new(200).with_header("content-length", &u64::MAX.to_string()),
        ));
        let pipeline = Pipeline::new(transport.clone()).with_policy(ResponseHookPolicy::new());

        let progress = Arc::new(Mutex::new(None));
        let recorded = progress.clone();
        let options = RequestOptions::new()
            .download_progress(10, None)
            .raw_response_hook(move |_, ctx| *recorded.lock().unwrap() = Some(ctx.progress));

        let mut request = Request::get(url());
        pipeline.send(&mut request, options).await.unwrap();

        let progress = progress.lock().unwrap().unwrap();
        assert_eq!(progress.download_stream_current, Some(u64::MAX));
    }

    #[tokio::test]
    async fn test_policy_default_hook() {
        let calls = Arc::new(Mutex::new(0));
        let counter = calls.clone();
        let transport = Arc::new(MockTransport::new());
        let pipeline = Pipeline::new(transport.clone()).with_policy(
            ResponseHookPolicy::new().with_hook(move |_, _| *counter.lock().unwrap() += 1),
        );

        let mut request = Request::get(url());
        pipeline.send(&mut request, RequestOptions::new()).await.unwrap();

        assert_eq!(*calls.lock().unwrap(), 1);
    }
}
