//! Pipeline configuration.

use crate::policies::{
    ContentValidationPolicy, HeadersPolicy, HostsPolicy, LoggingPolicy, RequestHookPolicy,
    ResponseHookPolicy,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tablestore_core::{
    Context, LocationHosts, Pipeline, ReqwestTransport, Request, Response, Result, Transport,
};
use tablestore_retries::{RetryConfig, TablesRetryPolicy};

/// Client-wide settings for a pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Primary and secondary endpoints.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hosts: Option<LocationHosts>,

    /// Retry budgets and backoff.
    pub retry: RetryConfig,

    /// Log every request and response at `DEBUG`.
    pub logging_enable: bool,

    /// Headers sent with every request.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,

    /// Per-attempt timeout of the HTTP client.
    #[serde(
        skip_serializing_if = "Option::is_none",
        with = "option_duration_serde"
    )]
    pub timeout: Option<Duration>,
}

impl PipelineConfig {
    /// Create an empty config.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the endpoints.
    #[must_use]
    pub fn hosts(mut self, hosts: LocationHosts) -> Self {
        self.hosts = Some(hosts);
        self
    }

    /// Set the retry config.
    #[must_use]
    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Enable logging for every call.
    #[must_use]
    pub fn logging_enable(mut self, enabled: bool) -> Self {
        self.logging_enable = enabled;
        self
    }

    /// Add a header sent with every request.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Set the per-attempt timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build a pipeline over a reqwest transport.
    pub fn build(&self) -> Result<Pipeline> {
        let transport = match self.timeout {
            Some(timeout) => ReqwestTransport::with_timeout(timeout)?,
            None => ReqwestTransport::new(),
        };
        build_pipeline(self, Arc::new(transport))
    }
}

/// Default hooks installed on a pipeline.
///
/// Hooks passed with a call's options take precedence.
#[derive(Clone, Default)]
pub struct PipelineHooks {
    request: RequestHookPolicy,
    response: ResponseHookPolicy,
}

impl PipelineHooks {
    /// Create without hooks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Hook invoked with every outgoing request.
    #[must_use]
    pub fn on_request(mut self, hook: impl Fn(&Request) + Send + Sync + 'static) -> Self {
        self.request = self.request.with_hook(hook);
        self
    }

    /// Hook invoked with every response.
    #[must_use]
    pub fn on_response(
        mut self,
        hook: impl Fn(&Response, &Context) + Send + Sync + 'static,
    ) -> Self {
        self.response = self.response.with_hook(hook);
        self
    }
}

impl std::fmt::Debug for PipelineHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineHooks")
            .field("request", &self.request)
            .field("response", &self.response)
            .finish()
    }
}

/// Assemble the standard policy chain in front of a transport.
pub fn build_pipeline(config: &PipelineConfig, transport: Arc<dyn Transport>) -> Result<Pipeline> {
    build_pipeline_with_hooks(config, PipelineHooks::default(), transport)
}

/// Assemble the standard policy chain with default hooks.
pub fn build_pipeline_with_hooks(
    config: &PipelineConfig,
    hooks: PipelineHooks,
    transport: Arc<dyn Transport>,
) -> Result<Pipeline> {
    let mut headers = HeadersPolicy::new();
    for (name, value) in &config.headers {
        headers = headers.with_header(name, value)?;
    }

    let mut pipeline = Pipeline::new(transport);
    if let Some(hosts) = &config.hosts {
        let hosts = match &hosts.secondary {
            Some(secondary) => LocationHosts::new(hosts.primary.as_str(), secondary.as_str())?,
            None => LocationHosts::primary(hosts.primary.as_str())?,
        };
        pipeline = pipeline.with_sans_io(HostsPolicy::new(hosts));
    }

    Ok(pipeline
        .with_sans_io(headers)
        .with_sans_io(ContentValidationPolicy::new())
        .with_sans_io(hooks.request)
        .with_policy(TablesRetryPolicy::new(config.retry.clone()))
        .with_policy(hooks.response)
        .with_sans_io(LoggingPolicy::new(config.logging_enable)))
}

mod option_duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => d.as_secs_f64().serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let opt: Option<f64> = Option::deserialize(deserializer)?;
        opt.map(Duration::try_from_secs_f64)
            .transpose()
            .map_err(serde::de::Error::custom)
    }
}
