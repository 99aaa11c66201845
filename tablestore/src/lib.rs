//! # tablestore
//!
//! HTTP request pipeline for table service clients.
//!
//! A pipeline is a chain of policies in front of a transport. The standard
//! chain built by [`build_pipeline`] resolves the target endpoint, stamps
//! request headers, validates content digests, retries failed attempts with
//! backoff (failing over between the primary and secondary endpoints of a
//! geo-redundant account), tracks transfer progress and logs traffic.
//!
//! ## Crates
//!
//! - [`tablestore_core`] - requests, responses, the policy chain and transports
//! - [`tablestore_retries`] - the retry policy and backoff strategies
//!
//! ## Example
//!
//! ```rust,ignore
//! use tablestore::prelude::*;
//!
//! let pipeline = PipelineConfig::new()
//!     .hosts(LocationHosts::new("acct.table.core", "acct-secondary.table.core")?)
//!     .retry(RetryConfig::exponential().retry_to_secondary(true))
//!     .build()?;
//!
//! let mut request = Request::get("https://acct.table.core/Tables".parse()?);
//! let response = pipeline
//!     .send(&mut request, RequestOptions::new().retry_hook(|event| {
//!         println!("retry {} -> {}", event.retry_count, event.location_mode);
//!     }))
//!     .await?;
//!
//! println!("{} from {:?}", response.status, response.location_mode);
//! ```
//!
//! Logging goes through `tracing`; install a subscriber (for example
//! `tracing_subscriber::fmt::init()`) to see it.

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod config;
pub mod policies;

// Re-export crates
pub use tablestore_core as core;
pub use tablestore_retries as retries;

// Re-exports
pub use config::{build_pipeline, build_pipeline_with_hooks, PipelineConfig, PipelineHooks};
pub use policies::{
    ContentValidationPolicy, HeadersPolicy, HostsPolicy, LoggingPolicy, RequestHookPolicy,
    ResponseHookPolicy,
};
pub use tablestore_core::{
    Body, Context, LocationHosts, LocationMode, MockTransport, Pipeline, PipelineError, Policy,
    Request, RequestHistory, RequestOptions, ReqwestTransport, Response, Result, RetryEvent,
    SansIoPolicy, Transport,
};
pub use tablestore_retries::{
    BackoffConfig, BackoffStrategy, ExponentialBackoff, LinearBackoff, RetryConfig,
    TablesRetryPolicy,
};

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{
        build_pipeline, LocationHosts, LocationMode, Pipeline, PipelineConfig, PipelineError,
        Request, RequestOptions, Response, Result, RetryConfig, TablesRetryPolicy,
    };
}
