//! # tablestore-retries
//!
//! Retry policy for the tablestore pipeline.
//!
//! Requests that fail with a transport error or a retryable status are
//! replayed with a randomized backoff. Reads against geo-redundant accounts
//! can alternate between the primary and secondary endpoints.
//!
//! ## Core Concepts
//!
//! - **[`TablesRetryPolicy`]**: the pipeline policy running the retry loop
//! - **[`RetryConfig`]**: retry budgets and the wait strategy
//! - **[`BackoffStrategy`]**: how long to wait before each retry
//! - **[`RetrySettings`]**: per-request retry state
//!
//! ## Backoff
//!
//! - [`ExponentialBackoff`]: 15, 18, 24 seconds by default
//! - [`LinearBackoff`]: a fixed 15 seconds by default
//! - [`NoBackoff`]: retry immediately
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use tablestore_core::{Pipeline, ReqwestTransport, RequestOptions};
//! use tablestore_retries::{RetryConfig, TablesRetryPolicy};
//!
//! let pipeline = Pipeline::new(Arc::new(ReqwestTransport::new()))
//!     .with_policy(TablesRetryPolicy::new(
//!         RetryConfig::exponential().retry_to_secondary(true),
//!     ));
//!
//! let response = pipeline.send(&mut request, RequestOptions::new()).await?;
//! for attempt in &response.history {
//!     println!("{} {}", attempt.method, attempt.url);
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod backoff;
pub mod config;
pub mod policy;
pub mod strategy;

// Re-exports
pub use backoff::{ExponentialBackoff, ExponentialBackoffBuilder, LinearBackoff};
pub use config::{BackoffConfig, RetryConfig};
pub use policy::{Failure, RetrySettings, TablesRetryPolicy};
pub use strategy::{BackoffStrategy, NoBackoff};

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{
        BackoffConfig, BackoffStrategy, ExponentialBackoff, LinearBackoff, RetryConfig,
        TablesRetryPolicy,
    };
}
