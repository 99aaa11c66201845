//! # tablestore-core
//!
//! Core types for the tablestore request pipeline.
//!
//! - **Requests and responses**: [`Request`], [`Body`], [`Response`], [`RequestHistory`]
//! - **Locations**: [`LocationMode`] and [`LocationHosts`] for primary/secondary routing
//! - **Options**: [`RequestOptions`] with per-call overrides and hooks
//! - **Pipeline**: the [`Policy`] chain, [`Next`] and the per-call [`Context`]
//! - **Transports**: the [`Transport`] trait, [`ReqwestTransport`] and [`MockTransport`]
//! - **Errors**: [`PipelineError`] with its transport [`ErrorPhase`]
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tablestore_core::{Pipeline, ReqwestTransport, Request, RequestOptions};
//!
//! let pipeline = Pipeline::new(Arc::new(ReqwestTransport::new()));
//! let mut request = Request::get("https://acct.table.core/Tables".parse()?);
//! let response = pipeline.send(&mut request, RequestOptions::new()).await?;
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod error;
pub mod location;
pub mod mock;
pub mod options;
pub mod pipeline;
pub mod request;
pub mod response;
pub mod transport;

// Re-exports
pub use error::{BoxError, ErrorPhase, PipelineError, Result};
pub use location::{LocationHosts, LocationMode};
pub use mock::{MockTransport, SeenRequest};
pub use options::{RequestHook, RequestOptions, ResponseHook, RetryEvent, RetryHook};
pub use pipeline::{
    Context, Next, Pipeline, Policy, ResolvedLocation, SansIo, SansIoPolicy, StreamProgress,
};
pub use request::{Body, BodyStream, Request};
pub use response::{AttemptOutcome, RequestHistory, Response};
pub use transport::{ReqwestTransport, Transport};

/// Re-exported HTTP primitives used in the public API.
pub mod http {
    pub use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
    pub use reqwest::Method;
    pub use url::Url;
}
