//! Pipeline policies wrapped around the retry policy.
//!
//! [`build_pipeline`](crate::build_pipeline) assembles them in this order:
//!
//! 1. [`HostsPolicy`]
//! 2. [`HeadersPolicy`]
//! 3. [`ContentValidationPolicy`]
//! 4. [`RequestHookPolicy`]
//! 5. `TablesRetryPolicy`
//! 6. [`ResponseHookPolicy`]
//! 7. [`LoggingPolicy`]
//!
//! Policies after the retry policy run once per attempt.

pub mod content_validation;
pub mod headers;
pub mod hooks;
pub mod hosts;
pub mod logging;

pub use content_validation::ContentValidationPolicy;
pub use headers::HeadersPolicy;
pub use hooks::{RequestHookPolicy, ResponseHookPolicy};
pub use hosts::HostsPolicy;
pub use logging::LoggingPolicy;
