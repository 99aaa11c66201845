//! Error types for the request pipeline.
//!
//! Errors are a closed set of variants. The retry policy inspects
//! [`PipelineError::phase`] to decide which budget a failure is charged to,
//! instead of probing for concrete error types at runtime.

use crate::location::LocationMode;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Boxed error carried as the cause of transport failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The main error type for pipeline operations.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The request could not be sent; the service never saw it.
    #[error("Service request error: {message}")]
    ServiceRequest {
        /// Error message.
        message: String,
        /// Underlying cause.
        #[source]
        source: Option<BoxError>,
    },

    /// The connection failed after the request was sent.
    #[error("Service response error: {message}")]
    ServiceResponse {
        /// Error message.
        message: String,
        /// Underlying cause.
        #[source]
        source: Option<BoxError>,
    },

    /// The service echoed a different client request id than the one sent.
    #[error(
        "Echoed client request ID: {echoed} does not match sent client request ID: {sent}.  Service request ID: {service_request_id}"
    )]
    ClientRequestIdMismatch {
        /// Id echoed by the service.
        echoed: String,
        /// Id sent with the request.
        sent: String,
        /// The service-side request id.
        service_request_id: String,
    },

    /// Content MD5 of the response does not match.
    #[error("MD5 mismatch. Expected value is '{expected}', computed value is '{computed}'.")]
    ContentMd5Mismatch {
        /// Value reported by the service.
        expected: String,
        /// Value computed locally.
        computed: String,
    },

    /// A request asked for a location that has no configured host.
    #[error("Attempting to use undefined host location {0}")]
    UndefinedLocation(LocationMode),

    /// A configured host cannot be used as a URL network location.
    #[error("Invalid host '{host}': {reason}")]
    InvalidHost {
        /// Offending host.
        host: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The request body cannot be read or rewound as required.
    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Other error.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Phase of the exchange in which a transport-level failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPhase {
    /// Connection could not be established.
    Connect,
    /// Connection dropped after the request was sent.
    Read,
}

impl fmt::Display for ErrorPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connect => write!(f, "connect"),
            Self::Read => write!(f, "read"),
        }
    }
}

impl PipelineError {
    /// Create a connect-phase error.
    pub fn service_request(message: impl Into<String>) -> Self {
        Self::ServiceRequest {
            message: message.into(),
            source: None,
        }
    }

    /// Create a response-phase error.
    pub fn service_response(message: impl Into<String>) -> Self {
        Self::ServiceResponse {
            message: message.into(),
            source: None,
        }
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Transport phase of this error, if it is a transport-level failure.
    pub fn phase(&self) -> Option<ErrorPhase> {
        match self {
            Self::ServiceRequest { .. } => Some(ErrorPhase::Connect),
            Self::ServiceResponse { .. } => Some(ErrorPhase::Read),
            _ => None,
        }
    }

    /// Whether this error came from talking to the service.
    ///
    /// Service errors are counted by the retry policy. Local problems with
    /// configuration or the request body are returned immediately.
    pub fn is_service_error(&self) -> bool {
        match self {
            Self::ServiceRequest { .. }
            | Self::ServiceResponse { .. }
            | Self::ClientRequestIdMismatch { .. }
            | Self::ContentMd5Mismatch { .. }
            | Self::Other(_) => true,
            Self::UndefinedLocation(_)
            | Self::InvalidHost { .. }
            | Self::InvalidBody(_)
            | Self::Configuration(_) => false,
        }
    }
}

/// Result type alias using PipelineError.
pub type Result<T> = std::result::Result<T, PipelineError>;
