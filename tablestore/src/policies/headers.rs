//! Standard request headers and client request id echo checks.

use chrono::{DateTime, Utc};
use tablestore_core::http::{HeaderMap, HeaderName, HeaderValue};
use tablestore_core::{Context, PipelineError, Request, Response, Result, SansIoPolicy};
use uuid::Uuid;

/// Header carrying the caller-chosen request id.
pub const CLIENT_REQUEST_ID: &str = "x-ms-client-request-id";
/// Header carrying the service-assigned request id.
pub const SERVICE_REQUEST_ID: &str = "x-ms-request-id";
/// Service date header.
pub const MS_DATE: &str = "x-ms-date";

/// Stamps every request with date and client request id headers.
///
/// Static headers configured on the policy are applied first. On the way
/// back, a response that echoes a different client request id than the one
/// sent is turned into [`PipelineError::ClientRequestIdMismatch`].
#[derive(Debug, Clone, Default)]
pub struct HeadersPolicy {
    headers: HeaderMap,
}

impl HeadersPolicy {
    /// Create a policy without static headers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a static header sent with every request.
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self> {
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
            PipelineError::configuration(format!("invalid header name {name:?}: {e}"))
        })?;
        let value = header_value(value)?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Static headers sent with every request.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}

impl SansIoPolicy for HeadersPolicy {
    fn on_request(&self, request: &mut Request, ctx: &mut Context) -> Result<()> {
        for (name, value) in &self.headers {
            request.headers.insert(name.clone(), value.clone());
        }

        let date = header_value(&http_date(Utc::now()))?;
        request
            .headers
            .insert(HeaderName::from_static(MS_DATE), date.clone());
        request.headers.insert(HeaderName::from_static("date"), date);

        let client_request_id = ctx
            .options
            .client_request_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        request.headers.insert(
            HeaderName::from_static(CLIENT_REQUEST_ID),
            header_value(&client_request_id)?,
        );
        Ok(())
    }

    fn on_response(
        &self,
        request: &Request,
        response: &mut Response,
        _ctx: &mut Context,
    ) -> Result<()> {
        let Some(echoed) = response.header(CLIENT_REQUEST_ID) else {
            return Ok(());
        };
        let sent = request.header(CLIENT_REQUEST_ID).unwrap_or_default();
        if echoed != sent {
            return Err(PipelineError::ClientRequestIdMismatch {
                echoed: echoed.to_string(),
                sent: sent.to_string(),
                service_request_id: response
                    .header(SERVICE_REQUEST_ID)
                    .unwrap_or_default()
                    .to_string(),
            });
        }
        Ok(())
    }
}

/// Format a timestamp as an HTTP date, e.g. `Sun, 06 Nov 1994 08:49:37 GMT`.
pub fn http_date(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|e| {
        PipelineError::configuration(format!("invalid header value {value:?}: {e}"))
    })
}
