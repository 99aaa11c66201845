//! Request and response trace logging with secret redaction.
//!
//! Logging is off unless enabled on the policy or for a single call through
//! `RequestOptions::logging_enable`, and only emits anything when `DEBUG` is
//! enabled for this module. SAS signatures and `Authorization` values are
//! never written out.

use regex::Regex;
use std::sync::OnceLock;
use tablestore_core::http::Url;
use tablestore_core::{Body, Context, Request, Response, Result, SansIoPolicy};
use tracing::{debug, Level};

const REDACTED: &str = "*****";

static ATTACHMENT: OnceLock<Regex> = OnceLock::new();

fn attachment_pattern() -> &'static Regex {
    ATTACHMENT.get_or_init(|| {
        Regex::new(r#"(?i)^attachment; ?filename=["\w.]+"#).expect("attachment pattern is valid")
    })
}

/// Logs requests and responses at `DEBUG`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingPolicy {
    enabled: bool,
}

impl LoggingPolicy {
    /// Create a policy, enabled for every call or only on request.
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// Whether logging is on by default.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl SansIoPolicy for LoggingPolicy {
    fn on_request(&self, request: &mut Request, ctx: &mut Context) -> Result<()> {
        ctx.logging_enabled = ctx.options.logging_enable.unwrap_or(self.enabled);
        if !ctx.logging_enabled || !tracing::enabled!(Level::DEBUG) {
            return Ok(());
        }

        debug!(
            url = %redact_url(&request.url),
            method = %request.method,
            "Request"
        );
        for (name, value) in &request.headers {
            let value = String::from_utf8_lossy(value.as_bytes());
            debug!(
                header = name.as_str(),
                value = %redact_header(name.as_str(), &value),
                "Request header"
            );
        }
        debug!(body = %request_body_summary(&request.body), "Request body");
        Ok(())
    }

    fn on_response(
        &self,
        _request: &Request,
        response: &mut Response,
        ctx: &mut Context,
    ) -> Result<()> {
        if !ctx.logging_enabled || !tracing::enabled!(Level::DEBUG) {
            return Ok(());
        }

        debug!(status = response.status, "Response");
        for (name, value) in &response.headers {
            debug!(
                header = name.as_str(),
                value = %String::from_utf8_lossy(value.as_bytes()),
                "Response header"
            );
        }
        debug!(content = %response_body_summary(response), "Response content");
        Ok(())
    }
}

/// URL with the `sig` query parameter masked.
pub fn redact_url(url: &Url) -> String {
    if !url.query_pairs().any(|(k, _)| k == "sig") {
        return url.to_string();
    }
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let v = if k == "sig" { REDACTED.into() } else { v };
            (k.into_owned(), v.into_owned())
        })
        .collect();
    let mut redacted = url.clone();
    redacted.query_pairs_mut().clear().extend_pairs(pairs);
    redacted.to_string()
}

/// Header value safe to log.
///
/// `Authorization` is masked entirely; a copy source URL keeps everything
/// but its signature.
pub fn redact_header(name: &str, value: &str) -> String {
    if name.eq_ignore_ascii_case("authorization") {
        return REDACTED.to_string();
    }
    if name.eq_ignore_ascii_case("x-ms-copy-source") && value.contains("sig") {
        if let Ok(url) = Url::parse(value) {
            return redact_url(&url);
        }
    }
    value.to_string()
}

/// Loggable form of a request body.
pub fn request_body_summary(body: &Body) -> String {
    match body {
        Body::Empty => String::new(),
        Body::Bytes(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        Body::Stream(_) => "File upload".to_string(),
    }
}

/// Loggable form of a response body; binary payloads are described, not dumped.
pub fn response_body_summary(response: &Response) -> String {
    if let Some(disposition) = response
        .header("content-disposition")
        .filter(|h| attachment_pattern().is_match(h))
    {
        let filename = disposition.split_once('=').map_or("", |(_, f)| f);
        return format!("File attachments: {filename}");
    }
    let content_type = response.header("content-type").unwrap_or_default();
    if content_type.ends_with("octet-stream") {
        return "Body contains binary data.".to_string();
    }
    if content_type.starts_with("image") {
        return "Body contains image data.".to_string();
    }
    response.text()
}
