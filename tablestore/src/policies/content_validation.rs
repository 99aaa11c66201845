//! Content-MD5 computation and verification.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::io::{Read, Seek, SeekFrom};
use tablestore_core::http::{HeaderName, HeaderValue, Method};
use tablestore_core::{Body, BodyStream, Context, PipelineError, Request, Response, Result, SansIoPolicy};
use tracing::debug;

/// Header carrying the base64 MD5 digest of a body.
pub const CONTENT_MD5: &str = "content-md5";

/// Computes `Content-MD5` for outgoing bodies and verifies it on responses.
///
/// Active only for calls with `validate_content` set. GET requests carry no
/// body and are not stamped; their responses are checked against a digest of
/// the response body.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentValidationPolicy;

impl ContentValidationPolicy {
    /// Create the policy.
    pub fn new() -> Self {
        Self
    }
}

impl SansIoPolicy for ContentValidationPolicy {
    fn on_request(&self, request: &mut Request, ctx: &mut Context) -> Result<()> {
        let validate = ctx.options.validate_content;
        ctx.validate_content = validate;
        if !validate || request.method == Method::GET {
            return Ok(());
        }

        let digest = body_md5(&mut request.body)?;
        let value = HeaderValue::from_str(&digest)
            .map_err(|e| PipelineError::configuration(e.to_string()))?;
        request
            .headers
            .insert(HeaderName::from_static(CONTENT_MD5), value);
        ctx.content_md5 = Some(digest);
        Ok(())
    }

    fn on_response(
        &self,
        _request: &Request,
        response: &mut Response,
        ctx: &mut Context,
    ) -> Result<()> {
        if !ctx.validate_content {
            return Ok(());
        }
        let Some(expected) = response.header(CONTENT_MD5).filter(|v| !v.is_empty()) else {
            return Ok(());
        };

        let computed = match &ctx.content_md5 {
            Some(digest) => digest.clone(),
            None => encode_md5(&response.body),
        };
        if expected != computed {
            return Err(PipelineError::ContentMd5Mismatch {
                expected: expected.to_string(),
                computed,
            });
        }
        debug!("Content-MD5 verified");
        Ok(())
    }
}

/// Base64 MD5 digest of some bytes.
pub fn encode_md5(data: &[u8]) -> String {
    STANDARD.encode(md5::compute(data).0)
}

/// Base64 MD5 digest of a request body.
///
/// A stream is read from its current position and then sought back there,
/// so the transport still sends the whole remainder.
pub fn body_md5(body: &mut Body) -> Result<String> {
    match body {
        Body::Empty => Ok(encode_md5(&[])),
        Body::Bytes(bytes) => Ok(encode_md5(bytes)),
        Body::Stream(stream) => stream_md5(stream.as_mut()),
    }
}

fn stream_md5(stream: &mut dyn BodyStream) -> Result<String> {
    let position = stream.stream_position().unwrap_or(0);

    let mut context = md5::Context::new();
    let mut chunk = [0u8; 4096];
    loop {
        let read = stream
            .read(&mut chunk)
            .map_err(|e| PipelineError::InvalidBody(format!("failed to read body: {e}")))?;
        if read == 0 {
            break;
        }
        context.consume(&chunk[..read]);
    }

    stream.seek(SeekFrom::Start(position)).map_err(|_| {
        PipelineError::InvalidBody("Data should be bytes or a seekable stream.".to_string())
    })?;
    Ok(STANDARD.encode(context.compute().0))
}
