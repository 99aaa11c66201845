//! Outgoing request types.

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use std::fmt;
use std::io::{Read, Seek};
use url::Url;

/// A readable request body that may support rewinding.
///
/// Streams whose [`Seek`] implementation fails are treated as non-rewindable:
/// a failed attempt with such a body is never replayed.
pub trait BodyStream: Read + Seek + Send {}

impl<T: Read + Seek + Send> BodyStream for T {}

/// Request body.
#[derive(Default)]
pub enum Body {
    /// No body.
    #[default]
    Empty,
    /// In-memory bytes.
    Bytes(Bytes),
    /// Readable stream, consumed by the transport.
    Stream(Box<dyn BodyStream>),
}

impl Body {
    /// Wrap a stream.
    pub fn stream(stream: impl BodyStream + 'static) -> Self {
        Self::Stream(Box::new(stream))
    }

    /// Whether the body is a stream.
    pub fn is_stream(&self) -> bool {
        matches!(self, Self::Stream(_))
    }

    /// Whether there is no body at all.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Bytes(b) => b.is_empty(),
            Self::Stream(_) => false,
        }
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "Empty"),
            Self::Bytes(b) => f.debug_tuple("Bytes").field(&b.len()).finish(),
            Self::Stream(_) => write!(f, "Stream"),
        }
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(Bytes::from(bytes))
    }
}

impl From<&'static str> for Body {
    fn from(s: &'static str) -> Self {
        Self::Bytes(Bytes::from_static(s.as_bytes()))
    }
}

impl From<String> for Body {
    fn from(s: String) -> Self {
        Self::Bytes(Bytes::from(s))
    }
}

/// An HTTP request travelling through the pipeline.
///
/// Policies may rewrite the URL in place, e.g. on failover.
#[derive(Debug)]
pub struct Request {
    /// HTTP method.
    pub method: Method,
    /// Target URL.
    pub url: Url,
    /// Request headers.
    pub headers: HeaderMap,
    /// Request body.
    pub body: Body,
}

impl Request {
    /// Create a request with no headers and no body.
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: Body::Empty,
        }
    }

    /// Create a GET request.
    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    /// Create a PUT request.
    pub fn put(url: Url) -> Self {
        Self::new(Method::PUT, url)
    }

    /// Create a POST request.
    pub fn post(url: Url) -> Self {
        Self::new(Method::POST, url)
    }

    /// Set the body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Body>) -> Self {
        self.body = body.into();
        self
    }

    /// Add a header.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Header value as a string, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn url() -> Url {
        Url::parse("https://acct.table.core/Tables").unwrap()
    }

    #[test]
    fn test_request_builder() {
        let request = Request::post(url())
            .with_body("{}")
            .with_header(
                HeaderName::from_static("x-ms-version"),
                HeaderValue::from_static("2019-02-02"),
            );

        assert_eq!(request.method, Method::POST);
        assert_eq!(request.header("x-ms-version"), Some("2019-02-02"));
        assert!(!request.body.is_empty());
        assert!(!request.body.is_stream());
    }

    #[test]
    fn test_stream_body() {
        let request = Request::put(url()).with_body(Body::stream(Cursor::new(vec![1u8, 2, 3])));
        assert!(request.body.is_stream());
        assert_eq!(format!("{:?}", request.body), "Stream");
    }

    #[test]
    fn test_empty_body() {
        assert!(Request::get(url()).body.is_empty());
        assert!(Body::from(Vec::new()).is_empty());
    }
}
