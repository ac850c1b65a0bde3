//! Response descriptors and the request/response types handlers see.
//!
//! A descriptor is what a rule points to. The routing engine never looks
//! inside it; the HTTP layer renders each variant.

use axum::body::Bytes;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::routing::query::QueryParams;

/// Programmatic response producer.
pub trait ResponseHandler: Send + Sync {
    fn respond(&self, request: &MockRequest) -> MockResponse;
}

impl<F> ResponseHandler for F
where
    F: Fn(&MockRequest) -> MockResponse + Send + Sync,
{
    fn respond(&self, request: &MockRequest) -> MockResponse {
        self(request)
    }
}

/// What a rule answers with.
#[derive(Clone)]
pub enum ResponseDescriptor {
    /// JSON text sent as-is.
    InlineJson(String),
    /// Path relative to the data directory.
    File(PathBuf),
    /// Callback invoked per request.
    Handler(Arc<dyn ResponseHandler>),
}

impl ResponseDescriptor {
    pub fn json(text: impl Into<String>) -> Self {
        ResponseDescriptor::InlineJson(text.into())
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        ResponseDescriptor::File(path.into())
    }

    pub fn handler<H: ResponseHandler + 'static>(handler: H) -> Self {
        ResponseDescriptor::Handler(Arc::new(handler))
    }

    /// Classify a configured string: JSON objects and arrays are inline
    /// bodies, anything else names a data file.
    pub fn classify(text: &str) -> Self {
        let trimmed = text.trim();
        let looks_like_json = trimmed.starts_with('{') || trimmed.starts_with('[');
        if looks_like_json && serde_json::from_str::<serde_json::Value>(trimmed).is_ok() {
            ResponseDescriptor::InlineJson(trimmed.to_string())
        } else {
            ResponseDescriptor::File(PathBuf::from(text))
        }
    }

    /// Short label for logs and `check` output.
    pub fn kind(&self) -> &'static str {
        match self {
            ResponseDescriptor::InlineJson(_) => "json",
            ResponseDescriptor::File(_) => "file",
            ResponseDescriptor::Handler(_) => "handler",
        }
    }
}

impl From<&str> for ResponseDescriptor {
    fn from(text: &str) -> Self {
        ResponseDescriptor::classify(text)
    }
}

impl From<String> for ResponseDescriptor {
    fn from(text: String) -> Self {
        ResponseDescriptor::classify(&text)
    }
}

impl fmt::Debug for ResponseDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseDescriptor::InlineJson(text) => f.debug_tuple("InlineJson").field(text).finish(),
            ResponseDescriptor::File(path) => f.debug_tuple("File").field(path).finish(),
            ResponseDescriptor::Handler(h) => {
                write!(f, "Handler({:p})", Arc::as_ptr(h) as *const ())
            }
        }
    }
}

impl fmt::Display for ResponseDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseDescriptor::InlineJson(text) => write!(f, "{}", text),
            ResponseDescriptor::File(path) => write!(f, "{}", path.display()),
            ResponseDescriptor::Handler(_) => write!(f, "<handler>"),
        }
    }
}

impl PartialEq for ResponseDescriptor {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ResponseDescriptor::InlineJson(a), ResponseDescriptor::InlineJson(b)) => a == b,
            (ResponseDescriptor::File(a), ResponseDescriptor::File(b)) => a == b,
            (ResponseDescriptor::Handler(a), ResponseDescriptor::Handler(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Request facts handed to a [`ResponseHandler`].
#[derive(Debug, Clone)]
pub struct MockRequest {
    pub method: Method,
    /// Percent-decoded path.
    pub path: String,
    pub query: QueryParams,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// A fully rendered mock response.
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl MockResponse {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// 200 with a JSON body.
    pub fn json(body: impl Into<Bytes>) -> Self {
        Self::new(StatusCode::OK)
            .with_header(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .with_body(body)
    }

    /// 200 with a plain text body.
    pub fn text(body: impl Into<Bytes>) -> Self {
        Self::new(StatusCode::OK)
            .with_header(
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/plain; charset=utf-8"),
            )
            .with_body(body)
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }
}

impl IntoResponse for MockResponse {
    fn into_response(self) -> Response {
        (self.status, self.headers, self.body).into_response()
    }
}
