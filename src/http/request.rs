//! Request handling.
//!
//! # Responsibilities
//! - Decode the request target into a matchable path and query
//! - Expose the request ID set by the outer middleware
//! - Assemble the [`MockRequest`] handlers receive
//!
//! # Design Decisions
//! - Paths are percent-decoded before matching, as rule paths are at compile time
//! - A path that is not valid UTF-8 once decoded is matched as sent

use axum::body::Bytes;
use axum::http::{request::Parts, HeaderMap, Uri};
use std::borrow::Cow;

use crate::routing::descriptor::MockRequest;
use crate::routing::query::{percent_decode, QueryParams};

/// Header carrying the request correlation ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// What a request asks for, decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestTarget {
    /// Percent-decoded path.
    pub path: String,
    /// Raw query string, without `?`.
    pub raw_query: Option<String>,
    pub query: QueryParams,
}

impl RequestTarget {
    pub fn from_uri(uri: &Uri) -> Self {
        let raw_query = uri.query().filter(|q| !q.is_empty()).map(str::to_string);
        let query = raw_query
            .as_deref()
            .map(QueryParams::parse)
            .unwrap_or_default();

        Self {
            path: decode(uri.path()).into_owned(),
            raw_query,
            query,
        }
    }

    /// Decoded `path?query` for logs and error bodies.
    pub fn display_url(&self) -> String {
        match &self.raw_query {
            Some(q) => format!("{}?{}", self.path, decode(q)),
            None => self.path.clone(),
        }
    }

    pub fn into_mock_request(self, parts: &Parts, body: Bytes) -> MockRequest {
        MockRequest {
            method: parts.method.clone(),
            path: self.path,
            query: self.query,
            headers: parts.headers.clone(),
            body,
        }
    }
}

/// Percent-decode `raw`, keeping it as sent when it is not UTF-8.
pub fn decode(raw: &str) -> Cow<'_, str> {
    percent_decode(raw)
}

/// Request ID assigned to this request, if any.
pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}
