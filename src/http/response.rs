//! Response helpers for outcomes the rule table does not describe.
//!
//! Each response carries its [`Outcome`] as an extension so the access
//! log can record it.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use http_body_util::LengthLimitError;

use crate::data::DataError;
use crate::observability::metrics::Outcome;

/// Tag `response` with how it was produced.
pub fn with_outcome(mut response: Response, outcome: Outcome) -> Response {
    response.extensions_mut().insert(outcome);
    response
}

/// 404 for a request no rule (and no static file) answers.
pub fn not_found(method: &str, url: &str) -> Response {
    with_outcome(
        (
            StatusCode::NOT_FOUND,
            format!("config not found: {} {}", method, url),
        )
            .into_response(),
        Outcome::NotFound,
    )
}

/// 500 for a data file that could not be turned into a response.
pub fn data_error(error: &DataError) -> Response {
    with_outcome(
        (StatusCode::INTERNAL_SERVER_ERROR, error.to_string()).into_response(),
        Outcome::Error,
    )
}

/// Response for a handler request whose body could not be buffered:
/// 413 when it is over `limit`, 400 when reading it failed.
pub fn body_error(error: &axum::Error, limit: usize) -> Response {
    if is_length_limit(error) {
        return body_too_large(limit);
    }
    tracing::warn!(error = %error, "Failed to read request body");
    with_outcome(
        (
            StatusCode::BAD_REQUEST,
            format!("failed to read request body: {}", error),
        )
            .into_response(),
        Outcome::Error,
    )
}

fn is_length_limit(error: &axum::Error) -> bool {
    let mut source = std::error::Error::source(error);
    while let Some(e) = source {
        if e.is::<LengthLimitError>() {
            return true;
        }
        source = e.source();
    }
    false
}

/// 413 for a handler request whose body is over the limit.
pub fn body_too_large(limit: usize) -> Response {
    with_outcome(
        (
            StatusCode::PAYLOAD_TOO_LARGE,
            format!("request body exceeds {} bytes", limit),
        )
            .into_response(),
        Outcome::Error,
    )
}
