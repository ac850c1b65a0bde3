//! Access log middleware.
//!
//! One line per request, `<METHOD> <decoded url> <status> - <ms>ms`, plus
//! request metrics labelled with the handler's [`Outcome`].

use axum::{body::Body, http::Request, middleware::Next, response::Response};
use std::time::Instant;

use crate::http::request::{request_id, RequestTarget};
use crate::observability::metrics::{self, Outcome};

pub async fn access_log(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let url = RequestTarget::from_uri(request.uri()).display_url();
    let request_id = request_id(request.headers()).to_string();

    let response = next.run(request).await;

    let status = response.status();
    let outcome = response
        .extensions()
        .get::<Outcome>()
        .copied()
        .unwrap_or(Outcome::Error);

    tracing::info!(
        request_id = %request_id,
        outcome = outcome.as_str(),
        "{} {} {} - {}ms",
        method,
        url,
        status.as_u16(),
        start.elapsed().as_millis()
    );
    metrics::record_request(method.as_str(), status.as_u16(), outcome, start);

    response
}
