//! HTTP metrics middleware for capturing all request/response metrics
//!
//! Applied as the outermost layer so it also sees responses produced before
//! any handler runs (401, 404, 503 from the edge).

use crate::observability::metrics::record_http_request;
use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

pub async fn http_metrics_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();

    let response = next.run(request).await;

    record_http_request(&method, response.status().as_u16(), start.elapsed());

    response
}
