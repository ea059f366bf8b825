//! Reverse proxy to upstream services.
//!
//! Requests are buffered (bounded by [`MAX_BODY_BYTES`]) and forwarded with
//! reqwest. Hop-by-hop headers are dropped in both directions.

use crate::config::RouteConfig;
use crate::errors::GatewayError;
use crate::observability::metrics::{
    categorize_status_code, record_error, record_upstream_request,
};
use crate::public_paths::matches_prefix;
use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderMap, HeaderName},
    response::Response,
};
use common::types::{USER_ID_HEADER, USER_ROLE_HEADER};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::instrument;

/// Largest request body forwarded upstream (2 MiB).
pub const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Upstream request timeout. Matches the router's own request timeout.
pub const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);

const HOP_BY_HOP_HEADERS: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Headers the gateway writes itself; a caller's `Connection` list cannot
/// remove them.
fn is_gateway_owned(name: &HeaderName) -> bool {
    name.as_str() == USER_ID_HEADER || name.as_str() == USER_ROLE_HEADER
}

/// Remove hop-by-hop headers, including any named by `Connection` other than
/// the gateway's identity headers.
fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .filter(|name| !is_gateway_owned(name))
        .collect();

    for name in &listed {
        headers.remove(name);
    }
    for name in HOP_BY_HOP_HEADERS {
        headers.remove(name);
    }
}

/// Prefix routes, longest prefix first.
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<RouteConfig>,
}

impl RouteTable {
    pub fn new(mut routes: Vec<RouteConfig>) -> Self {
        routes.sort_by(|a, b| b.prefix.len().cmp(&a.prefix.len()));
        Self { routes }
    }

    /// The most specific route for `path`, if any.
    pub fn resolve(&self, path: &str) -> Option<&RouteConfig> {
        self.routes
            .iter()
            .find(|route| matches_prefix(&route.prefix, path))
    }
}

pub struct ProxyState {
    pub routes: RouteTable,
    pub client: reqwest::Client,
}

impl ProxyState {
    pub fn new(routes: RouteTable) -> Self {
        let client = reqwest::Client::builder()
            .timeout(UPSTREAM_TIMEOUT)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(target: "gateway.proxy", error = %e, "Failed to build HTTP client with custom config, using defaults");
                reqwest::Client::new()
            });

        Self { routes, client }
    }
}

/// Forward a request to the upstream owning its path.
///
/// Runs behind the authentication middleware, so identity headers on the
/// request are gateway-issued.
#[instrument(skip_all, name = "gateway.proxy", fields(route, status))]
pub async fn forward(
    State(state): State<Arc<ProxyState>>,
    req: Request,
) -> Result<Response, GatewayError> {
    send_upstream(&state, req).await.inspect_err(|e| {
        record_error("proxy", e.status_code());
    })
}

async fn send_upstream(state: &ProxyState, req: Request) -> Result<Response, GatewayError> {
    let path = req.uri().path().to_string();
    let Some(route) = state.routes.resolve(&path) else {
        tracing::debug!(target: "gateway.proxy", "No route for path");
        return Err(GatewayError::RouteNotFound);
    };
    tracing::Span::current().record("route", route.prefix.as_str());

    let path_and_query = req
        .uri()
        .path_and_query()
        .map_or(path.as_str(), |pq| pq.as_str());
    let url = format!("{}{}", route.upstream, path_and_query);

    let (parts, body) = req.into_parts();
    let body = axum::body::to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|_| GatewayError::PayloadTooLarge)?;

    let mut headers = parts.headers;
    strip_hop_by_hop(&mut headers);
    headers.remove(header::HOST);
    headers.remove(header::CONTENT_LENGTH);

    let start = Instant::now();
    let upstream_response = state
        .client
        .request(parts.method, url)
        .headers(headers)
        .body(body)
        .send()
        .await;

    let upstream_response = match upstream_response {
        Ok(response) => response,
        Err(e) => {
            record_upstream_request(&route.prefix, "upstream_error", start.elapsed());
            return Err(GatewayError::UpstreamUnavailable(e.to_string()));
        }
    };

    let status = upstream_response.status();
    let mut response_headers = upstream_response.headers().clone();
    let response_body = match upstream_response.bytes().await {
        Ok(bytes) => bytes,
        Err(e) => {
            record_upstream_request(&route.prefix, "upstream_error", start.elapsed());
            return Err(GatewayError::UpstreamUnavailable(e.to_string()));
        }
    };

    record_upstream_request(
        &route.prefix,
        categorize_status_code(status.as_u16()),
        start.elapsed(),
    );
    tracing::Span::current().record("status", status.as_u16());

    strip_hop_by_hop(&mut response_headers);
    response_headers.remove(header::CONTENT_LENGTH);

    let mut response = Response::new(Body::from(response_body));
    *response.status_mut() = status;
    *response.headers_mut() = response_headers;
    Ok(response)
}
