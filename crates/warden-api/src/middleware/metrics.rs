//! Request metrics middleware
//!
//! Counts requests and records per-request latency on the `metrics` tracing
//! target. Paths are normalized so per-account routes aggregate under one
//! endpoint label.

use crate::state::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use std::time::Instant;

/// Metrics tracking middleware
pub async fn metrics_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let endpoint = normalize_endpoint(request.uri().path());

    state.increment_requests();

    let response = next.run(request).await;

    let latency_us = start.elapsed().as_micros() as u64;
    tracing::debug!(
        target: "metrics",
        %method,
        endpoint,
        status = response.status().as_u16(),
        latency_us,
        "request completed"
    );

    response
}

/// Replace id segments with a placeholder so `/users/7` and `/users/12`
/// count as the same endpoint. The `me` sentinel is left as-is.
fn normalize_endpoint(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if is_numeric(segment) {
                ":id"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn is_numeric(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}
