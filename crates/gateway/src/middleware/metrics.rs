//! Per-request Prometheus counters and latency histograms

use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use inspireqa_common::metrics::RequestMetrics;

/// Record method, route template and status for every API request
pub async fn track_metrics(request: Request, next: Next) -> Response {
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_owned())
        .unwrap_or_else(|| request.uri().path().to_owned());

    let metrics = RequestMetrics::start(request.method().as_str(), &endpoint);
    let response = next.run(request).await;
    metrics.finish(response.status().as_u16());

    response
}
