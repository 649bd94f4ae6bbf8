//! Metrics and observability utilities
//!
//! Prometheus metrics for HTTP requests, pipeline runs and per-stage
//! collaborator latency.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all InspireQA metrics
pub const METRICS_PREFIX: &str = "inspireqa";

/// Histogram buckets for pipeline stages (in seconds).
/// LLM and rerank calls dominate and run for tens of seconds.
pub const STAGE_BUCKETS: &[f64] = &[
    0.050, // 50ms
    0.100, // 100ms
    0.250, // 250ms
    0.500, // 500ms
    1.000, // 1s
    2.500, // 2.5s
    5.000, // 5s
    10.00, // 10s
    20.00, // 20s - LLM timeout
    40.00, // 40s - rerank timeout
    60.00, // 60s
];

/// Register all metric descriptions
pub fn register_metrics() {
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    describe_counter!(
        format!("{}_pipeline_runs_total", METRICS_PREFIX),
        Unit::Count,
        "Pipeline runs by pipeline and outcome"
    );

    describe_histogram!(
        format!("{}_pipeline_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "End-to-end pipeline latency in seconds"
    );

    describe_histogram!(
        format!("{}_stage_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Latency of a single pipeline stage in seconds"
    );

    describe_counter!(
        format!("{}_citations_total", METRICS_PREFIX),
        Unit::Count,
        "Citations kept after reconciliation"
    );

    describe_counter!(
        format!("{}_persistence_errors_total", METRICS_PREFIX),
        Unit::Count,
        "Query records that failed to persist"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

/// Record the latency of one stage of a pipeline run
pub fn record_stage(pipeline: &'static str, stage: &'static str, duration_secs: f64) {
    histogram!(
        format!("{}_stage_duration_seconds", METRICS_PREFIX),
        "pipeline" => pipeline,
        "stage" => stage
    )
    .record(duration_secs);
}

/// Record a finished pipeline run
pub fn record_pipeline(pipeline: &'static str, duration_secs: f64, success: bool) {
    let outcome = if success { "success" } else { "error" };

    counter!(
        format!("{}_pipeline_runs_total", METRICS_PREFIX),
        "pipeline" => pipeline,
        "outcome" => outcome
    )
    .increment(1);

    if success {
        histogram!(
            format!("{}_pipeline_duration_seconds", METRICS_PREFIX),
            "pipeline" => pipeline
        )
        .record(duration_secs);
    }
}

/// Record how many citations survived reconciliation
pub fn record_citations(pipeline: &'static str, count: usize) {
    counter!(
        format!("{}_citations_total", METRICS_PREFIX),
        "pipeline" => pipeline
    )
    .increment(count as u64);
}

/// Record a query record that could not be stored
pub fn record_persistence_error(endpoint: &'static str) {
    counter!(
        format!("{}_persistence_errors_total", METRICS_PREFIX),
        "endpoint" => endpoint
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_buckets_sorted() {
        let mut prev = 0.0;
        for &bucket in STAGE_BUCKETS {
            assert!(bucket > prev);
            prev = bucket;
        }

        // Collaborator timeouts should land on bucket edges
        assert!(STAGE_BUCKETS.contains(&20.00));
        assert!(STAGE_BUCKETS.contains(&40.00));
    }

    #[test]
    fn test_recorders_without_exporter() {
        let metrics = RequestMetrics::start("POST", "/v1/search");
        metrics.finish(200);
        record_stage("search", "expanding_query", 0.5);
        record_pipeline("rag", 1.2, true);
        record_citations("rag", 3);
        record_persistence_error("search");
    }
}
