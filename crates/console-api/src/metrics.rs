//! Prometheus metrics for the Unity console backend
//!
//! Exposed metrics:
//! - `console_http_requests_total` - Counter for HTTP requests
//! - `console_http_request_duration_seconds` - Histogram for request latencies
//! - `console_stats_cache_lookups_total` - Snapshot cache hits and misses
//! - `console_collector_failures_total` - Collector failures degraded to zero
//! - `console_fanout_in_flight` - Vendor calls currently holding a fan-out permit
//! - `console_saga_steps_total` - Import saga step outcomes
//! - `console_chat_commands_total` - Parsed chat commands by action

use axum::{
    extract::{MatchedPath, Request},
    http::StatusCode,
    middleware::Next,
    response::IntoResponse,
};
use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_histogram_vec, register_int_gauge, CounterVec, Encoder,
    HistogramVec, IntGauge, TextEncoder,
};
use std::time::Instant;

lazy_static! {
    pub static ref HTTP_REQUESTS_TOTAL: CounterVec = register_counter_vec!(
        "console_http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .unwrap();

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "console_http_request_duration_seconds",
        "HTTP request latency in seconds",
        &["method", "path"],
        vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
    )
    .unwrap();

    pub static ref STATS_CACHE_LOOKUPS_TOTAL: CounterVec = register_counter_vec!(
        "console_stats_cache_lookups_total",
        "Workspace snapshot cache lookups by time filter and result",
        &["time_filter", "result"]
    )
    .unwrap();

    pub static ref COLLECTOR_FAILURES_TOTAL: CounterVec = register_counter_vec!(
        "console_collector_failures_total",
        "Statistics collectors that failed and were reported as zero",
        &["collector"]
    )
    .unwrap();

    pub static ref FANOUT_IN_FLIGHT: IntGauge = register_int_gauge!(
        "console_fanout_in_flight",
        "Vendor calls currently holding a fan-out permit"
    )
    .unwrap();

    pub static ref SAGA_STEPS_TOTAL: CounterVec = register_counter_vec!(
        "console_saga_steps_total",
        "Import saga steps by name and outcome",
        &["step", "outcome"]
    )
    .unwrap();

    pub static ref CHAT_COMMANDS_TOTAL: CounterVec = register_counter_vec!(
        "console_chat_commands_total",
        "Chat commands by parsed action",
        &["action"]
    )
    .unwrap();
}

/// Axum middleware to track HTTP request metrics
pub async fn track_metrics(req: Request, next: Next) -> impl IntoResponse {
    let start = Instant::now();
    let method = req.method().to_string();
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(req).await;
    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    HTTP_REQUESTS_TOTAL
        .with_label_values(&[&method, &path, &status])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[&method, &path])
        .observe(duration);

    response
}

/// Handler for the `/metrics` endpoint
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = vec![];

    match encoder.encode(&metric_families, &mut buffer) {
        Ok(_) => (
            StatusCode::OK,
            [("content-type", encoder.format_type().to_string())],
            buffer,
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to encode metrics: {}", e),
        )
            .into_response(),
    }
}

pub fn record_cache_lookup(time_filter: &str, hit: bool) {
    STATS_CACHE_LOOKUPS_TOTAL
        .with_label_values(&[time_filter, if hit { "hit" } else { "miss" }])
        .inc();
}

pub fn record_collector_failure(collector: &str) {
    COLLECTOR_FAILURES_TOTAL.with_label_values(&[collector]).inc();
}

pub fn record_saga_step(step: &str, outcome: &str) {
    SAGA_STEPS_TOTAL.with_label_values(&[step, outcome]).inc();
}

pub fn record_chat_command(action: &str) {
    CHAT_COMMANDS_TOTAL.with_label_values(&[action]).inc();
}
