//! Prometheus metrics for the API server.

use std::sync::LazyLock;
use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use regex::Regex;

/// Initialize the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "ghost_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "ghost_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "ghost_http_requests_in_flight";

    // Saga metrics
    pub const CREDITS_CHARGED_TOTAL: &str = "ghost_credits_charged_total";
    pub const CREDITS_REFUNDED_TOTAL: &str = "ghost_credits_refunded_total";
    pub const REFUND_FAILURES_TOTAL: &str = "ghost_refund_failures_total";
    pub const SAGAS_COMPLETED_TOTAL: &str = "ghost_sagas_completed_total";

    // Provider metrics
    pub const ENRICHMENT_DURATION_SECONDS: &str = "ghost_enrichment_duration_seconds";
    pub const ENRICHMENT_POLLS_TOTAL: &str = "ghost_enrichment_polls_total";
    pub const OPENER_ATTEMPTS_TOTAL: &str = "ghost_opener_attempts_total";
    pub const OPENER_FALLBACKS_TOTAL: &str = "ghost_opener_fallbacks_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

pub fn record_credit_charged(operation: &'static str) {
    counter!(names::CREDITS_CHARGED_TOTAL, "operation" => operation).increment(1);
}

pub fn record_credit_refunded(operation: &'static str) {
    counter!(names::CREDITS_REFUNDED_TOTAL, "operation" => operation).increment(1);
}

pub fn record_refund_failure(operation: &'static str) {
    counter!(names::REFUND_FAILURES_TOTAL, "operation" => operation).increment(1);
}

/// Record a finished saga; `outcome` is "ok" or an error kind.
pub fn record_saga_completed(operation: &'static str, outcome: &'static str) {
    counter!(names::SAGAS_COMPLETED_TOTAL, "operation" => operation, "outcome" => outcome).increment(1);
}

pub fn record_enrichment(outcome: &'static str, polls: u32, duration_secs: f64) {
    counter!(names::ENRICHMENT_POLLS_TOTAL, "outcome" => outcome).increment(u64::from(polls));
    histogram!(names::ENRICHMENT_DURATION_SECONDS, "outcome" => outcome).record(duration_secs);
}

pub fn record_opener_attempt() {
    counter!(names::OPENER_ATTEMPTS_TOTAL).increment(1);
}

pub fn record_opener_fallback(reason: &'static str) {
    counter!(names::OPENER_FALLBACKS_TOTAL, "reason" => reason).increment(1);
}

static WALLET_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/0x[0-9A-Za-z]+(/|$)").unwrap());

/// Collapse wallet addresses so path labels stay low-cardinality.
fn sanitize_path(path: &str) -> String {
    WALLET_SEGMENT.replace_all(path, "/:wallet$1").into_owned()
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    record_http_request(&method, &path, status, start.elapsed().as_secs_f64());

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_path() {
        assert_eq!(
            sanitize_path("/api/credits/0x52908400098527886E0F7030069857D2E4169EE7"),
            "/api/credits/:wallet"
        );
        assert_eq!(sanitize_path("/api/history/0xTESTWALLET"), "/api/history/:wallet");
        assert_eq!(sanitize_path("/api/search"), "/api/search");
    }
}
