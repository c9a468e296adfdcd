//! Store metrics, exported through whatever recorder the binary installs.

use std::time::Duration;

use metrics::{counter, histogram};

pub mod names {
    pub const STORE_REQUESTS: &str = "ghost_store_requests_total";
    pub const STORE_LATENCY: &str = "ghost_store_request_duration_seconds";
    pub const STORE_RETRIES: &str = "ghost_store_retries_total";
    /// Precondition conflicts on read-modify-write updates.
    pub const STORE_CONFLICTS: &str = "ghost_store_write_conflicts_total";
}

/// Status class label: `ok`, `4xx` or `5xx`.
fn status_class(status: u16) -> &'static str {
    match status {
        200..=299 => "ok",
        400..=499 => "4xx",
        _ => "5xx",
    }
}

pub fn record_request(operation: &str, collection: &str, status: u16, elapsed: Duration) {
    let class = status_class(status);
    counter!(
        names::STORE_REQUESTS,
        "operation" => operation.to_string(),
        "collection" => collection.to_string(),
        "status" => class
    )
    .increment(1);
    histogram!(
        names::STORE_LATENCY,
        "operation" => operation.to_string(),
        "collection" => collection.to_string()
    )
    .record(elapsed.as_secs_f64());
}

pub fn record_retry(operation: &str) {
    counter!(names::STORE_RETRIES, "operation" => operation.to_string()).increment(1);
}

/// `final_attempt` marks a conflict that exhausted the retry budget.
pub fn record_contention(collection: &str, final_attempt: bool) {
    counter!(
        names::STORE_CONFLICTS,
        "collection" => collection.to_string(),
        "exhausted" => if final_attempt { "true" } else { "false" }
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_class() {
        assert_eq!(status_class(200), "ok");
        assert_eq!(status_class(409), "4xx");
        assert_eq!(status_class(412), "4xx");
        assert_eq!(status_class(503), "5xx");
    }
}
