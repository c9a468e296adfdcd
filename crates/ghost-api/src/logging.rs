//! Structured saga logging.
//!
//! Every paid request gets a `SagaLogger` so the charge, each provider call
//! and any compensation share the same request id in the log stream.

use tracing::{error, info, warn, Span};

/// Logger scoped to one orchestration run.
#[derive(Debug, Clone)]
pub struct SagaLogger {
    request_id: String,
    operation: &'static str,
    wallet: Option<String>,
}

impl SagaLogger {
    /// Create a logger for one run.
    ///
    /// # Arguments
    /// * `operation` - The saga being run (e.g. "search", "regenerate")
    /// * `wallet` - Wallet being charged, if any
    /// * `request_id` - Id of the HTTP request; a fresh one is generated when absent
    pub fn new(operation: &'static str, wallet: Option<&str>, request_id: Option<&str>) -> Self {
        Self {
            request_id: request_id
                .map(str::to_string)
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            operation,
            wallet: wallet.map(str::to_string),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            request_id = %self.request_id,
            operation = self.operation,
            wallet = self.wallet.as_deref(),
            "Saga started: {}", message
        );
    }

    /// Log a completed step.
    pub fn log_step(&self, stage: &str, message: &str) {
        info!(
            request_id = %self.request_id,
            operation = self.operation,
            wallet = self.wallet.as_deref(),
            stage,
            "Saga step: {}", message
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            request_id = %self.request_id,
            operation = self.operation,
            wallet = self.wallet.as_deref(),
            "Saga warning: {}", message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            request_id = %self.request_id,
            operation = self.operation,
            wallet = self.wallet.as_deref(),
            "Saga error: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            request_id = %self.request_id,
            operation = self.operation,
            wallet = self.wallet.as_deref(),
            "Saga completed: {}", message
        );
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }

    /// Span covering the whole run; provider and store spans nest under it.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "saga",
            request_id = %self.request_id,
            operation = self.operation,
            wallet = self.wallet.as_deref()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_saga_logger_creation() {
        let logger = SagaLogger::new("search", Some("0xTESTWALLET"), None);
        assert_eq!(logger.operation(), "search");
        assert_eq!(logger.request_id().len(), 36);
    }

    #[test]
    fn test_request_ids_are_unique() {
        let a = SagaLogger::new("regenerate", None, None);
        let b = SagaLogger::new("regenerate", None, None);
        assert_ne!(a.request_id(), b.request_id());
    }

    #[test]
    fn test_uses_http_request_id() {
        let logger = SagaLogger::new("search", None, Some("abc-123"));
        assert_eq!(logger.request_id(), "abc-123");
    }
}
