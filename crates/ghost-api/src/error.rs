//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Insufficient credits")]
    InsufficientCredits,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Enrichment provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Enrichment provider is out of credits")]
    ProviderInsufficientCredits,

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Server error: {0}")]
    Internal(String),

    #[error("Firestore error: {0}")]
    Firestore(#[from] ghost_firestore::FirestoreError),
}

impl ApiError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn provider_unavailable(msg: impl Into<String>) -> Self {
        Self::ProviderUnavailable(msg.into())
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Short label used in logs and the saga outcome metric.
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::InsufficientCredits => "insufficient_credits",
            ApiError::NotFound(_) => "not_found",
            ApiError::BadRequest(_) => "bad_request",
            ApiError::ProviderUnavailable(_) => "provider_unavailable",
            ApiError::ProviderInsufficientCredits => "provider_insufficient_credits",
            ApiError::Timeout(_) => "timeout",
            ApiError::Internal(_) | ApiError::Firestore(_) => "server_error",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InsufficientCredits => StatusCode::PAYMENT_REQUIRED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::ProviderUnavailable(_) | ApiError::ProviderInsufficientCredits => StatusCode::BAD_GATEWAY,
            ApiError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Internal(_) | ApiError::Firestore(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing message and optional diagnostic detail.
    fn body_parts(&self) -> (String, Option<String>) {
        match self {
            ApiError::InsufficientCredits | ApiError::ProviderInsufficientCredits => (self.to_string(), None),
            ApiError::NotFound(msg) | ApiError::BadRequest(msg) => (msg.clone(), None),
            ApiError::ProviderUnavailable(detail) => {
                ("Enrichment provider unavailable".to_string(), Some(detail.clone()))
            }
            ApiError::Timeout(detail) => ("Enrichment timed out".to_string(), Some(detail.clone())),
            ApiError::Internal(detail) => ("Server error".to_string(), Some(detail.clone())),
            ApiError::Firestore(e) => ("Server error".to_string(), Some(e.to_string())),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let (error, details) = self.body_parts();

        // Don't expose internal error details in production
        let details = if std::env::var("ENVIRONMENT")
            .map(|e| e.eq_ignore_ascii_case("production"))
            .unwrap_or(false)
        {
            None
        } else {
            details
        };

        (status, Json(ErrorResponse { error, details })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;
    use serial_test::serial;

    use super::*;

    async fn body_json(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), 4096).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiError::InsufficientCredits.status_code(), StatusCode::PAYMENT_REQUIRED);
        assert_eq!(ApiError::not_found("x").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::provider_unavailable("x").status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(ApiError::ProviderInsufficientCredits.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(ApiError::timeout("x").status_code(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(ApiError::internal("x").status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(ApiError::bad_request("x").status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    #[serial]
    async fn test_insufficient_credits_body() {
        std::env::remove_var("ENVIRONMENT");
        let (status, body) = body_json(ApiError::InsufficientCredits).await;
        assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
        assert_eq!(body["error"], "Insufficient credits");
        assert!(body.get("details").is_none());
    }

    #[tokio::test]
    #[serial]
    async fn test_server_error_details_hidden_in_production() {
        std::env::remove_var("ENVIRONMENT");
        let (_, body) = body_json(ApiError::internal("record write failed")).await;
        assert_eq!(body["error"], "Server error");
        assert_eq!(body["details"], "record write failed");

        std::env::set_var("ENVIRONMENT", "production");
        let (_, body) = body_json(ApiError::internal("record write failed")).await;
        assert!(body.get("details").is_none());
        std::env::remove_var("ENVIRONMENT");
    }
}
