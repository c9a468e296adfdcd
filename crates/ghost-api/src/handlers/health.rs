//! Liveness and banner handlers.

use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// Wallet/record backend in use (`firestore` or `memory`).
    pub store: &'static str,
    pub timestamp: DateTime<Utc>,
}

/// Liveness check. Does not touch the store.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        store: state.config.store_backend.as_str(),
        timestamp: Utc::now(),
    })
}

pub async fn root() -> &'static str {
    "Ghost Backend API Running"
}
