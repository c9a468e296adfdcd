//! Axum HTTP API server.
//!
//! This crate provides:
//! - The credit ledger and the paid search/regenerate saga
//! - FullEnrich polling and Gemini opener generation with local stubs
//! - Wallet, search and health routes
//! - Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod security;
pub mod services;
pub mod state;

pub use config::{ApiConfig, StoreBackend};
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use services::{EnrichmentOrchestrator, EnrichmentPoller, OpenerGenerator, WalletLedger};
pub use state::AppState;
