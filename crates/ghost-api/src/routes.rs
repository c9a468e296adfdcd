//! API routes.

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;

use crate::handlers::search::{regenerate, search};
use crate::handlers::wallet::{buy_credits, deduct, get_badges, get_credits, get_history, get_reputation, record_search};
use crate::handlers::{health, root};
use crate::metrics::metrics_middleware;
use crate::middleware::{request_id, request_logging};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let search_routes = Router::new()
        .route("/search", post(search))
        .route("/search/regenerate", post(regenerate));

    let wallet_routes = Router::new()
        .route("/credits/:wallet", get(get_credits))
        .route("/history/:wallet", get(get_history))
        .route("/badges/:wallet", get(get_badges))
        .route("/reputation/:wallet", get(get_reputation))
        .route("/deduct", post(deduct))
        .route("/buy-credits", post(buy_credits))
        .route("/record", post(record_search));

    let api_routes = Router::new().merge(search_routes).merge(wallet_routes);

    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    Router::new()
        .nest("/api", api_routes)
        .route("/", get(root))
        .route("/health", get(health))
        .merge(metrics_routes)
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(request_logging))
        .layer(middleware::from_fn(request_id))
        .with_state(state)
}
