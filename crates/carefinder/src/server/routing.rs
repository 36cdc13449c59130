//! Axum router configuration for all endpoints

use axum::{
  middleware,
  routing::{get, post},
  Router,
};

use crate::server::handlers::{analysis, chat, experiments, facilities, logs, plans, query, status};
use crate::server::middleware::request_context_middleware;
use crate::server::state::SharedState;

/// Create the application router over the shared state
pub fn create_router(state: SharedState) -> Router {
  Router::new()
    // Status and version endpoints
    .route("/status", get(status::status))
    .route("/version", get(status::version))
    .route("/api", get(status::api_info))
    .route("/logs", get(logs::get_logs))
    // Facility endpoints
    .route("/facilities", get(facilities::list_facilities))
    .route("/facilities/{id}", get(facilities::get_facility))
    // Analysis endpoints
    .route("/analysis/deserts", get(analysis::deserts))
    .route("/analysis/stats", get(analysis::stats))
    // Chat endpoints
    .route("/chat", post(chat::chat))
    .route("/chat/history/{session_id}", get(chat::history))
    .route("/experiments/runs", get(experiments::list_runs))
    // Query and planning endpoints
    .route("/query", post(query::run_query))
    .route("/plans", get(plans::list_plans).post(plans::create_plan))
    .route("/plans/{id}", get(plans::get_plan))
    .layer(middleware::from_fn_with_state(state.clone(), request_context_middleware))
    .with_state(state)
}
