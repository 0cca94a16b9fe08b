//! HTTP route handlers.

use axum::{extract::State, response::IntoResponse, routing::get, Router};
use serde_json::json;

use crate::api::response::api_success;
use crate::api::AppState;
use crate::protocol_constants::SERVICE_ID;

// ─────────────────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────────────────

/// Creates the Axum router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/state", get(get_current_state))
        .with_state(state)
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

async fn health_check() -> impl IntoResponse {
    api_success(json!({
        "status": "ok",
        "service": SERVICE_ID,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Controller state merged with the cache snapshot.
async fn get_current_state(State(state): State<AppState>) -> impl IntoResponse {
    let controller = state.controller_state.snapshot();
    let cache = state.cache.snapshot();
    api_success(json!({
        "connection": controller.connection,
        "activeScene": cache.active_scene,
        "lastDecision": controller.last_decision,
        "decidedAt": controller.decided_at,
        "scenes": cache.scenes,
        "inputs": cache.inputs,
    }))
}
