pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::generation::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Module registry
        .route("/api/v1/modules", get(handlers::handle_list_modules))
        // Worksheet API
        .route(
            "/api/v1/worksheets/generate",
            post(handlers::handle_generate),
        )
        .route(
            "/api/v1/worksheets/preview",
            post(handlers::handle_preview),
        )
        .route("/api/v1/worksheets/current", get(handlers::handle_current))
        .route("/api/v1/worksheets/reset", post(handlers::handle_reset))
        // Layout API
        .route("/api/v1/layout/estimate", post(handlers::handle_estimate))
        // Presets
        .route("/api/v1/presets", get(handlers::handle_list_presets))
        .route(
            "/api/v1/presets/:name",
            get(handlers::handle_get_preset)
                .put(handlers::handle_put_preset)
                .delete(handlers::handle_delete_preset),
        )
        .with_state(state)
}
