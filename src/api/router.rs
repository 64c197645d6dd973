use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::services::ServeDir;
use super::AppState;
use super::handlers;
use crate::guard::protect;

pub fn routes(state: Arc<AppState>) -> Router {
    let guarded = Router::new()
        .route("/api/v1/rules/stats", get(handlers::stats::get_stats))
        .with_state(state.clone())
        .fallback_service(ServeDir::new(&state.static_dir));

    Router::new()
        // Health (public)
        .route("/health", get(handlers::health::health_check))
        .with_state(state.clone())
        // Everything else sits behind the IP guard
        .merge(protect(guarded, state.guard.clone()))
}
