use axum::{extract::State, Json};
use serde_json::{json, Value};
use std::sync::Arc;
use crate::api::AppState;

/// Liveness plus a check of the rule store. Always 200: a failing store
/// only means the guard is running on its fallback rules.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<Value> {
    let store = match state.admin.store().count_all().await {
        Ok(_) => "ok",
        Err(e) => {
            tracing::warn!("Health check: rule store unavailable: {}", e);
            "unavailable"
        }
    };

    Json(json!({
        "status": "ok",
        "store": store,
        "guard_enabled": state.guard.settings.enabled,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
