use axum::{extract::State, Json};
use serde_json::{json, Value};
use std::sync::Arc;
use crate::api::AppState;
use crate::error::AppResult;

pub async fn get_stats(State(state): State<Arc<AppState>>) -> AppResult<Json<Value>> {
    let stats = state.admin.stats().await?;

    Ok(Json(json!({
        "whitelist_count": stats.whitelist_count,
        "blacklist_count": stats.blacklist_count,
        "total_active": stats.total_active,
        "total_inactive": stats.total_inactive,
    })))
}
