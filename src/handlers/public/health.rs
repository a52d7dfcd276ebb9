// handlers/public/health.rs - GET /health handler

use axum::{extract::State, Extension};
use serde_json::json;

use crate::app::AppState;
use crate::deadline::Deadline;
use crate::middleware::{ApiResponse, ApiResult};

/// GET /health - Database round trip plus the size of the message catalog.
pub async fn health_get(State(state): State<AppState>, Extension(deadline): Extension<Deadline>) -> ApiResult {
    state.database.ping(deadline).await?;
    let messages = state.messages.len().await;
    Ok(ApiResponse::data_only(json!({
        "status": "ok",
        "database": "up",
        "messages": messages,
    })))
}
