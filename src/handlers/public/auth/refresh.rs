// handlers/public/auth/refresh.rs - POST /refresh-token handler

use axum::{extract::rejection::JsonRejection, extract::State, Extension, Json};
use serde::Deserialize;

use super::utils::{json_body, Fields};
use crate::app::AppState;
use crate::deadline::Deadline;
use crate::messages::codes;
use crate::middleware::{ApiResponse, ApiResult};

#[derive(Default, Deserialize)]
#[serde(default)]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

/// POST /refresh-token - Trade a refresh token for a new token pair.
pub async fn refresh_post(
    State(state): State<AppState>,
    Extension(deadline): Extension<Deadline>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> ApiResult {
    let request = json_body(payload)?;
    let mut fields = Fields::default();
    let refresh_token = fields.secret("refresh_token", request.refresh_token);
    fields.finish()?;

    let token = state.auth.refresh(deadline, &refresh_token).await?;
    ApiResponse::success_with_data(codes::GEN_OPERATION_OK, token)
}
