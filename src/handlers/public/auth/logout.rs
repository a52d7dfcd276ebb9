// handlers/public/auth/logout.rs - POST /logout handler

use axum::{extract::rejection::JsonRejection, extract::State, Extension, Json};

use super::refresh::RefreshRequest;
use super::utils::{json_body, Fields};
use crate::app::AppState;
use crate::deadline::Deadline;
use crate::messages::codes;
use crate::middleware::{ApiResponse, ApiResult};

/// POST /logout - End the identity-provider session behind a refresh token.
pub async fn logout_post(
    State(state): State<AppState>,
    Extension(deadline): Extension<Deadline>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> ApiResult {
    let request = json_body(payload)?;
    let mut fields = Fields::default();
    let refresh_token = fields.secret("refresh_token", request.refresh_token);
    fields.finish()?;

    state.auth.logout(deadline, &refresh_token).await?;
    Ok(ApiResponse::success(codes::GEN_OPERATION_OK))
}
