// handlers/public/auth/login.rs - POST /login handler

use axum::{extract::rejection::JsonRejection, extract::State, Extension, Json};
use serde::Deserialize;

use super::utils::{json_body, Fields};
use crate::app::AppState;
use crate::deadline::Deadline;
use crate::messages::codes;
use crate::middleware::{ApiResponse, ApiResult};

#[derive(Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/**
 * POST /login - Exchange employee credentials for an identity-provider token pair
 *
 * Inactive employees are refused, as are accounts whose email has not been
 * verified yet.
 *
 * Expected Output:
 * ```json
 * { "success": true, "code": "MOD_KC_LOGIN_SUCCESS_EXI_00001", "message": "...",
 *   "data": { "access_token": "...", "refresh_token": "...", "expires_in": 300,
 *             "refresh_expires_in": 1800, "token_type": "Bearer" } }
 * ```
 */
pub async fn login_post(
    State(state): State<AppState>,
    Extension(deadline): Extension<Deadline>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult {
    let request = json_body(payload)?;
    let mut fields = Fields::default();
    let email = fields.email("email", request.email);
    let password = fields.secret("password", request.password);
    fields.finish()?;

    let token = state.auth.login(deadline, &email, &password).await?;
    ApiResponse::success_with_data(codes::KC_LOGIN_SUCCESS, token)
}
