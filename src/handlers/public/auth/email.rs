// handlers/public/auth/email.rs - Identity-provider action emails
//
// POST /resend-verification-email - VERIFY_EMAIL link for an unverified account,
//                                    a warning envelope for a verified one
// POST /password-reset            - UPDATE_PASSWORD link

use axum::{extract::rejection::JsonRejection, extract::State, Extension, Json};
use serde::Deserialize;

use super::utils::{json_body, Fields};
use crate::app::AppState;
use crate::deadline::Deadline;
use crate::error::DomainError;
use crate::messages::codes;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::VerificationEmail;

#[derive(Default, Deserialize)]
#[serde(default)]
pub struct EmailRequest {
    pub email: Option<String>,
}

fn email_field(payload: Result<Json<EmailRequest>, JsonRejection>) -> Result<String, DomainError> {
    let request = json_body(payload)?;
    let mut fields = Fields::default();
    let email = fields.email("email", request.email);
    fields.finish()?;
    Ok(email)
}

pub async fn resend_verification_post(
    State(state): State<AppState>,
    Extension(deadline): Extension<Deadline>,
    payload: Result<Json<EmailRequest>, JsonRejection>,
) -> ApiResult {
    let email = email_field(payload)?;
    match state.auth.resend_verification_email(deadline, &email).await? {
        VerificationEmail::Sent => Ok(ApiResponse::success(codes::KC_VERIF_EMAIL_SENT)),
        VerificationEmail::AlreadyVerified => Ok(ApiResponse::warning(codes::KC_EMAIL_ALREADY_VERIFIED, vec![email])),
    }
}

pub async fn password_reset_post(
    State(state): State<AppState>,
    Extension(deadline): Extension<Deadline>,
    payload: Result<Json<EmailRequest>, JsonRejection>,
) -> ApiResult {
    let email = email_field(payload)?;
    state.auth.send_password_reset(deadline, &email).await?;
    Ok(ApiResponse::success(codes::KC_PWD_RESET_SENT))
}
