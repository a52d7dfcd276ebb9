// handlers/public/auth/register.rs - POST /register handler

use axum::{extract::rejection::JsonRejection, extract::State, Extension, Json};
use serde::Deserialize;
use serde_json::json;

use super::utils::{json_body, optional, parse_date, Fields};
use crate::app::AppState;
use crate::deadline::Deadline;
use crate::domain::NewEmployee;
use crate::error::DomainError;
use crate::messages::codes;
use crate::middleware::{ApiResponse, ApiResult};

/// Body of a registration request. Every field is optional at the parsing
/// stage so that validation can name all offending fields together.
#[derive(Default, Deserialize)]
#[serde(default)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub airline: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub identification_number: Option<String>,
    pub bp: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub role: Option<String>,
    pub active: Option<bool>,
}

impl RegisterRequest {
    pub fn validate(self) -> Result<NewEmployee, DomainError> {
        let mut fields = Fields::default();
        let name = fields.required("name", self.name);
        let airline = fields.required("airline", self.airline);
        let email = fields.email("email", self.email);
        let password = fields.secret("password", self.password);
        let role = fields.required("role", self.role);
        fields.finish()?;

        let start_date = parse_date("start_date", self.start_date.as_deref())?;
        let end_date = parse_date("end_date", self.end_date.as_deref())?;
        if let (Some(start), Some(end)) = (start_date, end_date) {
            if start > end {
                return Err(DomainError::StartDateAfterEndDate);
            }
        }

        Ok(NewEmployee {
            name,
            airline,
            email,
            password,
            identification_number: optional(self.identification_number),
            bp: optional(self.bp),
            start_date,
            end_date,
            active: self.active.unwrap_or(true),
            role,
        })
    }
}

/**
 * POST /register - Register an employee locally and in the identity provider
 *
 * Expected Input:
 * ```json
 * {
 *   "name": "Ana Pilot",          // Required
 *   "airline": "airline-id",      // Required
 *   "email": "a@x.com",           // Required, unique
 *   "password": "secret",         // Required
 *   "role": "pilot",              // Required, realm role name
 *   "identification_number": "",  // Optional
 *   "bp": "",                     // Optional
 *   "start_date": "2024-01-01",   // Optional, RFC 3339 or YYYY-MM-DD
 *   "end_date": "2025-01-01"      // Optional, not before start_date
 * }
 * ```
 *
 * Expected Output (201):
 * ```json
 * { "success": true, "code": "MOD_U_OK_REGISTERED", "message": "...",
 *   "data": { "employee": { "id": "...", "remote_user_id": "...", ... } } }
 * ```
 */
pub async fn register_post(
    State(state): State<AppState>,
    Extension(deadline): Extension<Deadline>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult {
    let input = json_body(payload)?.validate()?;
    let employee = state.registration.register(deadline, input).await?;
    ApiResponse::success_with_data(codes::USER_REGISTERED, json!({ "employee": employee }))
}
