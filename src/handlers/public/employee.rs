// handlers/public/employee.rs - GET /user/email/:email handler

use axum::{
    extract::{Path, State},
    Extension,
};
use serde_json::json;

use super::auth::utils::Fields;
use crate::app::AppState;
use crate::deadline::Deadline;
use crate::middleware::{ApiResponse, ApiResult};

/// GET /user/email/:email - Employee record for an email address.
///
/// The email is lowercased the same way registration stores it. A malformed
/// address is a 400, an unknown one a 404.
pub async fn employee_by_email_get(
    State(state): State<AppState>,
    Extension(deadline): Extension<Deadline>,
    Path(email): Path<String>,
) -> ApiResult {
    let mut fields = Fields::default();
    let email = fields.email("email", Some(email));
    fields.finish()?;

    let employee = state.employees.get_by_email(deadline, &email).await?;
    Ok(ApiResponse::data_only(json!({ "employee": employee })))
}
