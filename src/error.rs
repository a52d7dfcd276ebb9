// Domain error taxonomy and its mapping onto message codes
use thiserror::Error;

use crate::database::StoreError;
use crate::idp::IdpError;
use crate::messages::codes;

/// Every failure a request can report. The set is closed: `message_code`
/// is total over it and the response envelope never sees anything else.
#[derive(Debug, Error)]
pub enum DomainError {
    // Input
    #[error("malformed JSON body: {0}")]
    InvalidJson(String),

    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("invalid field: {0}")]
    InvalidField(String),

    #[error("invalid fields: {}", .0.join(", "))]
    InvalidFields(Vec<String>),

    #[error("invalid date in field: {0}")]
    InvalidDate(String),

    #[error("start_date is after end_date")]
    StartDateAfterEndDate,

    #[error("invalid identifier: {0}")]
    InvalidId(String),

    // Identity
    #[error("employee already registered")]
    DuplicateUser,

    #[error("identity provider already has this user")]
    DuplicateRemoteUser,

    #[error("employee not found")]
    UserNotFound,

    #[error("no employee with this email")]
    EmailNotFound,

    #[error("identity provider user not found")]
    RemoteUserNotFound,

    #[error("role not found: {0}")]
    RoleNotFound(String),

    #[error("authentication failed")]
    AuthFailed,

    #[error("email not verified")]
    EmailNotVerified,

    #[error("token expired")]
    TokenExpired,

    #[error("token already used")]
    TokenUsed,

    #[error("token invalid")]
    TokenInvalid,

    #[error("forbidden")]
    Forbidden,

    // Dependencies
    #[error("identity provider unavailable")]
    IdpUnavailable,

    #[error("database unavailable")]
    DatabaseUnavailable,

    #[error("remote operation failed: {0}")]
    RemoteOperationFailed(String),

    #[error("employee cannot be saved")]
    UserCannotSave,

    // Registration
    #[error("an earlier registration for this email did not complete")]
    IncompleteRegistration,

    #[error("request deadline exceeded")]
    Canceled,

    // Routing
    #[error("no route for {0}")]
    RouteNotFound(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn message_code(&self) -> &'static str {
        match self {
            DomainError::InvalidJson(_) => codes::VAL_JSON_INVALID,
            DomainError::MissingField(_) => codes::VAL_FIELD_REQUIRED,
            DomainError::InvalidField(_) => codes::VAL_FIELD_FORMAT,
            DomainError::InvalidFields(_) => codes::VAL_MULTIPLE,
            DomainError::InvalidDate(_) => codes::VAL_DATE_FORMAT,
            DomainError::StartDateAfterEndDate => codes::VAL_START_AFTER_END,
            DomainError::InvalidId(_) => codes::VAL_ID_INVALID,
            DomainError::DuplicateUser | DomainError::DuplicateRemoteUser => codes::USER_DUPLICATE,
            DomainError::UserNotFound => codes::USER_NOT_FOUND,
            DomainError::EmailNotFound => codes::USER_EMAIL_NOT_FOUND,
            DomainError::RemoteUserNotFound => codes::KC_USER_NOT_FOUND,
            DomainError::RoleNotFound(_) => codes::ROLE_NOT_FOUND,
            DomainError::AuthFailed => codes::GEN_UNAUTHORIZED,
            DomainError::EmailNotVerified => codes::USER_EMAIL_NOT_VERIFIED,
            DomainError::TokenExpired => codes::USER_TOKEN_EXPIRED,
            DomainError::TokenUsed => codes::USER_TOKEN_USED,
            DomainError::TokenInvalid => codes::KC_INVALID_TOKEN,
            DomainError::Forbidden => codes::GEN_FORBIDDEN,
            DomainError::IdpUnavailable => codes::INFRA_IDP_UNAVAILABLE,
            DomainError::DatabaseUnavailable => codes::INFRA_DB_UNAVAILABLE,
            DomainError::RemoteOperationFailed(_) => codes::INFRA_DEPENDENCY_FAILED,
            DomainError::UserCannotSave => codes::USER_CANNOT_SAVE,
            DomainError::IncompleteRegistration => codes::INFRA_INCOMPLETE_REGISTRATION,
            DomainError::Canceled => codes::GEN_TIMEOUT,
            DomainError::RouteNotFound(_) => codes::ROUTE_NOT_FOUND,
            DomainError::Internal(_) => codes::GEN_SERVER_ERROR,
        }
    }

    /// Parameters substituted into the message template.
    pub fn params(&self) -> Vec<String> {
        match self {
            DomainError::MissingField(field)
            | DomainError::InvalidField(field)
            | DomainError::InvalidDate(field)
            | DomainError::InvalidId(field)
            | DomainError::RoleNotFound(field)
            | DomainError::RouteNotFound(field) => vec![field.clone()],
            DomainError::InvalidFields(fields) => vec![fields.join(", ")],
            _ => Vec::new(),
        }
    }

    /// Collapse a list of offending fields into the single- or multi-field variant.
    pub fn from_fields(mut fields: Vec<String>, missing: bool) -> Option<Self> {
        match fields.len() {
            0 => None,
            1 => {
                let field = fields.remove(0);
                Some(if missing {
                    DomainError::MissingField(field)
                } else {
                    DomainError::InvalidField(field)
                })
            }
            _ => Some(DomainError::InvalidFields(fields)),
        }
    }
}

impl From<IdpError> for DomainError {
    fn from(err: IdpError) -> Self {
        match err {
            IdpError::Unavailable(reason) => {
                tracing::error!("Identity provider unavailable: {}", reason);
                DomainError::IdpUnavailable
            }
            IdpError::AuthFailed => DomainError::AuthFailed,
            IdpError::DuplicateUser => DomainError::DuplicateRemoteUser,
            IdpError::NotFound => DomainError::RemoteUserNotFound,
            IdpError::RoleNotFound(role) => DomainError::RoleNotFound(role),
            IdpError::InvalidToken => DomainError::TokenInvalid,
            IdpError::TokenExpired => DomainError::TokenExpired,
            IdpError::Timeout => DomainError::Canceled,
            IdpError::Rejected { operation, status } => {
                tracing::error!("Identity provider rejected {} with {}", operation, status);
                DomainError::RemoteOperationFailed(operation.to_string())
            }
            IdpError::InvalidResponse(detail) => {
                tracing::error!("Identity provider response invalid: {}", detail);
                DomainError::RemoteOperationFailed(detail)
            }
            IdpError::Transport(e) => {
                tracing::error!("Identity provider transport error: {}", e);
                DomainError::RemoteOperationFailed(e.to_string())
            }
        }
    }
}

impl From<StoreError> for DomainError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateUser => DomainError::DuplicateUser,
            StoreError::CannotSave(detail) | StoreError::CannotUpdate(detail) => {
                tracing::error!("Employee write failed: {}", detail);
                DomainError::UserCannotSave
            }
            StoreError::NotFound => DomainError::UserNotFound,
            StoreError::Unavailable(reason) => {
                tracing::error!("Database unavailable: {}", reason);
                DomainError::DatabaseUnavailable
            }
            StoreError::Timeout => DomainError::Canceled,
            StoreError::TxFinished => DomainError::Internal("transaction already finished".into()),
            StoreError::Query(e) => {
                // Don't expose SQL errors to clients
                tracing::error!("Database query error: {}", e);
                DomainError::Internal("database error".into())
            }
        }
    }
}
