use once_cell::sync::Lazy;
use std::collections::HashMap;

use super::codes::*;
use super::MessageType;

/// Authoritative code to HTTP status table. Codes not listed here fall back
/// to their message type.
pub static CODE_STATUS: Lazy<HashMap<&'static str, u16>> = Lazy::new(|| {
    HashMap::from([
        // Users
        (USER_REGISTERED, 201),
        (USER_DUPLICATE, 409),
        (USER_CANNOT_SAVE, 500),
        (USER_NOT_FOUND, 404),
        (USER_EMAIL_NOT_FOUND, 404),
        (USER_TOKEN_NOT_FOUND, 404),
        (USER_EMAIL_NOT_VERIFIED, 403),
        (USER_TOKEN_EXPIRED, 401),
        (USER_TOKEN_USED, 401),
        // Validation
        (VAL_BAD_FORMAT, 400),
        (VAL_INVALID_REQUEST, 400),
        (VAL_FAILED, 400),
        (VAL_FIELD_FORMAT, 400),
        (VAL_FIELD_REQUIRED, 400),
        (VAL_FIELD_TYPE, 400),
        (VAL_MULTIPLE, 400),
        (VAL_JSON_INVALID, 400),
        (VAL_ID_INVALID, 400),
        (VAL_START_AFTER_END, 400),
        (VAL_DATE_FORMAT, 400),
        // Identity provider
        (KC_INVALID_TOKEN, 401),
        (KC_USER_NOT_FOUND, 404),
        (KC_LOGIN_SUCCESS, 200),
        (KC_VERIF_EMAIL_SENT, 200),
        (KC_PWD_RESET_SENT, 200),
        (KC_EMAIL_ALREADY_VERIFIED, 200),
        // Routing
        (ROUTE_NOT_FOUND, 404),
        // Authorization
        (ROLE_NOT_FOUND, 404),
        // Infrastructure
        (INFRA_IDP_UNAVAILABLE, 500),
        (INFRA_DB_UNAVAILABLE, 500),
        (INFRA_DEPENDENCY_FAILED, 500),
        (INFRA_INCOMPLETE_REGISTRATION, 409),
        // General
        (GEN_SERVER_ERROR, 500),
        (GEN_UNAUTHORIZED, 401),
        (GEN_FORBIDDEN, 403),
        (GEN_TIMEOUT, 504),
        (GEN_OPERATION_OK, 200),
    ])
});

/// Status from the static table only.
pub fn mapped_status(code: &str) -> Option<u16> {
    CODE_STATUS.get(code).copied()
}

/// Fallback when a code is absent from the static table.
pub fn status_for_type(message_type: MessageType) -> u16 {
    match message_type {
        MessageType::Error => 500,
        MessageType::Success | MessageType::Warning | MessageType::Info | MessageType::Debug => 200,
    }
}
