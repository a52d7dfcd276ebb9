//! Identity-provider integration.
//!
//! `AdminSession` keeps the administrative bearer token fresh, `KeycloakClient`
//! speaks the Keycloak REST API, and the capability traits below are what the
//! rest of the crate depends on.

pub mod keycloak;
pub mod session;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

use crate::deadline::Deadline;
use crate::domain::Employee;

pub use keycloak::KeycloakClient;
pub use session::{AdminSession, AdminToken};

/// User attribute linking an identity-provider user back to the local employee row.
pub const EMPLOYEE_ID_ATTRIBUTE: &str = "employee_id";

pub const ACTION_VERIFY_EMAIL: &str = "VERIFY_EMAIL";
pub const ACTION_UPDATE_PASSWORD: &str = "UPDATE_PASSWORD";

/// Lifespan of the link sent in a verification email.
pub const VERIFY_EMAIL_LIFESPAN: Duration = Duration::from_secs(24 * 60 * 60);
/// Lifespan of the link sent in a password-reset email.
pub const PASSWORD_RESET_LIFESPAN: Duration = Duration::from_secs(12 * 60 * 60);

#[derive(Debug, Error)]
pub enum IdpError {
    #[error("identity provider unavailable: {0}")]
    Unavailable(String),

    #[error("invalid user credentials")]
    AuthFailed,

    #[error("user already exists in identity provider")]
    DuplicateUser,

    #[error("user not found in identity provider")]
    NotFound,

    #[error("realm role not found: {0}")]
    RoleNotFound(String),

    #[error("invalid token")]
    InvalidToken,

    #[error("token is no longer active")]
    TokenExpired,

    #[error("identity provider call timed out")]
    Timeout,

    #[error("{operation} rejected with status {status}")]
    Rejected { operation: &'static str, status: u16 },

    #[error("unexpected identity provider response: {0}")]
    InvalidResponse(String),

    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

/// A user as the identity provider reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdpUser {
    pub id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub email_verified: bool,
    #[serde(default)]
    pub attributes: HashMap<String, Vec<String>>,
}

impl IdpUser {
    /// Local employee id recorded on this user, if it was created by registration.
    pub fn employee_id(&self) -> Option<&str> {
        self.attributes
            .get(EMPLOYEE_ID_ATTRIBUTE)
            .and_then(|values| values.first())
            .map(String::as_str)
    }
}

/// Token pair issued to an end user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserToken {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default)]
    pub expires_in: u64,
    #[serde(default)]
    pub refresh_expires_in: u64,
    #[serde(default)]
    pub token_type: String,
}

/// Administrative operations. Every call presents a valid admin session token.
#[async_trait]
pub trait IdpAdmin: Send + Sync {
    /// Creates the user and returns its server-assigned id.
    async fn create_user(&self, deadline: Deadline, employee: &Employee) -> Result<String, IdpError>;

    /// Exact-match lookup by email.
    async fn get_user_by_email(&self, deadline: Deadline, email: &str) -> Result<IdpUser, IdpError>;

    async fn get_user_by_id(&self, deadline: Deadline, user_id: &str) -> Result<IdpUser, IdpError>;

    async fn delete_user(&self, deadline: Deadline, user_id: &str) -> Result<(), IdpError>;

    async fn set_password(
        &self,
        deadline: Deadline,
        user_id: &str,
        password: &str,
        temporary: bool,
    ) -> Result<(), IdpError>;

    /// Resolves the realm role by name and maps it onto the user.
    async fn assign_role(&self, deadline: Deadline, user_id: &str, role: &str) -> Result<(), IdpError>;

    async fn send_action_email(
        &self,
        deadline: Deadline,
        user_id: &str,
        actions: &[&str],
        lifespan: Duration,
    ) -> Result<(), IdpError>;

    async fn send_verification_email(&self, deadline: Deadline, user_id: &str) -> Result<(), IdpError> {
        self.send_action_email(deadline, user_id, &[ACTION_VERIFY_EMAIL], VERIFY_EMAIL_LIFESPAN)
            .await
    }

    async fn send_password_reset_email(&self, deadline: Deadline, email: &str) -> Result<(), IdpError> {
        let user = self.get_user_by_email(deadline, email).await?;
        self.send_action_email(deadline, &user.id, &[ACTION_UPDATE_PASSWORD], PASSWORD_RESET_LIFESPAN)
            .await
    }
}

/// End-user token operations. These never consume the admin session.
#[async_trait]
pub trait IdpUserAuth: Send + Sync {
    async fn user_login(&self, deadline: Deadline, email: &str, password: &str) -> Result<UserToken, IdpError>;

    async fn refresh_user_token(&self, deadline: Deadline, refresh_token: &str) -> Result<UserToken, IdpError>;

    async fn logout(&self, deadline: Deadline, refresh_token: &str) -> Result<(), IdpError>;
}

/// Obtains a fresh administrative token. Implemented over HTTP by the Keycloak
/// client and by counting fakes in tests.
#[async_trait]
pub trait AdminLogin: Send + Sync {
    async fn admin_login(&self, deadline: Deadline) -> Result<AdminToken, IdpError>;
}
