use async_trait::async_trait;
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::database::EmployeeStore;
use crate::deadline::Deadline;
use crate::error::DomainError;
use crate::idp::{IdpAdmin, IdpError, IdpUserAuth, UserToken};

/// End-user session operations behind the public auth routes.
#[async_trait]
pub trait Authentication: Send + Sync {
    async fn login(&self, deadline: Deadline, email: &str, password: &str) -> Result<UserToken, DomainError>;

    async fn refresh(&self, deadline: Deadline, refresh_token: &str) -> Result<UserToken, DomainError>;

    async fn logout(&self, deadline: Deadline, refresh_token: &str) -> Result<(), DomainError>;

    async fn resend_verification_email(&self, deadline: Deadline, email: &str) -> Result<VerificationEmail, DomainError>;

    async fn send_password_reset(&self, deadline: Deadline, email: &str) -> Result<(), DomainError>;
}

/// Outcome of a verification-email request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationEmail {
    Sent,
    /// The address was verified already; nothing was sent.
    AlreadyVerified,
}

/// Claims read from the access token issued by the identity provider.
#[derive(Debug, Deserialize)]
struct AccessClaims {
    #[serde(default)]
    sub: Option<String>,
    #[serde(default)]
    email_verified: Option<bool>,
}

pub struct AuthService<S, I> {
    store: Arc<S>,
    idp: Arc<I>,
}

impl<S, I> AuthService<S, I>
where
    S: EmployeeStore,
    I: IdpAdmin + IdpUserAuth,
{
    pub fn new(store: Arc<S>, idp: Arc<I>) -> Self {
        Self { store, idp }
    }
}

#[async_trait]
impl<S, I> Authentication for AuthService<S, I>
where
    S: EmployeeStore + 'static,
    I: IdpAdmin + IdpUserAuth + 'static,
{
    async fn login(&self, deadline: Deadline, email: &str, password: &str) -> Result<UserToken, DomainError> {
        let employee = self
            .store
            .get_by_email(deadline, email)
            .await?
            .ok_or(DomainError::EmailNotFound)?;
        if !employee.active {
            debug!(employee_id = %employee.id, "login refused for inactive employee");
            return Err(DomainError::Forbidden);
        }

        let token = self.idp.user_login(deadline, email, password).await?;

        // Token comes straight from the identity provider; only the claims matter here.
        let claims = access_claims(&token.access_token)?;
        if claims.email_verified == Some(false) {
            debug!(employee_id = %employee.id, "login refused, email not verified");
            return Err(DomainError::EmailNotVerified);
        }

        info!(employee_id = %employee.id, subject = ?claims.sub, "employee logged in");
        Ok(token)
    }

    async fn refresh(&self, deadline: Deadline, refresh_token: &str) -> Result<UserToken, DomainError> {
        Ok(self.idp.refresh_user_token(deadline, refresh_token).await?)
    }

    async fn logout(&self, deadline: Deadline, refresh_token: &str) -> Result<(), DomainError> {
        Ok(self.idp.logout(deadline, refresh_token).await?)
    }

    async fn resend_verification_email(&self, deadline: Deadline, email: &str) -> Result<VerificationEmail, DomainError> {
        let user = match self.idp.get_user_by_email(deadline, email).await {
            Ok(user) => user,
            Err(IdpError::NotFound) => return Err(DomainError::EmailNotFound),
            Err(e) => return Err(e.into()),
        };
        if user.email_verified {
            info!(remote_id = %user.id, "email already verified, not resending");
            return Ok(VerificationEmail::AlreadyVerified);
        }
        self.idp.send_verification_email(deadline, &user.id).await?;
        Ok(VerificationEmail::Sent)
    }

    async fn send_password_reset(&self, deadline: Deadline, email: &str) -> Result<(), DomainError> {
        match self.idp.send_password_reset_email(deadline, email).await {
            Err(IdpError::NotFound) => Err(DomainError::EmailNotFound),
            other => Ok(other?),
        }
    }
}

fn access_claims(token: &str) -> Result<AccessClaims, DomainError> {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    decode::<AccessClaims>(token, &DecodingKey::from_secret(&[]), &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            debug!("access token claims unreadable: {}", e);
            DomainError::TokenInvalid
        })
}
