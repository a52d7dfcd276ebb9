use super::runtime::Runtime;
use crate::app::saga_settings;
use crate::config::AppConfig;
use crate::deadline::Deadline;
use crate::error::DomainError;
use crate::services::{EmployeeRegistration, RegistrationSaga};

/// Report what a registration for `email` would run into, without changing anything.
pub async fn preflight(config: &AppConfig, email: &str) -> anyhow::Result<()> {
    let runtime = Runtime::connect(config).await?;
    let saga = RegistrationSaga::new(runtime.store, runtime.idp, saga_settings(&config.api, &config.idp));
    let email = email.trim().to_lowercase();

    match saga.preflight(Deadline::after(config.api.request_timeout()), &email).await {
        Ok(()) => println!("{}: no earlier registration, safe to register", email),
        Err(DomainError::DuplicateUser) => println!("{}: already registered", email),
        Err(DomainError::IncompleteRegistration) => {
            println!("{}: partial registration found, remove the leftover row or identity provider user", email)
        }
        Err(e) => anyhow::bail!("preflight failed: {}", e),
    }
    Ok(())
}
