use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::database::EmployeeStore;
use crate::deadline::Deadline;
use crate::domain::Employee;
use crate::error::DomainError;

/// Read-only employee queries behind the public lookup route.
#[async_trait]
pub trait EmployeeDirectory: Send + Sync {
    async fn get_by_email(&self, deadline: Deadline, email: &str) -> Result<Employee, DomainError>;
}

pub struct EmployeeService<S> {
    store: Arc<S>,
}

impl<S: EmployeeStore> EmployeeService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<S> EmployeeDirectory for EmployeeService<S>
where
    S: EmployeeStore + 'static,
{
    async fn get_by_email(&self, deadline: Deadline, email: &str) -> Result<Employee, DomainError> {
        match self.store.get_by_email(deadline, email).await? {
            Some(employee) => Ok(employee),
            None => {
                debug!(email, "no employee with this email");
                Err(DomainError::EmailNotFound)
            }
        }
    }
}
