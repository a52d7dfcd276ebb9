// Employee registration across the local database and the identity provider
use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::database::{EmployeeStore, StoreError};
use crate::deadline::Deadline;
use crate::domain::{Employee, NewEmployee};
use crate::error::DomainError;
use crate::idp::{IdpAdmin, IdpError};

/// Progress marker of a single registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SagaStep {
    DbOpen,
    RemoteCreated,
    RemotePasswordSet,
    RemoteRoleAssigned,
    DbPatched,
    Committed,
    Compensated(CompensationOutcome),
}

/// What compensation managed to undo on the identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompensationOutcome {
    /// Nothing remote existed yet.
    NotNeeded,
    RemoteDeleted,
    /// The remote user was already gone when compensation ran.
    RemoteAlreadyGone,
    /// The remote user could not be deleted and is now an orphan.
    RemoteOrphaned,
}

impl fmt::Display for SagaStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SagaStep::DbOpen => write!(f, "db_open"),
            SagaStep::RemoteCreated => write!(f, "remote_created"),
            SagaStep::RemotePasswordSet => write!(f, "remote_password_set"),
            SagaStep::RemoteRoleAssigned => write!(f, "remote_role_assigned"),
            SagaStep::DbPatched => write!(f, "db_patched"),
            SagaStep::Committed => write!(f, "committed"),
            SagaStep::Compensated(outcome) => write!(f, "compensated({:?})", outcome),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SagaSettings {
    /// Budget for compensation calls, independent of the request deadline.
    pub compensation_timeout: Duration,
    /// Send a verification email once the registration has committed.
    pub send_verification_email: bool,
}

impl Default for SagaSettings {
    fn default() -> Self {
        Self {
            compensation_timeout: Duration::from_secs(10),
            send_verification_email: false,
        }
    }
}

/// Registration as seen by the HTTP layer.
#[async_trait]
pub trait EmployeeRegistration: Send + Sync {
    /// Read-only check for earlier registrations of `email`, complete or not.
    async fn preflight(&self, deadline: Deadline, email: &str) -> Result<(), DomainError>;

    async fn register(&self, deadline: Deadline, input: NewEmployee) -> Result<Employee, DomainError>;
}

/// A failed step together with the remote user it left behind, if any.
struct StepFailure {
    error: DomainError,
    remote_id: Option<String>,
}

impl StepFailure {
    fn local(error: DomainError) -> Self {
        Self { error, remote_id: None }
    }

    fn remote(error: DomainError, remote_id: &str) -> Self {
        Self {
            error,
            remote_id: Some(remote_id.to_string()),
        }
    }
}

/// Creates the employee row and the identity-provider user together, or
/// neither.
///
/// The row is written inside a transaction that stays open while the remote
/// user is created, given its password and role, and linked back. Any failure
/// after the remote user exists deletes it once before the transaction rolls
/// back. If that delete fails the orphan is logged and the next attempt for the
/// same email is refused by `preflight`. A failed commit is re-read before
/// anything is deleted.
pub struct RegistrationSaga<S, I> {
    store: Arc<S>,
    idp: Arc<I>,
    settings: SagaSettings,
}

impl<S, I> RegistrationSaga<S, I>
where
    S: EmployeeStore,
    I: IdpAdmin,
{
    pub fn new(store: Arc<S>, idp: Arc<I>, settings: SagaSettings) -> Self {
        Self { store, idp, settings }
    }

    async fn check_existing(&self, deadline: Deadline, email: &str) -> Result<(), DomainError> {
        if let Some(existing) = self.store.get_by_email(deadline, email).await? {
            if existing.is_partial() {
                warn!(employee_id = %existing.id, "employee row has no identity provider link");
                return Err(DomainError::IncompleteRegistration);
            }
            let remote_id = existing.remote_user_id.as_deref().unwrap_or_default();
            return match self.idp.get_user_by_id(deadline, remote_id).await {
                Err(IdpError::NotFound) => {
                    warn!(employee_id = %existing.id, remote_id, "employee row links a deleted identity provider user");
                    Err(DomainError::IncompleteRegistration)
                }
                Err(e) => {
                    debug!(employee_id = %existing.id, "identity provider link not confirmed: {}", e);
                    Err(DomainError::DuplicateUser)
                }
                Ok(_) => Err(DomainError::DuplicateUser),
            };
        }

        let remote = match self.idp.get_user_by_email(deadline, email).await {
            Ok(user) => user,
            Err(IdpError::NotFound) => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        if self.store.get_by_remote_id(deadline, &remote.id).await?.is_some() {
            return Err(DomainError::DuplicateUser);
        }
        if let Some(employee_id) = remote.employee_id() {
            warn!(remote_id = %remote.id, employee_id, "identity provider user left by an aborted registration");
            return Err(DomainError::IncompleteRegistration);
        }

        // Created outside this system; S3 reports it as a remote duplicate.
        debug!(remote_id = %remote.id, "identity provider user exists without a local employee");
        Ok(())
    }

    /// S2 to S7. On error the failure records whether a remote user exists.
    async fn run_steps(
        &self,
        deadline: Deadline,
        tx: &mut S::Tx,
        employee: &mut Employee,
        password: &str,
    ) -> Result<(), StepFailure> {
        bounded(deadline, self.store.save_in_tx(deadline, tx, employee))
            .await
            .map_err(StepFailure::local)?;
        trace_step(employee.id, SagaStep::DbOpen);

        let remote_id = bounded(deadline, self.idp.create_user(deadline, employee))
            .await
            .map_err(StepFailure::local)?;
        trace_step(employee.id, SagaStep::RemoteCreated);

        bounded(deadline, self.idp.set_password(deadline, &remote_id, password, false))
            .await
            .map_err(|e| StepFailure::remote(e, &remote_id))?;
        trace_step(employee.id, SagaStep::RemotePasswordSet);

        bounded(deadline, self.idp.assign_role(deadline, &remote_id, &employee.role))
            .await
            .map_err(|e| StepFailure::remote(e, &remote_id))?;
        trace_step(employee.id, SagaStep::RemoteRoleAssigned);

        bounded(deadline, self.store.patch_remote_id_in_tx(deadline, tx, employee.id, &remote_id))
            .await
            .map_err(|e| StepFailure::remote(e, &remote_id))?;
        trace_step(employee.id, SagaStep::DbPatched);

        if let Err(e) = bounded(deadline, self.store.commit(deadline, tx)).await {
            // A commit that timed out or lost its connection may still have landed.
            if !self.commit_landed(employee.id, &remote_id).await {
                return Err(StepFailure::remote(e, &remote_id));
            }
            warn!(employee_id = %employee.id, "commit reported {} but the row is persisted", e);
        }
        trace_step(employee.id, SagaStep::Committed);

        employee.remote_user_id = Some(remote_id);
        Ok(())
    }

    /// Re-read the row after a failed commit, under the compensation budget.
    async fn commit_landed(&self, employee_id: Uuid, remote_id: &str) -> bool {
        let deadline = Deadline::after(self.settings.compensation_timeout);
        match deadline.run(self.store.get_by_id(deadline, employee_id)).await {
            Ok(Ok(Some(row))) => row.remote_user_id.as_deref() == Some(remote_id),
            Ok(Ok(None)) => false,
            Ok(Err(e)) => {
                error!(%employee_id, "commit outcome unknown, row unreadable: {}", e);
                false
            }
            Err(_) => {
                error!(%employee_id, "commit outcome unknown, re-read timed out");
                false
            }
        }
    }

    /// Undo whatever the failed run left behind. Never fails; problems are logged.
    async fn compensate(&self, employee_id: Uuid, remote_id: Option<&str>, tx: S::Tx) -> CompensationOutcome {
        let deadline = Deadline::after(self.settings.compensation_timeout);

        let outcome = match remote_id {
            None => CompensationOutcome::NotNeeded,
            Some(remote_id) => {
                warn!(%employee_id, remote_id, "deleting identity provider user after failed registration");
                match deadline.run(self.idp.delete_user(deadline, remote_id)).await {
                    Ok(Ok(())) => CompensationOutcome::RemoteDeleted,
                    Ok(Err(IdpError::NotFound)) => CompensationOutcome::RemoteAlreadyGone,
                    Ok(Err(e)) => {
                        error!(%employee_id, remote_id, "compensation failed, orphan identity provider user: {}", e);
                        CompensationOutcome::RemoteOrphaned
                    }
                    Err(_) => {
                        error!(%employee_id, remote_id, "compensation timed out, orphan identity provider user");
                        CompensationOutcome::RemoteOrphaned
                    }
                }
            }
        };

        match deadline.run(self.store.rollback(deadline, tx)).await {
            Ok(Ok(())) => {}
            Ok(Err(StoreError::TxFinished)) => {
                debug!(%employee_id, "transaction already finished, nothing to roll back")
            }
            Ok(Err(e)) => warn!(%employee_id, "rollback failed: {}", e),
            Err(_) => warn!(%employee_id, "rollback timed out"),
        }

        trace_step(employee_id, SagaStep::Compensated(outcome));
        outcome
    }

    async fn send_verification(&self, deadline: Deadline, employee: &Employee) {
        let Some(remote_id) = employee.remote_user_id.as_deref() else {
            return;
        };
        match deadline.run(self.idp.send_verification_email(deadline, remote_id)).await {
            Ok(Ok(())) => info!(employee_id = %employee.id, "verification email sent"),
            Ok(Err(e)) => warn!(employee_id = %employee.id, "verification email not sent: {}", e),
            Err(_) => warn!(employee_id = %employee.id, "verification email timed out"),
        }
    }
}

#[async_trait]
impl<S, I> EmployeeRegistration for RegistrationSaga<S, I>
where
    S: EmployeeStore + 'static,
    I: IdpAdmin + 'static,
{
    async fn preflight(&self, deadline: Deadline, email: &str) -> Result<(), DomainError> {
        bounded(deadline, self.check_existing(deadline, email))
            .await
            .map_err(|e| observed(deadline, e))
    }

    async fn register(&self, deadline: Deadline, input: NewEmployee) -> Result<Employee, DomainError> {
        self.preflight(deadline, &input.email).await?;

        // S0
        let (mut employee, password) = input.into_employee(Uuid::new_v4());
        debug!(employee_id = %employee.id, email = %employee.email, "registration started");

        // S1
        let mut tx = bounded(deadline, self.store.begin_tx(deadline))
            .await
            .map_err(|e| observed(deadline, e))?;

        match self.run_steps(deadline, &mut tx, &mut employee, &password).await {
            Ok(()) => {
                info!(employee_id = %employee.id, "employee registered");
                if self.settings.send_verification_email {
                    self.send_verification(deadline, &employee).await;
                }
                Ok(employee)
            }
            Err(failure) => {
                warn!(employee_id = %employee.id, "registration failed: {}", failure.error);
                self.compensate(employee.id, failure.remote_id.as_deref(), tx).await;
                Err(observed(deadline, failure.error))
            }
        }
    }
}

/// Await a step under the request deadline, converting its error.
async fn bounded<F, T, E>(deadline: Deadline, step: F) -> Result<T, DomainError>
where
    F: Future<Output = Result<T, E>>,
    E: Into<DomainError>,
{
    match deadline.run(step).await {
        Ok(result) => result.map_err(Into::into),
        Err(_) => Err(DomainError::Canceled),
    }
}

/// Once the request deadline has passed the caller sees `Canceled`, whatever
/// the step reported.
fn observed(deadline: Deadline, err: DomainError) -> DomainError {
    if deadline.is_expired() {
        DomainError::Canceled
    } else {
        err
    }
}

fn trace_step(employee_id: Uuid, step: SagaStep) {
    debug!(%employee_id, %step, "registration step");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_render_for_logs() {
        assert_eq!(SagaStep::DbOpen.to_string(), "db_open");
        assert_eq!(
            SagaStep::Compensated(CompensationOutcome::RemoteOrphaned).to_string(),
            "compensated(RemoteOrphaned)"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn bounded_turns_elapsed_into_canceled() {
        let deadline = Deadline::after(Duration::from_millis(10));
        let slow = async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            Ok::<_, DomainError>(())
        };
        assert!(matches!(bounded(deadline, slow).await, Err(DomainError::Canceled)));
    }

    #[tokio::test(start_paused = true)]
    async fn expired_deadline_masks_step_error() {
        let deadline = Deadline::after(Duration::from_millis(10));
        assert!(matches!(
            observed(deadline, DomainError::IdpUnavailable),
            DomainError::IdpUnavailable
        ));
        tokio::time::advance(Duration::from_millis(20)).await;
        assert!(matches!(
            observed(deadline, DomainError::IdpUnavailable),
            DomainError::Canceled
        ));
    }
}
