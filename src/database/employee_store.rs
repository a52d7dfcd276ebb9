use async_trait::async_trait;
use sqlx::{Executor, PgPool, Postgres, Transaction};
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::deadline::Deadline;
use crate::domain::Employee;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("employee with this email already exists")]
    DuplicateUser,

    #[error("employee cannot be saved: {0}")]
    CannotSave(String),

    #[error("employee cannot be updated: {0}")]
    CannotUpdate(String),

    #[error("employee not found")]
    NotFound,

    #[error("transaction already finished")]
    TxFinished,

    #[error("database unavailable: {0}")]
    Unavailable(String),

    #[error("database call timed out")]
    Timeout,

    #[error(transparent)]
    Query(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed => StoreError::Unavailable(err.to_string()),
            other => StoreError::Query(other),
        }
    }
}

/// Transactional persistence for employee records.
///
/// `Tx` is an opaque handle that owns its connection until `commit` or
/// `rollback`. Writes are only accepted through a handle.
#[async_trait]
pub trait EmployeeStore: Send + Sync {
    type Tx: Send + 'static;

    async fn begin_tx(&self, deadline: Deadline) -> Result<Self::Tx, StoreError>;

    async fn save_in_tx(&self, deadline: Deadline, tx: &mut Self::Tx, employee: &Employee) -> Result<(), StoreError>;

    async fn patch_remote_id_in_tx(
        &self,
        deadline: Deadline,
        tx: &mut Self::Tx,
        id: Uuid,
        remote_id: &str,
    ) -> Result<(), StoreError>;

    /// Commit. On failure the handle is spent and a later `rollback` reports
    /// `TxFinished` instead of touching the database.
    async fn commit(&self, deadline: Deadline, tx: &mut Self::Tx) -> Result<(), StoreError>;

    async fn rollback(&self, deadline: Deadline, tx: Self::Tx) -> Result<(), StoreError>;

    async fn get_by_email(&self, deadline: Deadline, email: &str) -> Result<Option<Employee>, StoreError>;

    async fn get_by_id(&self, deadline: Deadline, id: Uuid) -> Result<Option<Employee>, StoreError>;

    async fn get_by_remote_id(&self, deadline: Deadline, remote_id: &str) -> Result<Option<Employee>, StoreError>;

    async fn ping(&self, deadline: Deadline) -> Result<(), StoreError>;
}

/// Object-safe view of the store used by the health endpoint.
#[async_trait]
pub trait StorePing: Send + Sync {
    async fn ping(&self, deadline: Deadline) -> Result<(), StoreError>;
}

#[async_trait]
impl<T: EmployeeStore> StorePing for T {
    async fn ping(&self, deadline: Deadline) -> Result<(), StoreError> {
        EmployeeStore::ping(self, deadline).await
    }
}

const INSERT_EMPLOYEE: &str = "INSERT INTO employee \
    (id, name, airline, email, identification_number, bp, start_date, end_date, active, role, remote_user_id) \
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)";

const UPDATE_REMOTE_ID: &str = "UPDATE employee SET remote_user_id = $2 WHERE id = $1";

#[cfg(test)]
const SELECT_COLUMNS: &str =
    "id, name, airline, email, identification_number, bp, start_date, end_date, active, role, remote_user_id";

const SELECT_BY_EMAIL: &str = "SELECT id, name, airline, email, identification_number, bp, start_date, end_date, \
    active, role, remote_user_id FROM employee WHERE email = $1";

const SELECT_BY_ID: &str = "SELECT id, name, airline, email, identification_number, bp, start_date, end_date, \
    active, role, remote_user_id FROM employee WHERE id = $1";

const SELECT_BY_REMOTE_ID: &str = "SELECT id, name, airline, email, identification_number, bp, start_date, end_date, \
    active, role, remote_user_id FROM employee WHERE remote_user_id = $1";

const SET_READ_COMMITTED: &str = "SET TRANSACTION ISOLATION LEVEL READ COMMITTED";

const STATEMENTS: &[&str] = &[
    INSERT_EMPLOYEE,
    UPDATE_REMOTE_ID,
    SELECT_BY_EMAIL,
    SELECT_BY_ID,
    SELECT_BY_REMOTE_ID,
];

/// Transaction handle for `PgEmployeeStore`.
pub struct EmployeeTx {
    inner: Option<Transaction<'static, Postgres>>,
}

impl EmployeeTx {
    fn conn(&mut self) -> Result<&mut Transaction<'static, Postgres>, StoreError> {
        self.inner.as_mut().ok_or(StoreError::TxFinished)
    }
}

/// Postgres-backed employee store.
pub struct PgEmployeeStore {
    pool: PgPool,
}

impl PgEmployeeStore {
    /// Prepare every statement once so schema drift fails at startup rather
    /// than mid-registration. sqlx keeps the prepared forms in its
    /// per-connection statement cache.
    pub async fn new(pool: PgPool, deadline: Deadline) -> Result<Self, StoreError> {
        deadline
            .run(async {
                let mut conn = pool.acquire().await?;
                for sql in STATEMENTS {
                    (&mut *conn).prepare(*sql).await?;
                }
                Ok::<_, StoreError>(())
            })
            .await
            .map_err(|_| StoreError::Timeout)??;
        debug!("prepared {} employee statements", STATEMENTS.len());
        Ok(Self { pool })
    }

    async fn fetch_one_by(&self, deadline: Deadline, sql: &'static str, key: &str) -> Result<Option<Employee>, StoreError> {
        deadline
            .run(sqlx::query_as::<_, Employee>(sql).bind(key).fetch_optional(&self.pool))
            .await
            .map_err(|_| StoreError::Timeout)?
            .map_err(StoreError::from)
    }
}

fn classify_insert(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::DuplicateUser,
        sqlx::Error::Io(_) | sqlx::Error::Tls(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
            StoreError::Unavailable(err.to_string())
        }
        _ => StoreError::CannotSave(err.to_string()),
    }
}

#[async_trait]
impl EmployeeStore for PgEmployeeStore {
    type Tx = EmployeeTx;

    async fn begin_tx(&self, deadline: Deadline) -> Result<EmployeeTx, StoreError> {
        let tx = deadline
            .run(async {
                let mut tx = self.pool.begin().await?;
                (&mut *tx).execute(SET_READ_COMMITTED).await?;
                Ok::<_, sqlx::Error>(tx)
            })
            .await
            .map_err(|_| StoreError::Timeout)??;
        Ok(EmployeeTx { inner: Some(tx) })
    }

    async fn save_in_tx(&self, deadline: Deadline, tx: &mut EmployeeTx, employee: &Employee) -> Result<(), StoreError> {
        let conn = tx.conn()?;
        let query = sqlx::query(INSERT_EMPLOYEE)
            .bind(employee.id)
            .bind(&employee.name)
            .bind(&employee.airline)
            .bind(&employee.email)
            .bind(&employee.identification_number)
            .bind(&employee.bp)
            .bind(employee.start_date)
            .bind(employee.end_date)
            .bind(employee.active)
            .bind(&employee.role)
            .bind(employee.remote_user_id.as_deref());
        deadline
            .run(query.execute(&mut **conn))
            .await
            .map_err(|_| StoreError::Timeout)?
            .map_err(classify_insert)?;
        Ok(())
    }

    async fn patch_remote_id_in_tx(
        &self,
        deadline: Deadline,
        tx: &mut EmployeeTx,
        id: Uuid,
        remote_id: &str,
    ) -> Result<(), StoreError> {
        let conn = tx.conn()?;
        let result = deadline
            .run(sqlx::query(UPDATE_REMOTE_ID).bind(id).bind(remote_id).execute(&mut **conn))
            .await
            .map_err(|_| StoreError::Timeout)?
            .map_err(|e| match StoreError::from(e) {
                StoreError::Query(q) => StoreError::CannotUpdate(q.to_string()),
                other => other,
            })?;
        if result.rows_affected() != 1 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn commit(&self, deadline: Deadline, tx: &mut EmployeeTx) -> Result<(), StoreError> {
        let inner = tx.inner.take().ok_or(StoreError::TxFinished)?;
        deadline
            .run(inner.commit())
            .await
            .map_err(|_| StoreError::Timeout)?
            .map_err(StoreError::from)
    }

    async fn rollback(&self, deadline: Deadline, mut tx: EmployeeTx) -> Result<(), StoreError> {
        let Some(inner) = tx.inner.take() else {
            return Err(StoreError::TxFinished);
        };
        match deadline.run(inner.rollback()).await {
            Ok(result) => result.map_err(StoreError::from),
            Err(_) => {
                // Dropping the connection mid-rollback aborts the transaction server side.
                warn!("rollback exceeded its deadline; connection dropped");
                Err(StoreError::Timeout)
            }
        }
    }

    async fn get_by_email(&self, deadline: Deadline, email: &str) -> Result<Option<Employee>, StoreError> {
        self.fetch_one_by(deadline, SELECT_BY_EMAIL, email).await
    }

    async fn get_by_id(&self, deadline: Deadline, id: Uuid) -> Result<Option<Employee>, StoreError> {
        deadline
            .run(sqlx::query_as::<_, Employee>(SELECT_BY_ID).bind(id).fetch_optional(&self.pool))
            .await
            .map_err(|_| StoreError::Timeout)?
            .map_err(StoreError::from)
    }

    async fn get_by_remote_id(&self, deadline: Deadline, remote_id: &str) -> Result<Option<Employee>, StoreError> {
        self.fetch_one_by(deadline, SELECT_BY_REMOTE_ID, remote_id).await
    }

    async fn ping(&self, deadline: Deadline) -> Result<(), StoreError> {
        deadline
            .run(sqlx::query("SELECT 1").execute(&self.pool))
            .await
            .map_err(|_| StoreError::Timeout)?
            .map(|_| ())
            .map_err(StoreError::from)
    }
}
