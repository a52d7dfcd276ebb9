use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use uuid::Uuid;

/// Locally persisted identity record for an airline employee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Employee {
    pub id: Uuid,
    pub name: String,
    pub airline: String,
    pub email: String,
    pub identification_number: String,
    pub bp: String,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub active: bool,
    pub role: String,
    /// Identifier of the matching identity-provider user, set once registration commits.
    pub remote_user_id: Option<String>,
}

impl Employee {
    /// True when the row was written but the identity-provider link never landed.
    pub fn is_partial(&self) -> bool {
        self.remote_user_id.as_deref().map_or(true, str::is_empty)
    }
}

/// Validated registration input. Carries the password only until the
/// identity provider has accepted it.
#[derive(Clone)]
pub struct NewEmployee {
    pub name: String,
    pub airline: String,
    pub email: String,
    pub password: String,
    pub identification_number: String,
    pub bp: String,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub active: bool,
    pub role: String,
}

impl NewEmployee {
    /// Assign the local identifier and produce the record to persist.
    pub fn into_employee(self, id: Uuid) -> (Employee, String) {
        let employee = Employee {
            id,
            name: self.name,
            airline: self.airline,
            email: self.email,
            identification_number: self.identification_number,
            bp: self.bp,
            start_date: self.start_date,
            end_date: self.end_date,
            active: self.active,
            role: self.role,
            remote_user_id: None,
        };
        (employee, self.password)
    }
}

impl fmt::Debug for NewEmployee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewEmployee")
            .field("name", &self.name)
            .field("airline", &self.airline)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("identification_number", &self.identification_number)
            .field("bp", &self.bp)
            .field("start_date", &self.start_date)
            .field("end_date", &self.end_date)
            .field("active", &self.active)
            .field("role", &self.role)
            .finish()
    }
}
