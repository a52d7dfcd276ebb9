pub mod employee_store;
pub mod manager;
pub mod message_repository;

pub use employee_store::{EmployeeStore, EmployeeTx, PgEmployeeStore, StoreError, StorePing};
pub use manager::{DatabaseError, DatabaseManager};
pub use message_repository::PgMessageRepository;
