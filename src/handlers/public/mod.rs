// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Every route the service exposes is public: registration, token
// acquisition, the employee lookup and the health check.

pub mod auth;
pub mod employee;
pub mod health;
pub mod not_found;

pub use auth::*;
pub use employee::employee_by_email_get;
pub use health::health_get;
pub use not_found::not_found;
