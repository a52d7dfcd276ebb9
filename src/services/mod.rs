pub mod auth_service;
pub mod employee_service;
pub mod registration;

pub use auth_service::{AuthService, Authentication, VerificationEmail};
pub use employee_service::{EmployeeDirectory, EmployeeService};
pub use registration::{
    CompensationOutcome, EmployeeRegistration, RegistrationSaga, SagaSettings, SagaStep,
};
