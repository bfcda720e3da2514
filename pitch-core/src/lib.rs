pub mod tenancy;
pub mod identity;
pub mod payment;
pub mod repository;

pub use identity::{Permission, Principal, Role, User};
pub use payment::{Payment, PaymentStatus};
pub use repository::RepositoryError;
pub use tenancy::{Tenant, TenantSettings};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    ValidationError(String),
    #[error("Missing permission: {0}")]
    PermissionDenied(String),
    #[error("Invalid payment transition from {from} to {to}")]
    InvalidPaymentTransition { from: String, to: String },
    #[error("Internal service error: {0}")]
    InternalError(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
