//! Business logic layer for the delivery backend.
//!
//! Two services live here:
//! - [`OrderFlowService`]: order creation with discount/delivery-price
//!   composition, the status lifecycle with its order-finish side effect,
//!   and the courier assignment flows.
//! - [`auth::AuthService`]: login, JWT issuance/verification and password
//!   hashing for couriers and users.
//!
//! Services are generic over the repository traits for dependency
//! injection; the server consumes them behind trait objects.

use model::OrderStatus;
use repository::RepositoryError;
use thiserror::Error;

pub mod auth;
mod orders;

pub use auth::{Auth, AuthService, Claims};
pub use orders::{CourierOrders, OrderFlow, OrderFlowService};

/// The main error type for all service operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The request is structurally or semantically invalid.
    #[error("{0}")]
    Validation(String),
    /// The referenced entity does not exist (or is soft-deleted).
    #[error("not found")]
    NotFound,
    /// The requested order status transition is not allowed from the
    /// order's current status.
    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
    /// A repository (database) operation failed.
    #[error("Database error: {0}")]
    Repo(RepositoryError),
    /// Some unexpected or unhandled error.
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl From<RepositoryError> for ServiceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => ServiceError::NotFound,
            RepositoryError::InvalidTransition { from, to } => {
                ServiceError::InvalidTransition { from, to }
            }
            other => ServiceError::Repo(other),
        }
    }
}
