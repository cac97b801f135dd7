//! # Data Repository Layer
//!
//! Repository traits and PostgreSQL implementations for all entities:
//! orders, clients, branches, couriers, users, products, categories and
//! delivery tariffs. The orders repository additionally owns the
//! authoritative order status machine (see [`OrdersRepository::advance_status`]).
//!
//! Every read, list, update and delete predicate excludes soft-deleted
//! rows (`deleted_at IS NULL`).

use model::OrderStatus;
use thiserror::Error;

mod branches;
mod catalog;
mod clients;
mod couriers;
mod orders;
mod tariffs;
mod users;

pub use branches::{BranchData, BranchesRepository, PgBranchesRepository};
pub use catalog::{
    CategoriesRepository, CategoryData, PgCategoriesRepository, PgProductsRepository, ProductData,
    ProductsRepository,
};
pub use clients::{ClientData, ClientsRepository, PgClientsRepository};
pub use couriers::{CourierData, CouriersRepository, PgCouriersRepository};
pub use orders::{OrderPricing, OrdersRepository, PgOrdersRepository};
pub use tariffs::{PgTariffsRepository, TariffData, TariffsRepository};
pub use users::{PgUsersRepository, UserData, UsersRepository};

/// # RepositoryError
///
/// Error types that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database-related errors, wrapping the underlying PostgreSQL error
    #[error("Database error: {0}")]
    Db(#[from] tokio_postgres::Error),
    /// Failed to obtain a connection from the pool.
    #[error("Pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),
    /// No matching non-deleted row.
    #[error("Not found")]
    NotFound,
    /// The requested order status transition is not in the transition table.
    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
}
