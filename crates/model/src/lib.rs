//! Domain model for the delivery backend.
//!
//! Entities are shared by the repository, service and server crates.
//! Monetary amounts are plain `f64` matching the DOUBLE PRECISION columns;
//! timestamps are UTC. Soft deletion is a storage concern and the
//! `deleted_at` column is never surfaced here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

mod status;
pub use status::OrderStatus;

/// Order — the central aggregate. `id` is the database serial, `order_uid`
/// the immutable business-facing identifier handed out to clients.
/// `courier_id == 0` means the order has no courier assigned yet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    pub id: i32,
    pub order_uid: String,
    pub client_id: i32,
    pub branch_id: i32,
    pub delivery_type: String,
    pub address: String,
    pub courier_id: i32,
    /// Subtotal after discount.
    pub price: f64,
    pub delivery_price: f64,
    pub discount: f64,
    pub status: OrderStatus,
    pub payment_type: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Creation request for an order. Pricing fields (discount, delivery price)
/// are derived by the service layer before the row is inserted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrder {
    pub client_id: i32,
    pub branch_id: i32,
    pub delivery_type: String,
    pub address: String,
    /// Pre-discount subtotal as submitted by the client.
    pub price: f64,
    pub payment_type: String,
}

/// Optional equality/range predicates for order listing. All fields are
/// combined with AND; `None` means the predicate is not applied.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderFilter {
    pub order_uid: Option<String>,
    pub client_id: Option<i32>,
    pub branch_id: Option<i32>,
    pub courier_id: Option<i32>,
    pub payment_type: Option<String>,
    pub delivery_type: Option<String>,
    pub price_from: Option<f64>,
    pub price_to: Option<f64>,
}

/// Client — consumed read-only by the pricing composition; its aggregate
/// counters are bumped only when one of its orders finishes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Client {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    /// "percent" or "fixed"; anything else yields no discount.
    pub discount_type: String,
    pub discount_amount: f64,
    pub total_orders_count: i32,
    pub total_orders_sum: f64,
    pub last_ordered_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Branch of the chain; references exactly one delivery tariff.
/// Work hours are "HH:MM:SS" strings compared lexicographically.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Branch {
    pub id: i32,
    pub name: String,
    pub address: String,
    pub phone: String,
    pub work_hour_start: String,
    pub work_hour_end: String,
    pub delivery_tariff_id: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Delivery tariff. A `fixed` tariff charges `base_price` flat; an
/// `alternative` tariff selects a price from its brackets by subtotal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeliveryTariff {
    pub id: i32,
    pub name: String,
    /// "fixed" or "alternative".
    pub tariff_type: String,
    pub base_price: f64,
    pub brackets: Vec<TariffBracket>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Price range with a flat delivery fee. Bounds are exclusive on both
/// ends; a subtotal exactly on a boundary matches no bracket.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TariffBracket {
    pub from_price: f64,
    pub to_price: f64,
    pub price: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Courier {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub branch_id: i32,
    pub phone: String,
    pub login: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub max_order_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub login: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: i32,
    pub name: String,
    pub price: f64,
    pub category_id: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Category {
    pub id: i32,
    pub name: String,
    pub parent_id: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}
