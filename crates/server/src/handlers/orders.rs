//! Order CRUD and the status-advance endpoint.

use axum::{
    extract::{Path, Query, State},
    response::Response,
    Json,
};
use model::{NewOrder, Order, OrderFilter, OrderStatus};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::error::{ok, ApiError};
use crate::handlers::{ListResponse, Page};
use crate::AppState;

pub async fn create_order(
    State(state): State<AppState>,
    Json(req): Json<NewOrder>,
) -> Result<Response, ApiError> {
    let order_uid = state.orders.create_order(&req).await?;
    info!("Created order {}", order_uid);
    Ok(ok(json!({ "order_uid": order_uid })))
}

pub async fn get_order(
    State(state): State<AppState>,
    Path(order_uid): Path<String>,
) -> Result<Response, ApiError> {
    let order = state.orders.get_order(&order_uid).await?;
    Ok(ok(order))
}

pub async fn list_orders(
    State(state): State<AppState>,
    Query(page): Query<Page>,
    Query(filter): Query<OrderFilter>,
) -> Result<Response, ApiError> {
    let (page, limit) = page.resolve(&state);
    let (items, total) = state.orders.list_orders(&filter, page, limit).await?;
    Ok(ok(ListResponse { items, total }))
}

pub async fn update_order(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(mut order): Json<Order>,
) -> Result<Response, ApiError> {
    order.id = id;
    state.orders.update_order(&order).await?;
    Ok(ok("updated"))
}

pub async fn delete_order(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Response, ApiError> {
    state.orders.delete_order(id).await?;
    Ok(ok("deleted"))
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub status: String,
}

/// `PUT /v1/logic/{order_uid}?status=` — move the order one step along
/// the status chain. Finishing an order also bumps the client aggregates.
pub async fn update_order_status(
    State(state): State<AppState>,
    Path(order_uid): Path<String>,
    Query(query): Query<StatusQuery>,
) -> Result<Response, ApiError> {
    let target = OrderStatus::parse(&query.status)
        .ok_or_else(|| ApiError::bad_request(format!("unknown status: {}", query.status)))?;
    state.orders.advance_status(&order_uid, target).await?;
    info!("Order {} moved to {}", order_uid, target);
    Ok(ok(target.as_str()))
}
