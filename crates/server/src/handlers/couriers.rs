//! Courier-facing flows: accepting an order, the dashboard listing and
//! dropping an order back into the pool.
//!
//! The accept endpoint identifies the courier from the bearer token; the
//! other two take explicit path parameters, matching the gateway surface
//! the mobile client already speaks.

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap},
    response::Response,
};
use serde::Deserialize;
use tracing::info;

use crate::error::{ok, ApiError};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct AcceptQuery {
    pub order_uid: String,
}

/// Pull the courier id out of the `Authorization: Bearer <jwt>` header.
fn courier_from_bearer(state: &AppState, headers: &HeaderMap) -> Result<i32, ApiError> {
    let header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::unauthorized("missing authorization header"))?;
    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::unauthorized("authorization header is not a bearer token"))?;
    let claims = state
        .auth
        .verify(token)
        .map_err(|e| ApiError::unauthorized(e.to_string()))?;
    claims
        .account_id()
        .map_err(|e| ApiError::unauthorized(e.to_string()))
}

/// `GET /v1/courier/active-orders/list?order_uid=` — the authenticated
/// courier takes an unassigned order.
pub async fn accept_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<AcceptQuery>,
) -> Result<Response, ApiError> {
    let courier_id = courier_from_bearer(&state, &headers)?;
    state
        .orders
        .courier_accept(&query.order_uid, courier_id)
        .await?;
    info!("Courier {} accepted order {}", courier_id, query.order_uid);
    Ok(ok("accepted"))
}

/// `GET /v1/courier/get_order/{courier_id}` — the courier's dashboard:
/// orders they hold plus unassigned orders they may pick up.
pub async fn courier_orders(
    State(state): State<AppState>,
    Path(courier_id): Path<i32>,
) -> Result<Response, ApiError> {
    let orders = state.orders.courier_orders(courier_id).await?;
    Ok(ok(orders))
}

/// `GET /v1/courier/delete_order/{order_uid}` — drop the courier from an
/// order, returning it to the unassigned pool in the `accepted` state.
pub async fn drop_order(
    State(state): State<AppState>,
    Path(order_uid): Path<String>,
) -> Result<Response, ApiError> {
    state.orders.remove_courier(&order_uid).await?;
    info!("Order {} returned to the unassigned pool", order_uid);
    Ok(ok("removed"))
}
