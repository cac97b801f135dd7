//! CRUD handlers for the catalog and account entities: products,
//! categories, branches, delivery tariffs, clients, couriers and users.
//!
//! Courier and user payloads carry a plaintext `password` field; the
//! handlers hash it before it reaches the repository, so plaintext never
//! leaves this module.

use axum::{
    extract::{Path, Query, State},
    response::Response,
    Json,
};
use chrono::Local;
use model::TariffBracket;
use repository::{
    BranchData, CategoryData, ClientData, CourierData, ProductData, TariffData, UserData,
};
use serde::Deserialize;
use serde_json::json;

use crate::error::{ok, ApiError};
use crate::handlers::{ListResponse, Page};
use crate::AppState;

fn created(id: i32) -> Response {
    ok(json!({ "id": id }))
}

// --- products ---

#[derive(Debug, Deserialize)]
pub struct ProductRequest {
    pub name: String,
    pub price: f64,
    pub category_id: i32,
}

impl ProductRequest {
    fn into_data(self) -> ProductData {
        ProductData {
            name: self.name,
            price: self.price,
            category_id: self.category_id,
        }
    }
}

pub async fn create_product(
    State(state): State<AppState>,
    Json(req): Json<ProductRequest>,
) -> Result<Response, ApiError> {
    let id = state.products.create(&req.into_data()).await?;
    Ok(created(id))
}

pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Response, ApiError> {
    Ok(ok(state.products.get(id).await?))
}

pub async fn list_products(
    State(state): State<AppState>,
    Query(page): Query<Page>,
) -> Result<Response, ApiError> {
    let (page, limit) = page.resolve(&state);
    let (items, total) = state.products.list(page, limit).await?;
    Ok(ok(ListResponse { items, total }))
}

pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(req): Json<ProductRequest>,
) -> Result<Response, ApiError> {
    state.products.update(id, &req.into_data()).await?;
    Ok(ok("updated"))
}

pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Response, ApiError> {
    state.products.delete(id).await?;
    Ok(ok("deleted"))
}

// --- categories ---

#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    pub name: String,
    pub parent_id: Option<i32>,
}

impl CategoryRequest {
    fn into_data(self) -> CategoryData {
        CategoryData {
            name: self.name,
            parent_id: self.parent_id,
        }
    }
}

pub async fn create_category(
    State(state): State<AppState>,
    Json(req): Json<CategoryRequest>,
) -> Result<Response, ApiError> {
    let id = state.categories.create(&req.into_data()).await?;
    Ok(created(id))
}

pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Response, ApiError> {
    Ok(ok(state.categories.get(id).await?))
}

pub async fn list_categories(
    State(state): State<AppState>,
    Query(page): Query<Page>,
) -> Result<Response, ApiError> {
    let (page, limit) = page.resolve(&state);
    let (items, total) = state.categories.list(page, limit).await?;
    Ok(ok(ListResponse { items, total }))
}

pub async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(req): Json<CategoryRequest>,
) -> Result<Response, ApiError> {
    state.categories.update(id, &req.into_data()).await?;
    Ok(ok("updated"))
}

pub async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Response, ApiError> {
    state.categories.delete(id).await?;
    Ok(ok("deleted"))
}

// --- branches ---

#[derive(Debug, Deserialize)]
pub struct BranchRequest {
    pub name: String,
    pub address: String,
    pub phone: String,
    pub work_hour_start: String,
    pub work_hour_end: String,
    pub delivery_tariff_id: i32,
}

impl BranchRequest {
    fn into_data(self) -> BranchData {
        BranchData {
            name: self.name,
            address: self.address,
            phone: self.phone,
            work_hour_start: self.work_hour_start,
            work_hour_end: self.work_hour_end,
            delivery_tariff_id: self.delivery_tariff_id,
        }
    }
}

pub async fn create_branch(
    State(state): State<AppState>,
    Json(req): Json<BranchRequest>,
) -> Result<Response, ApiError> {
    let id = state.branches.create(&req.into_data()).await?;
    Ok(created(id))
}

pub async fn get_branch(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Response, ApiError> {
    Ok(ok(state.branches.get(id).await?))
}

pub async fn list_branches(
    State(state): State<AppState>,
    Query(page): Query<Page>,
) -> Result<Response, ApiError> {
    let (page, limit) = page.resolve(&state);
    let (items, total) = state.branches.list(page, limit).await?;
    Ok(ok(ListResponse { items, total }))
}

pub async fn update_branch(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(req): Json<BranchRequest>,
) -> Result<Response, ApiError> {
    state.branches.update(id, &req.into_data()).await?;
    Ok(ok("updated"))
}

pub async fn delete_branch(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Response, ApiError> {
    state.branches.delete(id).await?;
    Ok(ok("deleted"))
}

/// `GET /v1/branch/active` — branches whose work window contains the
/// current wall-clock time.
pub async fn list_active_branches(
    State(state): State<AppState>,
    Query(page): Query<Page>,
) -> Result<Response, ApiError> {
    let (page, limit) = page.resolve(&state);
    let now = Local::now().format("%H:%M:%S").to_string();
    let (items, total) = state.branches.list_active(&now, page, limit).await?;
    Ok(ok(ListResponse { items, total }))
}

// --- delivery tariffs ---

#[derive(Debug, Deserialize)]
pub struct TariffRequest {
    pub name: String,
    pub tariff_type: String,
    pub base_price: f64,
    #[serde(default)]
    pub brackets: Vec<TariffBracket>,
}

impl TariffRequest {
    fn into_data(self) -> Result<TariffData, ApiError> {
        match self.tariff_type.as_str() {
            "fixed" | "alternative" => {}
            other => {
                return Err(ApiError::bad_request(format!(
                    "unknown tariff_type: {other}"
                )))
            }
        }
        Ok(TariffData {
            name: self.name,
            tariff_type: self.tariff_type,
            base_price: self.base_price,
            brackets: self.brackets,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct TariffListQuery {
    pub tariff_type: Option<String>,
}

pub async fn create_tariff(
    State(state): State<AppState>,
    Json(req): Json<TariffRequest>,
) -> Result<Response, ApiError> {
    let id = state.tariffs.create(&req.into_data()?).await?;
    Ok(created(id))
}

pub async fn get_tariff(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Response, ApiError> {
    Ok(ok(state.tariffs.get(id).await?))
}

pub async fn list_tariffs(
    State(state): State<AppState>,
    Query(page): Query<Page>,
    Query(query): Query<TariffListQuery>,
) -> Result<Response, ApiError> {
    let (page, limit) = page.resolve(&state);
    let (items, total) = state
        .tariffs
        .list(query.tariff_type.as_deref(), page, limit)
        .await?;
    Ok(ok(ListResponse { items, total }))
}

pub async fn update_tariff(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(req): Json<TariffRequest>,
) -> Result<Response, ApiError> {
    state.tariffs.update(id, &req.into_data()?).await?;
    Ok(ok("updated"))
}

pub async fn delete_tariff(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Response, ApiError> {
    state.tariffs.delete(id).await?;
    Ok(ok("deleted"))
}

// --- clients ---

#[derive(Debug, Deserialize)]
pub struct ClientRequest {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub discount_type: String,
    pub discount_amount: f64,
}

impl ClientRequest {
    fn into_data(self) -> Result<ClientData, ApiError> {
        match self.discount_type.as_str() {
            "percent" | "fixed" | "" => {}
            other => {
                return Err(ApiError::bad_request(format!(
                    "unknown discount_type: {other}"
                )))
            }
        }
        Ok(ClientData {
            first_name: self.first_name,
            last_name: self.last_name,
            phone: self.phone,
            discount_type: self.discount_type,
            discount_amount: self.discount_amount,
        })
    }
}

pub async fn create_client(
    State(state): State<AppState>,
    Json(req): Json<ClientRequest>,
) -> Result<Response, ApiError> {
    let id = state.clients.create(&req.into_data()?).await?;
    Ok(created(id))
}

pub async fn get_client(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Response, ApiError> {
    Ok(ok(state.clients.get(id).await?))
}

pub async fn list_clients(
    State(state): State<AppState>,
    Query(page): Query<Page>,
) -> Result<Response, ApiError> {
    let (page, limit) = page.resolve(&state);
    let (items, total) = state.clients.list(page, limit).await?;
    Ok(ok(ListResponse { items, total }))
}

pub async fn update_client(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(req): Json<ClientRequest>,
) -> Result<Response, ApiError> {
    state.clients.update(id, &req.into_data()?).await?;
    Ok(ok("updated"))
}

pub async fn delete_client(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Response, ApiError> {
    state.clients.delete(id).await?;
    Ok(ok("deleted"))
}

// --- couriers ---

#[derive(Debug, Deserialize)]
pub struct CourierRequest {
    pub first_name: String,
    pub last_name: String,
    pub branch_id: i32,
    pub phone: String,
    pub login: String,
    pub password: String,
    pub max_order_count: i32,
}

impl CourierRequest {
    fn into_data(self, state: &AppState) -> Result<CourierData, ApiError> {
        if self.login.is_empty() {
            return Err(ApiError::bad_request("login is required"));
        }
        if self.password.is_empty() {
            return Err(ApiError::bad_request("password is required"));
        }
        let password_hash = state.auth.hash_password(&self.password)?;
        Ok(CourierData {
            first_name: self.first_name,
            last_name: self.last_name,
            branch_id: self.branch_id,
            phone: self.phone,
            login: self.login,
            password_hash,
            max_order_count: self.max_order_count,
        })
    }
}

pub async fn create_courier(
    State(state): State<AppState>,
    Json(req): Json<CourierRequest>,
) -> Result<Response, ApiError> {
    let data = req.into_data(&state)?;
    let id = state.couriers.create(&data).await?;
    Ok(created(id))
}

pub async fn get_courier(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Response, ApiError> {
    Ok(ok(state.couriers.get(id).await?))
}

pub async fn list_couriers(
    State(state): State<AppState>,
    Query(page): Query<Page>,
) -> Result<Response, ApiError> {
    let (page, limit) = page.resolve(&state);
    let (items, total) = state.couriers.list(page, limit).await?;
    Ok(ok(ListResponse { items, total }))
}

pub async fn update_courier(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(req): Json<CourierRequest>,
) -> Result<Response, ApiError> {
    let data = req.into_data(&state)?;
    state.couriers.update(id, &data).await?;
    Ok(ok("updated"))
}

pub async fn delete_courier(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Response, ApiError> {
    state.couriers.delete(id).await?;
    Ok(ok("deleted"))
}

// --- users ---

#[derive(Debug, Deserialize)]
pub struct UserRequest {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub login: String,
    pub password: String,
}

impl UserRequest {
    fn into_data(self, state: &AppState) -> Result<UserData, ApiError> {
        if self.login.is_empty() {
            return Err(ApiError::bad_request("login is required"));
        }
        if self.password.is_empty() {
            return Err(ApiError::bad_request("password is required"));
        }
        let password_hash = state.auth.hash_password(&self.password)?;
        Ok(UserData {
            first_name: self.first_name,
            last_name: self.last_name,
            phone: self.phone,
            login: self.login,
            password_hash,
        })
    }
}

pub async fn create_user(
    State(state): State<AppState>,
    Json(req): Json<UserRequest>,
) -> Result<Response, ApiError> {
    let data = req.into_data(&state)?;
    let id = state.users.create(&data).await?;
    Ok(created(id))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Response, ApiError> {
    Ok(ok(state.users.get(id).await?))
}

pub async fn list_users(
    State(state): State<AppState>,
    Query(page): Query<Page>,
) -> Result<Response, ApiError> {
    let (page, limit) = page.resolve(&state);
    let (items, total) = state.users.list(page, limit).await?;
    Ok(ok(ListResponse { items, total }))
}

pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(req): Json<UserRequest>,
) -> Result<Response, ApiError> {
    let data = req.into_data(&state)?;
    state.users.update(id, &data).await?;
    Ok(ok("updated"))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Response, ApiError> {
    state.users.delete(id).await?;
    Ok(ok("deleted"))
}
