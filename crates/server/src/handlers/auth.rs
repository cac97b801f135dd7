//! Login endpoint shared by couriers and back-office users.

use axum::{extract::State, response::Response, Json};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::error::{ok, ApiError};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub login: String,
    pub password: String,
    /// "courier" or "user".
    pub role: String,
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Response, ApiError> {
    let token = state
        .auth
        .login(&req.login, &req.password, &req.role)
        .await?;
    info!("Issued token for {} ({})", req.login, req.role);
    Ok(ok(json!({ "token": token })))
}
