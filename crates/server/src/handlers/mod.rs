//! Request handlers, grouped by surface: order lifecycle, courier flows,
//! login and the plain entity CRUD.

pub mod auth;
pub mod couriers;
pub mod entities;
pub mod orders;

use serde::{Deserialize, Serialize};

use crate::AppState;

/// `page`/`limit` query parameters shared by every list endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct Page {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl Page {
    /// Resolve against the configured defaults, clamping non-positive
    /// values back to them.
    pub fn resolve(&self, state: &AppState) -> (i64, i64) {
        let page = match self.page {
            Some(p) if p > 0 => p,
            _ => state.default_page,
        };
        let limit = match self.limit {
            Some(l) if l > 0 => l,
            _ => state.default_limit,
        };
        (page, limit)
    }
}

/// Payload of every list endpoint: one page of items plus the total count
/// of rows matching the same predicates.
#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    pub total: i64,
}
