//! Orders repository: durable CRUD with filtering/pagination, soft delete
//! and the status machine. This is the authority for which lifecycle
//! transitions are allowed; callers never write `status` directly except
//! through [`OrdersRepository::advance_status`] and the explicit
//! [`OrdersRepository::reassign`] escape hatch.

use async_trait::async_trait;
use deadpool_postgres::Pool;
use model::{NewOrder, Order, OrderFilter, OrderStatus};
use tokio_postgres::types::ToSql;
use tokio_postgres::Row;
use uuid::Uuid;

use crate::RepositoryError;

const ORDER_COLUMNS: &str = r#"
    id, order_uid, client_id, branch_id, delivery_type, address, courier_id,
    price, delivery_price, discount, status, payment_type, created_at, updated_at
"#;

/// Pricing fields derived by the service layer before insertion.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderPricing {
    /// Subtotal after discount.
    pub price: f64,
    pub delivery_price: f64,
    pub discount: f64,
}

/// # OrdersRepository
///
/// Repository interface for managing orders.
///
/// Orders are created in the `accepted` state with a generated, globally
/// unique `order_uid`, advance along a fixed status chain, and are only
/// ever soft-deleted.
#[async_trait]
pub trait OrdersRepository: Send + Sync {
    /// Insert an order with derived pricing; returns the generated order_uid.
    async fn create(&self, order: &NewOrder, pricing: OrderPricing)
        -> Result<String, RepositoryError>;

    /// Get a live order by its business id.
    async fn get(&self, order_uid: &str) -> Result<Order, RepositoryError>;

    /// List live orders matching `filter`, newest first, together with the
    /// total count of matching rows (independent of the pagination window).
    async fn list(
        &self,
        filter: &OrderFilter,
        page: i64,
        limit: i64,
    ) -> Result<(Vec<Order>, i64), RepositoryError>;

    /// Full-row replace of the mutable fields, keyed by (id, order_uid).
    async fn update(&self, order: &Order) -> Result<(), RepositoryError>;

    /// Soft delete by internal id.
    async fn delete(&self, id: i32) -> Result<(), RepositoryError>;

    /// Current status of a live order.
    async fn get_status(&self, order_uid: &str) -> Result<OrderStatus, RepositoryError>;

    /// Advance the order to `target`, validating that the stored status is
    /// the required predecessor. On mismatch the status is left unchanged
    /// and [`RepositoryError::InvalidTransition`] is returned.
    async fn advance_status(
        &self,
        order_uid: &str,
        target: OrderStatus,
    ) -> Result<(), RepositoryError>;

    /// Remove the courier from an order: `courier_id = 0`, status back to
    /// `accepted`. A deliberate bypass of the transition table, kept as a
    /// tagged operation so the status machine stays exhaustive elsewhere.
    async fn reassign(&self, order_uid: &str) -> Result<(), RepositoryError>;

    /// Record which courier holds the order.
    async fn assign_courier(&self, order_uid: &str, courier_id: i32)
        -> Result<(), RepositoryError>;

    /// Candidate pool a courier may pick up: unassigned orders in
    /// `accepted` or `ready_in_branch`, optionally narrowed to one branch.
    async fn list_acceptable(&self, branch_id: Option<i32>)
        -> Result<Vec<Order>, RepositoryError>;

    /// Orders a courier currently holds: `courier_accepted` or `on_way`.
    async fn list_accepted(&self, courier_id: i32) -> Result<Vec<Order>, RepositoryError>;
}

/// PostgreSQL implementation of the [`OrdersRepository`] trait.
pub struct PgOrdersRepository {
    db: Pool,
}

impl PgOrdersRepository {
    pub fn new(db: Pool) -> Self {
        Self { db }
    }
}

fn order_from_row(row: &Row) -> Order {
    Order {
        id: row.get("id"),
        order_uid: row.get("order_uid"),
        client_id: row.get("client_id"),
        branch_id: row.get("branch_id"),
        delivery_type: row.get("delivery_type"),
        address: row.get("address"),
        courier_id: row.get("courier_id"),
        price: row.get("price"),
        delivery_price: row.get("delivery_price"),
        discount: row.get("discount"),
        status: row.get("status"),
        payment_type: row.get("payment_type"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

/// Builds the WHERE clause shared by the count and the page query, so both
/// always agree on the same predicate set.
fn build_filter<'a>(filter: &'a OrderFilter) -> (String, Vec<&'a (dyn ToSql + Sync)>) {
    let mut clauses = vec!["deleted_at IS NULL".to_string()];
    let mut params: Vec<&'a (dyn ToSql + Sync)> = Vec::new();

    if let Some(v) = filter.order_uid.as_ref() {
        params.push(v);
        clauses.push(format!("order_uid = ${}", params.len()));
    }
    if let Some(v) = filter.client_id.as_ref() {
        params.push(v);
        clauses.push(format!("client_id = ${}", params.len()));
    }
    if let Some(v) = filter.branch_id.as_ref() {
        params.push(v);
        clauses.push(format!("branch_id = ${}", params.len()));
    }
    if let Some(v) = filter.courier_id.as_ref() {
        params.push(v);
        clauses.push(format!("courier_id = ${}", params.len()));
    }
    if let Some(v) = filter.payment_type.as_ref() {
        params.push(v);
        clauses.push(format!("payment_type = ${}", params.len()));
    }
    if let Some(v) = filter.delivery_type.as_ref() {
        params.push(v);
        clauses.push(format!("delivery_type = ${}", params.len()));
    }
    if let Some(v) = filter.price_from.as_ref() {
        params.push(v);
        clauses.push(format!("price >= ${}", params.len()));
    }
    if let Some(v) = filter.price_to.as_ref() {
        params.push(v);
        clauses.push(format!("price <= ${}", params.len()));
    }

    (clauses.join(" AND "), params)
}

#[async_trait]
impl OrdersRepository for PgOrdersRepository {
    async fn create(
        &self,
        order: &NewOrder,
        pricing: OrderPricing,
    ) -> Result<String, RepositoryError> {
        let order_uid = Uuid::new_v4().to_string();
        let query = r#"
            INSERT INTO orders (
                order_uid, client_id, branch_id, delivery_type, address,
                courier_id, price, delivery_price, discount, status, payment_type
            )
            VALUES ($1, $2, $3, $4, $5, 0, $6, $7, $8, 'accepted', $9)
            RETURNING order_uid
        "#;
        let conn = self.db.get().await?;
        let row = conn
            .query_one(
                query,
                &[
                    &order_uid,
                    &order.client_id,
                    &order.branch_id,
                    &order.delivery_type,
                    &order.address,
                    &pricing.price,
                    &pricing.delivery_price,
                    &pricing.discount,
                    &order.payment_type,
                ],
            )
            .await?;
        Ok(row.get("order_uid"))
    }

    async fn get(&self, order_uid: &str) -> Result<Order, RepositoryError> {
        let query = format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE order_uid = $1 AND deleted_at IS NULL"
        );
        let conn = self.db.get().await?;
        let row = conn.query_opt(&query, &[&order_uid]).await?;
        match row {
            Some(row) => Ok(order_from_row(&row)),
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn list(
        &self,
        filter: &OrderFilter,
        page: i64,
        limit: i64,
    ) -> Result<(Vec<Order>, i64), RepositoryError> {
        let (where_sql, params) = build_filter(filter);
        let conn = self.db.get().await?;

        let count_query = format!("SELECT count(*) FROM orders WHERE {where_sql}");
        let total: i64 = conn.query_one(&count_query, &params).await?.get(0);

        let offset = (page - 1) * limit;
        let page_query = format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE {where_sql} \
             ORDER BY created_at DESC LIMIT ${} OFFSET ${}",
            params.len() + 1,
            params.len() + 2
        );
        let mut page_params = params;
        page_params.push(&limit);
        page_params.push(&offset);

        let rows = conn.query(&page_query, &page_params).await?;
        let orders = rows.iter().map(order_from_row).collect();
        Ok((orders, total))
    }

    async fn update(&self, order: &Order) -> Result<(), RepositoryError> {
        let query = r#"
            UPDATE orders
            SET client_id = $1,
                branch_id = $2,
                delivery_type = $3,
                address = $4,
                courier_id = $5,
                price = $6,
                delivery_price = $7,
                discount = $8,
                status = $9,
                payment_type = $10,
                updated_at = NOW()
            WHERE id = $11 AND order_uid = $12 AND deleted_at IS NULL
        "#;
        let conn = self.db.get().await?;
        let affected = conn
            .execute(
                query,
                &[
                    &order.client_id,
                    &order.branch_id,
                    &order.delivery_type,
                    &order.address,
                    &order.courier_id,
                    &order.price,
                    &order.delivery_price,
                    &order.discount,
                    &order.status,
                    &order.payment_type,
                    &order.id,
                    &order.order_uid,
                ],
            )
            .await?;
        if affected == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn delete(&self, id: i32) -> Result<(), RepositoryError> {
        let query = "UPDATE orders SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL";
        let conn = self.db.get().await?;
        let affected = conn.execute(query, &[&id]).await?;
        if affected == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn get_status(&self, order_uid: &str) -> Result<OrderStatus, RepositoryError> {
        let query = "SELECT status FROM orders WHERE order_uid = $1 AND deleted_at IS NULL";
        let conn = self.db.get().await?;
        let row = conn.query_opt(query, &[&order_uid]).await?;
        match row {
            Some(row) => Ok(row.get("status")),
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn advance_status(
        &self,
        order_uid: &str,
        target: OrderStatus,
    ) -> Result<(), RepositoryError> {
        let current = self.get_status(order_uid).await?;

        let required = target.required_predecessor().ok_or(
            RepositoryError::InvalidTransition {
                from: current,
                to: target,
            },
        )?;
        if current != required {
            return Err(RepositoryError::InvalidTransition {
                from: current,
                to: target,
            });
        }

        // The status guard makes the write a no-op if another caller moved
        // the order between our read and this update.
        let query = r#"
            UPDATE orders
            SET status = $1, updated_at = NOW()
            WHERE order_uid = $2 AND status = $3 AND deleted_at IS NULL
        "#;
        let conn = self.db.get().await?;
        let affected = conn.execute(query, &[&target, &order_uid, &current]).await?;
        if affected == 0 {
            let from = self.get_status(order_uid).await?;
            return Err(RepositoryError::InvalidTransition { from, to: target });
        }
        Ok(())
    }

    async fn reassign(&self, order_uid: &str) -> Result<(), RepositoryError> {
        let query = r#"
            UPDATE orders
            SET courier_id = 0, status = 'accepted', updated_at = NOW()
            WHERE order_uid = $1 AND deleted_at IS NULL
        "#;
        let conn = self.db.get().await?;
        let affected = conn.execute(query, &[&order_uid]).await?;
        if affected == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn assign_courier(
        &self,
        order_uid: &str,
        courier_id: i32,
    ) -> Result<(), RepositoryError> {
        let query = r#"
            UPDATE orders
            SET courier_id = $1, updated_at = NOW()
            WHERE order_uid = $2 AND deleted_at IS NULL
        "#;
        let conn = self.db.get().await?;
        let affected = conn.execute(query, &[&courier_id, &order_uid]).await?;
        if affected == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn list_acceptable(
        &self,
        branch_id: Option<i32>,
    ) -> Result<Vec<Order>, RepositoryError> {
        let conn = self.db.get().await?;
        let rows = match branch_id {
            Some(branch_id) => {
                let query = format!(
                    "SELECT {ORDER_COLUMNS} FROM orders \
                     WHERE deleted_at IS NULL AND courier_id = 0 \
                       AND status IN ('accepted', 'ready_in_branch') \
                       AND branch_id = $1 \
                     ORDER BY created_at DESC"
                );
                conn.query(&query, &[&branch_id]).await?
            }
            None => {
                let query = format!(
                    "SELECT {ORDER_COLUMNS} FROM orders \
                     WHERE deleted_at IS NULL AND courier_id = 0 \
                       AND status IN ('accepted', 'ready_in_branch') \
                     ORDER BY created_at DESC"
                );
                conn.query(&query, &[]).await?
            }
        };
        Ok(rows.iter().map(order_from_row).collect())
    }

    async fn list_accepted(&self, courier_id: i32) -> Result<Vec<Order>, RepositoryError> {
        let query = format!(
            "SELECT {ORDER_COLUMNS} FROM orders \
             WHERE deleted_at IS NULL AND courier_id = $1 \
               AND status IN ('courier_accepted', 'on_way') \
             ORDER BY created_at DESC"
        );
        let conn = self.db.get().await?;
        let rows = conn.query(&query, &[&courier_id]).await?;
        Ok(rows.iter().map(order_from_row).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::build_filter;
    use model::OrderFilter;

    #[test]
    fn test_empty_filter_only_excludes_deleted() {
        let filter = OrderFilter::default();
        let (sql, params) = build_filter(&filter);
        assert_eq!(sql, "deleted_at IS NULL");
        assert!(params.is_empty());
    }

    #[test]
    fn test_filter_placeholders_are_sequential() {
        let filter = OrderFilter {
            client_id: Some(5),
            courier_id: Some(2),
            price_from: Some(10.0),
            price_to: Some(99.0),
            ..Default::default()
        };
        let (sql, params) = build_filter(&filter);
        assert_eq!(
            sql,
            "deleted_at IS NULL AND client_id = $1 AND courier_id = $2 \
             AND price >= $3 AND price <= $4"
        );
        assert_eq!(params.len(), 4);
    }

    #[test]
    fn test_filter_equality_predicates() {
        let filter = OrderFilter {
            order_uid: Some("abc".to_string()),
            payment_type: Some("cash".to_string()),
            delivery_type: Some("delivery".to_string()),
            ..Default::default()
        };
        let (sql, _) = build_filter(&filter);
        assert!(sql.contains("order_uid = $1"));
        assert!(sql.contains("payment_type = $2"));
        assert!(sql.contains("delivery_type = $3"));
    }
}
