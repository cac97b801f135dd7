//! Clients repository. Besides plain CRUD it owns the aggregate update
//! applied when one of the client's orders finishes.

use async_trait::async_trait;
use deadpool_postgres::Pool;
use model::Client;
use tokio_postgres::Row;

use crate::RepositoryError;

const CLIENT_COLUMNS: &str = r#"
    id, first_name, last_name, phone, discount_type, discount_amount,
    total_orders_count, total_orders_sum, last_ordered_date, created_at, updated_at
"#;

/// Creation/update payload for a client.
#[derive(Debug, Clone)]
pub struct ClientData {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub discount_type: String,
    pub discount_amount: f64,
}

/// # ClientsRepository
///
/// Repository interface for managing clients and their running order
/// aggregates (`total_orders_count`, `total_orders_sum`,
/// `last_ordered_date`).
#[async_trait]
pub trait ClientsRepository: Send + Sync {
    async fn create(&self, client: &ClientData) -> Result<i32, RepositoryError>;
    async fn get(&self, id: i32) -> Result<Client, RepositoryError>;
    async fn list(&self, page: i64, limit: i64) -> Result<(Vec<Client>, i64), RepositoryError>;
    async fn update(&self, id: i32, client: &ClientData) -> Result<(), RepositoryError>;
    async fn delete(&self, id: i32) -> Result<(), RepositoryError>;

    /// Bump the aggregates after an order of this client finished: one more
    /// order, its price added to the running sum, ordered-date refreshed.
    async fn apply_finished_order(&self, id: i32, price: f64) -> Result<(), RepositoryError>;
}

/// PostgreSQL implementation of the [`ClientsRepository`] trait.
pub struct PgClientsRepository {
    db: Pool,
}

impl PgClientsRepository {
    pub fn new(db: Pool) -> Self {
        Self { db }
    }
}

fn client_from_row(row: &Row) -> Client {
    Client {
        id: row.get("id"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        phone: row.get("phone"),
        discount_type: row.get("discount_type"),
        discount_amount: row.get("discount_amount"),
        total_orders_count: row.get("total_orders_count"),
        total_orders_sum: row.get("total_orders_sum"),
        last_ordered_date: row.get("last_ordered_date"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[async_trait]
impl ClientsRepository for PgClientsRepository {
    async fn create(&self, client: &ClientData) -> Result<i32, RepositoryError> {
        let query = r#"
            INSERT INTO clients (first_name, last_name, phone, discount_type, discount_amount)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
        "#;
        let conn = self.db.get().await?;
        let row = conn
            .query_one(
                query,
                &[
                    &client.first_name,
                    &client.last_name,
                    &client.phone,
                    &client.discount_type,
                    &client.discount_amount,
                ],
            )
            .await?;
        Ok(row.get("id"))
    }

    async fn get(&self, id: i32) -> Result<Client, RepositoryError> {
        let query =
            format!("SELECT {CLIENT_COLUMNS} FROM clients WHERE id = $1 AND deleted_at IS NULL");
        let conn = self.db.get().await?;
        let row = conn.query_opt(&query, &[&id]).await?;
        match row {
            Some(row) => Ok(client_from_row(&row)),
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn list(&self, page: i64, limit: i64) -> Result<(Vec<Client>, i64), RepositoryError> {
        let conn = self.db.get().await?;
        let total: i64 = conn
            .query_one("SELECT count(*) FROM clients WHERE deleted_at IS NULL", &[])
            .await?
            .get(0);

        let offset = (page - 1) * limit;
        let query = format!(
            "SELECT {CLIENT_COLUMNS} FROM clients WHERE deleted_at IS NULL \
             ORDER BY created_at DESC LIMIT $1 OFFSET $2"
        );
        let rows = conn.query(&query, &[&limit, &offset]).await?;
        Ok((rows.iter().map(client_from_row).collect(), total))
    }

    async fn update(&self, id: i32, client: &ClientData) -> Result<(), RepositoryError> {
        let query = r#"
            UPDATE clients
            SET first_name = $1, last_name = $2, phone = $3,
                discount_type = $4, discount_amount = $5, updated_at = NOW()
            WHERE id = $6 AND deleted_at IS NULL
        "#;
        let conn = self.db.get().await?;
        let affected = conn
            .execute(
                query,
                &[
                    &client.first_name,
                    &client.last_name,
                    &client.phone,
                    &client.discount_type,
                    &client.discount_amount,
                    &id,
                ],
            )
            .await?;
        if affected == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn delete(&self, id: i32) -> Result<(), RepositoryError> {
        let query = "UPDATE clients SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL";
        let conn = self.db.get().await?;
        let affected = conn.execute(query, &[&id]).await?;
        if affected == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn apply_finished_order(&self, id: i32, price: f64) -> Result<(), RepositoryError> {
        let query = r#"
            UPDATE clients
            SET total_orders_count = total_orders_count + 1,
                total_orders_sum = total_orders_sum + $1,
                last_ordered_date = NOW(),
                updated_at = NOW()
            WHERE id = $2 AND deleted_at IS NULL
        "#;
        let conn = self.db.get().await?;
        let affected = conn.execute(query, &[&price, &id]).await?;
        if affected == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
