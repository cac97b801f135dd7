//! Couriers repository. `get_by_login` backs the login flow;
//! `max_order_count` caps how many in-flight orders a courier may hold.

use async_trait::async_trait;
use deadpool_postgres::Pool;
use model::Courier;
use tokio_postgres::Row;

use crate::RepositoryError;

const COURIER_COLUMNS: &str = r#"
    id, first_name, last_name, branch_id, phone, login, password_hash,
    max_order_count, created_at, updated_at
"#;

#[derive(Debug, Clone)]
pub struct CourierData {
    pub first_name: String,
    pub last_name: String,
    pub branch_id: i32,
    pub phone: String,
    pub login: String,
    pub password_hash: String,
    pub max_order_count: i32,
}

/// # CouriersRepository
///
/// Repository interface for managing couriers.
#[async_trait]
pub trait CouriersRepository: Send + Sync {
    async fn create(&self, courier: &CourierData) -> Result<i32, RepositoryError>;
    async fn get(&self, id: i32) -> Result<Courier, RepositoryError>;
    async fn get_by_login(&self, login: &str) -> Result<Courier, RepositoryError>;
    async fn list(&self, page: i64, limit: i64) -> Result<(Vec<Courier>, i64), RepositoryError>;
    async fn update(&self, id: i32, courier: &CourierData) -> Result<(), RepositoryError>;
    async fn delete(&self, id: i32) -> Result<(), RepositoryError>;
}

/// PostgreSQL implementation of the [`CouriersRepository`] trait.
pub struct PgCouriersRepository {
    db: Pool,
}

impl PgCouriersRepository {
    pub fn new(db: Pool) -> Self {
        Self { db }
    }
}

fn courier_from_row(row: &Row) -> Courier {
    Courier {
        id: row.get("id"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        branch_id: row.get("branch_id"),
        phone: row.get("phone"),
        login: row.get("login"),
        password_hash: row.get("password_hash"),
        max_order_count: row.get("max_order_count"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[async_trait]
impl CouriersRepository for PgCouriersRepository {
    async fn create(&self, courier: &CourierData) -> Result<i32, RepositoryError> {
        let query = r#"
            INSERT INTO couriers (first_name, last_name, branch_id, phone, login, password_hash, max_order_count)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
        "#;
        let conn = self.db.get().await?;
        let row = conn
            .query_one(
                query,
                &[
                    &courier.first_name,
                    &courier.last_name,
                    &courier.branch_id,
                    &courier.phone,
                    &courier.login,
                    &courier.password_hash,
                    &courier.max_order_count,
                ],
            )
            .await?;
        Ok(row.get("id"))
    }

    async fn get(&self, id: i32) -> Result<Courier, RepositoryError> {
        let query =
            format!("SELECT {COURIER_COLUMNS} FROM couriers WHERE id = $1 AND deleted_at IS NULL");
        let conn = self.db.get().await?;
        let row = conn.query_opt(&query, &[&id]).await?;
        match row {
            Some(row) => Ok(courier_from_row(&row)),
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn get_by_login(&self, login: &str) -> Result<Courier, RepositoryError> {
        let query = format!(
            "SELECT {COURIER_COLUMNS} FROM couriers WHERE login = $1 AND deleted_at IS NULL"
        );
        let conn = self.db.get().await?;
        let row = conn.query_opt(&query, &[&login]).await?;
        match row {
            Some(row) => Ok(courier_from_row(&row)),
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn list(&self, page: i64, limit: i64) -> Result<(Vec<Courier>, i64), RepositoryError> {
        let conn = self.db.get().await?;
        let total: i64 = conn
            .query_one("SELECT count(*) FROM couriers WHERE deleted_at IS NULL", &[])
            .await?
            .get(0);

        let offset = (page - 1) * limit;
        let query = format!(
            "SELECT {COURIER_COLUMNS} FROM couriers WHERE deleted_at IS NULL \
             ORDER BY created_at DESC LIMIT $1 OFFSET $2"
        );
        let rows = conn.query(&query, &[&limit, &offset]).await?;
        Ok((rows.iter().map(courier_from_row).collect(), total))
    }

    async fn update(&self, id: i32, courier: &CourierData) -> Result<(), RepositoryError> {
        let query = r#"
            UPDATE couriers
            SET first_name = $1, last_name = $2, branch_id = $3, phone = $4,
                login = $5, password_hash = $6, max_order_count = $7, updated_at = NOW()
            WHERE id = $8 AND deleted_at IS NULL
        "#;
        let conn = self.db.get().await?;
        let affected = conn
            .execute(
                query,
                &[
                    &courier.first_name,
                    &courier.last_name,
                    &courier.branch_id,
                    &courier.phone,
                    &courier.login,
                    &courier.password_hash,
                    &courier.max_order_count,
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
        let query = "UPDATE couriers SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL";
        let conn = self.db.get().await?;
        let affected = conn.execute(query, &[&id]).await?;
        if affected == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
