//! Branches repository. `list_active` returns the branches whose work
//! window contains the given wall-clock time, used by the gateway's
//! active-branch endpoint.

use async_trait::async_trait;
use deadpool_postgres::Pool;
use model::Branch;
use tokio_postgres::Row;

use crate::RepositoryError;

const BRANCH_COLUMNS: &str = r#"
    id, name, address, phone, work_hour_start, work_hour_end,
    delivery_tariff_id, created_at, updated_at
"#;

#[derive(Debug, Clone)]
pub struct BranchData {
    pub name: String,
    pub address: String,
    pub phone: String,
    pub work_hour_start: String,
    pub work_hour_end: String,
    pub delivery_tariff_id: i32,
}

/// # BranchesRepository
///
/// Repository interface for managing branches. Each branch references
/// exactly one delivery tariff.
#[async_trait]
pub trait BranchesRepository: Send + Sync {
    async fn create(&self, branch: &BranchData) -> Result<i32, RepositoryError>;
    async fn get(&self, id: i32) -> Result<Branch, RepositoryError>;
    async fn list(&self, page: i64, limit: i64) -> Result<(Vec<Branch>, i64), RepositoryError>;
    async fn update(&self, id: i32, branch: &BranchData) -> Result<(), RepositoryError>;
    async fn delete(&self, id: i32) -> Result<(), RepositoryError>;

    /// Branches open at `now` ("HH:MM:SS"), paginated.
    async fn list_active(
        &self,
        now: &str,
        page: i64,
        limit: i64,
    ) -> Result<(Vec<Branch>, i64), RepositoryError>;
}

/// PostgreSQL implementation of the [`BranchesRepository`] trait.
pub struct PgBranchesRepository {
    db: Pool,
}

impl PgBranchesRepository {
    pub fn new(db: Pool) -> Self {
        Self { db }
    }
}

fn branch_from_row(row: &Row) -> Branch {
    Branch {
        id: row.get("id"),
        name: row.get("name"),
        address: row.get("address"),
        phone: row.get("phone"),
        work_hour_start: row.get("work_hour_start"),
        work_hour_end: row.get("work_hour_end"),
        delivery_tariff_id: row.get("delivery_tariff_id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[async_trait]
impl BranchesRepository for PgBranchesRepository {
    async fn create(&self, branch: &BranchData) -> Result<i32, RepositoryError> {
        let query = r#"
            INSERT INTO branches (name, address, phone, work_hour_start, work_hour_end, delivery_tariff_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
        "#;
        let conn = self.db.get().await?;
        let row = conn
            .query_one(
                query,
                &[
                    &branch.name,
                    &branch.address,
                    &branch.phone,
                    &branch.work_hour_start,
                    &branch.work_hour_end,
                    &branch.delivery_tariff_id,
                ],
            )
            .await?;
        Ok(row.get("id"))
    }

    async fn get(&self, id: i32) -> Result<Branch, RepositoryError> {
        let query =
            format!("SELECT {BRANCH_COLUMNS} FROM branches WHERE id = $1 AND deleted_at IS NULL");
        let conn = self.db.get().await?;
        let row = conn.query_opt(&query, &[&id]).await?;
        match row {
            Some(row) => Ok(branch_from_row(&row)),
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn list(&self, page: i64, limit: i64) -> Result<(Vec<Branch>, i64), RepositoryError> {
        let conn = self.db.get().await?;
        let total: i64 = conn
            .query_one("SELECT count(*) FROM branches WHERE deleted_at IS NULL", &[])
            .await?
            .get(0);

        let offset = (page - 1) * limit;
        let query = format!(
            "SELECT {BRANCH_COLUMNS} FROM branches WHERE deleted_at IS NULL \
             ORDER BY created_at DESC LIMIT $1 OFFSET $2"
        );
        let rows = conn.query(&query, &[&limit, &offset]).await?;
        Ok((rows.iter().map(branch_from_row).collect(), total))
    }

    async fn update(&self, id: i32, branch: &BranchData) -> Result<(), RepositoryError> {
        let query = r#"
            UPDATE branches
            SET name = $1, address = $2, phone = $3, work_hour_start = $4,
                work_hour_end = $5, delivery_tariff_id = $6, updated_at = NOW()
            WHERE id = $7 AND deleted_at IS NULL
        "#;
        let conn = self.db.get().await?;
        let affected = conn
            .execute(
                query,
                &[
                    &branch.name,
                    &branch.address,
                    &branch.phone,
                    &branch.work_hour_start,
                    &branch.work_hour_end,
                    &branch.delivery_tariff_id,
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
        let query = "UPDATE branches SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL";
        let conn = self.db.get().await?;
        let affected = conn.execute(query, &[&id]).await?;
        if affected == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn list_active(
        &self,
        now: &str,
        page: i64,
        limit: i64,
    ) -> Result<(Vec<Branch>, i64), RepositoryError> {
        let conn = self.db.get().await?;
        let total: i64 = conn
            .query_one(
                "SELECT count(*) FROM branches \
                 WHERE deleted_at IS NULL AND work_hour_start <= $1 AND work_hour_end >= $1",
                &[&now],
            )
            .await?
            .get(0);

        let offset = (page - 1) * limit;
        let query = format!(
            "SELECT {BRANCH_COLUMNS} FROM branches \
             WHERE deleted_at IS NULL AND work_hour_start <= $1 AND work_hour_end >= $1 \
             ORDER BY created_at DESC LIMIT $2 OFFSET $3"
        );
        let rows = conn.query(&query, &[&now, &limit, &offset]).await?;
        Ok((rows.iter().map(branch_from_row).collect(), total))
    }
}
