//! Delivery tariffs repository. Tariffs are loaded together with their
//! price brackets; `alternative`-type tariffs use brackets, `fixed`
//! tariffs only their base price.

use async_trait::async_trait;
use deadpool_postgres::Pool;
use model::{DeliveryTariff, TariffBracket};
use tokio_postgres::Row;

use crate::RepositoryError;

#[derive(Debug, Clone)]
pub struct TariffData {
    pub name: String,
    pub tariff_type: String,
    pub base_price: f64,
    pub brackets: Vec<TariffBracket>,
}

/// # TariffsRepository
///
/// Repository interface for managing delivery tariffs and their brackets.
#[async_trait]
pub trait TariffsRepository: Send + Sync {
    async fn create(&self, tariff: &TariffData) -> Result<i32, RepositoryError>;
    async fn get(&self, id: i32) -> Result<DeliveryTariff, RepositoryError>;

    /// List tariffs, optionally restricted to one tariff type
    /// ("fixed" / "alternative"), with brackets loaded.
    async fn list(
        &self,
        tariff_type: Option<&str>,
        page: i64,
        limit: i64,
    ) -> Result<(Vec<DeliveryTariff>, i64), RepositoryError>;

    /// Replaces the tariff fields and its whole bracket set.
    async fn update(&self, id: i32, tariff: &TariffData) -> Result<(), RepositoryError>;
    async fn delete(&self, id: i32) -> Result<(), RepositoryError>;
}

/// PostgreSQL implementation of the [`TariffsRepository`] trait.
pub struct PgTariffsRepository {
    db: Pool,
}

impl PgTariffsRepository {
    pub fn new(db: Pool) -> Self {
        Self { db }
    }
}

fn tariff_from_row(row: &Row) -> DeliveryTariff {
    DeliveryTariff {
        id: row.get("id"),
        name: row.get("name"),
        tariff_type: row.get("tariff_type"),
        base_price: row.get("base_price"),
        brackets: Vec::new(),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

impl PgTariffsRepository {
    async fn load_brackets(
        &self,
        conn: &deadpool_postgres::Object,
        tariff_id: i32,
    ) -> Result<Vec<TariffBracket>, RepositoryError> {
        let rows = conn
            .query(
                "SELECT from_price, to_price, price FROM tariff_brackets \
                 WHERE tariff_id = $1 ORDER BY from_price",
                &[&tariff_id],
            )
            .await?;
        Ok(rows
            .iter()
            .map(|row| TariffBracket {
                from_price: row.get("from_price"),
                to_price: row.get("to_price"),
                price: row.get("price"),
            })
            .collect())
    }

    async fn insert_brackets(
        &self,
        conn: &deadpool_postgres::Object,
        tariff_id: i32,
        brackets: &[TariffBracket],
    ) -> Result<(), RepositoryError> {
        let query = "INSERT INTO tariff_brackets (tariff_id, from_price, to_price, price) \
                     VALUES ($1, $2, $3, $4)";
        for bracket in brackets {
            conn.execute(
                query,
                &[
                    &tariff_id,
                    &bracket.from_price,
                    &bracket.to_price,
                    &bracket.price,
                ],
            )
            .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl TariffsRepository for PgTariffsRepository {
    async fn create(&self, tariff: &TariffData) -> Result<i32, RepositoryError> {
        let query = r#"
            INSERT INTO delivery_tariffs (name, tariff_type, base_price)
            VALUES ($1, $2, $3)
            RETURNING id
        "#;
        let conn = self.db.get().await?;
        let row = conn
            .query_one(
                query,
                &[&tariff.name, &tariff.tariff_type, &tariff.base_price],
            )
            .await?;
        let id: i32 = row.get("id");
        self.insert_brackets(&conn, id, &tariff.brackets).await?;
        Ok(id)
    }

    async fn get(&self, id: i32) -> Result<DeliveryTariff, RepositoryError> {
        let query = "SELECT id, name, tariff_type, base_price, created_at, updated_at \
                     FROM delivery_tariffs WHERE id = $1 AND deleted_at IS NULL";
        let conn = self.db.get().await?;
        let row = conn.query_opt(query, &[&id]).await?;
        let mut tariff = match row {
            Some(row) => tariff_from_row(&row),
            None => return Err(RepositoryError::NotFound),
        };
        tariff.brackets = self.load_brackets(&conn, id).await?;
        Ok(tariff)
    }

    async fn list(
        &self,
        tariff_type: Option<&str>,
        page: i64,
        limit: i64,
    ) -> Result<(Vec<DeliveryTariff>, i64), RepositoryError> {
        let conn = self.db.get().await?;
        let offset = (page - 1) * limit;

        let (total, rows) = match tariff_type {
            Some(tariff_type) => {
                let total: i64 = conn
                    .query_one(
                        "SELECT count(*) FROM delivery_tariffs \
                         WHERE deleted_at IS NULL AND tariff_type = $1",
                        &[&tariff_type],
                    )
                    .await?
                    .get(0);
                let rows = conn
                    .query(
                        "SELECT id, name, tariff_type, base_price, created_at, updated_at \
                         FROM delivery_tariffs \
                         WHERE deleted_at IS NULL AND tariff_type = $1 \
                         ORDER BY created_at DESC LIMIT $2 OFFSET $3",
                        &[&tariff_type, &limit, &offset],
                    )
                    .await?;
                (total, rows)
            }
            None => {
                let total: i64 = conn
                    .query_one(
                        "SELECT count(*) FROM delivery_tariffs WHERE deleted_at IS NULL",
                        &[],
                    )
                    .await?
                    .get(0);
                let rows = conn
                    .query(
                        "SELECT id, name, tariff_type, base_price, created_at, updated_at \
                         FROM delivery_tariffs WHERE deleted_at IS NULL \
                         ORDER BY created_at DESC LIMIT $1 OFFSET $2",
                        &[&limit, &offset],
                    )
                    .await?;
                (total, rows)
            }
        };

        let mut tariffs = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut tariff = tariff_from_row(row);
            tariff.brackets = self.load_brackets(&conn, tariff.id).await?;
            tariffs.push(tariff);
        }
        Ok((tariffs, total))
    }

    async fn update(&self, id: i32, tariff: &TariffData) -> Result<(), RepositoryError> {
        let query = r#"
            UPDATE delivery_tariffs
            SET name = $1, tariff_type = $2, base_price = $3, updated_at = NOW()
            WHERE id = $4 AND deleted_at IS NULL
        "#;
        let conn = self.db.get().await?;
        let affected = conn
            .execute(
                query,
                &[&tariff.name, &tariff.tariff_type, &tariff.base_price, &id],
            )
            .await?;
        if affected == 0 {
            return Err(RepositoryError::NotFound);
        }
        conn.execute("DELETE FROM tariff_brackets WHERE tariff_id = $1", &[&id])
            .await?;
        self.insert_brackets(&conn, id, &tariff.brackets).await?;
        Ok(())
    }

    async fn delete(&self, id: i32) -> Result<(), RepositoryError> {
        let query =
            "UPDATE delivery_tariffs SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL";
        let conn = self.db.get().await?;
        let affected = conn.execute(query, &[&id]).await?;
        if affected == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
