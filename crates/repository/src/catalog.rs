//! Products and categories repositories.

use async_trait::async_trait;
use deadpool_postgres::Pool;
use model::{Category, Product};
use tokio_postgres::Row;

use crate::RepositoryError;

#[derive(Debug, Clone)]
pub struct ProductData {
    pub name: String,
    pub price: f64,
    pub category_id: i32,
}

#[derive(Debug, Clone)]
pub struct CategoryData {
    pub name: String,
    pub parent_id: Option<i32>,
}

/// # ProductsRepository
#[async_trait]
pub trait ProductsRepository: Send + Sync {
    async fn create(&self, product: &ProductData) -> Result<i32, RepositoryError>;
    async fn get(&self, id: i32) -> Result<Product, RepositoryError>;
    async fn list(&self, page: i64, limit: i64) -> Result<(Vec<Product>, i64), RepositoryError>;
    async fn update(&self, id: i32, product: &ProductData) -> Result<(), RepositoryError>;
    async fn delete(&self, id: i32) -> Result<(), RepositoryError>;
}

/// # CategoriesRepository
#[async_trait]
pub trait CategoriesRepository: Send + Sync {
    async fn create(&self, category: &CategoryData) -> Result<i32, RepositoryError>;
    async fn get(&self, id: i32) -> Result<Category, RepositoryError>;
    async fn list(&self, page: i64, limit: i64) -> Result<(Vec<Category>, i64), RepositoryError>;
    async fn update(&self, id: i32, category: &CategoryData) -> Result<(), RepositoryError>;
    async fn delete(&self, id: i32) -> Result<(), RepositoryError>;
}

/// PostgreSQL implementation of the [`ProductsRepository`] trait.
pub struct PgProductsRepository {
    db: Pool,
}

impl PgProductsRepository {
    pub fn new(db: Pool) -> Self {
        Self { db }
    }
}

fn product_from_row(row: &Row) -> Product {
    Product {
        id: row.get("id"),
        name: row.get("name"),
        price: row.get("price"),
        category_id: row.get("category_id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[async_trait]
impl ProductsRepository for PgProductsRepository {
    async fn create(&self, product: &ProductData) -> Result<i32, RepositoryError> {
        let query = r#"
            INSERT INTO products (name, price, category_id)
            VALUES ($1, $2, $3)
            RETURNING id
        "#;
        let conn = self.db.get().await?;
        let row = conn
            .query_one(query, &[&product.name, &product.price, &product.category_id])
            .await?;
        Ok(row.get("id"))
    }

    async fn get(&self, id: i32) -> Result<Product, RepositoryError> {
        let query = "SELECT id, name, price, category_id, created_at, updated_at \
                     FROM products WHERE id = $1 AND deleted_at IS NULL";
        let conn = self.db.get().await?;
        let row = conn.query_opt(query, &[&id]).await?;
        match row {
            Some(row) => Ok(product_from_row(&row)),
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn list(&self, page: i64, limit: i64) -> Result<(Vec<Product>, i64), RepositoryError> {
        let conn = self.db.get().await?;
        let total: i64 = conn
            .query_one("SELECT count(*) FROM products WHERE deleted_at IS NULL", &[])
            .await?
            .get(0);

        let offset = (page - 1) * limit;
        let query = "SELECT id, name, price, category_id, created_at, updated_at \
                     FROM products WHERE deleted_at IS NULL \
                     ORDER BY created_at DESC LIMIT $1 OFFSET $2";
        let rows = conn.query(query, &[&limit, &offset]).await?;
        Ok((rows.iter().map(product_from_row).collect(), total))
    }

    async fn update(&self, id: i32, product: &ProductData) -> Result<(), RepositoryError> {
        let query = r#"
            UPDATE products
            SET name = $1, price = $2, category_id = $3, updated_at = NOW()
            WHERE id = $4 AND deleted_at IS NULL
        "#;
        let conn = self.db.get().await?;
        let affected = conn
            .execute(
                query,
                &[&product.name, &product.price, &product.category_id, &id],
            )
            .await?;
        if affected == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn delete(&self, id: i32) -> Result<(), RepositoryError> {
        let query = "UPDATE products SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL";
        let conn = self.db.get().await?;
        let affected = conn.execute(query, &[&id]).await?;
        if affected == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

/// PostgreSQL implementation of the [`CategoriesRepository`] trait.
pub struct PgCategoriesRepository {
    db: Pool,
}

impl PgCategoriesRepository {
    pub fn new(db: Pool) -> Self {
        Self { db }
    }
}

fn category_from_row(row: &Row) -> Category {
    Category {
        id: row.get("id"),
        name: row.get("name"),
        parent_id: row.get("parent_id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[async_trait]
impl CategoriesRepository for PgCategoriesRepository {
    async fn create(&self, category: &CategoryData) -> Result<i32, RepositoryError> {
        let query = r#"
            INSERT INTO categories (name, parent_id)
            VALUES ($1, $2)
            RETURNING id
        "#;
        let conn = self.db.get().await?;
        let row = conn
            .query_one(query, &[&category.name, &category.parent_id])
            .await?;
        Ok(row.get("id"))
    }

    async fn get(&self, id: i32) -> Result<Category, RepositoryError> {
        let query = "SELECT id, name, parent_id, created_at, updated_at \
                     FROM categories WHERE id = $1 AND deleted_at IS NULL";
        let conn = self.db.get().await?;
        let row = conn.query_opt(query, &[&id]).await?;
        match row {
            Some(row) => Ok(category_from_row(&row)),
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn list(&self, page: i64, limit: i64) -> Result<(Vec<Category>, i64), RepositoryError> {
        let conn = self.db.get().await?;
        let total: i64 = conn
            .query_one(
                "SELECT count(*) FROM categories WHERE deleted_at IS NULL",
                &[],
            )
            .await?
            .get(0);

        let offset = (page - 1) * limit;
        let query = "SELECT id, name, parent_id, created_at, updated_at \
                     FROM categories WHERE deleted_at IS NULL \
                     ORDER BY created_at DESC LIMIT $1 OFFSET $2";
        let rows = conn.query(query, &[&limit, &offset]).await?;
        Ok((rows.iter().map(category_from_row).collect(), total))
    }

    async fn update(&self, id: i32, category: &CategoryData) -> Result<(), RepositoryError> {
        let query = r#"
            UPDATE categories
            SET name = $1, parent_id = $2, updated_at = NOW()
            WHERE id = $3 AND deleted_at IS NULL
        "#;
        let conn = self.db.get().await?;
        let affected = conn
            .execute(query, &[&category.name, &category.parent_id, &id])
            .await?;
        if affected == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn delete(&self, id: i32) -> Result<(), RepositoryError> {
        let query = "UPDATE categories SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL";
        let conn = self.db.get().await?;
        let affected = conn.execute(query, &[&id]).await?;
        if affected == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
