//! Users repository. Users are back-office accounts; `get_by_login`
//! backs the login flow.

use async_trait::async_trait;
use deadpool_postgres::Pool;
use model::User;
use tokio_postgres::Row;

use crate::RepositoryError;

const USER_COLUMNS: &str =
    "id, first_name, last_name, phone, login, password_hash, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct UserData {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub login: String,
    pub password_hash: String,
}

/// # UsersRepository
///
/// Repository interface for managing users.
#[async_trait]
pub trait UsersRepository: Send + Sync {
    async fn create(&self, user: &UserData) -> Result<i32, RepositoryError>;
    async fn get(&self, id: i32) -> Result<User, RepositoryError>;
    async fn get_by_login(&self, login: &str) -> Result<User, RepositoryError>;
    async fn list(&self, page: i64, limit: i64) -> Result<(Vec<User>, i64), RepositoryError>;
    async fn update(&self, id: i32, user: &UserData) -> Result<(), RepositoryError>;
    async fn delete(&self, id: i32) -> Result<(), RepositoryError>;
}

/// PostgreSQL implementation of the [`UsersRepository`] trait.
pub struct PgUsersRepository {
    db: Pool,
}

impl PgUsersRepository {
    pub fn new(db: Pool) -> Self {
        Self { db }
    }
}

fn user_from_row(row: &Row) -> User {
    User {
        id: row.get("id"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        phone: row.get("phone"),
        login: row.get("login"),
        password_hash: row.get("password_hash"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[async_trait]
impl UsersRepository for PgUsersRepository {
    async fn create(&self, user: &UserData) -> Result<i32, RepositoryError> {
        let query = r#"
            INSERT INTO users (first_name, last_name, phone, login, password_hash)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
        "#;
        let conn = self.db.get().await?;
        let row = conn
            .query_one(
                query,
                &[
                    &user.first_name,
                    &user.last_name,
                    &user.phone,
                    &user.login,
                    &user.password_hash,
                ],
            )
            .await?;
        Ok(row.get("id"))
    }

    async fn get(&self, id: i32) -> Result<User, RepositoryError> {
        let query =
            format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND deleted_at IS NULL");
        let conn = self.db.get().await?;
        let row = conn.query_opt(&query, &[&id]).await?;
        match row {
            Some(row) => Ok(user_from_row(&row)),
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn get_by_login(&self, login: &str) -> Result<User, RepositoryError> {
        let query =
            format!("SELECT {USER_COLUMNS} FROM users WHERE login = $1 AND deleted_at IS NULL");
        let conn = self.db.get().await?;
        let row = conn.query_opt(&query, &[&login]).await?;
        match row {
            Some(row) => Ok(user_from_row(&row)),
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn list(&self, page: i64, limit: i64) -> Result<(Vec<User>, i64), RepositoryError> {
        let conn = self.db.get().await?;
        let total: i64 = conn
            .query_one("SELECT count(*) FROM users WHERE deleted_at IS NULL", &[])
            .await?
            .get(0);

        let offset = (page - 1) * limit;
        let query = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE deleted_at IS NULL \
             ORDER BY created_at DESC LIMIT $1 OFFSET $2"
        );
        let rows = conn.query(&query, &[&limit, &offset]).await?;
        Ok((rows.iter().map(user_from_row).collect(), total))
    }

    async fn update(&self, id: i32, user: &UserData) -> Result<(), RepositoryError> {
        let query = r#"
            UPDATE users
            SET first_name = $1, last_name = $2, phone = $3,
                login = $4, password_hash = $5, updated_at = NOW()
            WHERE id = $6 AND deleted_at IS NULL
        "#;
        let conn = self.db.get().await?;
        let affected = conn
            .execute(
                query,
                &[
                    &user.first_name,
                    &user.last_name,
                    &user.phone,
                    &user.login,
                    &user.password_hash,
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
        let query = "UPDATE users SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL";
        let conn = self.db.get().await?;
        let affected = conn.execute(query, &[&id]).await?;
        if affected == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
