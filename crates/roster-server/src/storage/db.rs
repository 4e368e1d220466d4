//! PostgreSQL storage layer

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::models::{NewUser, User};

use super::{BackendKind, StorageError, UserStore};

pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Connect to PostgreSQL and make sure the users table exists.
    pub async fn connect(database_url: &str) -> Result<Self> {
        tracing::info!("Connecting to PostgreSQL...");

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .context("Failed to connect to PostgreSQL")?;

        tracing::info!("PostgreSQL connection established, ensuring schema...");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id SERIAL PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT UNIQUE NOT NULL,
                age INTEGER,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&pool)
        .await
        .context("Failed to create users table")?;

        tracing::info!("Database initialization complete");

        Ok(Self { pool })
    }

    /// Application-level uniqueness check; the UNIQUE constraint backstops it.
    async fn email_taken(&self, email: &str, exclude_id: Option<i32>) -> Result<bool, sqlx::Error> {
        let existing: Option<i32> = sqlx::query_scalar(
            r#"
            SELECT id FROM users
            WHERE LOWER(email) = $1 AND id IS DISTINCT FROM $2
            LIMIT 1
            "#,
        )
        .bind(email)
        .bind(exclude_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(existing.is_some())
    }
}

#[async_trait]
impl UserStore for Database {
    async fn list_users(&self) -> Result<Vec<User>, StorageError> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, age, created_at
            FROM users
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    async fn get_user(&self, id: i32) -> Result<Option<User>, StorageError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, age, created_at
            FROM users WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn create_user(&self, input: &NewUser) -> Result<User, StorageError> {
        if self.email_taken(&input.email, None).await? {
            return Err(StorageError::EmailTaken);
        }

        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, age)
            VALUES ($1, $2, $3)
            RETURNING id, name, email, age, created_at
            "#,
        )
        .bind(&input.name)
        .bind(&input.email)
        .bind(input.age)
        .fetch_one(&self.pool)
        .await
        .map_err(map_unique_violation)
    }

    async fn update_user(&self, id: i32, input: &NewUser) -> Result<User, StorageError> {
        if self.email_taken(&input.email, Some(id)).await? {
            return Err(StorageError::EmailTaken);
        }

        sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET name = $1, email = $2, age = $3
            WHERE id = $4
            RETURNING id, name, email, age, created_at
            "#,
        )
        .bind(&input.name)
        .bind(&input.email)
        .bind(input.age)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_unique_violation)?
        .ok_or(StorageError::NotFound)
    }

    async fn delete_user(&self, id: i32) -> Result<(), StorageError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }

        Ok(())
    }

    async fn count_users(&self) -> Result<u64, StorageError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        Ok(count as u64)
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Postgres
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

/// Concurrent creates can race past the application-level check; SQLSTATE
/// 23505 from the UNIQUE constraint maps to the same conflict signal instead
/// of leaking driver text to the client.
fn map_unique_violation(e: sqlx::Error) -> StorageError {
    match &e {
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
            StorageError::EmailTaken
        }
        _ => StorageError::Backend(e),
    }
}
