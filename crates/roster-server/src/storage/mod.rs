//! Storage layer
//!
//! One polymorphic user store with two variants: PostgreSQL when a database
//! URL is configured and reachable, an in-process map otherwise. The variant
//! is chosen once at startup and never revisited; handlers cannot tell which
//! one is active.

pub mod db;
pub mod memory;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{NewUser, User};

pub use db::Database;
pub use memory::MemoryStore;

/// Errors produced by a user store.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("user not found")]
    NotFound,
    #[error("email already exists")]
    EmailTaken,
    #[error(transparent)]
    Backend(#[from] sqlx::Error),
}

/// Which storage variant is serving requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Postgres,
    Memory,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Postgres => f.write_str("postgres"),
            BackendKind::Memory => f.write_str("in-memory"),
        }
    }
}

/// User store contract, identical regardless of variant.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// All users, newest first.
    async fn list_users(&self) -> Result<Vec<User>, StorageError>;

    async fn get_user(&self, id: i32) -> Result<Option<User>, StorageError>;

    /// Assigns id and `created_at`, persists, and returns the new record.
    /// Fails with `EmailTaken` if the email already exists (case-insensitive).
    async fn create_user(&self, input: &NewUser) -> Result<User, StorageError>;

    /// Replaces name/email/age in place. `id` and `created_at` are immutable.
    /// Fails with `EmailTaken` if the email collides with a different user's.
    async fn update_user(&self, id: i32, input: &NewUser) -> Result<User, StorageError>;

    /// Hard delete, no tombstone. The id is never reassigned afterwards.
    async fn delete_user(&self, id: i32) -> Result<(), StorageError>;

    async fn count_users(&self) -> Result<u64, StorageError>;

    fn kind(&self) -> BackendKind;

    /// Release any held connections before shutdown.
    async fn close(&self);
}

/// Select the storage variant for the lifetime of the process.
///
/// PostgreSQL is the default whenever a URL is configured. If connecting or
/// creating the table fails, the failure is logged and the in-memory fallback
/// is substituted; no reconnection is attempted afterwards.
pub async fn connect(database_url: Option<&str>) -> Arc<dyn UserStore> {
    match database_url {
        Some(url) => match Database::connect(url).await {
            Ok(database) => {
                tracing::info!("PostgreSQL storage initialized");
                Arc::new(database)
            }
            Err(e) => {
                tracing::warn!(
                    "PostgreSQL initialization failed, falling back to in-memory storage: {:#}",
                    e
                );
                Arc::new(MemoryStore::new())
            }
        },
        None => {
            tracing::info!("DATABASE_URL not set, using in-memory storage");
            Arc::new(MemoryStore::new())
        }
    }
}
