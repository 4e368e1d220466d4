//! User types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored user record
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub age: Option<i32>,
    pub created_at: DateTime<Utc>,
}

/// Validated, normalized fields ready for a storage write.
///
/// `email` is already trimmed and lower-cased by the time this exists.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub age: Option<i32>,
}

/// Incoming create/update body.
///
/// `age` stays a raw JSON value so unusable inputs can be nulled instead of
/// rejected; `name` and `email` are checked after trimming.
#[derive(Debug, Clone, Deserialize)]
pub struct UserPayload {
    pub name: Option<String>,
    pub email: Option<String>,
    pub age: Option<serde_json::Value>,
}
