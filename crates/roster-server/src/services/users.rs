//! User service
//!
//! Validation and normalization shared by the create and update paths, in
//! front of whichever storage variant is active.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::info;

use crate::error::ApiError;
use crate::models::{NewUser, User, UserPayload};
use crate::storage::{BackendKind, UserStore};

/// local@domain.tld shape: no whitespace, a single `@` before the dot.
static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.\S+$").expect("email pattern compiles"));

pub struct UserService {
    store: Arc<dyn UserStore>,
}

impl UserService {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> Result<Vec<User>, ApiError> {
        Ok(self.store.list_users().await?)
    }

    pub async fn get(&self, id: i32) -> Result<User, ApiError> {
        self.store.get_user(id).await?.ok_or(ApiError::NotFound)
    }

    pub async fn create(&self, payload: UserPayload) -> Result<User, ApiError> {
        let input = validate(payload)?;
        let user = self.store.create_user(&input).await?;
        info!("Created user {} <{}>", user.id, user.email);

        Ok(user)
    }

    pub async fn update(&self, id: i32, payload: UserPayload) -> Result<User, ApiError> {
        let input = validate(payload)?;
        let user = self.store.update_user(id, &input).await?;
        info!("Updated user {}", user.id);

        Ok(user)
    }

    pub async fn delete(&self, id: i32) -> Result<(), ApiError> {
        self.store.delete_user(id).await?;
        info!("Deleted user {}", id);

        Ok(())
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.store.kind()
    }

    /// Record count for the health report, with a flag for whether the probe
    /// succeeded. Never fails: a storage error is logged and reported as zero.
    pub async fn user_count(&self) -> (u64, bool) {
        match self.store.count_users().await {
            Ok(n) => (n, true),
            Err(e) => {
                tracing::error!("Health probe failed to count users: {}", e);
                (0, false)
            }
        }
    }
}

/// Field validation applied identically on create and update.
fn validate(payload: UserPayload) -> Result<NewUser, ApiError> {
    let name = payload.name.as_deref().map(str::trim).unwrap_or_default();
    let email = payload.email.as_deref().map(str::trim).unwrap_or_default();

    if name.is_empty() || email.is_empty() {
        return Err(ApiError::Validation("Name and email are required"));
    }
    if !EMAIL_RE.is_match(email) {
        return Err(ApiError::Validation("Invalid email format"));
    }

    Ok(NewUser {
        name: name.to_string(),
        email: email.to_lowercase(),
        age: coerce_age(payload.age.as_ref()),
    })
}

/// Parse-or-null: an unusable age is stored as null rather than rejected.
fn coerce_age(age: Option<&Value>) -> Option<i32> {
    match age? {
        Value::Number(n) => n.as_i64().and_then(|n| i32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
