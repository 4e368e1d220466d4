//! In-memory fallback store using DashMap
//!
//! Substituted when PostgreSQL cannot be initialized; seeded empty and lost
//! on restart. Unlike the database variant there is no unique-constraint
//! backstop here: the email check and the insert are separate steps, so
//! concurrent creates racing on the same email can both get through.

use std::sync::atomic::{AtomicI32, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;

use crate::models::{NewUser, User};

use super::{BackendKind, StorageError, UserStore};

pub struct MemoryStore {
    users: DashMap<i32, User>,
    next_id: AtomicI32,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
            next_id: AtomicI32::new(1),
        }
    }

    fn email_taken(&self, email: &str, exclude_id: Option<i32>) -> bool {
        self.users
            .iter()
            .any(|u| u.email.eq_ignore_ascii_case(email) && exclude_id != Some(u.id))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn list_users(&self) -> Result<Vec<User>, StorageError> {
        let mut users: Vec<User> = self.users.iter().map(|u| u.value().clone()).collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(users)
    }

    async fn get_user(&self, id: i32) -> Result<Option<User>, StorageError> {
        Ok(self.users.get(&id).map(|u| u.value().clone()))
    }

    async fn create_user(&self, input: &NewUser) -> Result<User, StorageError> {
        if self.email_taken(&input.email, None) {
            return Err(StorageError::EmailTaken);
        }

        // The counter only moves forward, so ids are never reused.
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let user = User {
            id,
            name: input.name.clone(),
            email: input.email.clone(),
            age: input.age,
            created_at: Utc::now(),
        };
        self.users.insert(id, user.clone());

        Ok(user)
    }

    async fn update_user(&self, id: i32, input: &NewUser) -> Result<User, StorageError> {
        if self.email_taken(&input.email, Some(id)) {
            return Err(StorageError::EmailTaken);
        }

        let mut entry = self.users.get_mut(&id).ok_or(StorageError::NotFound)?;
        entry.name = input.name.clone();
        entry.email = input.email.clone();
        entry.age = input.age;

        Ok(entry.value().clone())
    }

    async fn delete_user(&self, id: i32) -> Result<(), StorageError> {
        self.users
            .remove(&id)
            .map(|_| ())
            .ok_or(StorageError::NotFound)
    }

    async fn count_users(&self) -> Result<u64, StorageError> {
        Ok(self.users.len() as u64)
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Memory
    }

    async fn close(&self) {}
}
