//! In-memory user store
//!
//! Backs the integration-test rig and single-process development runs.
//! Ids are assigned sequentially starting at 1, matching the serial column
//! of the PostgreSQL store.

use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::Mutex;

use warden_core::{NewUser, Result, User, UserStore, WardenError};

struct Inner {
    users: BTreeMap<i64, User>,
    next_id: i64,
}

/// In-memory user store
pub struct MemoryUserStore {
    inner: Mutex<Inner>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                users: BTreeMap::new(),
                next_id: 1,
            }),
        }
    }
}

impl Default for MemoryUserStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let inner = self.inner.lock().await;
        Ok(inner.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>> {
        let inner = self.inner.lock().await;
        Ok(inner.users.get(&id).cloned())
    }

    async fn find_users_by_ids(&self, ids: &[i64]) -> Result<Vec<User>> {
        let inner = self.inner.lock().await;
        // BTreeMap iteration gives ascending id order, same as the SQL store
        Ok(inner
            .users
            .values()
            .filter(|u| ids.contains(&u.id))
            .cloned()
            .collect())
    }

    async fn insert_user(&self, user: NewUser) -> Result<User> {
        let mut inner = self.inner.lock().await;

        if inner.users.values().any(|u| u.email == user.email) {
            return Err(WardenError::DuplicateEmail);
        }

        let id = inner.next_id;
        inner.next_id += 1;

        let user = User {
            id,
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            last_login: user.last_login,
        };
        inner.users.insert(id, user.clone());

        Ok(user)
    }

    async fn update_user(&self, user: &User) -> Result<()> {
        let mut inner = self.inner.lock().await;
        match inner.users.get_mut(&user.id) {
            Some(slot) => {
                *slot = user.clone();
                Ok(())
            }
            None => Err(WardenError::NotFound),
        }
    }

    async fn delete_users(&self, ids: &[i64]) -> Result<u64> {
        let mut inner = self.inner.lock().await;
        let mut removed = 0;
        for id in ids {
            if inner.users.remove(id).is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let inner = self.inner.lock().await;
        Ok(inner.users.values().cloned().collect())
    }
}
