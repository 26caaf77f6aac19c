use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{normalize_email, NewUser, UserRecord, UserStore};
use crate::auth::password::HashedCredential;
use crate::error::AppError;

/// Process-local user directory. Used by the binary until a database-backed
/// store is wired in, and by tests.
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    inner: RwLock<Directory>,
}

#[derive(Debug, Default)]
struct Directory {
    by_id: HashMap<String, UserRecord>,
    id_by_email: HashMap<String, String>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.read().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, AppError> {
        let key = normalize_email(email);
        let dir = self.inner.read();
        Ok(dir
            .id_by_email
            .get(&key)
            .and_then(|id| dir.by_id.get(id))
            .cloned())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<UserRecord>, AppError> {
        Ok(self.inner.read().by_id.get(id).cloned())
    }

    async fn insert(&self, new_user: NewUser) -> Result<UserRecord, AppError> {
        let email = normalize_email(&new_user.email);
        let mut dir = self.inner.write();

        if dir.id_by_email.contains_key(&email) {
            return Err(AppError::conflict(
                "EMAIL_TAKEN",
                "An account with this email already exists",
            ));
        }

        let record = UserRecord {
            id: Uuid::new_v4().to_string(),
            email: email.clone(),
            name: new_user.name.trim().to_string(),
            role: new_user.role,
            password_hash: new_user.password_hash,
            created_at: OffsetDateTime::now_utc(),
        };

        dir.id_by_email.insert(email, record.id.clone());
        dir.by_id.insert(record.id.clone(), record.clone());

        Ok(record)
    }

    async fn update_password(
        &self,
        id: &str,
        password_hash: HashedCredential,
    ) -> Result<(), AppError> {
        let mut dir = self.inner.write();
        let user = dir
            .by_id
            .get_mut(id)
            .ok_or_else(|| AppError::internal(format!("user {id} vanished during update")))?;
        user.password_hash = password_hash;
        Ok(())
    }
}
