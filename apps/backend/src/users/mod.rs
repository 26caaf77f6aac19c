//! User directory seam.
//!
//! The auth core never talks to a database. Handlers resolve users through a
//! [`UserStore`] and hand the resulting [`UserRecord`] to the session issuer.

pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use unicode_normalization::UnicodeNormalization;

use crate::auth::password::HashedCredential;
use crate::auth::role::Role;
use crate::error::AppError;

pub use memory::InMemoryUserStore;

/// Stored user, including the password digest.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub password_hash: HashedCredential,
    pub created_at: OffsetDateTime,
}

/// Redacted view of a user that is safe to return to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
}

impl From<&UserRecord> for PublicUser {
    fn from(user: &UserRecord) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub role: Role,
    pub password_hash: HashedCredential,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, AppError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<UserRecord>, AppError>;

    /// Insert a user. Fails with a conflict if the (normalised) email exists.
    async fn insert(&self, new_user: NewUser) -> Result<UserRecord, AppError>;

    async fn update_password(&self, id: &str, password_hash: HashedCredential)
        -> Result<(), AppError>;
}

/// Normalize an email address for consistent storage and comparison.
///
/// Trims whitespace, applies Unicode NFKC normalization and lowercases.
pub fn normalize_email(email: &str) -> String {
    email.trim().nfkc().collect::<String>().to_lowercase()
}
