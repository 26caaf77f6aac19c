//! Password hashing and strength rules.
//!
//! Hashing uses bcrypt with a configurable cost. Both `hash` and `verify` are
//! deliberately slow, so they run on tokio's blocking pool and the calling
//! request simply awaits them.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Lowest and highest cost bcrypt accepts.
pub const MIN_COST: u32 = 4;
pub const MAX_COST: u32 = 31;
pub const DEFAULT_COST: u32 = 12;

pub const MIN_PASSWORD_LEN: usize = 8;
/// bcrypt reads 72 bytes including a trailing NUL; anything longer would be
/// silently truncated.
pub const MAX_PASSWORD_BYTES: usize = 71;
pub const SYMBOLS: &str = "!@#$%^&*(),.?\":{}|<>";

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("hashing primitive failed: {0}")]
    Hashing(#[from] bcrypt::BcryptError),
    #[error("hashing task did not complete: {0}")]
    Join(#[from] tokio::task::JoinError),
    #[error("password is {0} bytes; at most {max} are accepted", max = MAX_PASSWORD_BYTES)]
    TooLong(usize),
}

/// A salted bcrypt digest with its cost embedded (`$2b$12$...`).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HashedCredential(String);

impl HashedCredential {
    /// Wrap a digest loaded from storage. No validation happens here; a
    /// malformed digest simply never verifies.
    pub fn from_stored(digest: impl Into<String>) -> Self {
        Self(digest.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for HashedCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("HashedCredential([REDACTED])")
    }
}

/// Result of [`validate_strength`]. Every violated rule contributes one message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StrengthReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Hash a plaintext credential with a fresh random salt.
    ///
    /// Plaintexts longer than [`MAX_PASSWORD_BYTES`] are refused rather than
    /// truncated. Otherwise fails only when bcrypt rejects the configuration
    /// (e.g. a cost outside `MIN_COST..=MAX_COST`).
    pub async fn hash(&self, plaintext: &str) -> Result<HashedCredential, PasswordError> {
        if plaintext.len() > MAX_PASSWORD_BYTES {
            return Err(PasswordError::TooLong(plaintext.len()));
        }

        let cost = self.cost;
        let plaintext = plaintext.to_owned();

        let digest =
            tokio::task::spawn_blocking(move || bcrypt::non_truncating_hash(plaintext, cost))
                .await??;

        Ok(HashedCredential(digest))
    }

    /// Check a plaintext against a stored digest. Mismatches, malformed
    /// digests, over-long plaintexts and primitive failures all come back as
    /// `false`.
    pub async fn verify(&self, plaintext: &str, hashed: &HashedCredential) -> bool {
        let plaintext = plaintext.to_owned();
        let digest = hashed.0.clone();

        match tokio::task::spawn_blocking(move || bcrypt::non_truncating_verify(plaintext, &digest))
            .await
        {
            Ok(Ok(matches)) => matches,
            Ok(Err(e)) => {
                debug!(error = %e, "password verification rejected digest");
                false
            }
            Err(e) => {
                debug!(error = %e, "password verification task failed");
                false
            }
        }
    }

    /// Do the same bcrypt work as a [`verify`](Self::verify) at this cost and
    /// discard the result. Login calls this when no account matches, so an
    /// unknown email takes as long to reject as a wrong password.
    pub async fn burn(&self, plaintext: &str) {
        let cost = self.cost;
        let plaintext = plaintext.to_owned();

        let outcome =
            tokio::task::spawn_blocking(move || bcrypt::non_truncating_hash(plaintext, cost)).await;
        if let Err(e) = outcome {
            debug!(error = %e, "password burn task failed");
        }
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(DEFAULT_COST)
    }
}

/// Check a candidate password against the strength rules.
///
/// Rules are evaluated independently and in a fixed order: minimum length,
/// maximum byte length, lowercase, uppercase, digit, symbol.
pub fn validate_strength(plaintext: &str) -> StrengthReport {
    let mut errors = Vec::new();

    if plaintext.chars().count() < MIN_PASSWORD_LEN {
        errors.push(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters long"
        ));
    }
    if plaintext.len() > MAX_PASSWORD_BYTES {
        errors.push(format!(
            "Password must be at most {MAX_PASSWORD_BYTES} bytes long"
        ));
    }
    if !plaintext.chars().any(|c| c.is_ascii_lowercase()) {
        errors.push("Password must contain at least one lowercase letter".to_string());
    }
    if !plaintext.chars().any(|c| c.is_ascii_uppercase()) {
        errors.push("Password must contain at least one uppercase letter".to_string());
    }
    if !plaintext.chars().any(|c| c.is_ascii_digit()) {
        errors.push("Password must contain at least one number".to_string());
    }
    if !plaintext.chars().any(|c| SYMBOLS.contains(c)) {
        errors.push("Password must contain at least one special character".to_string());
    }

    StrengthReport {
        is_valid: errors.is_empty(),
        errors,
    }
}
