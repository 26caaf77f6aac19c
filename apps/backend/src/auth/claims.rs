//! Claims embedded in session tokens.

use serde::{Deserialize, Serialize};

use crate::auth::role::Role;

/// Per-session facts signed into a token. A new token always gets a new
/// `SessionClaims`; nothing mutates one after construction.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SessionClaims {
    /// User identifier from the user directory
    pub sub: String,
    pub email: String,
    pub role: Role,
    /// Issued-at (seconds since epoch)
    pub iat: i64,
    /// Random per-session identifier
    pub sid: String,
}

/// Full token body: session claims plus the standard envelope.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TokenPayload {
    #[serde(flatten)]
    pub claims: SessionClaims,
    pub iss: String,
    pub aud: String,
    /// Expiry (seconds since epoch)
    pub exp: i64,
}
