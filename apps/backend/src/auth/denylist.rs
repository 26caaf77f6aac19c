//! Server-side session revocation.
//!
//! Tokens stay self-contained; this is an additive check keyed by session id.
//! Entries expire one token lifetime after revocation, by which point the
//! revoked token has expired on its own.

use std::time::Duration;

use moka::sync::Cache;

/// Upper bound on simultaneously revoked sessions.
const MAX_REVOKED_SESSIONS: u64 = 100_000;

#[derive(Clone)]
pub struct SessionDenylist {
    revoked: Cache<String, ()>,
}

impl SessionDenylist {
    pub fn new(token_ttl: Duration) -> Self {
        Self::with_capacity(token_ttl, MAX_REVOKED_SESSIONS)
    }

    pub fn with_capacity(token_ttl: Duration, capacity: u64) -> Self {
        Self {
            revoked: Cache::builder()
                .max_capacity(capacity)
                .time_to_live(token_ttl)
                .build(),
        }
    }

    pub fn revoke(&self, session_id: &str) {
        self.revoked.insert(session_id.to_string(), ());
    }

    pub fn is_revoked(&self, session_id: &str) -> bool {
        self.revoked.get(session_id).is_some()
    }
}
