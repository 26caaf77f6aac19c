use std::sync::Arc;

use crate::auth::denylist::SessionDenylist;
use crate::auth::guard::AccessGuard;
use crate::auth::jwt::TokenCodec;
use crate::auth::password::PasswordHasher;
use crate::auth::rate_limit::RateLimiter;
use crate::auth::session::SessionIssuer;
use crate::config::auth::AuthConfig;
use crate::state::app_state::AppState;
use crate::users::{InMemoryUserStore, UserStore};

/// Builder for creating AppState instances (used in both tests and main)
pub struct StateBuilder {
    config: AuthConfig,
    users: Option<Arc<dyn UserStore>>,
}

impl StateBuilder {
    pub fn new() -> Self {
        Self {
            config: AuthConfig::for_tests(),
            users: None,
        }
    }

    pub fn with_config(mut self, config: AuthConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_user_store(mut self, users: Arc<dyn UserStore>) -> Self {
        self.users = Some(users);
        self
    }

    /// Wire the auth core. Does not start the limiter's sweeper; the binary
    /// does that once a runtime is up.
    pub fn build(self) -> AppState {
        let config = self.config;

        let mut sessions = SessionIssuer::new(TokenCodec::new(config.security.clone()));
        if config.revocation {
            sessions = sessions.with_denylist(SessionDenylist::new(config.security.token_ttl));
        }

        AppState {
            hasher: PasswordHasher::new(config.bcrypt_cost),
            guard: AccessGuard::new(sessions),
            rate_limiter: Arc::new(RateLimiter::with_capacity(config.rate_limit_max_tracked)),
            users: self
                .users
                .unwrap_or_else(|| Arc::new(InMemoryUserStore::new())),
            config: Arc::new(config),
        }
    }
}

impl Default for StateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub fn build_state() -> StateBuilder {
    StateBuilder::new()
}
