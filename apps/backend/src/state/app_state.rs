use std::sync::Arc;

use crate::auth::guard::AccessGuard;
use crate::auth::password::PasswordHasher;
use crate::auth::rate_limit::RateLimiter;
use crate::auth::session::SessionIssuer;
use crate::config::auth::AuthConfig;
use crate::users::UserStore;

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    /// Loaded configuration
    pub config: Arc<AuthConfig>,
    pub hasher: PasswordHasher,
    pub guard: AccessGuard,
    pub rate_limiter: Arc<RateLimiter>,
    /// User directory (external collaborator)
    pub users: Arc<dyn UserStore>,
}

impl AppState {
    pub fn sessions(&self) -> &SessionIssuer {
        self.guard.sessions()
    }
}
