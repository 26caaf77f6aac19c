#![deny(clippy::wildcard_imports)]
#![cfg_attr(test, allow(clippy::wildcard_imports))]

pub mod auth;
pub mod config;
pub mod error;
pub mod extractors;
pub mod logging;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod telemetry;
pub mod trace_ctx;
pub mod users;

#[cfg(test)]
pub mod test_bootstrap;

// Re-exports for public API
pub use auth::guard::{AccessGuard, AuthFailure};
pub use auth::jwt::{TokenCodec, TokenError};
pub use auth::password::{validate_strength, HashedCredential, PasswordHasher};
pub use auth::rate_limit::{client_identifier, RateLimitPolicy, RateLimiter};
pub use auth::role::Role;
pub use auth::session::{Identity, Session, SessionIssuer, SessionValidation};
pub use config::auth::AuthConfig;
pub use error::AppError;
pub use extractors::{AdminUser, CurrentUser};
pub use middleware::{RateLimit, RequestTrace, StructuredLogger};
pub use state::app_state::AppState;
pub use state::builder::build_state;
pub use state::security_config::SecurityConfig;

// Auto-initialize logging for unit tests
#[cfg(test)]
#[ctor::ctor]
fn init_test_logging() {
    test_bootstrap::logging::init();
}
