use food_backend::auth::role::Role;
use food_backend::config::auth::AuthConfig;
use food_backend::state::app_state::AppState;
use food_backend::state::builder::build_state;
use food_backend::users::{NewUser, UserRecord};
use uuid::Uuid;

/// Satisfies every strength rule.
pub const STRONG_PASSWORD: &str = "Tasty-Tacos-42!";

pub fn unique_email(prefix: &str) -> String {
    format!("{prefix}-{}@example.com", Uuid::new_v4().simple())
}

/// State with test config (bcrypt cost 4, revocation on, fixed secret).
pub fn test_state() -> AppState {
    build_state().with_config(AuthConfig::for_tests()).build()
}

pub async fn seed_user(state: &AppState, email: &str, password: &str, role: Role) -> UserRecord {
    let password_hash = state
        .hasher
        .hash(password)
        .await
        .expect("hashing at test cost succeeds");

    state
        .users
        .insert(NewUser {
            email: email.to_string(),
            name: "Test Diner".to_string(),
            role,
            password_hash,
        })
        .await
        .expect("seeded email is unique")
}
