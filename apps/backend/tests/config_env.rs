mod common;
mod support;

use std::time::Duration;

use actix_web::test;
use food_backend::auth::guard::AUTH_COOKIE;
use food_backend::auth::role::Role;
use food_backend::config::auth::{AuthConfig, DemoAccounts, RuntimeEnv};
use food_backend::state::builder::build_state;
use serde_json::json;
use serial_test::serial;
use support::{create_test_app, seed_user, unique_email, STRONG_PASSWORD};

const AUTH_VARS: &[&str] = &[
    "APP_ENV",
    "AUTH_JWT_SECRET",
    "AUTH_BCRYPT_COST",
    "AUTH_TOKEN_TTL_SECS",
    "AUTH_ISSUER",
    "AUTH_AUDIENCE",
    "AUTH_DEMO_ACCOUNTS",
    "AUTH_REVOCATION",
    "RATE_LIMIT_MAX_TRACKED",
    "RATE_LIMIT_SWEEP_SECS",
];

/// Run `f` with exactly `vars` set among the auth variables.
fn with_env<T>(vars: &[(&str, &str)], f: impl FnOnce() -> T) -> T {
    let saved: Vec<(&str, Option<String>)> = AUTH_VARS
        .iter()
        .map(|key| (*key, std::env::var(key).ok()))
        .collect();

    for key in AUTH_VARS {
        std::env::remove_var(key);
    }
    for (key, value) in vars {
        std::env::set_var(key, value);
    }

    let out = f();

    for (key, value) in saved {
        match value {
            Some(v) => std::env::set_var(key, v),
            None => std::env::remove_var(key),
        }
    }
    out
}

#[::core::prelude::v1::test]
#[serial]
fn from_env_reads_overrides() {
    let config = with_env(
        &[
            ("APP_ENV", "production"),
            ("AUTH_JWT_SECRET", "a-production-secret-that-is-long-enough-1234"),
            ("AUTH_BCRYPT_COST", "10"),
            ("AUTH_TOKEN_TTL_SECS", "3600"),
            ("AUTH_REVOCATION", "false"),
            ("RATE_LIMIT_MAX_TRACKED", "500"),
        ],
        AuthConfig::from_env,
    )
    .expect("valid production config");

    assert_eq!(config.env, RuntimeEnv::Prod);
    assert_eq!(config.bcrypt_cost, 10);
    assert_eq!(config.security.token_ttl, Duration::from_secs(3600));
    assert!(!config.revocation);
    assert_eq!(config.rate_limit_max_tracked, 500);
    assert!(config.secure_cookies());
}

#[::core::prelude::v1::test]
#[serial]
fn production_without_secret_fails() {
    let err = with_env(&[("APP_ENV", "prod")], AuthConfig::from_env)
        .expect_err("missing secret is fatal in production");
    assert_eq!(err.code(), "CONFIG_ERROR");
}

#[::core::prelude::v1::test]
#[serial]
fn unparsable_cost_fails() {
    let err = with_env(&[("AUTH_BCRYPT_COST", "twelve")], AuthConfig::from_env)
        .expect_err("cost must be numeric");
    assert_eq!(err.code(), "CONFIG_ERROR");
}

#[actix_web::test]
async fn production_cookie_is_secure() {
    let mut config = AuthConfig::for_tests();
    config.env = RuntimeEnv::Prod;
    let state = build_state().with_config(config).build();
    let email = unique_email("prod");
    seed_user(&state, &email, STRONG_PASSWORD, Role::User).await;
    let app = create_test_app(state).with_prod_routes().build().await;

    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "email": email, "password": STRONG_PASSWORD }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 200);

    let cookie = resp
        .response()
        .cookies()
        .find(|c| c.name() == AUTH_COOKIE)
        .expect("auth cookie is set")
        .into_owned();
    assert_eq!(cookie.secure(), Some(true));
    assert_eq!(cookie.http_only(), Some(true));
}

#[actix_web::test]
async fn demo_accounts_skip_password_verification() {
    let demo_email = unique_email("demo");
    let regular_email = unique_email("regular");

    let mut config = AuthConfig::for_tests();
    config.demo_accounts = DemoAccounts::parse(&demo_email);
    let state = build_state().with_config(config).build();
    seed_user(&state, &demo_email, STRONG_PASSWORD, Role::User).await;
    seed_user(&state, &regular_email, STRONG_PASSWORD, Role::User).await;
    let app = create_test_app(state).with_prod_routes().build().await;

    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "email": demo_email, "password": "anything" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status().as_u16(), 200);

    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "email": regular_email, "password": "anything" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status().as_u16(), 401);
}
