//! Authentication settings loaded from the environment.
//!
//! | Variable | Default |
//! |---|---|
//! | `APP_ENV` | `development` |
//! | `AUTH_JWT_SECRET` | insecure development secret (refused in production) |
//! | `AUTH_BCRYPT_COST` | `12` |
//! | `AUTH_TOKEN_TTL_SECS` | `86400` |
//! | `AUTH_ISSUER` / `AUTH_AUDIENCE` | `food-backend` / `food-backend-clients` |
//! | `AUTH_DEMO_ACCOUNTS` | unset (refused in production) |
//! | `AUTH_REVOCATION` | `true` |
//! | `RATE_LIMIT_MAX_TRACKED` | `100000` |
//! | `RATE_LIMIT_SWEEP_SECS` | `60` |

use std::collections::HashSet;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::auth::password::{DEFAULT_COST, MAX_COST, MIN_COST};
use crate::auth::rate_limit::{RateLimitPolicy, DEFAULT_MAX_TRACKED};
use crate::error::AppError;
use crate::state::security_config::{SecurityConfig, DEFAULT_AUDIENCE, DEFAULT_ISSUER};
use crate::users::normalize_email;

/// Development-only signing secret. Never accepted in production.
pub const INSECURE_DEV_SECRET: &str = "insecure-development-secret-do-not-use-in-production";

const MIN_PROD_SECRET_LEN: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeEnv {
    Prod,
    Development,
    Test,
}

impl RuntimeEnv {
    fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("production") | Some("prod") => RuntimeEnv::Prod,
            Some("test") => RuntimeEnv::Test,
            _ => RuntimeEnv::Development,
        }
    }

    pub fn is_prod(&self) -> bool {
        matches!(self, RuntimeEnv::Prod)
    }
}

/// Accounts allowed to sign in with any non-empty password.
///
/// Staging and test only: [`AuthConfig`] refuses to load a non-empty list
/// when `APP_ENV` is production.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DemoAccounts {
    emails: HashSet<String>,
}

impl DemoAccounts {
    pub fn parse(raw: &str) -> Self {
        Self {
            emails: raw
                .split(',')
                .map(normalize_email)
                .filter(|e| !e.is_empty())
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.emails.is_empty()
    }

    pub fn allows(&self, email: &str) -> bool {
        self.emails.contains(&normalize_email(email))
    }
}

/// Per-endpoint limits handed to the rate limiter by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicies {
    pub login: RateLimitPolicy,
    pub register: RateLimitPolicy,
    pub password_change: RateLimitPolicy,
    pub api: RateLimitPolicy,
}

impl Default for RateLimitPolicies {
    fn default() -> Self {
        Self {
            login: RateLimitPolicy::new(20, Duration::from_secs(5 * 60)),
            register: RateLimitPolicy::new(5, Duration::from_secs(60 * 60)),
            password_change: RateLimitPolicy::new(3, Duration::from_secs(60 * 60)),
            api: RateLimitPolicy::new(100, Duration::from_secs(60)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub env: RuntimeEnv,
    pub security: SecurityConfig,
    pub bcrypt_cost: u32,
    pub demo_accounts: DemoAccounts,
    pub revocation: bool,
    pub rate_limit_max_tracked: usize,
    pub rate_limit_sweep_interval: Duration,
    pub policies: RateLimitPolicies,
}

impl AuthConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = RuntimeEnv::parse(lookup("APP_ENV").as_deref());

        let secret = jwt_secret(env, lookup("AUTH_JWT_SECRET"))?;

        let bcrypt_cost: u32 = parse_var(&lookup, "AUTH_BCRYPT_COST", DEFAULT_COST)?;
        if !(MIN_COST..=MAX_COST).contains(&bcrypt_cost) {
            return Err(AppError::config(format!(
                "AUTH_BCRYPT_COST must be between {MIN_COST} and {MAX_COST}, got {bcrypt_cost}"
            )));
        }

        let ttl_secs: u64 = parse_var(&lookup, "AUTH_TOKEN_TTL_SECS", 24 * 60 * 60)?;
        if ttl_secs == 0 {
            return Err(AppError::config("AUTH_TOKEN_TTL_SECS must be positive"));
        }

        let issuer = non_empty_var(&lookup, "AUTH_ISSUER", DEFAULT_ISSUER)?;
        let audience = non_empty_var(&lookup, "AUTH_AUDIENCE", DEFAULT_AUDIENCE)?;

        let demo_accounts = lookup("AUTH_DEMO_ACCOUNTS")
            .map(|raw| DemoAccounts::parse(&raw))
            .unwrap_or_default();
        if env.is_prod() && !demo_accounts.is_empty() {
            return Err(AppError::config(
                "AUTH_DEMO_ACCOUNTS must not be set in production",
            ));
        }
        if !demo_accounts.is_empty() {
            warn!("demo accounts enabled: password checks are bypassed for listed emails");
        }

        let revocation: bool = parse_var(&lookup, "AUTH_REVOCATION", true)?;

        let rate_limit_max_tracked: usize =
            parse_var(&lookup, "RATE_LIMIT_MAX_TRACKED", DEFAULT_MAX_TRACKED)?;
        let sweep_secs: u64 = parse_var(&lookup, "RATE_LIMIT_SWEEP_SECS", 60)?;
        if rate_limit_max_tracked == 0 || sweep_secs == 0 {
            return Err(AppError::config(
                "RATE_LIMIT_MAX_TRACKED and RATE_LIMIT_SWEEP_SECS must be positive",
            ));
        }

        let security = SecurityConfig::new(secret.into_bytes())
            .with_issuer(issuer)
            .with_audience(audience)
            .with_token_ttl(Duration::from_secs(ttl_secs));

        Ok(Self {
            env,
            security,
            bcrypt_cost,
            demo_accounts,
            revocation,
            rate_limit_max_tracked,
            rate_limit_sweep_interval: Duration::from_secs(sweep_secs),
            policies: RateLimitPolicies::default(),
        })
    }

    /// Fast, permissive settings for tests: minimum bcrypt cost, fixed secret.
    pub fn for_tests() -> Self {
        Self {
            env: RuntimeEnv::Test,
            security: SecurityConfig::new("test_secret_key_for_testing_purposes_only".as_bytes()),
            bcrypt_cost: MIN_COST,
            demo_accounts: DemoAccounts::default(),
            revocation: true,
            rate_limit_max_tracked: DEFAULT_MAX_TRACKED,
            rate_limit_sweep_interval: Duration::from_secs(60),
            policies: RateLimitPolicies::default(),
        }
    }

    /// Whether the auth cookie gets the `Secure` attribute.
    pub fn secure_cookies(&self) -> bool {
        self.env.is_prod()
    }
}

fn jwt_secret(env: RuntimeEnv, raw: Option<String>) -> Result<String, AppError> {
    let configured = raw.filter(|s| !s.trim().is_empty());

    match (env, configured) {
        (RuntimeEnv::Prod, None) => Err(AppError::config(
            "AUTH_JWT_SECRET must be set in production",
        )),
        (RuntimeEnv::Prod, Some(secret)) if secret == INSECURE_DEV_SECRET => Err(
            AppError::config("AUTH_JWT_SECRET is the development fallback"),
        ),
        (RuntimeEnv::Prod, Some(secret)) if secret.len() < MIN_PROD_SECRET_LEN => {
            Err(AppError::config(format!(
                "AUTH_JWT_SECRET must be at least {MIN_PROD_SECRET_LEN} bytes in production"
            )))
        }
        (_, Some(secret)) => Ok(secret),
        (_, None) => {
            warn!("AUTH_JWT_SECRET not set; using the insecure development secret");
            Ok(INSECURE_DEV_SECRET.to_string())
        }
    }
}

fn parse_var<T, F>(lookup: &F, key: &str, default: T) -> Result<T, AppError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) if raw.trim().is_empty() => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::config(format!("{key} has an invalid value: '{raw}'"))),
    }
}

fn non_empty_var<F>(lookup: &F, key: &str, default: &str) -> Result<String, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default.to_string()),
        Some(raw) if raw.trim().is_empty() => {
            Err(AppError::config(format!("{key} must not be empty")))
        }
        Some(raw) => Ok(raw.trim().to_string()),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<AuthConfig, AppError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AuthConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_in_development() {
        let config = load(&[]).unwrap();

        assert_eq!(config.env, RuntimeEnv::Development);
        assert_eq!(config.security.jwt_secret, INSECURE_DEV_SECRET.as_bytes());
        assert_eq!(config.bcrypt_cost, 12);
        assert_eq!(config.security.token_ttl, Duration::from_secs(86_400));
        assert_eq!(config.security.issuer, "food-backend");
        assert!(config.revocation);
        assert!(!config.secure_cookies());
    }

    #[test]
    fn production_requires_a_real_secret() {
        let err = load(&[("APP_ENV", "production")]).unwrap_err();
        assert_eq!(err.code(), "CONFIG_ERROR");

        assert!(load(&[("APP_ENV", "prod"), ("AUTH_JWT_SECRET", INSECURE_DEV_SECRET)]).is_err());
        assert!(load(&[("APP_ENV", "prod"), ("AUTH_JWT_SECRET", "short")]).is_err());

        let config = load(&[
            ("APP_ENV", "production"),
            ("AUTH_JWT_SECRET", "a-very-long-production-secret-value-0123456789"),
        ])
        .unwrap();
        assert!(config.secure_cookies());
    }

    #[test]
    fn bcrypt_cost_is_range_checked() {
        assert!(load(&[("AUTH_BCRYPT_COST", "3")]).is_err());
        assert!(load(&[("AUTH_BCRYPT_COST", "32")]).is_err());
        assert!(load(&[("AUTH_BCRYPT_COST", "twelve")]).is_err());
        assert_eq!(load(&[("AUTH_BCRYPT_COST", "10")]).unwrap().bcrypt_cost, 10);
    }

    #[test]
    fn ttl_must_be_positive() {
        assert!(load(&[("AUTH_TOKEN_TTL_SECS", "0")]).is_err());
        let config = load(&[("AUTH_TOKEN_TTL_SECS", "900")]).unwrap();
        assert_eq!(config.security.token_ttl, Duration::from_secs(900));
    }

    #[test]
    fn demo_accounts_are_refused_in_production() {
        let err = load(&[
            ("APP_ENV", "production"),
            ("AUTH_JWT_SECRET", "a-very-long-production-secret-value-0123456789"),
            ("AUTH_DEMO_ACCOUNTS", "demo@example.com"),
        ])
        .unwrap_err();
        assert_eq!(err.code(), "CONFIG_ERROR");

        let config = load(&[("AUTH_DEMO_ACCOUNTS", " Demo@Example.com, ,chef@example.com")]).unwrap();
        assert!(config.demo_accounts.allows("demo@example.com"));
        assert!(config.demo_accounts.allows("CHEF@example.com"));
        assert!(!config.demo_accounts.allows("other@example.com"));
    }

    #[test]
    fn empty_issuer_is_rejected() {
        assert!(load(&[("AUTH_ISSUER", "  ")]).is_err());
    }

    #[test]
    fn default_policies_match_endpoint_classes() {
        let policies = RateLimitPolicies::default();
        assert_eq!(policies.login.max_requests, 20);
        assert_eq!(policies.login.window, Duration::from_secs(300));
        assert_eq!(policies.register.max_requests, 5);
        assert_eq!(policies.password_change.max_requests, 3);
    }
}
