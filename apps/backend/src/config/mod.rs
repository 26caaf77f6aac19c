//! Process configuration, read once at startup.

pub mod auth;

pub use auth::{AuthConfig, DemoAccounts, RateLimitPolicies, RuntimeEnv};
