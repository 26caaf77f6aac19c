#![allow(dead_code)]

pub mod app_builder;
pub mod factory;

pub use app_builder::create_test_app;
pub use factory::{seed_user, test_state, unique_email, STRONG_PASSWORD};
