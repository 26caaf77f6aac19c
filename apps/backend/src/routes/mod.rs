use actix_web::web;

pub mod admin;
pub mod auth;
pub mod health;

/// Register every route. Used by `main.rs` and by integration tests, so both
/// see the same per-resource rate limiting.
pub fn configure(cfg: &mut web::ServiceConfig) {
    // Health check: /health
    cfg.configure(health::configure_routes);

    // Auth routes: /api/auth/**
    cfg.service(web::scope("/api/auth").configure(auth::configure_routes));

    // Admin routes: /api/admin/**
    cfg.service(web::scope("/api/admin").configure(admin::configure_routes));
}
