use actix_web::{web, HttpResponse};
use serde::Serialize;

use crate::error::AppError;
use crate::extractors::AdminUser;
use crate::middleware::RateLimit;
use crate::state::app_state::AppState;

#[derive(Debug, Serialize)]
pub struct RateLimiterStats {
    pub tracked_identifiers: usize,
    pub max_tracked: usize,
}

#[derive(Debug, Serialize)]
pub struct OverviewResponse {
    pub success: bool,
    pub revocation_enabled: bool,
    pub rate_limiter: RateLimiterStats,
}

async fn overview(
    _admin: AdminUser,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(OverviewResponse {
        success: true,
        revocation_enabled: app_state.sessions().revocation_enabled(),
        rate_limiter: RateLimiterStats {
            tracked_identifiers: app_state.rate_limiter.tracked_identifiers(),
            max_tracked: app_state.rate_limiter.max_tracked(),
        },
    }))
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/overview")
            .wrap(RateLimit::api())
            .route(web::get().to(overview)),
    );
}
