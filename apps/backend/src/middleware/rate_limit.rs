//! Rate limiting middleware.
//!
//! Wraps a resource or scope so the limiter is consulted before extractors
//! parse the body or the handler does any other work. Counters are keyed by
//! `"{endpoint}:{client}"`, so resources sharing an endpoint name share a
//! budget.

use std::future::{ready, Ready};

use actix_web::body::EitherBody;
use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{web, Error, ResponseError};
use futures_util::future::LocalBoxFuture;

use crate::auth::rate_limit::{client_identifier, RateLimitPolicy};
use crate::config::auth::RateLimitPolicies;
use crate::error::AppError;
use crate::logging::security;
use crate::state::app_state::AppState;

type PolicySelector = fn(&RateLimitPolicies) -> RateLimitPolicy;

/// Rejects requests over the selected policy with 429 `RATE_LIMITED`.
///
/// The policy is read from `AppState` per request, so the same route table
/// serves production limits and whatever a test configured.
#[derive(Clone, Copy)]
pub struct RateLimit {
    endpoint: &'static str,
    select: PolicySelector,
}

impl RateLimit {
    pub fn new(endpoint: &'static str, select: PolicySelector) -> Self {
        Self { endpoint, select }
    }

    pub fn login() -> Self {
        Self::new("login", |p| p.login)
    }

    pub fn register() -> Self {
        Self::new("register", |p| p.register)
    }

    pub fn password_change() -> Self {
        Self::new("password_change", |p| p.password_change)
    }

    pub fn api() -> Self {
        Self::new("api", |p| p.api)
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimit
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = RateLimitMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimitMiddleware {
            service,
            endpoint: self.endpoint,
            select: self.select,
        }))
    }
}

pub struct RateLimitMiddleware<S> {
    service: S,
    endpoint: &'static str,
    select: PolicySelector,
}

impl<S, B> Service<ServiceRequest> for RateLimitMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let Some(app_state) = req.app_data::<web::Data<AppState>>().cloned() else {
            return Box::pin(async move {
                let err = AppError::internal("AppState not available");
                Ok(req.into_response(err.error_response()).map_into_right_body())
            });
        };

        let policy = (self.select)(&app_state.config.policies);
        let client = client_identifier(&req);
        let key = format!("{}:{client}", self.endpoint);

        if !app_state.rate_limiter.check_policy(&key, policy) {
            let endpoint = self.endpoint;
            return Box::pin(async move {
                security::rate_limit_hit(endpoint, &client);
                let response = AppError::too_many_requests().error_response();
                Ok(req.into_response(response).map_into_right_body())
            });
        }

        let fut = self.service.call(req);
        Box::pin(async move { fut.await.map(ServiceResponse::map_into_left_body) })
    }
}
