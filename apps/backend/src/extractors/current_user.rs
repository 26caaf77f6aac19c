use std::future::{ready, Ready};
use std::ops::Deref;

use actix_web::dev::Payload;
use actix_web::{web, FromRequest, HttpRequest};

use crate::auth::role::Role;
use crate::auth::session::Identity;
use crate::error::AppError;
use crate::state::app_state::AppState;

/// Authenticated caller. Rejects with 401 when the request carries no valid
/// session token.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Identity);

/// Authenticated caller holding the admin role. 401 without a valid token,
/// 403 for any other role.
#[derive(Debug, Clone)]
pub struct AdminUser(pub Identity);

fn app_state(req: &HttpRequest) -> Result<&web::Data<AppState>, AppError> {
    req.app_data::<web::Data<AppState>>()
        .ok_or_else(|| AppError::internal("AppState not available"))
}

impl FromRequest for CurrentUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(app_state(req).and_then(|state| {
            state
                .guard
                .require_auth(req)
                .map(CurrentUser)
                .map_err(AppError::from)
        }))
    }
}

impl FromRequest for AdminUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(app_state(req).and_then(|state| {
            state
                .guard
                .require_role(req, Role::Admin)
                .map(AdminUser)
                .map_err(AppError::from)
        }))
    }
}

impl Deref for CurrentUser {
    type Target = Identity;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Deref for AdminUser {
    type Target = Identity;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
