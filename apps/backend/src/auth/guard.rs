//! Request authentication and role checks.
//!
//! The guard only ever accepts a signed session token, taken from a bearer
//! `Authorization` header or, failing that, the `auth-token` cookie. Failures
//! are plain values carrying a message and an HTTP status so callers can turn
//! them into a response directly.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

use crate::auth::request::CredentialSource;
use crate::auth::role::Role;
use crate::auth::session::{Identity, SessionIssuer, REJECTED_TOKEN_MESSAGE};
use crate::error::AppError;

pub const AUTH_COOKIE: &str = "auth-token";
pub const NO_TOKEN_MESSAGE: &str = "No authentication token provided";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{error}")]
pub struct AuthFailure {
    pub error: String,
    pub status: StatusCode,
}

impl AuthFailure {
    pub fn unauthorized(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            status: StatusCode::UNAUTHORIZED,
        }
    }

    pub fn forbidden(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            status: StatusCode::FORBIDDEN,
        }
    }
}

impl ResponseError for AuthFailure {
    fn status_code(&self) -> StatusCode {
        self.status
    }

    fn error_response(&self) -> HttpResponse {
        AppError::from(self.clone()).error_response()
    }
}

#[derive(Clone)]
pub struct AccessGuard {
    sessions: SessionIssuer,
}

impl AccessGuard {
    pub fn new(sessions: SessionIssuer) -> Self {
        Self { sessions }
    }

    pub fn sessions(&self) -> &SessionIssuer {
        &self.sessions
    }

    /// Bearer header first, then the auth cookie.
    pub fn extract_credential(&self, req: &impl CredentialSource) -> Option<String> {
        let bearer = req
            .header("authorization")
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty());

        if let Some(token) = bearer {
            return Some(token.to_string());
        }

        req.cookie_value(AUTH_COOKIE)
            .filter(|token| !token.trim().is_empty())
    }

    pub fn require_auth(&self, req: &impl CredentialSource) -> Result<Identity, AuthFailure> {
        let token = self
            .extract_credential(req)
            .ok_or_else(|| AuthFailure::unauthorized(NO_TOKEN_MESSAGE))?;

        self.sessions
            .validate_session(&token)
            .into_result()
            .map_err(|_| AuthFailure::unauthorized(REJECTED_TOKEN_MESSAGE))
    }

    pub fn require_role(
        &self,
        req: &impl CredentialSource,
        role: Role,
    ) -> Result<Identity, AuthFailure> {
        let identity = self.require_auth(req)?;

        if identity.role != role {
            return Err(AuthFailure::forbidden(format!(
                "{} access required",
                role.title()
            )));
        }

        Ok(identity)
    }
}
