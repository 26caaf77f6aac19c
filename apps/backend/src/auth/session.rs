//! Session minting and validation on top of [`TokenCodec`].
//!
//! A token is in one of three states: valid, expired (signature fine, lifetime
//! elapsed) or invalid. Only the passage of time moves a token from valid to
//! expired. Revocation through the optional denylist is layered on top and
//! never changes how tokens themselves are verified.

use std::sync::Arc;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::claims::SessionClaims;
use crate::auth::denylist::SessionDenylist;
use crate::auth::jwt::{unix_seconds, TokenCodec, TokenError};
use crate::auth::role::Role;
use crate::logging::security;
use crate::users::{PublicUser, UserRecord};

/// The only message clients ever see for a rejected token.
pub const REJECTED_TOKEN_MESSAGE: &str = "Invalid or expired token";

/// A freshly minted session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
    pub user: PublicUser,
}

/// Authenticated caller derived from a verified session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub subject_id: String,
    pub email: String,
    pub role: Role,
    pub session_id: String,
}

impl From<SessionClaims> for Identity {
    fn from(claims: SessionClaims) -> Self {
        Self {
            subject_id: claims.sub,
            email: claims.email,
            role: claims.role,
            session_id: claims.sid,
        }
    }
}

/// Internal reason a session was refused. Callers only ever surface
/// [`REJECTED_TOKEN_MESSAGE`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionRejection {
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error("session revoked")]
    Revoked,
}

impl SessionRejection {
    /// Short label for logs.
    pub fn reason(&self) -> &'static str {
        match self {
            SessionRejection::Token(TokenError::Expired) => "expired",
            SessionRejection::Token(TokenError::Invalid) => "invalid",
            SessionRejection::Token(TokenError::Signing(_)) => "signing",
            SessionRejection::Revoked => "revoked",
        }
    }
}

/// Outcome of [`SessionIssuer::validate_session`]. Never an error value;
/// failures are data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionValidation {
    Valid(Identity),
    Rejected(SessionRejection),
}

impl SessionValidation {
    pub fn is_valid(&self) -> bool {
        matches!(self, SessionValidation::Valid(_))
    }

    pub fn user(&self) -> Option<&Identity> {
        match self {
            SessionValidation::Valid(identity) => Some(identity),
            SessionValidation::Rejected(_) => None,
        }
    }

    pub fn error(&self) -> Option<&'static str> {
        match self {
            SessionValidation::Valid(_) => None,
            SessionValidation::Rejected(_) => Some(REJECTED_TOKEN_MESSAGE),
        }
    }

    pub fn into_result(self) -> Result<Identity, SessionRejection> {
        match self {
            SessionValidation::Valid(identity) => Ok(identity),
            SessionValidation::Rejected(rejection) => Err(rejection),
        }
    }
}

#[derive(Clone)]
pub struct SessionIssuer {
    codec: Arc<TokenCodec>,
    denylist: Option<SessionDenylist>,
}

impl SessionIssuer {
    pub fn new(codec: TokenCodec) -> Self {
        Self {
            codec: Arc::new(codec),
            denylist: None,
        }
    }

    /// Enable server-side revocation. Entries live as long as the token TTL.
    pub fn with_denylist(mut self, denylist: SessionDenylist) -> Self {
        self.denylist = Some(denylist);
        self
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    pub fn revocation_enabled(&self) -> bool {
        self.denylist.is_some()
    }

    /// Mint a session for `user` with the default TTL.
    pub fn create_session(&self, user: &UserRecord) -> Result<Session, TokenError> {
        self.create_session_at(user, SystemTime::now())
    }

    pub fn create_session_at(
        &self,
        user: &UserRecord,
        now: SystemTime,
    ) -> Result<Session, TokenError> {
        let ttl = self.codec.default_ttl();
        let issued_at = unix_seconds(now)?;

        let claims = SessionClaims {
            sub: user.id.clone(),
            email: user.email.clone(),
            role: user.role,
            iat: issued_at,
            sid: Uuid::new_v4().to_string(),
        };

        let token = self.codec.sign_at(&claims, ttl, now)?;
        let expires_at = OffsetDateTime::from_unix_timestamp(issued_at + ttl.as_secs() as i64)
            .map_err(|e| TokenError::Signing(format!("expiry out of range: {e}")))?;

        Ok(Session {
            token,
            expires_at,
            user: PublicUser::from(user),
        })
    }

    /// Verify `token` and map it to an [`Identity`].
    pub fn validate_session(&self, token: &str) -> SessionValidation {
        let claims = match self.codec.verify(token) {
            Ok(claims) => claims,
            Err(e) => {
                let rejection = SessionRejection::from(e);
                security::token_rejected(rejection.reason());
                return SessionValidation::Rejected(rejection);
            }
        };

        if let Some(denylist) = &self.denylist {
            if denylist.is_revoked(&claims.sid) {
                security::token_rejected(SessionRejection::Revoked.reason());
                return SessionValidation::Rejected(SessionRejection::Revoked);
            }
        }

        SessionValidation::Valid(Identity::from(claims))
    }

    /// Revoke a session id. Returns `false` when revocation is disabled.
    pub fn revoke(&self, session_id: &str) -> bool {
        match &self.denylist {
            Some(denylist) => {
                denylist.revoke(session_id);
                security::session_revoked(session_id);
                true
            }
            None => false,
        }
    }
}
