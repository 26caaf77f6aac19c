use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;

use crate::auth::claims::{SessionClaims, TokenPayload};
use crate::state::security_config::SecurityConfig;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Bad signature, malformed structure, or issuer/audience mismatch.
    #[error("invalid token")]
    Invalid,
    /// Signature is fine but `exp` has passed.
    #[error("token expired")]
    Expired,
    /// Misconfiguration on the issuing side (e.g. no secret).
    #[error("failed to sign token: {0}")]
    Signing(String),
}

/// Signs and verifies HS256 session tokens bound to a fixed issuer and audience.
#[derive(Clone)]
pub struct TokenCodec {
    security: SecurityConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenCodec {
    pub fn new(security: SecurityConfig) -> Self {
        // Pin algorithm, issuer and audience; no clock leeway on `exp`.
        let mut validation = Validation::new(security.algorithm);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_issuer(&[security.issuer.as_str()]);
        validation.set_audience(&[security.audience.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(&security.jwt_secret),
            decoding_key: DecodingKey::from_secret(&security.jwt_secret),
            validation,
            security,
        }
    }

    pub fn security(&self) -> &SecurityConfig {
        &self.security
    }

    pub fn default_ttl(&self) -> Duration {
        self.security.token_ttl
    }

    /// Sign `claims` with `exp = now + ttl`.
    pub fn sign(&self, claims: &SessionClaims, ttl: Duration) -> Result<String, TokenError> {
        self.sign_at(claims, ttl, SystemTime::now())
    }

    /// Sign `claims` with `exp = now + ttl` for an explicit `now`.
    pub fn sign_at(
        &self,
        claims: &SessionClaims,
        ttl: Duration,
        now: SystemTime,
    ) -> Result<String, TokenError> {
        if self.security.jwt_secret.is_empty() {
            return Err(TokenError::Signing("signing secret is empty".to_string()));
        }

        let exp = unix_seconds(now)? + ttl.as_secs() as i64;

        let payload = TokenPayload {
            claims: claims.clone(),
            iss: self.security.issuer.clone(),
            aud: self.security.audience.clone(),
            exp,
        };

        encode(
            &Header::new(self.security.algorithm),
            &payload,
            &self.encoding_key,
        )
        .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verify signature, expiry, issuer and audience, and return the claims.
    pub fn verify(&self, token: &str) -> Result<SessionClaims, TokenError> {
        decode::<TokenPayload>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })
    }

    /// Read the payload without checking signature or expiry.
    ///
    /// Diagnostics only. Never base an authorization decision on this.
    pub fn decode(&self, token: &str) -> Option<TokenPayload> {
        let mut parts = token.split('.');
        let (_header, payload, _signature) = (parts.next()?, parts.next()?, parts.next()?);
        if parts.next().is_some() {
            return None;
        }

        let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
        serde_json::from_slice(&bytes).ok()
    }
}

pub(crate) fn unix_seconds(now: SystemTime) -> Result<i64, TokenError> {
    now.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .map_err(|_| TokenError::Signing("system clock is before the unix epoch".to_string()))
}
