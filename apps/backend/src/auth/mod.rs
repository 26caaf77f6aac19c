pub mod claims;
pub mod denylist;
pub mod guard;
pub mod jwt;
pub mod password;
pub mod rate_limit;
pub mod request;
pub mod role;
pub mod session;

pub use claims::{SessionClaims, TokenPayload};
pub use denylist::SessionDenylist;
pub use guard::{AccessGuard, AuthFailure, AUTH_COOKIE};
pub use jwt::{TokenCodec, TokenError};
pub use password::{validate_strength, HashedCredential, PasswordError, PasswordHasher, StrengthReport};
pub use rate_limit::{client_identifier, RateLimitPolicy, RateLimiter};
pub use request::{CredentialSource, RequestParts};
pub use role::Role;
pub use session::{Identity, Session, SessionIssuer, SessionRejection, SessionValidation};
