//! Security event log lines. Each carries a stable `event` field so they can
//! be filtered out of the JSON log stream.

use tracing::{info, warn};

use crate::logging::pii::Redacted;
use crate::trace_ctx;

/// Log a security-relevant login failure event.
pub fn login_failed(reason: &str, email: Option<&str>) {
    let trace_id = trace_ctx::trace_id();

    warn!(
        event = "SECURITY_LOGIN_FAILED",
        %trace_id,
        email = %email.map(Redacted).unwrap_or(Redacted("")),
        reason,
        "Authentication failure"
    );
}

/// Log a rejected session token with its internal reason
/// (`expired`, `invalid`, `revoked`).
pub fn token_rejected(reason: &str) {
    let trace_id = trace_ctx::trace_id();

    info!(
        event = "SECURITY_TOKEN_REJECTED",
        %trace_id,
        reason,
        "Session token rejected"
    );
}

/// Log a security-relevant rate-limit event.
pub fn rate_limit_hit(endpoint: &str, client: &str) {
    let trace_id = trace_ctx::trace_id();

    warn!(
        event = "SECURITY_RATE_LIMIT_HIT",
        %trace_id,
        endpoint,
        client,
        "Rate limit exceeded"
    );
}

pub fn demo_login_used(email: &str) {
    let trace_id = trace_ctx::trace_id();

    warn!(
        event = "SECURITY_DEMO_LOGIN",
        %trace_id,
        email = %Redacted(email),
        "Demo account logged in without password verification"
    );
}

pub fn session_revoked(session_id: &str) {
    let trace_id = trace_ctx::trace_id();

    info!(
        event = "SECURITY_SESSION_REVOKED",
        %trace_id,
        session_id,
        "Session revoked"
    );
}
