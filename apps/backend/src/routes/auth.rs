use std::sync::LazyLock;

use actix_web::cookie::{time::Duration as CookieDuration, Cookie, SameSite};
use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::guard::AUTH_COOKIE;
use crate::auth::password::validate_strength;
use crate::auth::role::Role;
use crate::auth::session::{Identity, Session};
use crate::config::auth::AuthConfig;
use crate::error::AppError;
use crate::extractors::{CurrentUser, ValidatedJson};
use crate::logging::security;
use crate::middleware::RateLimit;
use crate::state::app_state::AppState;
use crate::users::{normalize_email, NewUser};

/// Shape check only.
static EMAIL_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap()
});

const MAX_NAME_LEN: usize = 100;

#[derive(Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub current_password: String,
    #[serde(default)]
    pub new_password: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub success: bool,
    pub session: Session,
}

#[derive(Debug, Serialize)]
pub struct IdentityResponse {
    pub success: bool,
    pub user: Identity,
}

#[derive(Debug, Serialize)]
pub struct Acknowledged {
    pub success: bool,
}

/// Register a new account and sign it in.
async fn register(
    body: ValidatedJson<RegisterRequest>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();

    let email = normalize_email(&body.email);
    if !EMAIL_SHAPE.is_match(&email) {
        return Err(AppError::bad_request(
            "INVALID_EMAIL",
            "A valid email address is required",
        ));
    }

    let name = body.name.trim();
    if name.is_empty() || name.chars().count() > MAX_NAME_LEN {
        return Err(AppError::bad_request(
            "INVALID_NAME",
            format!("Name must be between 1 and {MAX_NAME_LEN} characters"),
        ));
    }

    let strength = validate_strength(&body.password);
    if !strength.is_valid {
        return Err(AppError::invalid(
            "WEAK_PASSWORD",
            "Password does not meet the strength requirements",
            strength.errors,
        ));
    }

    let password_hash = app_state.hasher.hash(&body.password).await?;
    let user = app_state
        .users
        .insert(NewUser {
            email,
            name: name.to_string(),
            role: Role::User,
            password_hash,
        })
        .await?;

    let session = app_state.sessions().create_session(&user)?;
    info!(user_id = %user.id, "account registered");

    Ok(session_response(StatusCode::CREATED, &app_state.config, session))
}

/// Exchange email and password for a session.
///
/// Unknown accounts and wrong passwords produce the same 401 after the same
/// bcrypt work.
async fn login(
    body: ValidatedJson<LoginRequest>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let email = normalize_email(&body.email);

    if email.is_empty() || body.password.is_empty() {
        return Err(AppError::bad_request(
            "MISSING_CREDENTIALS",
            "Email and password are required",
        ));
    }

    let Some(user) = app_state.users.find_by_email(&email).await? else {
        app_state.hasher.burn(&body.password).await;
        security::login_failed("unknown_account", Some(&email));
        return Err(AppError::invalid_credentials());
    };

    if app_state.config.demo_accounts.allows(&email) {
        security::demo_login_used(&email);
    } else if !app_state
        .hasher
        .verify(&body.password, &user.password_hash)
        .await
    {
        security::login_failed("password_mismatch", Some(&email));
        return Err(AppError::invalid_credentials());
    }

    let session = app_state.sessions().create_session(&user)?;
    Ok(session_response(StatusCode::OK, &app_state.config, session))
}

/// End the caller's session and clear the cookie.
///
/// Without revocation configured the token stays valid until it expires;
/// the cookie is cleared either way.
async fn logout(
    user: CurrentUser,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    if !app_state.sessions().revoke(&user.session_id) {
        info!("logout without revocation; token remains valid until expiry");
    }

    let mut cookie = Cookie::build(AUTH_COOKIE, "")
        .path("/")
        .http_only(true)
        .secure(app_state.config.secure_cookies())
        .same_site(SameSite::Lax)
        .finish();
    cookie.make_removal();

    Ok(HttpResponse::Ok()
        .cookie(cookie)
        .json(Acknowledged { success: true }))
}

async fn session(user: CurrentUser) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(IdentityResponse {
        success: true,
        user: user.0,
    }))
}

async fn change_password(
    user: CurrentUser,
    body: ValidatedJson<ChangePasswordRequest>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();

    // Token outlived the account.
    let record = app_state
        .users
        .find_by_id(&user.subject_id)
        .await?
        .ok_or_else(|| AppError::unauthorized(crate::auth::session::REJECTED_TOKEN_MESSAGE))?;

    if !app_state
        .hasher
        .verify(&body.current_password, &record.password_hash)
        .await
    {
        security::login_failed("current_password_mismatch", Some(&record.email));
        return Err(AppError::unauthorized("Current password is incorrect"));
    }

    let strength = validate_strength(&body.new_password);
    if !strength.is_valid {
        return Err(AppError::invalid(
            "WEAK_PASSWORD",
            "Password does not meet the strength requirements",
            strength.errors,
        ));
    }

    if body.new_password == body.current_password {
        return Err(AppError::bad_request(
            "PASSWORD_UNCHANGED",
            "New password must differ from the current password",
        ));
    }

    let password_hash = app_state.hasher.hash(&body.new_password).await?;
    app_state
        .users
        .update_password(&record.id, password_hash)
        .await?;
    info!(user_id = %record.id, "password changed");

    Ok(HttpResponse::Ok().json(Acknowledged { success: true }))
}

fn session_response(status: StatusCode, config: &AuthConfig, session: Session) -> HttpResponse {
    let max_age = i64::try_from(config.security.token_ttl.as_secs()).unwrap_or(i64::MAX);

    let cookie = Cookie::build(AUTH_COOKIE, session.token.clone())
        .path("/")
        .http_only(true)
        .secure(config.secure_cookies())
        .same_site(SameSite::Lax)
        .max_age(CookieDuration::seconds(max_age))
        .finish();

    HttpResponse::build(status).cookie(cookie).json(SessionResponse {
        success: true,
        session,
    })
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/register")
            .wrap(RateLimit::register())
            .route(web::post().to(register)),
    )
    .service(
        web::resource("/login")
            .wrap(RateLimit::login())
            .route(web::post().to(login)),
    )
    .service(
        web::resource("/password")
            .wrap(RateLimit::password_change())
            .route(web::post().to(change_password)),
    )
    .service(
        web::resource("/logout")
            .wrap(RateLimit::api())
            .route(web::post().to(logout)),
    )
    .service(
        web::resource("/session")
            .wrap(RateLimit::api())
            .route(web::get().to(session)),
    );
}
