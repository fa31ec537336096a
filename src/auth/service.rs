//! Session lifecycle: register, login, refresh-token rotation, profile.

use lazy_static::lazy_static;
use regex::Regex;
use time::{Duration, OffsetDateTime};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    auth::{
        dto::TokenPair,
        password::{hash_password, is_password_complex, verify_password},
        repo::{RefreshToken, User},
        token::JwtKeys,
    },
    error::ApiError,
    state::AppState,
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db) if db.kind() == sqlx::error::ErrorKind::UniqueViolation
    )
}

fn jwt_keys(state: &AppState) -> JwtKeys {
    use axum::extract::FromRef;
    JwtKeys::from_ref(state)
}

fn refresh_ttl(state: &AppState) -> Duration {
    Duration::minutes(state.config.jwt.refresh_ttl_minutes)
}

/// Register a new user. The email is stored as given (only trimmed);
/// the plaintext password never leaves this function.
pub async fn register(state: &AppState, email: &str, password: &str) -> Result<User, ApiError> {
    let email = email.trim();

    if !is_valid_email(email) {
        return Err(ApiError::Validation("invalid email".into()));
    }
    if !is_password_complex(password) {
        return Err(ApiError::Validation(
            "password must be at least 8 characters and contain an uppercase letter, \
             a lowercase letter, a number, and a special character"
                .into(),
        ));
    }

    if User::find_by_email(&state.db, email).await?.is_some() {
        warn!(email, "registration for an existing email");
        return Err(ApiError::Conflict("user already exists".into()));
    }

    let hash = hash_password(password)?;
    let user = User::create(&state.db, email, &hash).await.map_err(|e| {
        if is_unique_violation(&e) {
            // Lost a race with a concurrent registration of the same email.
            ApiError::Conflict("user already exists".into())
        } else {
            e.into()
        }
    })?;

    info!(user_id = %user.id, "user registered");
    Ok(user)
}

/// Verify credentials and issue a fresh access/refresh pair. Unknown email
/// and wrong password produce the same error. Concurrent sessions per user
/// are allowed; every login gets its own refresh token.
pub async fn login(state: &AppState, email: &str, password: &str) -> Result<TokenPair, ApiError> {
    let email = email.trim();

    let user = User::find_by_email(&state.db, email)
        .await?
        .ok_or(ApiError::InvalidCredentials)?;

    if !verify_password(password, &user.password_hash)? {
        warn!(user_id = %user.id, "login with a wrong password");
        return Err(ApiError::InvalidCredentials);
    }

    let access_token = jwt_keys(state).sign_access(user.id)?;
    let refresh = RefreshToken::issue(&state.db, user.id, refresh_ttl(state)).await?;

    info!(user_id = %user.id, "user logged in");
    Ok(TokenPair {
        access_token,
        refresh_token: refresh.token,
    })
}

/// Rotate a refresh token: invalidate the presented one and return a new
/// pair. The lookup consumes the row atomically, so presenting one token
/// from two places lets at most one caller through; the other sees it as
/// already invalid.
pub async fn refresh(state: &AppState, token: &str) -> Result<TokenPair, ApiError> {
    let consumed = RefreshToken::consume(&state.db, token)
        .await?
        .ok_or(ApiError::InvalidRefreshToken)?;

    if consumed.is_expired(OffsetDateTime::now_utc()) {
        warn!(user_id = %consumed.user_id, "expired refresh token presented");
        return Err(ApiError::RefreshTokenExpired);
    }

    let user = User::find_by_id(&state.db, consumed.user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("user not found".into()))?;

    let access_token = jwt_keys(state).sign_access(user.id)?;
    let next = RefreshToken::issue(&state.db, user.id, refresh_ttl(state)).await?;

    info!(user_id = %user.id, "refresh token rotated");
    Ok(TokenPair {
        access_token,
        refresh_token: next.token,
    })
}

/// Pure lookup, no side effects.
pub async fn profile(state: &AppState, user_id: Uuid) -> Result<User, ApiError> {
    User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("user not found".into()))
}
