use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;
use uuid::Uuid;

use crate::{auth::token::JwtKeys, error::ApiError};

/// Extracts and validates the bearer access token, yielding the user id.
///
/// Runs before any handler logic; a missing, malformed, unverifiable or
/// expired token never reaches a handler. The token is self-contained, so
/// no store lookup happens here.
#[derive(Debug)]
pub struct AuthUser(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);

        let auth_header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("Authorization header required".into()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::Unauthorized("invalid token format".into()))?;

        let claims = keys.verify(token).map_err(|_| {
            warn!("invalid or expired token");
            ApiError::Unauthorized("invalid or expired token".into())
        })?;

        Ok(AuthUser(claims.sub))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::{extract::FromRequestParts, http::Request};

    use super::*;

    #[derive(Clone)]
    struct KeysOnly(JwtKeys);

    impl FromRef<KeysOnly> for JwtKeys {
        fn from_ref(state: &KeysOnly) -> Self {
            state.0.clone()
        }
    }

    fn state() -> KeysOnly {
        KeysOnly(JwtKeys::new("test-secret", Duration::from_secs(3600)))
    }

    async fn extract(auth_header: Option<&str>, state: &KeysOnly) -> Result<AuthUser, ApiError> {
        let mut builder = Request::builder().uri("/me");
        if let Some(value) = auth_header {
            builder = builder.header(axum::http::header::AUTHORIZATION, value);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        AuthUser::from_request_parts(&mut parts, state).await
    }

    #[tokio::test]
    async fn accepts_a_valid_bearer_token() {
        let state = state();
        let user_id = Uuid::new_v4();
        let token = state.0.sign_access(user_id).unwrap();

        let AuthUser(extracted) = extract(Some(&format!("Bearer {token}")), &state)
            .await
            .expect("extraction should succeed");
        assert_eq!(extracted, user_id);
    }

    #[tokio::test]
    async fn rejects_a_missing_header() {
        let err = extract(None, &state()).await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn rejects_a_header_without_bearer_prefix() {
        let state = state();
        let token = state.0.sign_access(Uuid::new_v4()).unwrap();
        // Valid token, wrong scheme.
        let err = extract(Some(&format!("Basic {token}")), &state).await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn rejects_a_tampered_token() {
        let state = state();
        let mut token = state.0.sign_access(Uuid::new_v4()).unwrap();
        token.push('x');
        let err = extract(Some(&format!("Bearer {token}")), &state).await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }
}
