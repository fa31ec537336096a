//! Application-wide error taxonomy and its HTTP mapping.
//!
//! Domain services return [`ApiError`] variants; the transport layer maps
//! each variant to a fixed status code and a `{"error": ...}` body. Where a
//! client has to branch on the failure (refresh-token errors), the body also
//! carries a stable machine-readable `type` tag.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed input, rejected before touching storage.
    #[error("{0}")]
    Validation(String),

    /// Generic credential failure. Covers both unknown email and wrong
    /// password so the response does not reveal which one it was.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// The presented refresh token is unknown or was already rotated out.
    #[error("invalid refresh token")]
    InvalidRefreshToken,

    /// The refresh token exists but its absolute expiry has passed.
    #[error("refresh token expired")]
    RefreshTokenExpired,

    /// Missing/malformed/unverifiable access token.
    #[error("{0}")]
    Unauthorized(String),

    /// Authenticated, but the caller's role does not allow the operation.
    #[error("{0}")]
    Forbidden(String),

    /// Resource absent, or deliberately indistinguishable from absent
    /// (e.g. a wallet the caller is not a member of).
    #[error("{0}")]
    NotFound(String),

    /// Duplicate email, already-a-member, wallet limit.
    #[error("{0}")]
    Conflict(String),

    /// Storage or other infrastructure failure. Logged with full detail,
    /// surfaced to the client as a generic message.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::Internal(err.into())
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    kind: Option<&'static str>,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::InvalidCredentials
            | ApiError::InvalidRefreshToken
            | ApiError::RefreshTokenExpired
            | ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn type_tag(&self) -> Option<&'static str> {
        match self {
            ApiError::InvalidRefreshToken => Some("invalid_refresh_token"),
            ApiError::RefreshTokenExpired => Some("refresh_token_expired"),
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Internal(cause) => {
                tracing::error!(error = %cause, "internal error");
                "internal server error".to_string()
            }
            other => other.to_string(),
        };
        let body = Json(ErrorBody {
            error: message,
            kind: self.type_tag(),
        });
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn refresh_errors_carry_type_tags() {
        let response = ApiError::RefreshTokenExpired.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["type"], "refresh_token_expired");
        assert_eq!(body["error"], "refresh token expired");
    }

    #[tokio::test]
    async fn invalid_refresh_token_is_distinct_from_expired() {
        let response = ApiError::InvalidRefreshToken.into_response();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["type"], "invalid_refresh_token");
    }

    #[tokio::test]
    async fn internal_errors_do_not_leak_the_cause() {
        let response = ApiError::Internal(anyhow::anyhow!("pool timed out")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "internal server error");
    }

    #[tokio::test]
    async fn forbidden_maps_to_403() {
        let response = ApiError::Forbidden("only admins can invite users".into()).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
