use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        dto::{LoginRequest, PublicUser, RefreshRequest, RegisterRequest, RegisterResponse, TokenPair},
        extractors::AuthUser,
        service,
    },
    error::ApiError,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .route("/me", get(me))
}

#[instrument(skip(state, payload))]
async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    service::register(&state, &payload.email, &payload.password).await?;
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            status: "success",
            message: "user registered successfully",
        }),
    ))
}

#[instrument(skip(state, payload))]
async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenPair>, ApiError> {
    let pair = service::login(&state, &payload.email, &payload.password).await?;
    Ok(Json(pair))
}

#[instrument(skip(state, payload))]
async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<TokenPair>, ApiError> {
    let pair = service::refresh(&state, &payload.refresh_token).await?;
    Ok(Json(pair))
}

#[instrument(skip(state))]
async fn me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<PublicUser>, ApiError> {
    let user = service::profile(&state, user_id).await?;
    Ok(Json(PublicUser {
        id: user.id,
        email: user.email,
    }))
}
