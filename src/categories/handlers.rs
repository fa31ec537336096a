use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::extractors::AuthUser,
    categories::{
        dto::{CategoryRequest, ListCategoriesQuery},
        repo::Category,
    },
    error::ApiError,
    state::AppState,
    transactions::repo::TxKind,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list_categories).post(create_category))
        .route(
            "/categories/:id",
            axum::routing::put(update_category).delete(delete_category),
        )
}

fn parse_kind(kind: &str) -> Result<TxKind, ApiError> {
    TxKind::parse(kind)
        .ok_or_else(|| ApiError::Validation("invalid type. Must be 'expense' or 'income'".into()))
}

#[instrument(skip(state, payload))]
async fn create_category(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<CategoryRequest>,
) -> Result<(StatusCode, Json<Category>), ApiError> {
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(ApiError::Validation("category name is required".into()));
    }
    let kind = parse_kind(&payload.kind)?;

    let category = Category::create(&state.db, user_id, name, kind).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

#[instrument(skip(state))]
async fn list_categories(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(query): Query<ListCategoriesQuery>,
) -> Result<Json<Vec<Category>>, ApiError> {
    let kind = query.kind.as_deref().map(parse_kind).transpose()?;
    Ok(Json(Category::list_for_user(&state.db, user_id, kind).await?))
}

#[instrument(skip(state, payload))]
async fn update_category(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<CategoryRequest>,
) -> Result<Json<Category>, ApiError> {
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(ApiError::Validation("category name is required".into()));
    }
    let kind = parse_kind(&payload.kind)?;

    if Category::update(&state.db, id, user_id, name, kind).await? == 0 {
        return Err(ApiError::NotFound("category not found".into()));
    }
    Category::find_owned(&state.db, id, user_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("category not found".into()))
}

#[instrument(skip(state))]
async fn delete_category(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if Category::delete(&state.db, id, user_id).await? == 0 {
        return Err(ApiError::NotFound("category not found".into()));
    }
    Ok(StatusCode::NO_CONTENT)
}
