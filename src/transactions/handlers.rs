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
    error::ApiError,
    state::AppState,
    transactions::{
        dto::{parse_date_range, ListTransactionsQuery, TransactionRequest},
        repo::{NewTransaction, Transaction, TxKind},
        service,
    },
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/transactions", get(list_transactions).post(create_transaction))
        .route(
            "/transactions/:id",
            axum::routing::put(update_transaction).delete(delete_transaction),
        )
}

fn parse_kind(kind: &str) -> Result<TxKind, ApiError> {
    TxKind::parse(kind)
        .ok_or_else(|| ApiError::Validation("invalid type. Must be 'expense' or 'income'".into()))
}

impl TransactionRequest {
    fn into_new(self) -> Result<NewTransaction, ApiError> {
        Ok(NewTransaction {
            amount: self.amount,
            kind: parse_kind(&self.kind)?,
            category_id: self.category_id,
            description: self.description,
            date: self.date,
        })
    }
}

#[instrument(skip(state, payload))]
async fn create_transaction(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<TransactionRequest>,
) -> Result<(StatusCode, Json<Transaction>), ApiError> {
    let tx = service::create_transaction(&state, user_id, payload.into_new()?).await?;
    Ok((StatusCode::CREATED, Json(tx)))
}

#[instrument(skip(state))]
async fn list_transactions(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(query): Query<ListTransactionsQuery>,
) -> Result<Json<Vec<Transaction>>, ApiError> {
    let (from, to) = parse_date_range(query.date_from.as_deref(), query.date_to.as_deref())?;
    let kind = query.kind.as_deref().map(parse_kind).transpose()?;

    let list = Transaction::list_for_user(&state.db, user_id, from, to, kind).await?;
    Ok(Json(list))
}

#[instrument(skip(state, payload))]
async fn update_transaction(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<TransactionRequest>,
) -> Result<Json<Transaction>, ApiError> {
    let tx = service::update_transaction(&state, user_id, id, payload.into_new()?).await?;
    Ok(Json(tx))
}

#[instrument(skip(state))]
async fn delete_transaction(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    service::delete_transaction(&state, user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
