use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::extractors::AuthUser,
    error::ApiError,
    state::AppState,
    transactions::repo::{NewTransaction, Transaction, TxKind},
    wallets::{
        dto::{ChangeRoleRequest, CreateWalletTransactionRequest, InviteMemberRequest, WalletNameRequest},
        repo::{MemberWithEmail, Wallet, WalletMember, WalletRole},
        service,
    },
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/wallets", get(list_wallets).post(create_wallet))
        .route(
            "/wallets/:id",
            get(get_wallet).put(rename_wallet).delete(delete_wallet),
        )
        .route("/wallets/:id/members", get(list_members).post(invite_member))
        .route("/wallets/:id/members/:user_id", axum::routing::delete(remove_member))
        .route("/wallets/:id/members/:user_id/role", put(change_member_role))
        .route(
            "/wallets/:id/transactions",
            get(list_transactions).post(create_transaction),
        )
}

#[instrument(skip(state, payload))]
async fn create_wallet(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<WalletNameRequest>,
) -> Result<(StatusCode, Json<Wallet>), ApiError> {
    let wallet = service::create_wallet(&state, user_id, &payload.name).await?;
    Ok((StatusCode::CREATED, Json(wallet)))
}

#[instrument(skip(state))]
async fn list_wallets(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<Wallet>>, ApiError> {
    Ok(Json(service::list_wallets(&state, user_id).await?))
}

#[instrument(skip(state))]
async fn get_wallet(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(wallet_id): Path<Uuid>,
) -> Result<Json<Wallet>, ApiError> {
    Ok(Json(service::get_wallet(&state, user_id, wallet_id).await?))
}

#[instrument(skip(state, payload))]
async fn rename_wallet(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(wallet_id): Path<Uuid>,
    Json(payload): Json<WalletNameRequest>,
) -> Result<Json<Wallet>, ApiError> {
    let wallet = service::rename_wallet(&state, user_id, wallet_id, &payload.name).await?;
    Ok(Json(wallet))
}

#[instrument(skip(state))]
async fn delete_wallet(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(wallet_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    service::delete_wallet(&state, user_id, wallet_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
async fn list_members(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(wallet_id): Path<Uuid>,
) -> Result<Json<Vec<MemberWithEmail>>, ApiError> {
    Ok(Json(service::list_members(&state, user_id, wallet_id).await?))
}

#[instrument(skip(state, payload))]
async fn invite_member(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(wallet_id): Path<Uuid>,
    Json(payload): Json<InviteMemberRequest>,
) -> Result<(StatusCode, Json<WalletMember>), ApiError> {
    let member = service::invite_member(&state, user_id, wallet_id, &payload.email).await?;
    Ok((StatusCode::CREATED, Json(member)))
}

#[instrument(skip(state, payload))]
async fn change_member_role(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path((wallet_id, target_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<ChangeRoleRequest>,
) -> Result<StatusCode, ApiError> {
    let role = WalletRole::parse(&payload.role)
        .ok_or_else(|| ApiError::Validation("invalid role specified".into()))?;
    service::change_member_role(&state, user_id, wallet_id, target_id, role).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
async fn remove_member(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path((wallet_id, target_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    service::remove_member(&state, user_id, wallet_id, target_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
async fn list_transactions(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(wallet_id): Path<Uuid>,
) -> Result<Json<Vec<Transaction>>, ApiError> {
    Ok(Json(service::list_wallet_transactions(&state, user_id, wallet_id).await?))
}

#[instrument(skip(state, payload))]
async fn create_transaction(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(wallet_id): Path<Uuid>,
    Json(payload): Json<CreateWalletTransactionRequest>,
) -> Result<(StatusCode, Json<Transaction>), ApiError> {
    let kind = TxKind::parse(&payload.kind)
        .ok_or_else(|| ApiError::Validation("invalid type. Must be 'expense' or 'income'".into()))?;
    let new = NewTransaction {
        amount: payload.amount,
        kind,
        category_id: payload.category_id,
        description: payload.description,
        date: payload.date,
    };
    let tx = service::create_wallet_transaction(&state, user_id, wallet_id, new).await?;
    Ok((StatusCode::CREATED, Json(tx)))
}
