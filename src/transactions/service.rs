//! Personal transactions. The one real rule here: the referenced category
//! must belong to the user recording the transaction.

use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    categories::repo::Category,
    error::ApiError,
    state::AppState,
    transactions::repo::{NewTransaction, Transaction},
};

async fn check_category_ownership(
    state: &AppState,
    user_id: Uuid,
    category_id: Uuid,
) -> Result<(), ApiError> {
    Category::find_owned(&state.db, category_id, user_id)
        .await?
        .map(|_| ())
        .ok_or_else(|| {
            warn!(user_id = %user_id, category_id = %category_id, "category check failed");
            ApiError::NotFound("category not found or does not belong to the user".into())
        })
}

pub async fn create_transaction(
    state: &AppState,
    user_id: Uuid,
    new: NewTransaction,
) -> Result<Transaction, ApiError> {
    check_category_ownership(state, user_id, new.category_id).await?;

    let tx = Transaction::create(&state.db, user_id, None, &new).await?;
    info!(transaction_id = %tx.id, user_id = %user_id, "transaction created");
    Ok(tx)
}

pub async fn update_transaction(
    state: &AppState,
    user_id: Uuid,
    id: Uuid,
    new: NewTransaction,
) -> Result<Transaction, ApiError> {
    check_category_ownership(state, user_id, new.category_id).await?;

    if Transaction::update(&state.db, id, user_id, &new).await? == 0 {
        return Err(ApiError::NotFound("transaction not found".into()));
    }
    Transaction::find_owned(&state.db, id, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("transaction not found".into()))
}

pub async fn delete_transaction(state: &AppState, user_id: Uuid, id: Uuid) -> Result<(), ApiError> {
    if Transaction::delete(&state.db, id, user_id).await? == 0 {
        return Err(ApiError::NotFound("transaction not found".into()));
    }
    info!(transaction_id = %id, user_id = %user_id, "transaction deleted");
    Ok(())
}
