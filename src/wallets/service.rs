//! Authorization rules for shared wallets.
//!
//! Two authority levels exist over a wallet's roster: the owner (exactly
//! one, recorded on the wallet row, immutable) and the per-member role.
//! Every mutating operation re-checks the caller's standing and the
//! owner invariants inside the transaction that performs the mutation.
//!
//! A caller who is not a member gets the same failure whether the wallet
//! exists or not, so wallet ids cannot be probed.

use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    auth::repo::User,
    categories::repo::Category,
    error::ApiError,
    state::AppState,
    transactions::repo::{NewTransaction, Transaction},
    wallets::repo::{MemberWithEmail, Wallet, WalletMember, WalletRole},
};

pub const MAX_WALLETS_PER_USER: i64 = 10;

fn access_denied() -> ApiError {
    ApiError::NotFound("wallet not found or access denied".into())
}

pub async fn create_wallet(state: &AppState, user_id: Uuid, name: &str) -> Result<Wallet, ApiError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ApiError::Validation("wallet name is required".into()));
    }

    if Wallet::count_owned_by(&state.db, user_id).await? >= MAX_WALLETS_PER_USER {
        warn!(user_id = %user_id, "wallet limit reached");
        return Err(ApiError::Conflict("wallet limit reached".into()));
    }

    let wallet = Wallet::create_with_owner(&state.db, user_id, name).await?;
    info!(wallet_id = %wallet.id, owner_id = %user_id, "wallet created");
    Ok(wallet)
}

pub async fn list_wallets(state: &AppState, user_id: Uuid) -> Result<Vec<Wallet>, ApiError> {
    Ok(Wallet::list_for_user(&state.db, user_id).await?)
}

/// Any member may view; role is irrelevant.
pub async fn get_wallet(state: &AppState, user_id: Uuid, wallet_id: Uuid) -> Result<Wallet, ApiError> {
    WalletMember::find(&state.db, wallet_id, user_id)
        .await?
        .ok_or_else(access_denied)?;
    Wallet::find_by_id(&state.db, wallet_id)
        .await?
        .ok_or_else(access_denied)
}

/// Admins only.
pub async fn rename_wallet(
    state: &AppState,
    user_id: Uuid,
    wallet_id: Uuid,
    new_name: &str,
) -> Result<Wallet, ApiError> {
    let new_name = new_name.trim();
    if new_name.is_empty() {
        return Err(ApiError::Validation("wallet name is required".into()));
    }

    let mut tx = state.db.begin().await?;

    let member = WalletMember::find(&mut *tx, wallet_id, user_id)
        .await?
        .ok_or_else(access_denied)?;
    if member.role != WalletRole::Admin {
        warn!(user_id = %user_id, wallet_id = %wallet_id, "rename without admin rights");
        return Err(ApiError::Forbidden("only admins can update the wallet name".into()));
    }

    if Wallet::rename(&mut *tx, wallet_id, new_name).await? == 0 {
        return Err(access_denied());
    }
    let wallet = Wallet::find_by_id(&mut *tx, wallet_id)
        .await?
        .ok_or_else(access_denied)?;

    tx.commit().await?;
    Ok(wallet)
}

/// Owner only; being an admin is not enough.
pub async fn delete_wallet(state: &AppState, user_id: Uuid, wallet_id: Uuid) -> Result<(), ApiError> {
    WalletMember::find(&state.db, wallet_id, user_id)
        .await?
        .ok_or_else(access_denied)?;
    let wallet = Wallet::find_by_id(&state.db, wallet_id)
        .await?
        .ok_or_else(access_denied)?;

    if wallet.owner_id != user_id {
        warn!(user_id = %user_id, wallet_id = %wallet_id, "delete attempt by a non-owner");
        return Err(ApiError::Forbidden("only the owner can delete the wallet".into()));
    }

    if Wallet::delete(&state.db, wallet_id, user_id).await? == 0 {
        return Err(access_denied());
    }
    info!(wallet_id = %wallet_id, owner_id = %user_id, "wallet deleted");
    Ok(())
}

pub async fn list_members(
    state: &AppState,
    user_id: Uuid,
    wallet_id: Uuid,
) -> Result<Vec<MemberWithEmail>, ApiError> {
    WalletMember::find(&state.db, wallet_id, user_id)
        .await?
        .ok_or_else(access_denied)?;
    Ok(WalletMember::list_with_emails(&state.db, wallet_id).await?)
}

/// Admins invite by email; the invitee joins with the `member` role.
pub async fn invite_member(
    state: &AppState,
    inviter_id: Uuid,
    wallet_id: Uuid,
    email: &str,
) -> Result<WalletMember, ApiError> {
    let mut tx = state.db.begin().await?;

    let inviter = WalletMember::find(&mut *tx, wallet_id, inviter_id)
        .await?
        .ok_or_else(access_denied)?;
    if inviter.role != WalletRole::Admin {
        return Err(ApiError::Forbidden("only admins can invite users".into()));
    }

    let invited = User::find_by_email(&mut *tx, email.trim())
        .await?
        .ok_or_else(|| ApiError::NotFound("user with the specified email not found".into()))?;

    if WalletMember::find(&mut *tx, wallet_id, invited.id).await?.is_some() {
        return Err(ApiError::Conflict("user is already a member of this wallet".into()));
    }

    let member = WalletMember::add(&mut *tx, wallet_id, invited.id, WalletRole::Member).await?;
    tx.commit().await?;

    info!(wallet_id = %wallet_id, inviter_id = %inviter_id, invited_id = %invited.id, "member invited");
    Ok(member)
}

/// Admins change roles, with three carve-outs: not their own, never the
/// owner's, and only to a defined role (the closed enum guarantees that).
pub async fn change_member_role(
    state: &AppState,
    caller_id: Uuid,
    wallet_id: Uuid,
    target_id: Uuid,
    new_role: WalletRole,
) -> Result<(), ApiError> {
    let mut tx = state.db.begin().await?;

    let caller = WalletMember::find(&mut *tx, wallet_id, caller_id)
        .await?
        .ok_or_else(access_denied)?;
    if caller.role != WalletRole::Admin {
        return Err(ApiError::Forbidden("only admins can change roles".into()));
    }
    if caller_id == target_id {
        return Err(ApiError::Forbidden("cannot change your own role".into()));
    }

    let wallet = Wallet::find_by_id(&mut *tx, wallet_id)
        .await?
        .ok_or_else(access_denied)?;
    if wallet.owner_id == target_id {
        warn!(wallet_id = %wallet_id, caller_id = %caller_id, "attempt to change the owner's role");
        return Err(ApiError::Forbidden("cannot change the owner's role".into()));
    }

    if WalletMember::set_role(&mut *tx, wallet_id, target_id, new_role).await? == 0 {
        return Err(ApiError::NotFound("user is not a member of this wallet".into()));
    }

    tx.commit().await?;
    info!(wallet_id = %wallet_id, target_id = %target_id, role = %new_role, "member role updated");
    Ok(())
}

/// Admins remove members, with the mirrored carve-outs: not themselves and
/// never the owner.
pub async fn remove_member(
    state: &AppState,
    caller_id: Uuid,
    wallet_id: Uuid,
    target_id: Uuid,
) -> Result<(), ApiError> {
    let mut tx = state.db.begin().await?;

    let caller = WalletMember::find(&mut *tx, wallet_id, caller_id)
        .await?
        .ok_or_else(access_denied)?;
    if caller.role != WalletRole::Admin {
        return Err(ApiError::Forbidden("only admins can remove members".into()));
    }
    if caller_id == target_id {
        return Err(ApiError::Forbidden("cannot remove yourself from the wallet".into()));
    }

    let wallet = Wallet::find_by_id(&mut *tx, wallet_id)
        .await?
        .ok_or_else(access_denied)?;
    if wallet.owner_id == target_id {
        warn!(wallet_id = %wallet_id, caller_id = %caller_id, "attempt to remove the owner");
        return Err(ApiError::Forbidden("cannot remove the wallet owner".into()));
    }

    if WalletMember::remove(&mut *tx, wallet_id, target_id).await? == 0 {
        return Err(ApiError::NotFound("user is not a member of this wallet".into()));
    }

    tx.commit().await?;
    info!(wallet_id = %wallet_id, target_id = %target_id, "member removed");
    Ok(())
}

/// Any member may file a transaction, but the category referenced must
/// belong to the filing user; membership does not share categories.
pub async fn create_wallet_transaction(
    state: &AppState,
    user_id: Uuid,
    wallet_id: Uuid,
    new: NewTransaction,
) -> Result<Transaction, ApiError> {
    WalletMember::find(&state.db, wallet_id, user_id)
        .await?
        .ok_or_else(access_denied)?;

    Category::find_owned(&state.db, new.category_id, user_id)
        .await?
        .ok_or_else(|| {
            warn!(user_id = %user_id, category_id = %new.category_id, "foreign category on wallet transaction");
            ApiError::NotFound("category not found or does not belong to the user".into())
        })?;

    let tx = Transaction::create(&state.db, user_id, Some(wallet_id), &new).await?;
    info!(wallet_id = %wallet_id, user_id = %user_id, transaction_id = %tx.id, "wallet transaction created");
    Ok(tx)
}

pub async fn list_wallet_transactions(
    state: &AppState,
    user_id: Uuid,
    wallet_id: Uuid,
) -> Result<Vec<Transaction>, ApiError> {
    WalletMember::find(&state.db, wallet_id, user_id)
        .await?
        .ok_or_else(access_denied)?;
    Ok(Transaction::list_for_wallet(&state.db, wallet_id).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::test_state;
    use crate::transactions::repo::TxKind;

    async fn user(state: &AppState, email: &str) -> Uuid {
        User::create(&state.db, email, "hash").await.unwrap().id
    }

    fn new_tx(category_id: Uuid, amount: f64) -> NewTransaction {
        NewTransaction {
            amount,
            kind: TxKind::Expense,
            category_id,
            description: String::new(),
            date: None,
        }
    }

    #[tokio::test]
    async fn the_owner_membership_exists_right_after_creation() {
        let state = test_state().await;
        let alice = user(&state, "alice@example.com").await;

        let wallet = create_wallet(&state, alice, "Household").await.unwrap();
        assert_eq!(wallet.owner_id, alice);

        let member = WalletMember::find(&state.db, wallet.id, alice)
            .await
            .unwrap()
            .expect("owner membership row");
        assert_eq!(member.role, WalletRole::Admin);
    }

    #[tokio::test]
    async fn the_eleventh_wallet_is_refused() {
        let state = test_state().await;
        let alice = user(&state, "alice@example.com").await;

        for i in 0..MAX_WALLETS_PER_USER {
            create_wallet(&state, alice, &format!("Wallet {i}")).await.unwrap();
        }

        let err = create_wallet(&state, alice, "One too many").await.unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[tokio::test]
    async fn a_blank_name_is_rejected_before_the_limit_check() {
        let state = test_state().await;
        let alice = user(&state, "alice@example.com").await;
        let err = create_wallet(&state, alice, "   ").await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn non_members_cannot_tell_a_wallet_from_a_missing_one() {
        let state = test_state().await;
        let alice = user(&state, "alice@example.com").await;
        let bob = user(&state, "bob@example.com").await;
        let wallet = create_wallet(&state, alice, "Private").await.unwrap();

        let against_real = get_wallet(&state, bob, wallet.id).await.unwrap_err();
        let against_missing = get_wallet(&state, bob, Uuid::new_v4()).await.unwrap_err();

        // Same variant, same message: no existence leak.
        match (&against_real, &against_missing) {
            (ApiError::NotFound(a), ApiError::NotFound(b)) => assert_eq!(a, b),
            other => panic!("expected two NotFound errors, got {other:?}"),
        }

        // The collapse holds across every wallet sub-resource.
        assert!(matches!(
            list_members(&state, bob, wallet.id).await.unwrap_err(),
            ApiError::NotFound(_)
        ));
        assert!(matches!(
            list_wallet_transactions(&state, bob, wallet.id).await.unwrap_err(),
            ApiError::NotFound(_)
        ));
        assert!(matches!(
            rename_wallet(&state, bob, wallet.id, "Mine now").await.unwrap_err(),
            ApiError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn the_shared_trip_wallet_scenario() {
        let state = test_state().await;
        let alice = user(&state, "alice@example.com").await;
        let bob = user(&state, "bob@example.com").await;

        let wallet = create_wallet(&state, alice, "Trip").await.unwrap();
        invite_member(&state, alice, wallet.id, "bob@example.com").await.unwrap();

        // Bob, a plain member, can view but not manage.
        list_wallet_transactions(&state, bob, wallet.id).await.unwrap();
        assert!(matches!(
            rename_wallet(&state, bob, wallet.id, "Bob's Trip").await.unwrap_err(),
            ApiError::Forbidden(_)
        ));

        // Promotion unlocks management.
        change_member_role(&state, alice, wallet.id, bob, WalletRole::Admin).await.unwrap();
        let renamed = rename_wallet(&state, bob, wallet.id, "Road Trip").await.unwrap();
        assert_eq!(renamed.name, "Road Trip");

        // Even as an admin, Bob cannot touch the owner.
        assert!(matches!(
            remove_member(&state, bob, wallet.id, alice).await.unwrap_err(),
            ApiError::Forbidden(_)
        ));
        assert!(matches!(
            change_member_role(&state, bob, wallet.id, alice, WalletRole::Member)
                .await
                .unwrap_err(),
            ApiError::Forbidden(_)
        ));
    }

    #[tokio::test]
    async fn members_cannot_invite_and_strangers_cannot_be_invited_twice() {
        let state = test_state().await;
        let alice = user(&state, "alice@example.com").await;
        let bob = user(&state, "bob@example.com").await;
        user(&state, "carol@example.com").await;

        let wallet = create_wallet(&state, alice, "Flat").await.unwrap();
        invite_member(&state, alice, wallet.id, "bob@example.com").await.unwrap();

        // A plain member may not grow the roster.
        assert!(matches!(
            invite_member(&state, bob, wallet.id, "carol@example.com").await.unwrap_err(),
            ApiError::Forbidden(_)
        ));

        // The invitee must exist.
        assert!(matches!(
            invite_member(&state, alice, wallet.id, "nobody@example.com").await.unwrap_err(),
            ApiError::NotFound(_)
        ));

        // Double-invite is a conflict, distinct from the other failures.
        assert!(matches!(
            invite_member(&state, alice, wallet.id, "bob@example.com").await.unwrap_err(),
            ApiError::Conflict(_)
        ));
    }

    #[tokio::test]
    async fn admins_cannot_rewrite_their_own_standing() {
        let state = test_state().await;
        let alice = user(&state, "alice@example.com").await;
        let bob = user(&state, "bob@example.com").await;

        let wallet = create_wallet(&state, alice, "Shared").await.unwrap();
        invite_member(&state, alice, wallet.id, "bob@example.com").await.unwrap();
        change_member_role(&state, alice, wallet.id, bob, WalletRole::Admin).await.unwrap();

        assert!(matches!(
            change_member_role(&state, bob, wallet.id, bob, WalletRole::Member)
                .await
                .unwrap_err(),
            ApiError::Forbidden(_)
        ));
        assert!(matches!(
            remove_member(&state, bob, wallet.id, bob).await.unwrap_err(),
            ApiError::Forbidden(_)
        ));
    }

    #[tokio::test]
    async fn role_changes_require_an_actual_member() {
        let state = test_state().await;
        let alice = user(&state, "alice@example.com").await;
        let carol = user(&state, "carol@example.com").await;

        let wallet = create_wallet(&state, alice, "Shared").await.unwrap();

        let err = change_member_role(&state, alice, wallet.id, carol, WalletRole::Admin)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn removal_revokes_access() {
        let state = test_state().await;
        let alice = user(&state, "alice@example.com").await;
        let bob = user(&state, "bob@example.com").await;

        let wallet = create_wallet(&state, alice, "Shared").await.unwrap();
        invite_member(&state, alice, wallet.id, "bob@example.com").await.unwrap();
        get_wallet(&state, bob, wallet.id).await.unwrap();

        remove_member(&state, alice, wallet.id, bob).await.unwrap();
        assert!(matches!(
            get_wallet(&state, bob, wallet.id).await.unwrap_err(),
            ApiError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn only_the_owner_deletes_and_the_cascade_clears_the_roster() {
        let state = test_state().await;
        let alice = user(&state, "alice@example.com").await;
        let bob = user(&state, "bob@example.com").await;

        let wallet = create_wallet(&state, alice, "Doomed").await.unwrap();
        invite_member(&state, alice, wallet.id, "bob@example.com").await.unwrap();
        change_member_role(&state, alice, wallet.id, bob, WalletRole::Admin).await.unwrap();

        // Admin standing is not ownership.
        assert!(matches!(
            delete_wallet(&state, bob, wallet.id).await.unwrap_err(),
            ApiError::Forbidden(_)
        ));

        let category = Category::create(&state.db, alice, "Food", TxKind::Expense)
            .await
            .unwrap();
        create_wallet_transaction(&state, alice, wallet.id, new_tx(category.id, 12.5))
            .await
            .unwrap();

        delete_wallet(&state, alice, wallet.id).await.unwrap();

        assert!(WalletMember::find(&state.db, wallet.id, bob).await.unwrap().is_none());
        assert!(WalletMember::find(&state.db, wallet.id, alice).await.unwrap().is_none());
        assert!(Transaction::list_for_wallet(&state.db, wallet.id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn wallet_transactions_demand_the_callers_own_category() {
        let state = test_state().await;
        let alice = user(&state, "alice@example.com").await;
        let bob = user(&state, "bob@example.com").await;

        let wallet = create_wallet(&state, alice, "Shared").await.unwrap();
        invite_member(&state, alice, wallet.id, "bob@example.com").await.unwrap();

        let alices_category = Category::create(&state.db, alice, "Food", TxKind::Expense)
            .await
            .unwrap();

        // Bob is a perfectly valid member, but the category is Alice's.
        let err = create_wallet_transaction(&state, bob, wallet.id, new_tx(alices_category.id, 9.0))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));

        let bobs_category = Category::create(&state.db, bob, "Food", TxKind::Expense)
            .await
            .unwrap();
        let tx = create_wallet_transaction(&state, bob, wallet.id, new_tx(bobs_category.id, 9.0))
            .await
            .unwrap();
        assert_eq!(tx.wallet_id, Some(wallet.id));
        assert_eq!(tx.user_id, bob);

        let listed = list_wallet_transactions(&state, alice, wallet.id).await.unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    async fn shared_wallets_show_up_in_both_listings() {
        let state = test_state().await;
        let alice = user(&state, "alice@example.com").await;
        let bob = user(&state, "bob@example.com").await;

        let wallet = create_wallet(&state, alice, "Shared").await.unwrap();
        assert!(list_wallets(&state, bob).await.unwrap().is_empty());

        invite_member(&state, alice, wallet.id, "bob@example.com").await.unwrap();

        let bobs = list_wallets(&state, bob).await.unwrap();
        assert_eq!(bobs.len(), 1);
        assert_eq!(bobs[0].id, wallet.id);

        let members = list_members(&state, bob, wallet.id).await.unwrap();
        assert_eq!(members.len(), 2);
    }
}
