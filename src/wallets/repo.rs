use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool};
use time::OffsetDateTime;
use uuid::Uuid;

/// Roster role inside a wallet. Closed set; ownership is not a role but a
/// marker on the wallet itself ([`Wallet::owner_id`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum WalletRole {
    Admin,
    Member,
}

impl WalletRole {
    pub fn parse(s: &str) -> Option<WalletRole> {
        match s {
            "admin" => Some(WalletRole::Admin),
            "member" => Some(WalletRole::Member),
            _ => None,
        }
    }
}

impl std::fmt::Display for WalletRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WalletRole::Admin => write!(f, "admin"),
            WalletRole::Member => write!(f, "member"),
        }
    }
}

/// A shared wallet. The owner is fixed at creation and never reassigned.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Wallet {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// One row of a wallet's roster.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WalletMember {
    pub wallet_id: Uuid,
    pub user_id: Uuid,
    pub role: WalletRole,
    #[serde(with = "time::serde::rfc3339")]
    pub joined_at: OffsetDateTime,
}

/// Roster row joined with the member's email, for listing.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct MemberWithEmail {
    pub user_id: Uuid,
    pub email: String,
    pub role: WalletRole,
    #[serde(with = "time::serde::rfc3339")]
    pub joined_at: OffsetDateTime,
}

impl Wallet {
    /// Create the wallet and its owner's admin membership in one
    /// transaction. A wallet must never exist without that row, so the two
    /// inserts succeed or fail together.
    pub async fn create_with_owner(
        db: &SqlitePool,
        owner_id: Uuid,
        name: &str,
    ) -> sqlx::Result<Wallet> {
        let mut tx = db.begin().await?;
        let now = OffsetDateTime::now_utc();

        let wallet = sqlx::query_as::<_, Wallet>(
            r#"
            INSERT INTO wallets (id, owner_id, name, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING id, owner_id, name, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(owner_id)
        .bind(name)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO wallet_members (wallet_id, user_id, role, joined_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(wallet.id)
        .bind(owner_id)
        .bind(WalletRole::Admin)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(wallet)
    }

    pub async fn count_owned_by(db: &SqlitePool, owner_id: Uuid) -> sqlx::Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM wallets WHERE owner_id = ?")
            .bind(owner_id)
            .fetch_one(db)
            .await
    }

    pub async fn find_by_id<'e, E>(executor: E, wallet_id: Uuid) -> sqlx::Result<Option<Wallet>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Wallet>(
            r#"
            SELECT id, owner_id, name, created_at, updated_at
            FROM wallets
            WHERE id = ?
            "#,
        )
        .bind(wallet_id)
        .fetch_optional(executor)
        .await
    }

    /// Every wallet the user belongs to, own or shared.
    pub async fn list_for_user(db: &SqlitePool, user_id: Uuid) -> sqlx::Result<Vec<Wallet>> {
        sqlx::query_as::<_, Wallet>(
            r#"
            SELECT wallets.id, wallets.owner_id, wallets.name,
                   wallets.created_at, wallets.updated_at
            FROM wallets
            JOIN wallet_members ON wallet_members.wallet_id = wallets.id
            WHERE wallet_members.user_id = ?
            ORDER BY wallets.created_at
            "#,
        )
        .bind(user_id)
        .fetch_all(db)
        .await
    }

    pub async fn rename<'e, E>(executor: E, wallet_id: Uuid, name: &str) -> sqlx::Result<u64>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("UPDATE wallets SET name = ?, updated_at = ? WHERE id = ?")
            .bind(name)
            .bind(OffsetDateTime::now_utc())
            .bind(wallet_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    /// Delete, guarded by ownership. Memberships and transactions go with
    /// the wallet via the foreign-key cascade.
    pub async fn delete(db: &SqlitePool, wallet_id: Uuid, owner_id: Uuid) -> sqlx::Result<u64> {
        let result = sqlx::query("DELETE FROM wallets WHERE id = ? AND owner_id = ?")
            .bind(wallet_id)
            .bind(owner_id)
            .execute(db)
            .await?;
        Ok(result.rows_affected())
    }
}

impl WalletMember {
    pub async fn find<'e, E>(
        executor: E,
        wallet_id: Uuid,
        user_id: Uuid,
    ) -> sqlx::Result<Option<WalletMember>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, WalletMember>(
            r#"
            SELECT wallet_id, user_id, role, joined_at
            FROM wallet_members
            WHERE wallet_id = ? AND user_id = ?
            "#,
        )
        .bind(wallet_id)
        .bind(user_id)
        .fetch_optional(executor)
        .await
    }

    pub async fn add<'e, E>(
        executor: E,
        wallet_id: Uuid,
        user_id: Uuid,
        role: WalletRole,
    ) -> sqlx::Result<WalletMember>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let now = OffsetDateTime::now_utc();
        sqlx::query_as::<_, WalletMember>(
            r#"
            INSERT INTO wallet_members (wallet_id, user_id, role, joined_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING wallet_id, user_id, role, joined_at
            "#,
        )
        .bind(wallet_id)
        .bind(user_id)
        .bind(role)
        .bind(now)
        .bind(now)
        .fetch_one(executor)
        .await
    }

    pub async fn list_with_emails(
        db: &SqlitePool,
        wallet_id: Uuid,
    ) -> sqlx::Result<Vec<MemberWithEmail>> {
        sqlx::query_as::<_, MemberWithEmail>(
            r#"
            SELECT wallet_members.user_id, users.email, wallet_members.role,
                   wallet_members.joined_at
            FROM wallet_members
            JOIN users ON users.id = wallet_members.user_id
            WHERE wallet_members.wallet_id = ?
            ORDER BY wallet_members.joined_at
            "#,
        )
        .bind(wallet_id)
        .fetch_all(db)
        .await
    }

    pub async fn set_role<'e, E>(
        executor: E,
        wallet_id: Uuid,
        user_id: Uuid,
        role: WalletRole,
    ) -> sqlx::Result<u64>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            r#"
            UPDATE wallet_members
            SET role = ?, updated_at = ?
            WHERE wallet_id = ? AND user_id = ?
            "#,
        )
        .bind(role)
        .bind(OffsetDateTime::now_utc())
        .bind(wallet_id)
        .bind(user_id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn remove<'e, E>(executor: E, wallet_id: Uuid, user_id: Uuid) -> sqlx::Result<u64>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM wallet_members WHERE wallet_id = ? AND user_id = ?")
            .bind(wallet_id)
            .bind(user_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}
