use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::transactions::repo::TxKind;

/// A user-owned transaction category. Ownership gates its use: only the
/// owner may reference it from a transaction, shared wallets included.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Category {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: TxKind,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Category {
    pub async fn create(
        db: &SqlitePool,
        user_id: Uuid,
        name: &str,
        kind: TxKind,
    ) -> sqlx::Result<Category> {
        sqlx::query_as::<_, Category>(
            r#"
            INSERT INTO categories (id, user_id, name, kind, created_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING id, user_id, name, kind, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(name)
        .bind(kind)
        .bind(OffsetDateTime::now_utc())
        .fetch_one(db)
        .await
    }

    /// Fetch a category only if it belongs to the given user.
    pub async fn find_owned(
        db: &SqlitePool,
        id: Uuid,
        user_id: Uuid,
    ) -> sqlx::Result<Option<Category>> {
        sqlx::query_as::<_, Category>(
            r#"
            SELECT id, user_id, name, kind, created_at
            FROM categories
            WHERE id = ? AND user_id = ?
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(db)
        .await
    }

    pub async fn list_for_user(
        db: &SqlitePool,
        user_id: Uuid,
        kind: Option<TxKind>,
    ) -> sqlx::Result<Vec<Category>> {
        sqlx::query_as::<_, Category>(
            r#"
            SELECT id, user_id, name, kind, created_at
            FROM categories
            WHERE user_id = ?1
              AND (?2 IS NULL OR kind = ?2)
            ORDER BY created_at
            "#,
        )
        .bind(user_id)
        .bind(kind)
        .fetch_all(db)
        .await
    }

    /// Returns the number of rows touched; zero means the category does
    /// not exist or belongs to someone else.
    pub async fn update(
        db: &SqlitePool,
        id: Uuid,
        user_id: Uuid,
        name: &str,
        kind: TxKind,
    ) -> sqlx::Result<u64> {
        let result = sqlx::query(
            "UPDATE categories SET name = ?, kind = ? WHERE id = ? AND user_id = ?",
        )
        .bind(name)
        .bind(kind)
        .bind(id)
        .bind(user_id)
        .execute(db)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete(db: &SqlitePool, id: Uuid, user_id: Uuid) -> sqlx::Result<u64> {
        let result = sqlx::query("DELETE FROM categories WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(db)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repo::User;
    use crate::state::test_support::test_state;

    #[tokio::test]
    async fn categories_are_scoped_to_their_owner() {
        let state = test_state().await;
        let alice = User::create(&state.db, "alice@example.com", "hash").await.unwrap();
        let bob = User::create(&state.db, "bob@example.com", "hash").await.unwrap();

        let groceries = Category::create(&state.db, alice.id, "Groceries", TxKind::Expense)
            .await
            .unwrap();

        assert!(Category::find_owned(&state.db, groceries.id, alice.id)
            .await
            .unwrap()
            .is_some());
        // The same id through another user's eyes does not exist.
        assert!(Category::find_owned(&state.db, groceries.id, bob.id)
            .await
            .unwrap()
            .is_none());
        assert_eq!(Category::delete(&state.db, groceries.id, bob.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn list_filters_by_kind() {
        let state = test_state().await;
        let user = User::create(&state.db, "a@example.com", "hash").await.unwrap();
        Category::create(&state.db, user.id, "Salary", TxKind::Income).await.unwrap();
        Category::create(&state.db, user.id, "Rent", TxKind::Expense).await.unwrap();

        let all = Category::list_for_user(&state.db, user.id, None).await.unwrap();
        assert_eq!(all.len(), 2);

        let income = Category::list_for_user(&state.db, user.id, Some(TxKind::Income))
            .await
            .unwrap();
        assert_eq!(income.len(), 1);
        assert_eq!(income[0].name, "Salary");
    }
}
