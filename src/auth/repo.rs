use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl User {
    /// Create a new user with an already-hashed password.
    pub async fn create(db: &SqlitePool, email: &str, password_hash: &str) -> sqlx::Result<User> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, password_hash, created_at)
            VALUES (?, ?, ?, ?)
            RETURNING id, email, password_hash, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(password_hash)
        .bind(OffsetDateTime::now_utc())
        .fetch_one(db)
        .await
    }

    /// Find a user by email. The lookup is case-sensitive, matching how
    /// emails are stored. Takes any executor so it can run inside an open
    /// transaction.
    pub async fn find_by_email<'e, E>(db: E, email: &str) -> sqlx::Result<Option<User>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, created_at
            FROM users
            WHERE email = ?
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await
    }

    pub async fn find_by_id(db: &SqlitePool, id: Uuid) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, created_at
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await
    }
}

/// A stored refresh token. Opaque and random; one user may hold several at
/// once (one per device/session). Expiry is absolute and checked lazily.
#[derive(Debug, Clone, FromRow)]
pub struct RefreshToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token: String,
    pub expires_at: OffsetDateTime,
    pub created_at: OffsetDateTime,
}

impl RefreshToken {
    /// Mint and persist a fresh token for the user.
    pub async fn issue(db: &SqlitePool, user_id: Uuid, ttl: Duration) -> sqlx::Result<RefreshToken> {
        let now = OffsetDateTime::now_utc();
        sqlx::query_as::<_, RefreshToken>(
            r#"
            INSERT INTO refresh_tokens (id, user_id, token, expires_at, created_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING id, user_id, token, expires_at, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(Uuid::new_v4().to_string())
        .bind(now + ttl)
        .bind(now)
        .fetch_one(db)
        .await
    }

    /// Atomically look up and invalidate a token. At most one concurrent
    /// caller observes the row; everyone else gets `None`. This is what
    /// makes rotation single-use.
    pub async fn consume(db: &SqlitePool, token: &str) -> sqlx::Result<Option<RefreshToken>> {
        sqlx::query_as::<_, RefreshToken>(
            r#"
            DELETE FROM refresh_tokens
            WHERE token = ?
            RETURNING id, user_id, token, expires_at, created_at
            "#,
        )
        .bind(token)
        .fetch_optional(db)
        .await
    }

    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        now > self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::test_state;

    #[tokio::test]
    async fn duplicate_email_hits_the_unique_constraint() {
        let state = test_state().await;
        User::create(&state.db, "a@example.com", "hash").await.unwrap();

        let err = User::create(&state.db, "a@example.com", "other-hash")
            .await
            .unwrap_err();
        let db_err = err.as_database_error().expect("database error");
        assert_eq!(db_err.kind(), sqlx::error::ErrorKind::UniqueViolation);
    }

    #[tokio::test]
    async fn email_lookup_is_case_sensitive() {
        let state = test_state().await;
        User::create(&state.db, "Casey@example.com", "hash").await.unwrap();

        assert!(User::find_by_email(&state.db, "Casey@example.com")
            .await
            .unwrap()
            .is_some());
        assert!(User::find_by_email(&state.db, "casey@example.com")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn consume_removes_the_row() {
        let state = test_state().await;
        let user = User::create(&state.db, "a@example.com", "hash").await.unwrap();
        let issued = RefreshToken::issue(&state.db, user.id, Duration::days(7))
            .await
            .unwrap();

        let consumed = RefreshToken::consume(&state.db, &issued.token)
            .await
            .unwrap()
            .expect("first consume sees the token");
        assert_eq!(consumed.user_id, user.id);

        // Second consume: the row is gone.
        assert!(RefreshToken::consume(&state.db, &issued.token)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn a_user_may_hold_several_tokens() {
        let state = test_state().await;
        let user = User::create(&state.db, "a@example.com", "hash").await.unwrap();

        let first = RefreshToken::issue(&state.db, user.id, Duration::days(7)).await.unwrap();
        let second = RefreshToken::issue(&state.db, user.id, Duration::days(7)).await.unwrap();
        assert_ne!(first.token, second.token);

        // Consuming one leaves the other intact.
        RefreshToken::consume(&state.db, &first.token).await.unwrap().unwrap();
        assert!(RefreshToken::consume(&state.db, &second.token)
            .await
            .unwrap()
            .is_some());
    }
}
