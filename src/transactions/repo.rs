use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use time::OffsetDateTime;
use uuid::Uuid;

/// Direction of a money flow. Closed set; categories carry the same kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum TxKind {
    Income,
    Expense,
}

impl TxKind {
    pub fn parse(s: &str) -> Option<TxKind> {
        match s {
            "income" => Some(TxKind::Income),
            "expense" => Some(TxKind::Expense),
            _ => None,
        }
    }
}

impl std::fmt::Display for TxKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TxKind::Income => write!(f, "income"),
            TxKind::Expense => write!(f, "expense"),
        }
    }
}

/// A recorded transaction. `wallet_id` is set when the transaction was
/// filed against a shared wallet; the row still belongs to the user who
/// created it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub wallet_id: Option<Uuid>,
    pub category_id: Uuid,
    pub amount: f64,
    #[serde(rename = "type")]
    pub kind: TxKind,
    pub description: String,
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Fields supplied by the caller when recording a transaction.
#[derive(Debug)]
pub struct NewTransaction {
    pub amount: f64,
    pub kind: TxKind,
    pub category_id: Uuid,
    pub description: String,
    pub date: Option<OffsetDateTime>,
}

impl Transaction {
    pub async fn create(
        db: &SqlitePool,
        user_id: Uuid,
        wallet_id: Option<Uuid>,
        new: &NewTransaction,
    ) -> sqlx::Result<Transaction> {
        let now = OffsetDateTime::now_utc();
        sqlx::query_as::<_, Transaction>(
            r#"
            INSERT INTO transactions
                (id, user_id, wallet_id, category_id, amount, kind, description, date, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id, user_id, wallet_id, category_id, amount, kind, description, date, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(wallet_id)
        .bind(new.category_id)
        .bind(new.amount)
        .bind(new.kind)
        .bind(&new.description)
        .bind(new.date.unwrap_or(now))
        .bind(now)
        .fetch_one(db)
        .await
    }

    pub async fn find_owned(
        db: &SqlitePool,
        id: Uuid,
        user_id: Uuid,
    ) -> sqlx::Result<Option<Transaction>> {
        sqlx::query_as::<_, Transaction>(
            r#"
            SELECT id, user_id, wallet_id, category_id, amount, kind, description, date, created_at
            FROM transactions
            WHERE id = ? AND user_id = ?
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(db)
        .await
    }

    /// All of a user's transactions, newest first, optionally narrowed to a
    /// date range (inclusive) and a kind.
    pub async fn list_for_user(
        db: &SqlitePool,
        user_id: Uuid,
        from: Option<OffsetDateTime>,
        to: Option<OffsetDateTime>,
        kind: Option<TxKind>,
    ) -> sqlx::Result<Vec<Transaction>> {
        sqlx::query_as::<_, Transaction>(
            r#"
            SELECT id, user_id, wallet_id, category_id, amount, kind, description, date, created_at
            FROM transactions
            WHERE user_id = ?1
              AND (?2 IS NULL OR date >= ?2)
              AND (?3 IS NULL OR date <= ?3)
              AND (?4 IS NULL OR kind = ?4)
            ORDER BY date DESC
            "#,
        )
        .bind(user_id)
        .bind(from)
        .bind(to)
        .bind(kind)
        .fetch_all(db)
        .await
    }

    pub async fn list_for_wallet(db: &SqlitePool, wallet_id: Uuid) -> sqlx::Result<Vec<Transaction>> {
        sqlx::query_as::<_, Transaction>(
            r#"
            SELECT id, user_id, wallet_id, category_id, amount, kind, description, date, created_at
            FROM transactions
            WHERE wallet_id = ?
            ORDER BY date DESC
            "#,
        )
        .bind(wallet_id)
        .fetch_all(db)
        .await
    }

    /// Overwrite an owned transaction. Returns the number of rows touched;
    /// zero means the transaction does not exist or belongs to someone else.
    pub async fn update(
        db: &SqlitePool,
        id: Uuid,
        user_id: Uuid,
        new: &NewTransaction,
    ) -> sqlx::Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE transactions
            SET amount = ?, kind = ?, category_id = ?, description = ?,
                date = COALESCE(?, date)
            WHERE id = ? AND user_id = ?
            "#,
        )
        .bind(new.amount)
        .bind(new.kind)
        .bind(new.category_id)
        .bind(&new.description)
        .bind(new.date)
        .bind(id)
        .bind(user_id)
        .execute(db)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete(db: &SqlitePool, id: Uuid, user_id: Uuid) -> sqlx::Result<u64> {
        let result = sqlx::query("DELETE FROM transactions WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(db)
            .await?;
        Ok(result.rows_affected())
    }

    /// Income and expense totals over an inclusive date range.
    pub async fn summary(
        db: &SqlitePool,
        user_id: Uuid,
        from: Option<OffsetDateTime>,
        to: Option<OffsetDateTime>,
    ) -> sqlx::Result<(f64, f64)> {
        let rows = sqlx::query_as::<_, (TxKind, f64)>(
            r#"
            SELECT kind, SUM(amount)
            FROM transactions
            WHERE user_id = ?1
              AND (?2 IS NULL OR date >= ?2)
              AND (?3 IS NULL OR date <= ?3)
            GROUP BY kind
            "#,
        )
        .bind(user_id)
        .bind(from)
        .bind(to)
        .fetch_all(db)
        .await?;

        let mut income = 0.0;
        let mut expense = 0.0;
        for (kind, sum) in rows {
            match kind {
                TxKind::Income => income = sum,
                TxKind::Expense => expense = sum,
            }
        }
        Ok((income, expense))
    }

    /// Totals grouped by category name over an inclusive date range.
    pub async fn by_category(
        db: &SqlitePool,
        user_id: Uuid,
        from: Option<OffsetDateTime>,
        to: Option<OffsetDateTime>,
    ) -> sqlx::Result<Vec<(String, f64)>> {
        sqlx::query_as::<_, (String, f64)>(
            r#"
            SELECT categories.name, SUM(transactions.amount)
            FROM transactions
            JOIN categories ON categories.id = transactions.category_id
            WHERE transactions.user_id = ?1
              AND (?2 IS NULL OR transactions.date >= ?2)
              AND (?3 IS NULL OR transactions.date <= ?3)
            GROUP BY categories.name
            "#,
        )
        .bind(user_id)
        .bind(from)
        .bind(to)
        .fetch_all(db)
        .await
    }
}
