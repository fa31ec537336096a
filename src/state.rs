use std::str::FromStr;
use std::sync::Arc;

use anyhow::Context;
use sqlx::{
    migrate::Migrator,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};

use crate::config::AppConfig;

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let options = SqliteConnectOptions::from_str(&config.database_url)
            .context("parse DATABASE_URL")?
            .create_if_missing(true)
            .foreign_keys(true);
        let db = SqlitePoolOptions::new()
            .max_connections(10)
            .connect_with(options)
            .await
            .context("connect to database")?;

        Ok(Self { db, config })
    }

    pub fn from_parts(db: SqlitePool, config: Arc<AppConfig>) -> Self {
        Self { db, config }
    }
}

#[cfg(test)]
pub mod test_support {
    use super::*;
    use crate::config::JwtConfig;

    /// In-memory state with the embedded migrations applied. A single
    /// connection is enough for tests and keeps the `:memory:` database
    /// shared across all queries of a test.
    pub async fn test_state() -> AppState {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .expect("in-memory options")
            .foreign_keys(true);
        let db = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .expect("in-memory pool");
        MIGRATOR.run(&db).await.expect("migrations apply cleanly");

        let config = Arc::new(AppConfig {
            database_url: "sqlite::memory:".into(),
            jwt: JwtConfig {
                secret: "test-secret".into(),
                access_ttl_minutes: 60,
                refresh_ttl_minutes: 60 * 24 * 7,
            },
        });
        AppState::from_parts(db, config)
    }
}
