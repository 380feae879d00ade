//! SQLite address book: which wallets each Telegram user tracks.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

/// Database connection for the address book.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connect to the SQLite database at `database_url`, creating it if missing.
    pub async fn connect(database_url: &str) -> Result<Self, DbError> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        // Every connection to `:memory:` opens its own empty database.
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    async fn run_migrations(&self) -> Result<(), DbError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS user_addresses (
                user_id INTEGER NOT NULL,
                address TEXT NOT NULL,
                added_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (user_id, address)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_user_addresses_address ON user_addresses(address)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Track `address` for `user_id`. Returns false if it was already tracked.
    pub async fn add_address(&self, user_id: i64, address: &str) -> Result<bool, DbError> {
        let result = sqlx::query("INSERT OR IGNORE INTO user_addresses (user_id, address) VALUES (?, ?)")
            .bind(user_id)
            .bind(address)
            .execute(&self.pool)
            .await?;
        debug!("add_address user={} affected={}", user_id, result.rows_affected());
        Ok(result.rows_affected() > 0)
    }

    /// Stop tracking `address`. Returns false if it was not tracked.
    pub async fn remove_address(&self, user_id: i64, address: &str) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM user_addresses WHERE user_id = ? AND address = ?")
            .bind(user_id)
            .bind(address)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Addresses of `user_id` in the order they were added.
    pub async fn list_addresses(&self, user_id: i64) -> Result<Vec<String>, DbError> {
        let rows = sqlx::query_as::<_, (String,)>(
            "SELECT address FROM user_addresses WHERE user_id = ? ORDER BY rowid",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(address,)| address).collect())
    }

    /// Every tracked address across all users, without duplicates.
    pub async fn list_all_addresses(&self) -> Result<Vec<String>, DbError> {
        let rows = sqlx::query_as::<_, (String,)>(
            "SELECT DISTINCT address FROM user_addresses ORDER BY address",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(address,)| address).collect())
    }
}
