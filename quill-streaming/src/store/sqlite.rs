// File: quill-streaming/src/store/sqlite.rs

use async_trait::async_trait;
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;

use quill_common::error::Error;
use quill_common::models::Status;
use quill_common::traits::StatusStore;

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS statuses (
        status_id TEXT PRIMARY KEY,
        account_id TEXT NOT NULL,
        user_id TEXT NOT NULL,
        sort_id INTEGER NOT NULL,
        text TEXT NOT NULL,
        location TEXT
    )",
    "CREATE TABLE IF NOT EXISTS messages (
        message_id TEXT PRIMARY KEY,
        account_id TEXT NOT NULL,
        text TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS mentions (
        status_id TEXT NOT NULL,
        account_id TEXT NOT NULL,
        text TEXT NOT NULL
    )",
];

/// Sqlite-backed record store holding the statuses, direct-message and
/// mirrored-mention partitions the event router mutates.
pub struct SqliteStatusStore {
    pool: SqlitePool,
}

impl SqliteStatusStore {
    /// Opens (or creates) the database at `url` and bootstraps the
    /// schema. Use `sqlite::memory:` in tests.
    pub async fn connect(url: &str) -> Result<Self, Error> {
        // In-memory databases are per-connection; a single pooled
        // connection keeps every query on the same database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(url)
            .await?;
        for statement in SCHEMA {
            sqlx::query(statement).execute(&pool).await?;
        }
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Seeds one status row. Ingestion proper is the refresh pipeline's
    /// job; this exists for that pipeline and for tests.
    pub async fn insert_status(&self, account_id: &str, status: &Status) -> Result<(), Error> {
        sqlx::query(
            "INSERT OR REPLACE INTO statuses (status_id, account_id, user_id, sort_id, text, location)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&status.id)
        .bind(account_id)
        .bind(&status.user.id)
        .bind(status.sort_id)
        .bind(&status.text)
        .bind(&status.location)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn insert_message(
        &self,
        account_id: &str,
        message_id: &str,
        text: &str,
    ) -> Result<(), Error> {
        sqlx::query("INSERT OR REPLACE INTO messages (message_id, account_id, text) VALUES (?, ?, ?)")
            .bind(message_id)
            .bind(account_id)
            .bind(text)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn insert_mention(
        &self,
        account_id: &str,
        status_id: &str,
        text: &str,
    ) -> Result<(), Error> {
        sqlx::query("INSERT INTO mentions (status_id, account_id, text) VALUES (?, ?, ?)")
            .bind(status_id)
            .bind(account_id)
            .bind(text)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Location of a stored status: `None` if the row is missing,
    /// `Some(None)` if the row exists with a cleared location.
    pub async fn status_location(&self, status_id: &str) -> Result<Option<Option<String>>, Error> {
        let row: Option<(Option<String>,)> =
            sqlx::query_as("SELECT location FROM statuses WHERE status_id = ?")
                .bind(status_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(location,)| location))
    }
}

#[async_trait]
impl StatusStore for SqliteStatusStore {
    async fn delete_status(&self, status_id: &str) -> Result<u64, Error> {
        let result = sqlx::query("DELETE FROM statuses WHERE status_id = ?")
            .bind(status_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_mentions_of(&self, status_id: &str) -> Result<u64, Error> {
        let result = sqlx::query("DELETE FROM mentions WHERE status_id = ?")
            .bind(status_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_message(&self, message_id: &str) -> Result<u64, Error> {
        let result = sqlx::query("DELETE FROM messages WHERE message_id = ?")
            .bind(message_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn scrub_geo(&self, user_id: &str, up_to_sort_id: i64) -> Result<u64, Error> {
        let result =
            sqlx::query("UPDATE statuses SET location = NULL WHERE user_id = ? AND sort_id >= ?")
                .bind(user_id)
                .bind(up_to_sort_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }
}
