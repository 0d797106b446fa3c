//! Database module for SQLite persistence.
//!
//! Series, minutes and ledger topics are stored as JSON documents next to the
//! columns they are looked up by. Services talk to the store through the
//! [`DocumentStore`] and [`UserDirectory`] capabilities.

mod repository;

pub use repository::*;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

use crate::errors::AppError;
use crate::models::{CreateUserRequest, MeetingSeries, Minutes, TopicDoc, User};

/// Persistence of series, minutes and series ledgers.
#[allow(async_fn_in_trait)]
pub trait DocumentStore {
    async fn get_series(&self, id: &str) -> Result<Option<MeetingSeries>, AppError>;

    async fn list_series(&self) -> Result<Vec<MeetingSeries>, AppError>;

    async fn save_series(&self, series: &MeetingSeries) -> Result<(), AppError>;

    /// Removes the series together with its minutes and ledger.
    async fn remove_series(&self, id: &str) -> Result<bool, AppError>;

    async fn get_minutes(&self, id: &str) -> Result<Option<Minutes>, AppError>;

    /// Minutes of a series ordered by date, oldest first.
    async fn list_minutes_of_series(&self, series_id: &str) -> Result<Vec<Minutes>, AppError>;

    async fn save_minutes(&self, minutes: &Minutes) -> Result<(), AppError>;

    async fn remove_minutes(&self, id: &str) -> Result<bool, AppError>;

    /// Ledger topics of a series ordered by sort order.
    async fn list_ledger_topics(&self, series_id: &str) -> Result<Vec<TopicDoc>, AppError>;

    async fn get_ledger_topic(
        &self,
        series_id: &str,
        topic_id: &str,
    ) -> Result<Option<TopicDoc>, AppError>;

    async fn upsert_ledger_topic(&self, series_id: &str, topic: &TopicDoc) -> Result<(), AppError>;

    async fn remove_ledger_topic(&self, series_id: &str, topic_id: &str) -> Result<bool, AppError>;

    /// Replaces the whole ledger of a series.
    async fn replace_ledger(&self, series_id: &str, topics: &[TopicDoc]) -> Result<(), AppError>;

    /// Saves the minutes and replaces the ledger of its series atomically.
    async fn save_minutes_with_ledger(
        &self,
        minutes: &Minutes,
        topics: &[TopicDoc],
    ) -> Result<(), AppError>;
}

/// Identity lookups.
#[allow(async_fn_in_trait)]
pub trait UserDirectory {
    async fn get_user(&self, id: &str) -> Result<Option<User>, AppError>;

    async fn list_users(&self) -> Result<Vec<User>, AppError>;

    async fn find_users_by_username(&self, username: &str) -> Result<Vec<User>, AppError>;

    async fn create_user(&self, request: &CreateUserRequest) -> Result<User, AppError>;

    /// Display name of a user, the id itself for unknown users.
    async fn display_name(&self, id: &str) -> Result<String, AppError> {
        Ok(self
            .get_user(id)
            .await?
            .map(|user| user.display_name().to_string())
            .unwrap_or_else(|| id.to_string()))
    }
}

/// Initialize the database connection pool and run migrations.
pub async fn init_database(db_path: &Path) -> Result<SqlitePool, sqlx::Error> {
    // Ensure the parent directory exists
    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent).await.ok();
    }

    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;

    Ok(pool)
}

/// Create tables if they don't exist.
async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            username TEXT NOT NULL UNIQUE,
            profile_name TEXT,
            email TEXT,
            created_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS meeting_series (
            id TEXT PRIMARY KEY,
            project TEXT NOT NULL,
            name TEXT NOT NULL,
            doc TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS minutes (
            id TEXT PRIMARY KEY,
            meeting_series_id TEXT NOT NULL,
            date TEXT NOT NULL,
            is_finalized INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            doc TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS ledger_topics (
            id TEXT NOT NULL,
            parent_id TEXT NOT NULL,
            sort_order INTEGER NOT NULL DEFAULT 0,
            doc TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (parent_id, id)
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_minutes_series_date ON minutes(meeting_series_id, date);
        CREATE INDEX IF NOT EXISTS idx_ledger_topics_parent ON ledger_topics(parent_id, sort_order);
        CREATE INDEX IF NOT EXISTS idx_users_username ON users(username);
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
