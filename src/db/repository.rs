//! Database repository implementing the store capabilities on SQLite.

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};

use super::{DocumentStore, UserDirectory};
use crate::errors::AppError;
use crate::models::{CreateUserRequest, MeetingSeries, Minutes, TopicDoc, User};

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn insert_ledger_topic(
        tx: &mut Transaction<'_, Sqlite>,
        series_id: &str,
        topic: &TopicDoc,
        now: &str,
    ) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO ledger_topics (id, parent_id, sort_order, doc, updated_at) VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(parent_id, id) DO UPDATE SET sort_order = excluded.sort_order, doc = excluded.doc, updated_at = excluded.updated_at",
        )
        .bind(&topic.id)
        .bind(series_id)
        .bind(topic.sort_order)
        .bind(to_doc(topic)?)
        .bind(now)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    async fn write_minutes(
        tx: &mut Transaction<'_, Sqlite>,
        minutes: &Minutes,
        now: &str,
    ) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO minutes (id, meeting_series_id, date, is_finalized, created_at, doc, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET meeting_series_id = excluded.meeting_series_id, date = excluded.date,
                 is_finalized = excluded.is_finalized, doc = excluded.doc, updated_at = excluded.updated_at",
        )
        .bind(&minutes.id)
        .bind(&minutes.meeting_series_id)
        .bind(&minutes.date)
        .bind(minutes.is_finalized as i32)
        .bind(minutes.created_at.to_rfc3339())
        .bind(to_doc(minutes)?)
        .bind(now)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    async fn write_ledger(
        tx: &mut Transaction<'_, Sqlite>,
        series_id: &str,
        topics: &[TopicDoc],
        now: &str,
    ) -> Result<(), AppError> {
        sqlx::query("DELETE FROM ledger_topics WHERE parent_id = ?")
            .bind(series_id)
            .execute(&mut **tx)
            .await?;
        for topic in topics {
            Self::insert_ledger_topic(tx, series_id, topic, now).await?;
        }
        Ok(())
    }
}

impl DocumentStore for Repository {
    // ==================== SERIES OPERATIONS ====================

    async fn get_series(&self, id: &str) -> Result<Option<MeetingSeries>, AppError> {
        let row = sqlx::query("SELECT doc FROM meeting_series WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(doc_from_row).transpose()
    }

    async fn list_series(&self) -> Result<Vec<MeetingSeries>, AppError> {
        let rows = sqlx::query("SELECT doc FROM meeting_series ORDER BY project, name")
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(doc_from_row).collect()
    }

    async fn save_series(&self, series: &MeetingSeries) -> Result<(), AppError> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO meeting_series (id, project, name, doc, updated_at) VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET project = excluded.project, name = excluded.name,
                 doc = excluded.doc, updated_at = excluded.updated_at",
        )
        .bind(&series.id)
        .bind(&series.project)
        .bind(&series.name)
        .bind(to_doc(series)?)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn remove_series(&self, id: &str) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM ledger_topics WHERE parent_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM minutes WHERE meeting_series_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM meeting_series WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    // ==================== MINUTES OPERATIONS ====================

    async fn get_minutes(&self, id: &str) -> Result<Option<Minutes>, AppError> {
        let row = sqlx::query("SELECT doc FROM minutes WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(doc_from_row).transpose()
    }

    async fn list_minutes_of_series(&self, series_id: &str) -> Result<Vec<Minutes>, AppError> {
        let rows = sqlx::query(
            "SELECT doc FROM minutes WHERE meeting_series_id = ? ORDER BY date, created_at",
        )
        .bind(series_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(doc_from_row).collect()
    }

    async fn save_minutes(&self, minutes: &Minutes) -> Result<(), AppError> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;
        Self::write_minutes(&mut tx, minutes, &now).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn remove_minutes(&self, id: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM minutes WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // ==================== LEDGER OPERATIONS ====================

    async fn list_ledger_topics(&self, series_id: &str) -> Result<Vec<TopicDoc>, AppError> {
        let rows =
            sqlx::query("SELECT doc FROM ledger_topics WHERE parent_id = ? ORDER BY sort_order, id")
                .bind(series_id)
                .fetch_all(&self.pool)
                .await?;

        rows.iter().map(doc_from_row).collect()
    }

    async fn get_ledger_topic(
        &self,
        series_id: &str,
        topic_id: &str,
    ) -> Result<Option<TopicDoc>, AppError> {
        let row = sqlx::query("SELECT doc FROM ledger_topics WHERE parent_id = ? AND id = ?")
            .bind(series_id)
            .bind(topic_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(doc_from_row).transpose()
    }

    async fn upsert_ledger_topic(&self, series_id: &str, topic: &TopicDoc) -> Result<(), AppError> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;
        Self::insert_ledger_topic(&mut tx, series_id, topic, &now).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn remove_ledger_topic(&self, series_id: &str, topic_id: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM ledger_topics WHERE parent_id = ? AND id = ?")
            .bind(series_id)
            .bind(topic_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn replace_ledger(&self, series_id: &str, topics: &[TopicDoc]) -> Result<(), AppError> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;
        Self::write_ledger(&mut tx, series_id, topics, &now).await?;
        tx.commit().await?;

        tracing::debug!("Replaced ledger of series {} with {} topics", series_id, topics.len());
        Ok(())
    }

    async fn save_minutes_with_ledger(
        &self,
        minutes: &Minutes,
        topics: &[TopicDoc],
    ) -> Result<(), AppError> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;
        Self::write_minutes(&mut tx, minutes, &now).await?;
        Self::write_ledger(&mut tx, &minutes.meeting_series_id, topics, &now).await?;
        tx.commit().await?;
        Ok(())
    }
}

impl UserDirectory for Repository {
    // ==================== USER OPERATIONS ====================

    async fn get_user(&self, id: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query("SELECT id, username, profile_name, email FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    async fn list_users(&self) -> Result<Vec<User>, AppError> {
        let rows = sqlx::query("SELECT id, username, profile_name, email FROM users ORDER BY username")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(user_from_row).collect())
    }

    async fn find_users_by_username(&self, username: &str) -> Result<Vec<User>, AppError> {
        let rows = sqlx::query(
            "SELECT id, username, profile_name, email FROM users WHERE username = ? COLLATE NOCASE",
        )
        .bind(username)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(user_from_row).collect())
    }

    async fn create_user(&self, request: &CreateUserRequest) -> Result<User, AppError> {
        let username = request.username.trim();
        if username.is_empty() {
            return Err(AppError::Validation("Username is required".to_string()));
        }
        if !self.find_users_by_username(username).await?.is_empty() {
            return Err(AppError::Validation(format!(
                "Username {} is already taken",
                username
            )));
        }

        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            username: username.to_string(),
            profile_name: request.profile_name.clone(),
            email: request.email.clone(),
        };

        sqlx::query(
            "INSERT INTO users (id, username, profile_name, email, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.profile_name)
        .bind(&user.email)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(user)
    }
}

// ==================== HELPER FUNCTIONS ====================

fn user_from_row(row: &sqlx::sqlite::SqliteRow) -> User {
    User {
        id: row.get("id"),
        username: row.get("username"),
        profile_name: row.get("profile_name"),
        email: row.get("email"),
    }
}

fn doc_from_row<T: DeserializeOwned>(row: &sqlx::sqlite::SqliteRow) -> Result<T, AppError> {
    let doc: String = row.get("doc");
    serde_json::from_str(&doc).map_err(|e| {
        tracing::error!("Corrupt stored document: {:?}", e);
        AppError::Internal(format!("Corrupt stored document: {}", e))
    })
}

fn to_doc<T: Serialize>(value: &T) -> Result<String, AppError> {
    serde_json::to_string(value).map_err(|e| AppError::Internal(format!("Serialization failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_database;
    use tempfile::TempDir;

    async fn repo() -> (Repository, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let pool = init_database(&temp_dir.path().join("test.sqlite"))
            .await
            .expect("Failed to init DB");
        (Repository::new(pool), temp_dir)
    }

    fn ledger_topic(id: &str, sort_order: i64) -> TopicDoc {
        let mut topic = TopicDoc::new(format!("Topic {}", id));
        topic.id = id.to_string();
        topic.sort_order = sort_order;
        topic
    }

    #[tokio::test]
    async fn test_series_round_trip() {
        let (repo, _dir) = repo().await;
        let mut series = MeetingSeries::new("Project", "Weekly");
        repo.save_series(&series).await.unwrap();

        series.name = "Weekly Sync".to_string();
        repo.save_series(&series).await.unwrap();

        let loaded = repo.get_series(&series.id).await.unwrap().unwrap();
        assert_eq!(loaded.name, "Weekly Sync");
        assert_eq!(repo.list_series().await.unwrap().len(), 1);
        assert!(repo.get_series("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_minutes_are_listed_by_date() {
        let (repo, _dir) = repo().await;
        for date in ["2024-03-01", "2024-01-01", "2024-02-01"] {
            repo.save_minutes(&Minutes::new("s1", date)).await.unwrap();
        }
        repo.save_minutes(&Minutes::new("other", "2023-01-01"))
            .await
            .unwrap();

        let dates: Vec<String> = repo
            .list_minutes_of_series("s1")
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.date)
            .collect();
        assert_eq!(dates, ["2024-01-01", "2024-02-01", "2024-03-01"]);
    }

    #[tokio::test]
    async fn test_ledger_replace_and_upsert() {
        let (repo, _dir) = repo().await;
        repo.replace_ledger("s1", &[ledger_topic("b", 1), ledger_topic("a", 0)])
            .await
            .unwrap();

        let ids: Vec<String> = repo
            .list_ledger_topics("s1")
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, ["a", "b"]);

        let mut changed = ledger_topic("a", 5);
        changed.subject = "Renamed".to_string();
        repo.upsert_ledger_topic("s1", &changed).await.unwrap();
        let loaded = repo.get_ledger_topic("s1", "a").await.unwrap().unwrap();
        assert_eq!(loaded.subject, "Renamed");

        repo.replace_ledger("s1", &[ledger_topic("c", 0)]).await.unwrap();
        assert!(repo.get_ledger_topic("s1", "a").await.unwrap().is_none());
        assert!(repo.remove_ledger_topic("s1", "c").await.unwrap());
        assert!(repo.list_ledger_topics("s1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_series_cascades() {
        let (repo, _dir) = repo().await;
        let series = MeetingSeries::new("Project", "Weekly");
        repo.save_series(&series).await.unwrap();
        let minutes = Minutes::new(series.id.clone(), "2024-01-01");
        repo.save_minutes_with_ledger(&minutes, &[ledger_topic("t1", 0)])
            .await
            .unwrap();

        assert!(repo.remove_series(&series.id).await.unwrap());
        assert!(repo.get_minutes(&minutes.id).await.unwrap().is_none());
        assert!(repo.list_ledger_topics(&series.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_users() {
        let (repo, _dir) = repo().await;
        let user = repo
            .create_user(&CreateUserRequest {
                username: "jdoe".to_string(),
                profile_name: Some("Jane Doe".to_string()),
                email: None,
            })
            .await
            .unwrap();

        assert_eq!(repo.display_name(&user.id).await.unwrap(), "Jane Doe");
        assert_eq!(repo.display_name("unknown").await.unwrap(), "unknown");
        assert_eq!(repo.find_users_by_username("JDOE").await.unwrap().len(), 1);

        let duplicate = repo
            .create_user(&CreateUserRequest {
                username: "jdoe".to_string(),
                profile_name: None,
                email: None,
            })
            .await;
        assert!(matches!(duplicate, Err(AppError::Validation(_))));
    }
}
