//! Meeting series operations: minutes creation, the last-minutes cache,
//! labels and visibility.

use chrono::Duration;

use super::MinutesFinder;
use crate::aggregate::SeriesLedger;
use crate::date;
use crate::db::DocumentStore;
use crate::errors::AppError;
use crate::models::{
    CreateSeriesRequest, Label, MeetingSeries, Minutes, UpsertLabelRequest, VisibilityRequest,
};

pub struct SeriesService<'a, S> {
    store: &'a S,
}

impl<'a, S: DocumentStore> SeriesService<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub async fn get_series(&self, series_id: &str) -> Result<MeetingSeries, AppError> {
        self.store
            .get_series(series_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Meeting series {} not found", series_id)))
    }

    async fn get_minutes(&self, minutes_id: &str) -> Result<Minutes, AppError> {
        self.store
            .get_minutes(minutes_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Minutes {} not found", minutes_id)))
    }

    // ==================== SERIES ====================

    pub async fn create_series(&self, request: CreateSeriesRequest) -> Result<MeetingSeries, AppError> {
        let project = request.project.trim();
        let name = request.name.trim();
        if project.is_empty() || name.is_empty() {
            return Err(AppError::Validation(
                "Project and name of a meeting series are required".to_string(),
            ));
        }

        let mut series = MeetingSeries::new(project, name);
        series.visible_for = request.visible_for;
        series.informed_users = request.informed_users;
        self.store.save_series(&series).await?;

        tracing::info!(series_id = %series.id, project = %series.project, name = %series.name, "Created meeting series");
        Ok(series)
    }

    /// Recomputes `lastMinutesId`, `lastMinutesDate` and
    /// `lastMinutesFinalized` from the stored minutes.
    pub async fn update_last_minutes_fields(&self, series_id: &str) -> Result<MeetingSeries, AppError> {
        let mut series = self.get_series(series_id).await?;
        let finder = MinutesFinder::load(self.store, series_id).await?;
        let last = finder.last_minutes();

        series.last_minutes_id = last.map(|m| m.id.clone());
        series.last_minutes_date = last.map(|m| m.date.clone());
        series.last_minutes_finalized = last.is_some_and(|m| m.is_finalized);
        self.store.save_series(&series).await?;

        tracing::debug!(series_id, last_minutes_id = ?series.last_minutes_id, "Updated last minutes fields");
        Ok(series)
    }

    // ==================== MINUTES ====================

    /// Creates the next minutes of a series, carrying the ledger forward.
    /// Only allowed while the last minutes are finalized.
    pub async fn add_new_minutes(
        &self,
        series_id: &str,
        created_by: Option<&str>,
    ) -> Result<Minutes, AppError> {
        let mut series = self.get_series(series_id).await?;
        let finder = MinutesFinder::load(self.store, series_id).await?;
        let last = finder.last_minutes();

        if last.is_some_and(|m| !m.is_finalized) {
            return Err(AppError::NotAllowed(
                "The last minutes of this series must be finalized first".to_string(),
            ));
        }

        let mut date = date::today();
        if let Some(last_date) = last.and_then(|m| date::parse_date(&m.date)) {
            if date <= last_date {
                date = last_date + Duration::days(1);
            }
        }

        let mut minutes = Minutes::new(&series.id, date::format_date(date));
        minutes.visible_for = series.visible_for.clone();
        minutes.informed_users = series.informed_users.clone();
        minutes.created_by = created_by.map(str::to_string);
        if let Some(last) = last.filter(|m| m.global_note_pinned) {
            minutes.global_note = last.global_note.clone();
            minutes.global_note_pinned = true;
        }
        minutes.generate_new_participants()?;

        let ledger = SeriesLedger::load(self.store, &series.id, series.visible_for.clone()).await?;
        minutes.topics = ledger
            .sorted_topics()
            .into_iter()
            .map(|mut topic| {
                topic.tailor();
                topic.is_open = true;
                topic.is_skipped = false;
                topic.parent_id = None;
                topic.visible_for = None;
                topic.clear_is_edited();
                topic
            })
            .collect();

        self.store.save_minutes(&minutes).await?;
        series.minutes.push(minutes.id.clone());
        self.store.save_series(&series).await?;
        self.update_last_minutes_fields(&series.id).await?;

        tracing::info!(
            series_id = %series.id,
            minutes_id = %minutes.id,
            date = %minutes.date,
            topics = minutes.topics.len(),
            "Created minutes"
        );
        Ok(minutes)
    }

    /// Removes non-finalized minutes.
    pub async fn remove_minutes(&self, minutes_id: &str) -> Result<(), AppError> {
        let minutes = self.get_minutes(minutes_id).await?;
        minutes.ensure_editable()?;

        self.store.remove_minutes(minutes_id).await?;
        if let Some(mut series) = self.store.get_series(&minutes.meeting_series_id).await? {
            if series.has_minute(minutes_id) {
                series.minutes.retain(|id| id != minutes_id);
                self.store.save_series(&series).await?;
            }
            self.update_last_minutes_fields(&series.id).await?;
        }

        tracing::info!(minutes_id, "Removed minutes");
        Ok(())
    }

    /// A date is allowed when it is later than every other minutes of the
    /// series.
    pub async fn is_minutes_date_allowed(&self, minutes_id: &str, date: &str) -> Result<bool, AppError> {
        let Some(date) = date::parse_date(date) else {
            return Ok(false);
        };
        let minutes = self.get_minutes(minutes_id).await?;
        let finder = MinutesFinder::load(self.store, &minutes.meeting_series_id).await?;

        Ok(match finder.latest_date_except(minutes_id).and_then(date::parse_date) {
            Some(latest) => date > latest,
            None => true,
        })
    }

    pub async fn update_minutes_date(&self, minutes_id: &str, date: &str) -> Result<Minutes, AppError> {
        let mut minutes = self.get_minutes(minutes_id).await?;
        minutes.ensure_editable()?;
        if !self.is_minutes_date_allowed(minutes_id, date).await? {
            return Err(AppError::Validation(format!(
                "Date {} is not allowed for minutes {}",
                date, minutes_id
            )));
        }

        minutes.date = date.to_string();
        self.store.save_minutes(&minutes).await?;
        self.update_last_minutes_fields(&minutes.meeting_series_id).await?;
        Ok(minutes)
    }

    // ==================== LABELS ====================

    pub async fn upsert_label(
        &self,
        series_id: &str,
        request: UpsertLabelRequest,
    ) -> Result<Label, AppError> {
        let mut series = self.get_series(series_id).await?;
        let label = Label::from_request(request)?;
        let label_id = series.upsert_label(label);
        self.store.save_series(&series).await?;

        series
            .find_label(&label_id)
            .cloned()
            .ok_or_else(|| AppError::Internal(format!("Label {} vanished after upsert", label_id)))
    }

    pub async fn remove_label(&self, series_id: &str, label_id: &str) -> Result<bool, AppError> {
        let mut series = self.get_series(series_id).await?;
        let removed = series.remove_label(label_id);
        if removed {
            self.store.save_series(&series).await?;
        }
        Ok(removed)
    }

    pub async fn add_additional_responsible(
        &self,
        series_id: &str,
        responsible: &str,
    ) -> Result<MeetingSeries, AppError> {
        let responsible = responsible.trim();
        if responsible.is_empty() {
            return Err(AppError::Validation("Responsible must not be empty".to_string()));
        }
        let mut series = self.get_series(series_id).await?;
        series.add_additional_responsible(responsible);
        self.store.save_series(&series).await?;
        Ok(series)
    }

    // ==================== VISIBILITY ====================

    /// Replaces who can see and who is informed about a series and syncs the
    /// change into its minutes and ledger.
    pub async fn set_visible_and_informed_users(
        &self,
        series_id: &str,
        request: VisibilityRequest,
    ) -> Result<MeetingSeries, AppError> {
        let mut series = self.get_series(series_id).await?;
        series.visible_for = request.visible_for;
        series.informed_users = request.informed_users;
        self.store.save_series(&series).await?;

        let finder = MinutesFinder::load(self.store, series_id).await?;
        let last_id = finder.last_minutes().map(|m| m.id.clone());
        for minutes in finder.all_minutes_of_series(None, false) {
            let mut minutes = minutes.clone();
            minutes.visible_for = series.visible_for.clone();
            if !minutes.is_finalized {
                minutes.generate_new_participants()?;
                if last_id.as_deref() == Some(minutes.id.as_str()) {
                    minutes.informed_users = series.informed_users.clone();
                }
            }
            self.store.save_minutes(&minutes).await?;
        }

        let mut ledger = SeriesLedger::load(self.store, series_id, series.visible_for.clone()).await?;
        ledger.set_visible_for(series.visible_for.clone());
        self.store.replace_ledger(series_id, &ledger.topics).await?;

        tracing::info!(series_id, visible = series.visible_for.len(), informed = series.informed_users.len(), "Updated series visibility");
        Ok(series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{Placement, TopicParent};
    use crate::db::{init_database, Repository};
    use crate::models::{ItemDoc, ItemType, TopicDoc};
    use tempfile::TempDir;

    async fn repo() -> (Repository, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_database(&temp_dir.path().join("test.sqlite")).await.unwrap();
        (Repository::new(pool), temp_dir)
    }

    fn create_request() -> CreateSeriesRequest {
        CreateSeriesRequest {
            project: "Project".to_string(),
            name: "Weekly".to_string(),
            visible_for: vec!["alice".to_string(), "bob".to_string()],
            informed_users: vec!["dave".to_string()],
        }
    }

    #[tokio::test]
    async fn test_create_series_requires_names() {
        let (repo, _dir) = repo().await;
        let service = SeriesService::new(&repo);
        let mut request = create_request();
        request.name = "  ".to_string();
        assert!(matches!(
            service.create_series(request).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_add_new_minutes_requires_finalized_last() {
        let (repo, _dir) = repo().await;
        let service = SeriesService::new(&repo);
        let series = service.create_series(create_request()).await.unwrap();

        let first = service.add_new_minutes(&series.id, Some("alice")).await.unwrap();
        assert_eq!(first.date, date::format_date(date::today()));
        assert_eq!(first.participants.len(), 2);
        assert_eq!(first.informed_users, vec!["dave"]);

        let err = service.add_new_minutes(&series.id, None).await.unwrap_err();
        assert!(matches!(err, AppError::NotAllowed(_)));

        let series = service.get_series(&series.id).await.unwrap();
        assert_eq!(series.minutes, vec![first.id.clone()]);
        assert_eq!(series.last_minutes_id.as_deref(), Some(first.id.as_str()));
        assert!(!series.last_minutes_finalized);
    }

    #[tokio::test]
    async fn test_add_new_minutes_carries_ledger_and_pinned_note() {
        let (repo, _dir) = repo().await;
        let service = SeriesService::new(&repo);
        let series = service.create_series(create_request()).await.unwrap();

        let mut first = service.add_new_minutes(&series.id, None).await.unwrap();
        first.is_finalized = true;
        first.global_note = "remember".to_string();
        first.global_note_pinned = true;
        repo.save_minutes(&first).await.unwrap();

        let mut ledger = SeriesLedger::new(&series.id, series.visible_for.clone());
        let mut carried = TopicDoc::new("carried");
        carried.is_open = false;
        carried.is_skipped = true;
        carried.info_items.push(ItemDoc::new(ItemType::InfoItem, "dropped"));
        let mut open = ItemDoc::new(ItemType::ActionItem, "kept");
        open.id = "a1".to_string();
        open.is_open = Some(true);
        carried.info_items.push(open);
        ledger.upsert_topic(carried, Placement::Top);
        repo.replace_ledger(&series.id, &ledger.topics).await.unwrap();

        let second = service.add_new_minutes(&series.id, None).await.unwrap();
        let next_day = date::current_date_plus_delta_days(1, date::parse_date(&first.date));
        assert_eq!(second.date, next_day);
        assert_eq!(second.global_note, "remember");
        assert_eq!(second.topics.len(), 1);

        let topic = &second.topics[0];
        assert!(topic.is_open);
        assert!(!topic.is_skipped);
        assert!(topic.parent_id.is_none());
        assert_eq!(topic.info_items.len(), 1);
        assert_eq!(topic.info_items[0].id, "a1");
    }

    #[tokio::test]
    async fn test_remove_minutes_updates_cache() {
        let (repo, _dir) = repo().await;
        let service = SeriesService::new(&repo);
        let series = service.create_series(create_request()).await.unwrap();
        let minutes = service.add_new_minutes(&series.id, None).await.unwrap();

        service.remove_minutes(&minutes.id).await.unwrap();
        let series = service.get_series(&series.id).await.unwrap();
        assert!(series.minutes.is_empty());
        assert!(series.last_minutes_id.is_none());
        assert!(matches!(
            service.remove_minutes(&minutes.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_minutes_date_rules() {
        let (repo, _dir) = repo().await;
        let service = SeriesService::new(&repo);
        let series = service.create_series(create_request()).await.unwrap();

        let mut first = service.add_new_minutes(&series.id, None).await.unwrap();
        first.date = "2024-01-10".to_string();
        first.is_finalized = true;
        repo.save_minutes(&first).await.unwrap();
        let second = service.add_new_minutes(&series.id, None).await.unwrap();

        assert!(!service.is_minutes_date_allowed(&second.id, "2024-01-10").await.unwrap());
        assert!(service.is_minutes_date_allowed(&second.id, "2024-01-11").await.unwrap());
        assert!(!service.is_minutes_date_allowed(&second.id, "garbage").await.unwrap());
        assert!(!service.is_minutes_date_allowed(&first.id, "2000-01-01").await.unwrap());

        let updated = service.update_minutes_date(&second.id, "2024-01-11").await.unwrap();
        assert_eq!(updated.date, "2024-01-11");
        let series = service.get_series(&series.id).await.unwrap();
        assert_eq!(series.last_minutes_date.as_deref(), Some("2024-01-11"));

        assert!(matches!(
            service.update_minutes_date(&second.id, "2024-01-01").await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_labels_and_responsibles() {
        let (repo, _dir) = repo().await;
        let service = SeriesService::new(&repo);
        let series = service.create_series(create_request()).await.unwrap();

        let label = service
            .upsert_label(
                &series.id,
                UpsertLabelRequest {
                    id: None,
                    name: "urgent#ff0000".to_string(),
                    color: None,
                    is_disabled: false,
                    is_default_label: false,
                },
            )
            .await
            .unwrap();
        assert_eq!(label.name, "urgent");
        assert_eq!(label.color, "#ff0000");
        assert!(!label.id.is_empty());

        let bad = UpsertLabelRequest {
            id: None,
            name: "bad".to_string(),
            color: Some("#zz".to_string()),
            is_disabled: false,
            is_default_label: false,
        };
        assert!(service.upsert_label(&series.id, bad).await.is_err());

        assert!(service.remove_label(&series.id, &label.id).await.unwrap());
        assert!(!service.remove_label(&series.id, &label.id).await.unwrap());

        service.add_additional_responsible(&series.id, "ext@example.com").await.unwrap();
        let series = service.add_additional_responsible(&series.id, "other").await.unwrap();
        let series = service.add_additional_responsible(&series.id, "ext@example.com").await.unwrap();
        assert_eq!(series.additional_responsibles, vec!["ext@example.com", "other"]);
    }

    #[tokio::test]
    async fn test_visibility_is_synced() {
        let (repo, _dir) = repo().await;
        let service = SeriesService::new(&repo);
        let series = service.create_series(create_request()).await.unwrap();

        let mut first = service.add_new_minutes(&series.id, None).await.unwrap();
        first.is_finalized = true;
        repo.save_minutes(&first).await.unwrap();
        let second = service.add_new_minutes(&series.id, None).await.unwrap();
        let mut topic = TopicDoc::new("ledger");
        topic.id = "t1".to_string();
        repo.upsert_ledger_topic(&series.id, &topic).await.unwrap();

        service
            .set_visible_and_informed_users(
                &series.id,
                VisibilityRequest {
                    visible_for: vec!["carol".to_string()],
                    informed_users: vec!["erin".to_string()],
                },
            )
            .await
            .unwrap();

        let first = repo.get_minutes(&first.id).await.unwrap().unwrap();
        assert_eq!(first.visible_for, vec!["carol"]);
        assert_eq!(first.participants.len(), 2);
        assert_eq!(first.informed_users, vec!["dave"]);

        let second = repo.get_minutes(&second.id).await.unwrap().unwrap();
        assert_eq!(second.participants.len(), 1);
        assert_eq!(second.participants[0].user_id, "carol");
        assert_eq!(second.informed_users, vec!["erin"]);

        let topic = repo.get_ledger_topic(&series.id, "t1").await.unwrap().unwrap();
        assert_eq!(topic.visible_for, Some(vec!["carol".to_string()]));
    }
}
