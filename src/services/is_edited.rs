//! Advisory edit locks on series, topics, items and details.
//!
//! A lock is the pair `isEditedBy`/`isEditedDate`. Only its holder releases
//! it unless `ignore_lock` is set. Nothing is checked atomically.

use chrono::{DateTime, Utc};

use crate::aggregate::{Topic, TopicSource};
use crate::db::DocumentStore;
use crate::errors::AppError;
use crate::models::{MeetingSeries, Minutes};

fn releasable(holder: Option<&str>, user_id: &str, ignore_lock: bool) -> bool {
    ignore_lock || holder == Some(user_id)
}

fn release(by: &mut Option<String>, date: &mut Option<DateTime<Utc>>, user_id: &str, ignore_lock: bool) {
    if releasable(by.as_deref(), user_id, ignore_lock) {
        *by = None;
        *date = None;
    }
}

pub struct EditLocks<'a, S> {
    store: &'a S,
}

impl<'a, S: DocumentStore> EditLocks<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    async fn get_series(&self, series_id: &str) -> Result<MeetingSeries, AppError> {
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

    pub async fn set_is_edited_series(&self, series_id: &str, user_id: &str) -> Result<(), AppError> {
        let mut series = self.get_series(series_id).await?;
        series.is_edited_by = Some(user_id.to_string());
        series.is_edited_date = Some(Utc::now());
        self.store.save_series(&series).await
    }

    pub async fn remove_is_edited_series(
        &self,
        series_id: &str,
        user_id: &str,
        ignore_lock: bool,
    ) -> Result<(), AppError> {
        let mut series = self.get_series(series_id).await?;
        if !releasable(series.is_edited_by.as_deref(), user_id, ignore_lock) {
            return Ok(());
        }
        series.is_edited_by = None;
        series.is_edited_date = None;
        self.store.save_series(&series).await
    }

    // ==================== MINUTES ====================

    /// Releases every lock inside the minutes the caller may release.
    pub async fn remove_is_edited_minutes(
        &self,
        minutes_id: &str,
        user_id: &str,
        ignore_lock: bool,
    ) -> Result<(), AppError> {
        let mut minutes = self.get_minutes(minutes_id).await?;
        for topic in &mut minutes.topics {
            release(&mut topic.is_edited_by, &mut topic.is_edited_date, user_id, ignore_lock);
            for item in &mut topic.info_items {
                release(&mut item.is_edited_by, &mut item.is_edited_date, user_id, ignore_lock);
                for detail in &mut item.details {
                    release(&mut detail.is_edited_by, &mut detail.is_edited_date, user_id, ignore_lock);
                }
            }
        }
        self.store.save_minutes(&minutes).await
    }

    // ==================== TOPICS ====================

    pub async fn set_is_edited_topic(
        &self,
        minutes_id: &str,
        topic_id: &str,
        user_id: &str,
    ) -> Result<(), AppError> {
        let mut minutes = self.get_minutes(minutes_id).await?;
        minutes.ensure_editable()?;
        let mut topic = Topic::new(&mut minutes, TopicSource::Id(topic_id.to_string()))?;
        let doc = topic.document_mut();
        doc.is_edited_by = Some(user_id.to_string());
        doc.is_edited_date = Some(Utc::now());
        topic.save();
        self.store.save_minutes(&minutes).await
    }

    pub async fn remove_is_edited_topic(
        &self,
        minutes_id: &str,
        topic_id: &str,
        user_id: &str,
        ignore_lock: bool,
    ) -> Result<(), AppError> {
        let mut minutes = self.get_minutes(minutes_id).await?;
        let mut topic = Topic::new(&mut minutes, TopicSource::Id(topic_id.to_string()))?;
        if !releasable(topic.document().is_edited_by.as_deref(), user_id, ignore_lock) {
            return Ok(());
        }
        let doc = topic.document_mut();
        doc.is_edited_by = None;
        doc.is_edited_date = None;
        topic.save();
        self.store.save_minutes(&minutes).await
    }

    // ==================== ITEMS ====================

    pub async fn set_is_edited_info_item(
        &self,
        minutes_id: &str,
        topic_id: &str,
        item_id: &str,
        user_id: &str,
    ) -> Result<(), AppError> {
        self.update_item(minutes_id, topic_id, item_id, true, |item| {
            item.is_edited_by = Some(user_id.to_string());
            item.is_edited_date = Some(Utc::now());
            Ok(())
        })
        .await
    }

    pub async fn remove_is_edited_info_item(
        &self,
        minutes_id: &str,
        topic_id: &str,
        item_id: &str,
        user_id: &str,
        ignore_lock: bool,
    ) -> Result<(), AppError> {
        self.update_item(minutes_id, topic_id, item_id, false, |item| {
            release(&mut item.is_edited_by, &mut item.is_edited_date, user_id, ignore_lock);
            Ok(())
        })
        .await
    }

    pub async fn set_is_edited_detail(
        &self,
        minutes_id: &str,
        topic_id: &str,
        item_id: &str,
        detail_index: usize,
        user_id: &str,
    ) -> Result<(), AppError> {
        self.update_item(minutes_id, topic_id, item_id, true, |item| {
            let detail = item.details.get_mut(detail_index).ok_or_else(|| {
                AppError::InvalidState(format!("Item {} has no detail at index {}", item_id, detail_index))
            })?;
            detail.is_edited_by = Some(user_id.to_string());
            detail.is_edited_date = Some(Utc::now());
            Ok(())
        })
        .await
    }

    pub async fn remove_is_edited_detail(
        &self,
        minutes_id: &str,
        topic_id: &str,
        item_id: &str,
        detail_index: usize,
        user_id: &str,
        ignore_lock: bool,
    ) -> Result<(), AppError> {
        self.update_item(minutes_id, topic_id, item_id, false, |item| {
            if let Some(detail) = item.details.get_mut(detail_index) {
                release(&mut detail.is_edited_by, &mut detail.is_edited_date, user_id, ignore_lock);
            }
            Ok(())
        })
        .await
    }

    /// Applies `change` to one item of a minutes topic and saves the minutes.
    /// A missing item is ignored when releasing.
    async fn update_item<F>(
        &self,
        minutes_id: &str,
        topic_id: &str,
        item_id: &str,
        acquire: bool,
        change: F,
    ) -> Result<(), AppError>
    where
        F: FnOnce(&mut crate::models::ItemDoc) -> Result<(), AppError>,
    {
        let mut minutes = self.get_minutes(minutes_id).await?;
        if acquire {
            minutes.ensure_editable()?;
        }
        let mut topic = Topic::new(&mut minutes, TopicSource::Id(topic_id.to_string()))?;
        let Some(index) = topic.document().find_item_index(item_id) else {
            if acquire {
                return Err(AppError::InvalidState(format!(
                    "Item {} not found in topic {}",
                    item_id, topic_id
                )));
            }
            return Ok(());
        };

        change(&mut topic.document_mut().info_items[index])?;
        topic.save();
        self.store.save_minutes(&minutes).await
    }
}
