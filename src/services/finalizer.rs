//! Finalize and unfinalize workflow of minutes.

use chrono::Utc;

use super::{merge_topics_for_finalize, merge_topics_for_unfinalize, MinutesFinder, SeriesService};
use crate::aggregate::SeriesLedger;
use crate::date;
use crate::db::{DocumentStore, UserDirectory};
use crate::errors::AppError;
use crate::models::Minutes;

/// History line of the latest finalize state change.
pub fn compile_finalized_info(minutes: &Minutes) -> String {
    let Some(finalized_at) = minutes.finalized_at else {
        return "Never finalized".to_string();
    };

    let version = if minutes.finalized_version > 0 {
        format!("Version {}. ", minutes.finalized_version)
    } else {
        String::new()
    };
    let state = if minutes.is_finalized {
        "Finalized"
    } else {
        "Unfinalized"
    };

    format!(
        "{}{} on {} by {}",
        version,
        state,
        date::format_date_time(finalized_at),
        minutes.finalized_by.as_deref().unwrap_or_default()
    )
}

pub struct Finalizer<'a, S> {
    store: &'a S,
}

impl<'a, S: DocumentStore + UserDirectory> Finalizer<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    async fn get_minutes(&self, minutes_id: &str) -> Result<Minutes, AppError> {
        self.store
            .get_minutes(minutes_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Minutes {} not found", minutes_id)))
    }

    /// Locks the minutes and merges its topics into the series ledger.
    pub async fn finalize(&self, minutes_id: &str, user_id: &str) -> Result<Minutes, AppError> {
        tracing::info!(minutes_id, user_id, "Finalizing minutes");

        let mut minutes = self.get_minutes(minutes_id).await?;
        if minutes.is_finalized {
            return Err(AppError::InvalidState(format!(
                "Minutes {} are already finalized",
                minutes_id
            )));
        }
        let series_id = minutes.meeting_series_id.clone();
        if self.store.get_series(&series_id).await?.is_none() {
            return Err(AppError::InvalidState(format!(
                "Minutes {} belong to unknown meeting series {}",
                minutes_id, series_id
            )));
        }

        // Topic order of this meeting becomes the ledger order.
        for (index, topic) in minutes.topics.iter_mut().enumerate() {
            topic.clear_is_edited();
            topic.sort_order = index as i64;
        }

        let finder = MinutesFinder::load(self.store, &series_id).await?;
        let previous = finder.last_finalized_before(minutes_id);
        let mut ledger =
            SeriesLedger::load(self.store, &series_id, minutes.visible_for.clone()).await?;
        merge_topics_for_finalize(&mut ledger, &mut minutes, previous);

        minutes.finalized_at = Some(Utc::now());
        minutes.finalized_by = Some(self.store.display_name(user_id).await?);
        minutes.is_finalized = true;
        minutes.finalized_version += 1;
        let entry = compile_finalized_info(&minutes);
        minutes.finalized_history.push(entry);

        self.store
            .save_minutes_with_ledger(&minutes, &ledger.topics)
            .await?;
        SeriesService::new(self.store)
            .update_last_minutes_fields(&series_id)
            .await?;

        tracing::info!(
            minutes_id,
            version = minutes.finalized_version,
            ledger_topics = ledger.topics.len(),
            "Finalized minutes"
        );
        Ok(minutes)
    }

    /// Reopens the last finalized minutes and rolls the ledger back.
    pub async fn unfinalize(&self, minutes_id: &str, user_id: &str) -> Result<Minutes, AppError> {
        tracing::info!(minutes_id, user_id, "Unfinalizing minutes");

        if !self.is_unfinalize_minutes_allowed(minutes_id).await? {
            return Err(AppError::NotAllowed(format!(
                "Minutes {} are not allowed to be unfinalized",
                minutes_id
            )));
        }

        let mut minutes = self.get_minutes(minutes_id).await?;
        let series_id = minutes.meeting_series_id.clone();
        let finder = MinutesFinder::load(self.store, &series_id).await?;
        let earlier: Vec<Minutes> = finder
            .finalized_minutes_before(minutes_id)
            .into_iter()
            .cloned()
            .collect();

        let mut ledger = SeriesLedger::new(&series_id, minutes.visible_for.clone());
        merge_topics_for_unfinalize(&mut ledger, &earlier);

        minutes.finalized_at = Some(Utc::now());
        minutes.finalized_by = Some(self.store.display_name(user_id).await?);
        minutes.is_finalized = false;
        let entry = compile_finalized_info(&minutes);
        minutes.finalized_history.push(entry);

        self.store
            .save_minutes_with_ledger(&minutes, &ledger.topics)
            .await?;
        SeriesService::new(self.store)
            .update_last_minutes_fields(&series_id)
            .await?;

        tracing::info!(minutes_id, replayed = earlier.len(), "Unfinalized minutes");
        Ok(minutes)
    }

    /// Only the last minutes of a series can be unfinalized, and only while
    /// finalized.
    pub async fn is_unfinalize_minutes_allowed(&self, minutes_id: &str) -> Result<bool, AppError> {
        let minutes = self.get_minutes(minutes_id).await?;
        let finder = MinutesFinder::load(self.store, &minutes.meeting_series_id).await?;
        Ok(finder
            .last_minutes()
            .is_some_and(|last| last.id == minutes_id && last.is_finalized))
    }

    pub async fn finalized_info(&self, minutes_id: &str) -> Result<String, AppError> {
        let minutes = self.get_minutes(minutes_id).await?;
        Ok(compile_finalized_info(&minutes))
    }
}
