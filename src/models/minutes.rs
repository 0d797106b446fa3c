//! Minutes model: one dated meeting of a series with its topic snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ItemDoc, TopicDoc};
use crate::errors::AppError;

/// Attendance record of a user who can see the minutes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub user_id: String,
    #[serde(default)]
    pub present: bool,
    #[serde(default)]
    pub minute_keeper: bool,
}

impl Participant {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            present: false,
            minute_keeper: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Minutes {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "meetingSeries_id")]
    pub meeting_series_id: String,
    /// `YYYY-MM-DD`
    pub date: String,
    #[serde(default)]
    pub topics: Vec<TopicDoc>,
    #[serde(default)]
    pub visible_for: Vec<String>,
    #[serde(default)]
    pub informed_users: Vec<String>,
    #[serde(default)]
    pub participants: Vec<Participant>,
    #[serde(default)]
    pub participants_additional: String,
    #[serde(default)]
    pub global_note: String,
    #[serde(default)]
    pub global_note_pinned: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default)]
    pub is_finalized: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finalized_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finalized_by: Option<String>,
    /// 0 until the first finalize.
    #[serde(default)]
    pub finalized_version: u32,
    #[serde(default)]
    pub finalized_history: Vec<String>,
}

impl Minutes {
    pub fn new(meeting_series_id: impl Into<String>, date: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            meeting_series_id: meeting_series_id.into(),
            date: date.into(),
            topics: Vec::new(),
            visible_for: Vec::new(),
            informed_users: Vec::new(),
            participants: Vec::new(),
            participants_additional: String::new(),
            global_note: String::new(),
            global_note_pinned: false,
            created_at: Utc::now(),
            created_by: None,
            is_finalized: false,
            finalized_at: None,
            finalized_by: None,
            finalized_version: 0,
            finalized_history: Vec::new(),
        }
    }

    /// Finalized minutes are read-only.
    pub fn ensure_editable(&self) -> Result<(), AppError> {
        if self.is_finalized {
            return Err(AppError::InvalidState(format!(
                "Minutes {} are finalized and cannot be changed",
                self.id
            )));
        }
        Ok(())
    }

    pub fn find_topic(&self, topic_id: &str) -> Option<&TopicDoc> {
        self.topics.iter().find(|t| t.id == topic_id)
    }

    pub fn find_topic_index(&self, topic_id: &str) -> Option<usize> {
        self.topics.iter().position(|t| t.id == topic_id)
    }

    pub fn remove_topic(&mut self, topic_id: &str) -> Option<TopicDoc> {
        let index = self.find_topic_index(topic_id)?;
        Some(self.topics.remove(index))
    }

    pub fn get_new_topics(&self) -> Vec<&TopicDoc> {
        self.topics.iter().filter(|t| t.is_new).collect()
    }

    /// Carried-over topics that got closed in this meeting.
    pub fn get_old_closed_topics(&self) -> Vec<&TopicDoc> {
        self.topics
            .iter()
            .filter(|t| !t.is_new && !t.is_open && !t.has_open_action_item())
            .collect()
    }

    pub fn has_open_action_items(&self) -> bool {
        self.topics.iter().any(TopicDoc::has_open_action_item)
    }

    pub fn get_open_action_items(&self, include_skipped_topics: bool) -> Vec<&ItemDoc> {
        self.topics
            .iter()
            .filter(|t| include_skipped_topics || !t.is_skipped)
            .flat_map(|t| t.info_items.iter().filter(|item| item.is_sticky()))
            .collect()
    }

    pub fn get_persons_informed(&self) -> Vec<String> {
        self.visible_for
            .iter()
            .chain(self.informed_users.iter())
            .cloned()
            .collect()
    }

    /// Rebuilds the participant list from `visibleFor`, keeping the state of
    /// users that stay. Returns whether the list changed.
    pub fn generate_new_participants(&mut self) -> Result<bool, AppError> {
        if self.is_finalized {
            return Err(AppError::InvalidState(
                "Participants of finalized minutes cannot be regenerated".to_string(),
            ));
        }

        let mut previous = std::mem::take(&mut self.participants);
        let mut changed = false;
        let mut participants = Vec::with_capacity(self.visible_for.len());

        for user_id in &self.visible_for {
            match previous.iter().position(|p| &p.user_id == user_id) {
                Some(index) => participants.push(previous.remove(index)),
                None => {
                    changed = true;
                    participants.push(Participant::new(user_id.clone()));
                }
            }
        }

        self.participants = participants;
        Ok(changed || !previous.is_empty())
    }

    pub fn update_participant_present(&mut self, user_id: &str, present: bool) -> bool {
        match self.participants.iter_mut().find(|p| p.user_id == user_id) {
            Some(participant) => {
                participant.present = present;
                true
            }
            None => false,
        }
    }
}

/// Request body for changing the date of minutes.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateDateRequest {
    pub date: String,
}

/// Request body for marking a participant present or absent.
#[derive(Debug, Clone, Deserialize)]
pub struct ParticipantPresenceRequest {
    pub present: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ItemType;

    fn topic(subject: &str, is_new: bool, is_open: bool) -> TopicDoc {
        let mut t = TopicDoc::new(subject);
        t.id = subject.to_string();
        t.is_new = is_new;
        t.is_open = is_open;
        t
    }

    #[test]
    fn test_generate_new_participants_keeps_existing_state() {
        let mut minutes = Minutes::new("s1", "2024-01-01");
        minutes.visible_for = vec!["alice".to_string(), "bob".to_string()];
        assert!(minutes.generate_new_participants().unwrap());
        minutes.update_participant_present("alice", true);

        minutes.visible_for = vec!["alice".to_string(), "carol".to_string()];
        assert!(minutes.generate_new_participants().unwrap());

        assert_eq!(minutes.participants.len(), 2);
        assert!(minutes.participants[0].present);
        assert_eq!(minutes.participants[1].user_id, "carol");
        assert!(!minutes.participants[1].present);

        assert!(!minutes.generate_new_participants().unwrap());
    }

    #[test]
    fn test_generate_new_participants_rejects_finalized() {
        let mut minutes = Minutes::new("s1", "2024-01-01");
        minutes.is_finalized = true;
        assert!(matches!(
            minutes.generate_new_participants(),
            Err(AppError::InvalidState(_))
        ));
    }

    #[test]
    fn test_topic_queries() {
        let mut minutes = Minutes::new("s1", "2024-01-01");
        let mut carried = topic("carried", false, true);
        let mut ai = ItemDoc::new(ItemType::ActionItem, "todo");
        ai.is_open = Some(true);
        carried.info_items.push(ai);
        carried.is_skipped = true;

        minutes.topics = vec![
            topic("fresh", true, true),
            topic("closed", false, false),
            carried,
        ];

        assert_eq!(minutes.get_new_topics().len(), 1);
        assert_eq!(minutes.get_old_closed_topics()[0].id, "closed");
        assert!(minutes.has_open_action_items());
        assert_eq!(minutes.get_open_action_items(true).len(), 1);
        assert!(minutes.get_open_action_items(false).is_empty());
    }

    #[test]
    fn test_get_persons_informed() {
        let mut minutes = Minutes::new("s1", "2024-01-01");
        minutes.visible_for = vec!["alice".to_string()];
        minutes.informed_users = vec!["dave".to_string()];
        assert_eq!(minutes.get_persons_informed(), vec!["alice", "dave"]);
    }

    #[test]
    fn test_serializes_series_reference() {
        let minutes = Minutes::new("s1", "2024-01-01");
        let json = serde_json::to_value(&minutes).unwrap();
        assert_eq!(json["meetingSeries_id"], "s1");
        assert_eq!(json["finalizedVersion"], 0);
        assert!(json.get("finalizedAt").is_none());
    }
}
