//! Meeting series model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Label;

/// A meeting series: the owner of a sequence of minutes and a topic ledger.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MeetingSeries {
    #[serde(rename = "_id")]
    pub id: String,
    pub project: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub visible_for: Vec<String>,
    #[serde(default)]
    pub informed_users: Vec<String>,
    #[serde(default)]
    pub available_labels: Vec<Label>,
    #[serde(default)]
    pub additional_responsibles: Vec<String>,
    /// Minutes ids in creation order.
    #[serde(default)]
    pub minutes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_minutes_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_minutes_date: Option<String>,
    #[serde(default)]
    pub last_minutes_finalized: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_edited_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_edited_date: Option<DateTime<Utc>>,
}

impl MeetingSeries {
    pub fn new(project: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            project: project.into(),
            name: name.into(),
            created_at: Utc::now(),
            visible_for: Vec::new(),
            informed_users: Vec::new(),
            available_labels: Vec::new(),
            additional_responsibles: Vec::new(),
            minutes: Vec::new(),
            last_minutes_id: None,
            last_minutes_date: None,
            last_minutes_finalized: false,
            is_edited_by: None,
            is_edited_date: None,
        }
    }

    pub fn has_minute(&self, minutes_id: &str) -> bool {
        self.minutes.iter().any(|id| id == minutes_id)
    }

    // ==================== LABELS ====================

    pub fn find_label(&self, label_id: &str) -> Option<&Label> {
        self.available_labels.iter().find(|l| l.id == label_id)
    }

    pub fn find_label_by_name(&self, name: &str) -> Option<&Label> {
        self.available_labels.iter().find(|l| l.name == name)
    }

    pub fn find_labels_containing_substr(&self, name: &str, case_sensitive: bool) -> Vec<&Label> {
        let needle = if case_sensitive {
            name.to_string()
        } else {
            name.to_uppercase()
        };
        self.available_labels
            .iter()
            .filter(|label| {
                if case_sensitive {
                    label.name.contains(&needle)
                } else {
                    label.name.to_uppercase().contains(&needle)
                }
            })
            .collect()
    }

    /// Replaces the label with the same id, or inserts it at the front with a
    /// fresh id. Returns the label id.
    pub fn upsert_label(&mut self, mut label: Label) -> String {
        if !label.id.is_empty() {
            if let Some(existing) = self.available_labels.iter_mut().find(|l| l.id == label.id) {
                *existing = label;
                return existing.id.clone();
            }
        } else {
            label.id = uuid::Uuid::new_v4().to_string();
        }
        let id = label.id.clone();
        self.available_labels.insert(0, label);
        id
    }

    pub fn remove_label(&mut self, label_id: &str) -> bool {
        let before = self.available_labels.len();
        self.available_labels.retain(|l| l.id != label_id);
        before != self.available_labels.len()
    }

    /// Moves the responsible to the front, dropping an earlier occurrence.
    pub fn add_additional_responsible(&mut self, responsible: &str) {
        self.additional_responsibles.retain(|r| r != responsible);
        self.additional_responsibles.insert(0, responsible.to_string());
    }
}

/// Request body for creating a meeting series.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSeriesRequest {
    pub project: String,
    pub name: String,
    #[serde(default)]
    pub visible_for: Vec<String>,
    #[serde(default)]
    pub informed_users: Vec<String>,
}

/// Request body for replacing the visibility of a series.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisibilityRequest {
    pub visible_for: Vec<String>,
    #[serde(default)]
    pub informed_users: Vec<String>,
}

/// Request body for adding a free-text responsible.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdditionalResponsibleRequest {
    pub responsible: String,
}
