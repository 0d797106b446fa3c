//! Topic, item and detail documents.
//!
//! The same `TopicDoc` shape is embedded in a minutes snapshot and stored as a
//! series ledger entry (the latter additionally carries `parentId` and
//! `visibleFor`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default priority of a new action item.
pub const DEFAULT_PRIORITY: u8 = 3;
/// A new action item is due this many days from today.
pub const DEFAULT_DUE_DAYS: i64 = 7;

fn default_true() -> bool {
    true
}

/// An agenda topic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TopicDoc {
    /// Empty until the topic is first upserted into a parent.
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub responsibles: Vec<String>,
    #[serde(default = "default_true")]
    pub is_open: bool,
    #[serde(default)]
    pub is_recurring: bool,
    #[serde(default = "default_true")]
    pub is_new: bool,
    #[serde(default)]
    pub is_skipped: bool,
    #[serde(default)]
    pub sort_order: i64,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub info_items: Vec<ItemDoc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_in_minute: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible_for: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_edited_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_edited_date: Option<DateTime<Utc>>,
}

impl TopicDoc {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            parent_id: None,
            subject: subject.into(),
            responsibles: Vec::new(),
            is_open: true,
            is_recurring: false,
            is_new: true,
            is_skipped: false,
            sort_order: 0,
            labels: Vec::new(),
            info_items: Vec::new(),
            created_in_minute: None,
            visible_for: None,
            created_at: None,
            updated_at: None,
            is_edited_by: None,
            is_edited_date: None,
        }
    }

    pub fn has_open_action_item(&self) -> bool {
        self.info_items
            .iter()
            .any(|item| item.is_action_item() && item.is_open())
    }

    /// Closed, without open action items and not recurring: the topic will
    /// not be carried into future minutes.
    pub fn is_finally_completed(&self) -> bool {
        !self.is_open && !self.has_open_action_item() && !self.is_recurring
    }

    /// Drops every item that is not sticky.
    pub fn tailor(&mut self) {
        self.info_items.retain(ItemDoc::is_sticky);
    }

    pub fn invalidate_is_new_flag(&mut self) {
        self.is_new = false;
        for item in &mut self.info_items {
            item.invalidate_is_new_flag();
        }
    }

    pub fn find_item(&self, item_id: &str) -> Option<&ItemDoc> {
        self.info_items.iter().find(|item| item.id == item_id)
    }

    pub fn find_item_index(&self, item_id: &str) -> Option<usize> {
        self.info_items.iter().position(|item| item.id == item_id)
    }

    pub fn clear_is_edited(&mut self) {
        self.is_edited_by = None;
        self.is_edited_date = None;
        for item in &mut self.info_items {
            item.is_edited_by = None;
            item.is_edited_date = None;
            for detail in &mut item.details {
                detail.is_edited_by = None;
                detail.is_edited_date = None;
            }
        }
    }
}

/// Discriminator between plain info items and action items.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum ItemType {
    #[default]
    InfoItem,
    ActionItem,
}

impl ItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::InfoItem => "infoItem",
            ItemType::ActionItem => "actionItem",
        }
    }
}

/// An info item or action item inside a topic.
///
/// Action item fields (`isOpen`, `responsibles`, `priority`, `duedate`) stay
/// unset on plain info items.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ItemDoc {
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(default)]
    pub item_type: ItemType,
    #[serde(default)]
    pub subject: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_in_minute: Option<String>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default = "default_true")]
    pub is_new: bool,
    #[serde(default)]
    pub details: Vec<Detail>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_open: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub responsibles: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duedate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_edited_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_edited_date: Option<DateTime<Utc>>,
}

impl ItemDoc {
    pub fn new(item_type: ItemType, subject: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            item_type,
            subject: subject.into(),
            created_in_minute: None,
            labels: Vec::new(),
            is_new: true,
            details: Vec::new(),
            is_open: None,
            responsibles: Vec::new(),
            priority: None,
            duedate: None,
            created_at: None,
            updated_at: None,
            is_edited_by: None,
            is_edited_date: None,
        }
    }

    pub fn is_action_item(&self) -> bool {
        self.item_type == ItemType::ActionItem
    }

    /// Open state of an action item. Info items are never open.
    pub fn is_open(&self) -> bool {
        self.is_action_item() && self.is_open.unwrap_or(true)
    }

    /// Sticky items survive tailoring: only open action items.
    pub fn is_sticky(&self) -> bool {
        self.is_open()
    }

    pub fn is_created_in_minutes(&self, minutes_id: &str) -> bool {
        self.created_in_minute.as_deref() == Some(minutes_id)
    }

    pub fn invalidate_is_new_flag(&mut self) {
        self.is_new = false;
        for detail in &mut self.details {
            detail.is_new = false;
        }
    }

    /// Priority as a string, the form `prio:` filter values are compared in.
    pub fn priority_label(&self) -> String {
        self.priority
            .map(|p| p.to_string())
            .unwrap_or_default()
    }
}

/// A dated note attached to an item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Detail {
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_in_minute: Option<String>,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub text: String,
    #[serde(default = "default_true")]
    pub is_new: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_edited_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_edited_date: Option<DateTime<Utc>>,
}

/// Request body for inserting or replacing a topic in a minutes document.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertTopicRequest {
    pub topic: TopicDoc,
    #[serde(default)]
    pub insert_placement_top: Option<bool>,
}

/// Request body for inserting or replacing an item in a topic.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertItemRequest {
    pub item: ItemDoc,
    #[serde(default)]
    pub insert_placement_top: Option<bool>,
}

/// Request body for adding or editing a detail.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailRequest {
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action(subject: &str, open: bool) -> ItemDoc {
        let mut item = ItemDoc::new(ItemType::ActionItem, subject);
        item.is_open = Some(open);
        item
    }

    #[test]
    fn test_has_open_action_item() {
        let mut topic = TopicDoc::new("Budget");
        assert!(!topic.has_open_action_item());

        topic.info_items.push(ItemDoc::new(ItemType::InfoItem, "note"));
        assert!(!topic.has_open_action_item());

        topic.info_items.push(action("closed", false));
        assert!(!topic.has_open_action_item());

        topic.info_items.push(action("open", true));
        assert!(topic.has_open_action_item());
    }

    #[test]
    fn test_tailor_keeps_only_open_action_items() {
        let mut topic = TopicDoc::new("Budget");
        topic.info_items = vec![
            ItemDoc::new(ItemType::InfoItem, "info"),
            action("done", false),
            action("todo", true),
        ];

        topic.tailor();

        assert_eq!(topic.info_items.len(), 1);
        assert_eq!(topic.info_items[0].subject, "todo");
    }

    #[test]
    fn test_is_finally_completed() {
        let mut topic = TopicDoc::new("Budget");
        assert!(!topic.is_finally_completed());

        topic.is_open = false;
        assert!(topic.is_finally_completed());

        topic.is_recurring = true;
        assert!(!topic.is_finally_completed());

        topic.is_recurring = false;
        topic.info_items.push(action("todo", true));
        assert!(!topic.is_finally_completed());
    }

    #[test]
    fn test_deserialize_applies_document_defaults() {
        let topic: TopicDoc = serde_json::from_value(serde_json::json!({
            "_id": "t1",
            "subject": "Kickoff",
            "infoItems": [{ "_id": "i1", "subject": "Note" }]
        }))
        .unwrap();

        assert!(topic.is_open);
        assert!(topic.is_new);
        assert!(!topic.is_recurring);
        assert!(!topic.is_skipped);
        assert!(topic.labels.is_empty());
        assert_eq!(topic.info_items[0].item_type, ItemType::InfoItem);
        assert!(!topic.info_items[0].is_sticky());
    }

    #[test]
    fn test_serializes_document_field_names() {
        let mut item = action("todo", true);
        item.id = "i1".to_string();
        let json = serde_json::to_value(&item).unwrap();

        assert_eq!(json["_id"], "i1");
        assert_eq!(json["itemType"], "actionItem");
        assert_eq!(json["isOpen"], true);
        assert!(json.get("priority").is_none());
    }
}
