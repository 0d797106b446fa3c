//! Info item and action item wrappers bound to their topic.

use std::ops::{Deref, DerefMut};

use super::parent::{Placement, TopicParent};
use super::topic::Topic;
use crate::date;
use crate::errors::AppError;
use crate::models::{Detail, ItemDoc, ItemType, DEFAULT_DUE_DAYS, DEFAULT_PRIORITY};

/// How an item is handed to a wrapper.
#[derive(Debug, Clone)]
pub enum ItemSource {
    Id(String),
    Doc(ItemDoc),
}

pub struct InfoItem<'t, 'p, P: TopicParent> {
    topic: &'t mut Topic<'p, P>,
    doc: ItemDoc,
}

impl<'t, 'p, P: TopicParent> InfoItem<'t, 'p, P> {
    pub fn new(topic: &'t mut Topic<'p, P>, source: ItemSource) -> Result<Self, AppError> {
        let doc = match source {
            ItemSource::Doc(doc) => doc,
            ItemSource::Id(id) => topic.document().find_item(&id).cloned().ok_or_else(|| {
                AppError::InvalidState(format!("Item {} not found in topic {}", id, topic.id()))
            })?,
        };
        Ok(Self { topic, doc })
    }

    pub fn id(&self) -> &str {
        &self.doc.id
    }

    pub fn document(&self) -> &ItemDoc {
        &self.doc
    }

    pub fn document_mut(&mut self) -> &mut ItemDoc {
        &mut self.doc
    }

    pub fn into_document(self) -> ItemDoc {
        self.doc
    }

    pub fn is_action_item(&self) -> bool {
        self.doc.is_action_item()
    }

    pub fn is_sticky(&self) -> bool {
        self.doc.is_sticky()
    }

    pub fn is_created_in_minutes(&self, minutes_id: &str) -> bool {
        self.doc.is_created_in_minutes(minutes_id)
    }

    pub fn invalidate_is_new_flag(&mut self) {
        self.doc.invalidate_is_new_flag();
    }

    pub fn subject(&self) -> &str {
        &self.doc.subject
    }

    pub fn set_subject(&mut self, subject: impl Into<String>) {
        self.doc.subject = subject.into();
    }

    pub fn details(&self) -> &[Detail] {
        &self.doc.details
    }

    /// Appends a detail dated today. Returns the detail id.
    pub fn add_details(&mut self, text: impl Into<String>) -> String {
        let detail = Detail {
            id: uuid::Uuid::new_v4().to_string(),
            created_in_minute: self.topic.parent().lineage_id().map(str::to_string),
            date: date::format_date(date::today()),
            text: text.into(),
            is_new: true,
            is_edited_by: None,
            is_edited_date: None,
        };
        let id = detail.id.clone();
        self.doc.details.push(detail);
        id
    }

    /// Replaces the text of a detail. Blank text removes the detail.
    pub fn update_details(&mut self, index: usize, text: impl Into<String>) -> Result<(), AppError> {
        let text = text.into();
        if text.trim().is_empty() {
            self.remove_details(index)?;
            return Ok(());
        }
        let detail = self.doc.details.get_mut(index).ok_or_else(|| {
            AppError::InvalidState(format!("Item {} has no detail at index {}", self.doc.id, index))
        })?;
        detail.text = text;
        Ok(())
    }

    pub fn remove_details(&mut self, index: usize) -> Result<Detail, AppError> {
        if index >= self.doc.details.len() {
            return Err(AppError::InvalidState(format!(
                "Item {} has no detail at index {}",
                self.doc.id, index
            )));
        }
        Ok(self.doc.details.remove(index))
    }

    /// Writes the item into its topic and the topic into its parent.
    /// Returns the item id.
    pub fn save(&mut self, placement: Placement) -> String {
        let id = self.topic.upsert_info_item(self.doc.clone(), true, placement);
        if let Some(saved) = self.topic.document().find_item(&id) {
            self.doc = saved.clone();
        }
        id
    }
}

/// Fills unset action item fields: open, default priority, due in a week.
pub fn apply_action_item_defaults(doc: &mut ItemDoc) {
    doc.item_type = ItemType::ActionItem;
    if doc.is_open.is_none() {
        doc.is_open = Some(true);
    }
    if doc.priority.is_none() {
        doc.priority = Some(DEFAULT_PRIORITY);
    }
    if doc.duedate.as_deref().map_or(true, str::is_empty) {
        doc.duedate = Some(date::current_date_plus_delta_days(DEFAULT_DUE_DAYS, None));
    }
}

pub struct ActionItem<'t, 'p, P: TopicParent>(InfoItem<'t, 'p, P>);

impl<'t, 'p, P: TopicParent> ActionItem<'t, 'p, P> {
    pub fn new(topic: &'t mut Topic<'p, P>, source: ItemSource) -> Result<Self, AppError> {
        Ok(Self::from_info_item(InfoItem::new(topic, source)?))
    }

    fn from_info_item(mut item: InfoItem<'t, 'p, P>) -> Self {
        apply_action_item_defaults(&mut item.doc);
        Self(item)
    }

    pub fn is_open(&self) -> bool {
        self.0.doc.is_open()
    }

    pub fn toggle_state(&mut self) {
        self.0.doc.is_open = Some(!self.is_open());
    }

    pub fn priority(&self) -> u8 {
        self.0.doc.priority.unwrap_or(DEFAULT_PRIORITY)
    }

    pub fn set_priority(&mut self, priority: u8) -> Result<(), AppError> {
        if !(1..=5).contains(&priority) {
            return Err(AppError::Validation(format!(
                "Priority must be between 1 and 5, got {}",
                priority
            )));
        }
        self.0.doc.priority = Some(priority);
        Ok(())
    }

    pub fn duedate(&self) -> Option<&str> {
        self.0.doc.duedate.as_deref()
    }

    pub fn set_duedate(&mut self, duedate: &str) -> Result<(), AppError> {
        if date::parse_date(duedate).is_none() {
            return Err(AppError::Validation(format!("Invalid due date {}", duedate)));
        }
        self.0.doc.duedate = Some(duedate.to_string());
        Ok(())
    }

    pub fn responsibles(&self) -> &[String] {
        &self.0.doc.responsibles
    }

    pub fn has_responsibles(&self) -> bool {
        !self.0.doc.responsibles.is_empty()
    }

    pub fn set_responsibles(&mut self, responsibles: Vec<String>) {
        self.0.doc.responsibles = responsibles;
    }

    pub fn date_from_details(&self, index: usize) -> Option<&str> {
        self.0.doc.details.get(index).map(|d| d.date.as_str())
    }

    pub fn text_from_details(&self, index: usize) -> &str {
        self.0
            .doc
            .details
            .get(index)
            .map(|d| d.text.as_str())
            .unwrap_or("")
    }
}

impl<'t, 'p, P: TopicParent> Deref for ActionItem<'t, 'p, P> {
    type Target = InfoItem<'t, 'p, P>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<'t, 'p, P: TopicParent> DerefMut for ActionItem<'t, 'p, P> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

/// An item wrapped according to its type.
pub enum TopicItem<'t, 'p, P: TopicParent> {
    Info(InfoItem<'t, 'p, P>),
    Action(ActionItem<'t, 'p, P>),
}

impl<'t, 'p, P: TopicParent> TopicItem<'t, 'p, P> {
    pub(crate) fn create(topic: &'t mut Topic<'p, P>, doc: ItemDoc) -> Self {
        let is_action = doc.is_action_item();
        let item = InfoItem { topic, doc };
        if is_action {
            TopicItem::Action(ActionItem::from_info_item(item))
        } else {
            TopicItem::Info(item)
        }
    }

    pub fn item(&mut self) -> &mut InfoItem<'t, 'p, P> {
        match self {
            TopicItem::Info(item) => item,
            TopicItem::Action(item) => &mut item.0,
        }
    }

    pub fn document(&self) -> &ItemDoc {
        match self {
            TopicItem::Info(item) => item.document(),
            TopicItem::Action(item) => item.document(),
        }
    }
}
