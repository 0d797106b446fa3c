//! Stateful topic wrapper bound to its parent.
//!
//! A `Topic` owns a working copy of the topic document. Mutations change the
//! copy; [`Topic::save`] writes it back into the parent, and persisting the
//! parent is a separate step through the store.

use chrono::Utc;

use super::item::{ActionItem, InfoItem, ItemSource, TopicItem};
use super::parent::{Placement, TopicParent};
use crate::errors::AppError;
use crate::models::{ItemDoc, TopicDoc};

/// How a topic is handed to [`Topic::new`].
#[derive(Debug, Clone)]
pub enum TopicSource {
    Id(String),
    Doc(TopicDoc),
}

pub struct Topic<'p, P: TopicParent> {
    parent: &'p mut P,
    doc: TopicDoc,
}

/// Index of the topic with `id`, if any.
pub fn find_topic_index_in_array(id: &str, topics: &[TopicDoc]) -> Option<usize> {
    topics.iter().position(|t| t.id == id)
}

impl<'p, P: TopicParent> Topic<'p, P> {
    pub fn new(parent: &'p mut P, source: TopicSource) -> Result<Self, AppError> {
        let doc = match source {
            TopicSource::Doc(doc) => doc,
            TopicSource::Id(id) => parent.find_topic(&id).cloned().ok_or_else(|| {
                AppError::InvalidState(format!(
                    "Topic {} not found in {}",
                    id,
                    parent.parent_id()
                ))
            })?,
        };
        Ok(Self { parent, doc })
    }

    pub fn id(&self) -> &str {
        &self.doc.id
    }

    pub fn parent(&self) -> &P {
        self.parent
    }

    pub fn document(&self) -> &TopicDoc {
        &self.doc
    }

    pub fn document_mut(&mut self) -> &mut TopicDoc {
        &mut self.doc
    }

    pub fn into_document(self) -> TopicDoc {
        self.doc
    }

    pub fn subject(&self) -> &str {
        &self.doc.subject
    }

    pub fn set_subject(&mut self, subject: impl Into<String>) {
        self.doc.subject = subject.into();
    }

    pub fn invalidate_is_new_flag(&mut self) {
        self.doc.invalidate_is_new_flag();
    }

    pub fn is_finally_completed(&self) -> bool {
        self.doc.is_finally_completed()
    }

    /// Only topics created in the parent minutes may be deleted.
    pub fn is_delete_allowed(&self) -> bool {
        self.doc.created_in_minute.as_deref() == Some(self.parent.parent_id())
    }

    pub fn is_recurring(&self) -> bool {
        self.doc.is_recurring
    }

    pub fn toggle_recurring(&mut self) {
        self.doc.is_recurring = !self.doc.is_recurring;
    }

    pub fn is_skipped(&self) -> bool {
        self.doc.is_skipped
    }

    /// Skipping a closed topic reopens it when `force_open` is set.
    pub fn toggle_skip(&mut self, force_open: bool) {
        self.doc.is_skipped = !self.doc.is_skipped;
        if force_open && self.doc.is_skipped && !self.doc.is_open {
            self.toggle_state();
        }
    }

    pub fn toggle_state(&mut self) {
        self.doc.is_open = !self.doc.is_open;
    }

    pub fn close_topic_and_all_open_action_items(&mut self) {
        self.doc.is_open = false;
        self.doc.is_recurring = false;
        for item in self.doc.info_items.iter_mut().filter(|i| i.is_sticky()) {
            item.is_open = Some(false);
        }
    }

    pub fn has_open_action_item(&self) -> bool {
        self.doc.has_open_action_item()
    }

    /// Inserts or replaces an item. New items get a fresh id and the lineage
    /// of the parent minutes. Returns the item id.
    pub fn upsert_info_item(&mut self, mut item: ItemDoc, save: bool, placement: Placement) -> String {
        if item.id.is_empty() {
            item.id = uuid::Uuid::new_v4().to_string();
        }
        let id = item.id.clone();

        match self.doc.find_item_index(&id) {
            Some(index) => {
                let stored = &self.doc.info_items[index];
                if item.created_in_minute.is_none() {
                    item.created_in_minute = stored.created_in_minute.clone();
                }
                item.created_at = item.created_at.or(stored.created_at);
                for detail in &mut item.details {
                    if detail.created_in_minute.is_none() {
                        detail.created_in_minute = stored
                            .details
                            .iter()
                            .find(|d| d.id == detail.id)
                            .and_then(|d| d.created_in_minute.clone());
                    }
                }
                item.updated_at = Some(Utc::now());
                self.doc.info_items[index] = item;
            }
            None => {
                if item.created_in_minute.is_none() {
                    item.created_in_minute = self.parent.lineage_id().map(str::to_string);
                }
                item.created_at.get_or_insert_with(Utc::now);
                match placement {
                    Placement::Top => self.doc.info_items.insert(0, item),
                    Placement::Bottom => self.doc.info_items.push(item),
                }
            }
        }

        if save {
            self.save();
        }
        id
    }

    /// Removes an item and saves the topic. Action items carried over from
    /// earlier minutes cannot be removed.
    pub fn remove_info_item(&mut self, item_id: &str) -> Result<(), AppError> {
        let index = self.doc.find_item_index(item_id).ok_or_else(|| {
            AppError::InvalidState(format!("Item {} not found in topic {}", item_id, self.doc.id))
        })?;

        let item = &self.doc.info_items[index];
        if item.is_action_item() && !item.is_created_in_minutes(self.parent.parent_id()) {
            return Err(AppError::InvalidState(
                "It is not allowed to remove an action item which was not created within the current minutes"
                    .to_string(),
            ));
        }

        self.doc.info_items.remove(index);
        self.save();
        Ok(())
    }

    /// Drops all items except open action items.
    pub fn tailor_topic(&mut self) {
        self.doc.tailor();
    }

    pub fn find_info_item(&mut self, item_id: &str) -> Option<TopicItem<'_, 'p, P>> {
        let doc = self.doc.find_item(item_id)?.clone();
        Some(TopicItem::create(self, doc))
    }

    pub fn info_item(&mut self, source: ItemSource) -> Result<InfoItem<'_, 'p, P>, AppError> {
        InfoItem::new(self, source)
    }

    pub fn action_item(&mut self, source: ItemSource) -> Result<ActionItem<'_, 'p, P>, AppError> {
        ActionItem::new(self, source)
    }

    pub fn info_items(&self) -> &[ItemDoc] {
        &self.doc.info_items
    }

    pub fn get_only_info_items(&self) -> Vec<&ItemDoc> {
        self.doc
            .info_items
            .iter()
            .filter(|i| !i.is_action_item())
            .collect()
    }

    pub fn get_only_action_items(&self) -> Vec<&ItemDoc> {
        self.doc
            .info_items
            .iter()
            .filter(|i| i.is_action_item())
            .collect()
    }

    pub fn get_open_action_items(&self) -> Vec<&ItemDoc> {
        self.doc.info_items.iter().filter(|i| i.is_sticky()).collect()
    }

    pub fn add_labels_by_ids(&mut self, label_ids: &[String]) {
        for id in label_ids {
            if !self.has_label_with_id(id) {
                self.doc.labels.push(id.clone());
            }
        }
    }

    pub fn has_label_with_id(&self, label_id: &str) -> bool {
        self.doc.labels.iter().any(|l| l == label_id)
    }

    pub fn has_responsibles(&self) -> bool {
        !self.doc.responsibles.is_empty()
    }

    pub fn responsibles(&self) -> &[String] {
        &self.doc.responsibles
    }

    /// Writes the working copy back into the parent.
    pub fn save(&mut self) {
        self.save_at(Placement::Top);
    }

    /// Like [`Topic::save`]; a topic new to the parent goes to `placement`.
    pub fn save_at(&mut self, placement: Placement) {
        self.doc.updated_at = Some(Utc::now());
        self.doc.created_at.get_or_insert_with(Utc::now);
        let id = self.parent.upsert_topic(self.doc.clone(), placement);
        self.doc.id = id;
        if let Some(saved) = self.parent.find_topic(&self.doc.id) {
            self.doc.created_in_minute = saved.created_in_minute.clone();
        }
    }
}
