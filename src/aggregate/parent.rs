//! Topic parents: a minutes snapshot or the topic ledger of a series.

use crate::db::DocumentStore;
use crate::errors::AppError;
use crate::models::{Minutes, TopicDoc};

/// Where a new topic or item goes in its list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Placement {
    #[default]
    Top,
    Bottom,
}

impl Placement {
    pub fn from_top_flag(top: Option<bool>) -> Self {
        if top.unwrap_or(true) {
            Placement::Top
        } else {
            Placement::Bottom
        }
    }
}

/// Anything that holds topics.
pub trait TopicParent {
    fn parent_id(&self) -> &str;

    /// Minutes id stamped as `createdInMinute` on new sub-documents, `None`
    /// for parents that are not minutes.
    fn lineage_id(&self) -> Option<&str>;

    fn find_topic(&self, topic_id: &str) -> Option<&TopicDoc>;

    /// Replaces the topic with the same id or inserts it. Topics without an
    /// id get a fresh one. Returns the topic id.
    fn upsert_topic(&mut self, topic: TopicDoc, placement: Placement) -> String;
}

fn assign_id(topic: &mut TopicDoc) {
    if topic.id.is_empty() {
        topic.id = uuid::Uuid::new_v4().to_string();
    }
}

impl TopicParent for Minutes {
    fn parent_id(&self) -> &str {
        &self.id
    }

    fn lineage_id(&self) -> Option<&str> {
        Some(&self.id)
    }

    fn find_topic(&self, topic_id: &str) -> Option<&TopicDoc> {
        Minutes::find_topic(self, topic_id)
    }

    fn upsert_topic(&mut self, mut topic: TopicDoc, placement: Placement) -> String {
        assign_id(&mut topic);
        let id = topic.id.clone();
        match self.find_topic_index(&id) {
            Some(index) => self.topics[index] = topic,
            None => {
                if topic.created_in_minute.is_none() {
                    topic.created_in_minute = Some(self.id.clone());
                }
                match placement {
                    Placement::Top => self.topics.insert(0, topic),
                    Placement::Bottom => self.topics.push(topic),
                }
            }
        }
        id
    }
}

/// The topics a series carries between minutes.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesLedger {
    pub series_id: String,
    pub visible_for: Vec<String>,
    pub topics: Vec<TopicDoc>,
}

impl SeriesLedger {
    pub fn new(series_id: impl Into<String>, visible_for: Vec<String>) -> Self {
        Self {
            series_id: series_id.into(),
            visible_for,
            topics: Vec::new(),
        }
    }

    pub async fn load<S: DocumentStore>(
        store: &S,
        series_id: &str,
        visible_for: Vec<String>,
    ) -> Result<Self, AppError> {
        let topics = store.list_ledger_topics(series_id).await?;
        Ok(Self {
            series_id: series_id.to_string(),
            visible_for,
            topics,
        })
    }

    pub fn remove(&mut self, topic_id: &str) -> Option<TopicDoc> {
        let index = self.topics.iter().position(|t| t.id == topic_id)?;
        Some(self.topics.remove(index))
    }

    pub fn clear(&mut self) {
        self.topics.clear();
    }

    /// Topics ordered by `sortOrder`.
    pub fn sorted_topics(&self) -> Vec<TopicDoc> {
        let mut topics = self.topics.clone();
        topics.sort_by_key(|t| t.sort_order);
        topics
    }

    /// Propagates `visibleFor` to every entry.
    pub fn set_visible_for(&mut self, visible_for: Vec<String>) {
        for topic in &mut self.topics {
            topic.visible_for = Some(visible_for.clone());
        }
        self.visible_for = visible_for;
    }
}

impl TopicParent for SeriesLedger {
    fn parent_id(&self) -> &str {
        &self.series_id
    }

    fn lineage_id(&self) -> Option<&str> {
        None
    }

    fn find_topic(&self, topic_id: &str) -> Option<&TopicDoc> {
        self.topics.iter().find(|t| t.id == topic_id)
    }

    fn upsert_topic(&mut self, mut topic: TopicDoc, placement: Placement) -> String {
        assign_id(&mut topic);
        topic.parent_id = Some(self.series_id.clone());
        topic.visible_for = Some(self.visible_for.clone());
        let id = topic.id.clone();
        match self.topics.iter().position(|t| t.id == id) {
            Some(index) => self.topics[index] = topic,
            None => match placement {
                Placement::Top => self.topics.insert(0, topic),
                Placement::Bottom => self.topics.push(topic),
            },
        }
        id
    }
}

/// A topic parent given by id or as a loaded handle.
#[derive(Debug, Clone)]
pub enum ParentElement {
    Id(String),
    Minutes(Minutes),
    Series(SeriesLedger),
}

/// A parent after resolution.
#[derive(Debug, Clone)]
pub enum ResolvedParent {
    Minutes(Minutes),
    Series(SeriesLedger),
}

impl ParentElement {
    /// Resolves an id as minutes first, then as a series. Unknown ids are an
    /// invalid state.
    pub async fn resolve<S: DocumentStore>(self, store: &S) -> Result<ResolvedParent, AppError> {
        match self {
            ParentElement::Minutes(minutes) => Ok(ResolvedParent::Minutes(minutes)),
            ParentElement::Series(ledger) => Ok(ResolvedParent::Series(ledger)),
            ParentElement::Id(id) => {
                if let Some(minutes) = store.get_minutes(&id).await? {
                    return Ok(ResolvedParent::Minutes(minutes));
                }
                if let Some(series) = store.get_series(&id).await? {
                    let ledger = SeriesLedger::load(store, &series.id, series.visible_for).await?;
                    return Ok(ResolvedParent::Series(ledger));
                }
                Err(AppError::InvalidState(format!(
                    "No minutes or meeting series with id {}",
                    id
                )))
            }
        }
    }
}

impl ResolvedParent {
    /// Persists the parent: the minutes document, or every ledger entry.
    pub async fn save<S: DocumentStore>(&self, store: &S) -> Result<(), AppError> {
        match self {
            ResolvedParent::Minutes(minutes) => store.save_minutes(minutes).await,
            ResolvedParent::Series(ledger) => {
                store.replace_ledger(&ledger.series_id, &ledger.topics).await
            }
        }
    }

    pub fn as_minutes(&self) -> Option<&Minutes> {
        match self {
            ResolvedParent::Minutes(minutes) => Some(minutes),
            ResolvedParent::Series(_) => None,
        }
    }
}

impl TopicParent for ResolvedParent {
    fn parent_id(&self) -> &str {
        match self {
            ResolvedParent::Minutes(minutes) => minutes.parent_id(),
            ResolvedParent::Series(ledger) => ledger.parent_id(),
        }
    }

    fn lineage_id(&self) -> Option<&str> {
        match self {
            ResolvedParent::Minutes(minutes) => minutes.lineage_id(),
            ResolvedParent::Series(ledger) => ledger.lineage_id(),
        }
    }

    fn find_topic(&self, topic_id: &str) -> Option<&TopicDoc> {
        match self {
            ResolvedParent::Minutes(minutes) => TopicParent::find_topic(minutes, topic_id),
            ResolvedParent::Series(ledger) => ledger.find_topic(topic_id),
        }
    }

    fn upsert_topic(&mut self, topic: TopicDoc, placement: Placement) -> String {
        match self {
            ResolvedParent::Minutes(minutes) => minutes.upsert_topic(topic, placement),
            ResolvedParent::Series(ledger) => ledger.upsert_topic(topic, placement),
        }
    }
}
