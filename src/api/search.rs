//! Search endpoints backed by the query language in [`crate::search`].

use std::collections::HashSet;

use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};

use super::{success, ApiResult};
use crate::auth::CurrentUser;
use crate::db::DocumentStore;
use crate::errors::AppError;
use crate::models::{ItemDoc, TopicDoc};
use crate::search::{
    ItemsFilter, QueryParser, ResolverSnapshot, TopicsFilter, ITEM_KEYWORDS, TOPIC_KEYWORDS,
};
use crate::services::{MinutesFinder, SeriesService};
use crate::AppState;

/// Search query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    /// Query string in the item or topic vocabulary.
    #[serde(default)]
    pub q: Option<String>,
}

impl SearchQuery {
    fn text(&self) -> &str {
        self.q.as_deref().unwrap_or_default()
    }
}

/// An item together with the topic and minutes it was found in.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemHit {
    pub item: ItemDoc,
    pub topic_id: String,
    pub topic_subject: String,
    pub minutes_id: Option<String>,
    pub minutes_date: Option<String>,
    pub meeting_series_id: String,
}

fn item_hits<'t>(
    topics: impl IntoIterator<Item = &'t TopicDoc>,
    series_id: &str,
    minutes: Option<(&str, &str)>,
    parser: &QueryParser<'_>,
    seen: &mut HashSet<String>,
) -> Vec<ItemHit> {
    let mut hits = Vec::new();
    for topic in topics {
        for item in ItemsFilter.filter(&topic.info_items, parser) {
            if !seen.insert(item.id.clone()) {
                continue;
            }
            hits.push(ItemHit {
                item: item.clone(),
                topic_id: topic.id.clone(),
                topic_subject: topic.subject.clone(),
                minutes_id: minutes.map(|(id, _)| id.to_string()),
                minutes_date: minutes.map(|(_, date)| date.to_string()),
                meeting_series_id: series_id.to_string(),
            });
        }
    }
    hits
}

/// GET /api/series/:id/items?q= - Items across all minutes, newest first.
pub async fn search_series_items(
    State(state): State<AppState>,
    Path(id): Path<String>,
    user: CurrentUser,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Vec<ItemHit>> {
    let series = SeriesService::new(&*state.repo).get_series(&id).await?;
    let finder = MinutesFinder::load(&*state.repo, &id).await?;
    let snapshot = ResolverSnapshot::load(&*state.repo, series.available_labels).await?;

    let mut parser = snapshot.parser(&ITEM_KEYWORDS, user.id());
    parser.parse(query.text());

    let mut seen = HashSet::new();
    let mut hits = Vec::new();
    for minutes in finder.all_minutes_of_series(None, true) {
        hits.extend(item_hits(
            &minutes.topics,
            &id,
            Some((&minutes.id, &minutes.date)),
            &parser,
            &mut seen,
        ));
    }

    tracing::debug!(series_id = %id, query = %query.text(), hits = hits.len(), "Searched series items");
    success(hits)
}

/// GET /api/series/:id/topics?q= - Ledger topics matching the query.
pub async fn search_series_topics(
    State(state): State<AppState>,
    Path(id): Path<String>,
    user: CurrentUser,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Vec<TopicDoc>> {
    let series = SeriesService::new(&*state.repo).get_series(&id).await?;
    let topics = state.repo.list_ledger_topics(&id).await?;
    let snapshot = ResolverSnapshot::load(&*state.repo, series.available_labels).await?;

    let mut parser = snapshot.parser(&TOPIC_KEYWORDS, user.id());
    parser.parse(query.text());

    let found = TopicsFilter
        .filter(&topics, &parser)
        .into_iter()
        .cloned()
        .collect();
    success(found)
}

/// GET /api/minutes/:id/items?q= - Items of one minutes document.
pub async fn search_minutes_items(
    State(state): State<AppState>,
    Path(id): Path<String>,
    user: CurrentUser,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Vec<ItemHit>> {
    let minutes = state
        .repo
        .get_minutes(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Minutes {} not found", id)))?;
    let series = SeriesService::new(&*state.repo)
        .get_series(&minutes.meeting_series_id)
        .await?;
    let snapshot = ResolverSnapshot::load(&*state.repo, series.available_labels).await?;

    let mut parser = snapshot.parser(&ITEM_KEYWORDS, user.id());
    parser.parse(query.text());

    let hits = item_hits(
        &minutes.topics,
        &minutes.meeting_series_id,
        Some((&minutes.id, &minutes.date)),
        &parser,
        &mut HashSet::new(),
    );
    success(hits)
}

/// GET /api/action-items?q= - Action items assigned to the caller.
///
/// Walks the ledgers of every series visible to the caller and returns items
/// listing the caller as responsible, ordered by due date.
pub async fn my_action_items(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Vec<ItemHit>> {
    let mut hits = Vec::new();
    let mut seen = HashSet::new();

    for series in state.repo.list_series().await? {
        if !series.visible_for.iter().any(|id| id == user.id()) {
            continue;
        }
        let topics = state.repo.list_ledger_topics(&series.id).await?;
        let snapshot = ResolverSnapshot::load(&*state.repo, series.available_labels.clone()).await?;
        let mut parser = snapshot.parser(&ITEM_KEYWORDS, user.id());
        parser.parse(query.text());

        hits.extend(
            item_hits(&topics, &series.id, None, &parser, &mut seen)
                .into_iter()
                .filter(|hit| {
                    hit.item.is_action_item()
                        && hit.item.responsibles.iter().any(|r| r == user.id())
                }),
        );
    }

    hits.sort_by(|a, b| match (&a.item.duedate, &b.item.duedate) {
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
    success(hits)
}
