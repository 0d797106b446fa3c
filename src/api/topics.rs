//! Topic and item endpoints.
//!
//! A topic parent is given by id and resolved to minutes or to the ledger of
//! a series. Finalized minutes reject every change.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use super::{success, ApiResult, LockQuery};
use crate::aggregate::{
    ItemSource, ParentElement, Placement, ResolvedParent, Topic, TopicItem, TopicSource,
};
use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::models::{DetailRequest, ItemDoc, ItemType, TopicDoc, UpsertItemRequest, UpsertTopicRequest};
use crate::services::EditLocks;
use crate::AppState;

/// Request body for attaching labels to a topic.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicLabelsRequest {
    pub label_ids: Vec<String>,
}

async fn resolve_parent(state: &AppState, parent_id: &str) -> Result<ResolvedParent, AppError> {
    let parent = ParentElement::Id(parent_id.to_string())
        .resolve(&*state.repo)
        .await?;
    if let Some(minutes) = parent.as_minutes() {
        minutes.ensure_editable()?;
    }
    Ok(parent)
}

/// Runs `change` on a topic of the parent, saves the topic and persists the
/// parent. Returns the closure result with the saved topic.
async fn with_topic<T, F>(
    state: &AppState,
    parent_id: &str,
    topic_id: &str,
    change: F,
) -> Result<(T, TopicDoc), AppError>
where
    F: FnOnce(&mut Topic<'_, ResolvedParent>) -> Result<T, AppError>,
{
    let mut parent = resolve_parent(state, parent_id).await?;
    let (result, doc) = {
        let mut topic = Topic::new(&mut parent, TopicSource::Id(topic_id.to_string()))?;
        let result = change(&mut topic)?;
        topic.save();
        (result, topic.into_document())
    };
    parent.save(&*state.repo).await?;
    Ok((result, doc))
}

fn saved_item(topic: &TopicDoc, item_id: &str) -> Result<ItemDoc, AppError> {
    topic
        .find_item(item_id)
        .cloned()
        .ok_or_else(|| AppError::Internal(format!("Item {} missing after save", item_id)))
}

// ==================== TOPICS ====================

/// POST /api/parents/:parent_id/topics - Insert or replace a topic.
pub async fn upsert_topic(
    State(state): State<AppState>,
    Path(parent_id): Path<String>,
    Json(request): Json<UpsertTopicRequest>,
) -> ApiResult<TopicDoc> {
    if request.topic.subject.trim().is_empty() {
        return Err(AppError::Validation("Topic subject is required".to_string()));
    }

    let mut parent = resolve_parent(&state, &parent_id).await?;
    let doc = {
        let mut topic = Topic::new(&mut parent, TopicSource::Doc(request.topic))?;
        topic.save_at(Placement::from_top_flag(request.insert_placement_top));
        topic.into_document()
    };
    parent.save(&*state.repo).await?;

    tracing::info!(parent_id = %parent_id, topic_id = %doc.id, "Saved topic");
    success(doc)
}

/// DELETE /api/parents/:parent_id/topics/:topic_id - Only topics created in
/// these minutes can be deleted.
pub async fn delete_topic(
    State(state): State<AppState>,
    Path((parent_id, topic_id)): Path<(String, String)>,
) -> ApiResult<()> {
    let mut parent = resolve_parent(&state, &parent_id).await?;
    let allowed = Topic::new(&mut parent, TopicSource::Id(topic_id.clone()))?.is_delete_allowed();
    if !allowed {
        return Err(AppError::InvalidState(format!(
            "Topic {} was not created in {} and cannot be deleted",
            topic_id, parent_id
        )));
    }

    match &mut parent {
        ResolvedParent::Minutes(minutes) => {
            minutes.remove_topic(&topic_id);
        }
        ResolvedParent::Series(ledger) => {
            ledger.remove(&topic_id);
        }
    }
    parent.save(&*state.repo).await?;

    tracing::info!(parent_id = %parent_id, topic_id = %topic_id, "Deleted topic");
    success(())
}

/// POST /api/parents/:parent_id/topics/:topic_id/toggle-state
pub async fn toggle_topic_state(
    State(state): State<AppState>,
    Path((parent_id, topic_id)): Path<(String, String)>,
) -> ApiResult<TopicDoc> {
    let ((), doc) = with_topic(&state, &parent_id, &topic_id, |topic| {
        topic.toggle_state();
        Ok(())
    })
    .await?;
    success(doc)
}

/// POST /api/parents/:parent_id/topics/:topic_id/toggle-recurring
pub async fn toggle_topic_recurring(
    State(state): State<AppState>,
    Path((parent_id, topic_id)): Path<(String, String)>,
) -> ApiResult<TopicDoc> {
    let ((), doc) = with_topic(&state, &parent_id, &topic_id, |topic| {
        topic.toggle_recurring();
        Ok(())
    })
    .await?;
    success(doc)
}

/// POST /api/parents/:parent_id/topics/:topic_id/toggle-skip - Skipping a
/// closed topic reopens it.
pub async fn toggle_topic_skip(
    State(state): State<AppState>,
    Path((parent_id, topic_id)): Path<(String, String)>,
) -> ApiResult<TopicDoc> {
    let ((), doc) = with_topic(&state, &parent_id, &topic_id, |topic| {
        topic.toggle_skip(true);
        Ok(())
    })
    .await?;
    success(doc)
}

/// POST /api/parents/:parent_id/topics/:topic_id/close - Close the topic and
/// all of its open action items.
pub async fn close_topic(
    State(state): State<AppState>,
    Path((parent_id, topic_id)): Path<(String, String)>,
) -> ApiResult<TopicDoc> {
    let ((), doc) = with_topic(&state, &parent_id, &topic_id, |topic| {
        topic.close_topic_and_all_open_action_items();
        Ok(())
    })
    .await?;
    success(doc)
}

/// POST /api/parents/:parent_id/topics/:topic_id/labels
pub async fn add_topic_labels(
    State(state): State<AppState>,
    Path((parent_id, topic_id)): Path<(String, String)>,
    Json(request): Json<TopicLabelsRequest>,
) -> ApiResult<TopicDoc> {
    let ((), doc) = with_topic(&state, &parent_id, &topic_id, |topic| {
        topic.add_labels_by_ids(&request.label_ids);
        Ok(())
    })
    .await?;
    success(doc)
}

// ==================== ITEMS ====================

/// POST /api/parents/:parent_id/topics/:topic_id/items - Insert or replace an
/// info item or action item.
pub async fn upsert_item(
    State(state): State<AppState>,
    Path((parent_id, topic_id)): Path<(String, String)>,
    Json(request): Json<UpsertItemRequest>,
) -> ApiResult<ItemDoc> {
    if request.item.subject.trim().is_empty() {
        return Err(AppError::Validation("Item subject is required".to_string()));
    }
    let placement = Placement::from_top_flag(request.insert_placement_top);
    let item = request.item;

    let (item_id, doc) = with_topic(&state, &parent_id, &topic_id, move |topic| {
        Ok(match item.item_type {
            ItemType::ActionItem => topic.action_item(ItemSource::Doc(item))?.save(placement),
            ItemType::InfoItem => topic.info_item(ItemSource::Doc(item))?.save(placement),
        })
    })
    .await?;

    tracing::info!(parent_id = %parent_id, topic_id = %topic_id, item_id = %item_id, "Saved item");
    success(saved_item(&doc, &item_id)?)
}

/// DELETE /api/parents/:parent_id/topics/:topic_id/items/:item_id
pub async fn delete_item(
    State(state): State<AppState>,
    Path((parent_id, topic_id, item_id)): Path<(String, String, String)>,
) -> ApiResult<()> {
    with_topic(&state, &parent_id, &topic_id, |topic| topic.remove_info_item(&item_id)).await?;
    success(())
}

/// POST /api/parents/:parent_id/topics/:topic_id/items/:item_id/toggle-state
pub async fn toggle_item_state(
    State(state): State<AppState>,
    Path((parent_id, topic_id, item_id)): Path<(String, String, String)>,
) -> ApiResult<ItemDoc> {
    let ((), doc) = with_topic(&state, &parent_id, &topic_id, |topic| {
        match topic.find_info_item(&item_id) {
            Some(TopicItem::Action(mut item)) => {
                item.toggle_state();
                item.save(Placement::Top);
                Ok(())
            }
            Some(TopicItem::Info(_)) => Err(AppError::InvalidState(format!(
                "Item {} is not an action item",
                item_id
            ))),
            None => Err(AppError::InvalidState(format!("Item {} not found", item_id))),
        }
    })
    .await?;
    success(saved_item(&doc, &item_id)?)
}

/// POST /api/parents/:parent_id/topics/:topic_id/items/:item_id/details
pub async fn add_detail(
    State(state): State<AppState>,
    Path((parent_id, topic_id, item_id)): Path<(String, String, String)>,
    Json(request): Json<DetailRequest>,
) -> ApiResult<ItemDoc> {
    let ((), doc) = with_topic(&state, &parent_id, &topic_id, |topic| {
        let mut item = topic.info_item(ItemSource::Id(item_id.clone()))?;
        item.add_details(request.text);
        item.save(Placement::Top);
        Ok(())
    })
    .await?;
    success(saved_item(&doc, &item_id)?)
}

/// PUT /api/parents/:parent_id/topics/:topic_id/items/:item_id/details/:index
/// - Blank text removes the detail.
pub async fn update_detail(
    State(state): State<AppState>,
    Path((parent_id, topic_id, item_id, index)): Path<(String, String, String, usize)>,
    Json(request): Json<DetailRequest>,
) -> ApiResult<ItemDoc> {
    let ((), doc) = with_topic(&state, &parent_id, &topic_id, |topic| {
        let mut item = topic.info_item(ItemSource::Id(item_id.clone()))?;
        item.update_details(index, request.text)?;
        item.save(Placement::Top);
        Ok(())
    })
    .await?;
    success(saved_item(&doc, &item_id)?)
}

/// DELETE /api/parents/:parent_id/topics/:topic_id/items/:item_id/details/:index
pub async fn delete_detail(
    State(state): State<AppState>,
    Path((parent_id, topic_id, item_id, index)): Path<(String, String, String, usize)>,
) -> ApiResult<ItemDoc> {
    let ((), doc) = with_topic(&state, &parent_id, &topic_id, |topic| {
        let mut item = topic.info_item(ItemSource::Id(item_id.clone()))?;
        item.remove_details(index)?;
        item.save(Placement::Top);
        Ok(())
    })
    .await?;
    success(saved_item(&doc, &item_id)?)
}

// ==================== LOCKS ====================

/// PUT /api/minutes/:id/topics/:topic_id/lock
pub async fn lock_topic(
    State(state): State<AppState>,
    Path((minutes_id, topic_id)): Path<(String, String)>,
    user: CurrentUser,
) -> ApiResult<()> {
    EditLocks::new(&*state.repo)
        .set_is_edited_topic(&minutes_id, &topic_id, user.id())
        .await?;
    success(())
}

/// DELETE /api/minutes/:id/topics/:topic_id/lock
pub async fn unlock_topic(
    State(state): State<AppState>,
    Path((minutes_id, topic_id)): Path<(String, String)>,
    user: CurrentUser,
    Query(query): Query<LockQuery>,
) -> ApiResult<()> {
    EditLocks::new(&*state.repo)
        .remove_is_edited_topic(&minutes_id, &topic_id, user.id(), query.ignore_lock)
        .await?;
    success(())
}

/// PUT /api/minutes/:id/topics/:topic_id/items/:item_id/lock
pub async fn lock_item(
    State(state): State<AppState>,
    Path((minutes_id, topic_id, item_id)): Path<(String, String, String)>,
    user: CurrentUser,
) -> ApiResult<()> {
    EditLocks::new(&*state.repo)
        .set_is_edited_info_item(&minutes_id, &topic_id, &item_id, user.id())
        .await?;
    success(())
}

/// DELETE /api/minutes/:id/topics/:topic_id/items/:item_id/lock
pub async fn unlock_item(
    State(state): State<AppState>,
    Path((minutes_id, topic_id, item_id)): Path<(String, String, String)>,
    user: CurrentUser,
    Query(query): Query<LockQuery>,
) -> ApiResult<()> {
    EditLocks::new(&*state.repo)
        .remove_is_edited_info_item(&minutes_id, &topic_id, &item_id, user.id(), query.ignore_lock)
        .await?;
    success(())
}

/// PUT /api/minutes/:id/topics/:topic_id/items/:item_id/details/:index/lock
pub async fn lock_detail(
    State(state): State<AppState>,
    Path((minutes_id, topic_id, item_id, index)): Path<(String, String, String, usize)>,
    user: CurrentUser,
) -> ApiResult<()> {
    EditLocks::new(&*state.repo)
        .set_is_edited_detail(&minutes_id, &topic_id, &item_id, index, user.id())
        .await?;
    success(())
}

/// DELETE /api/minutes/:id/topics/:topic_id/items/:item_id/details/:index/lock
pub async fn unlock_detail(
    State(state): State<AppState>,
    Path((minutes_id, topic_id, item_id, index)): Path<(String, String, String, usize)>,
    user: CurrentUser,
    Query(query): Query<LockQuery>,
) -> ApiResult<()> {
    EditLocks::new(&*state.repo)
        .remove_is_edited_detail(
            &minutes_id,
            &topic_id,
            &item_id,
            index,
            user.id(),
            query.ignore_lock,
        )
        .await?;
    success(())
}
