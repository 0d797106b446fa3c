//! Meeting series endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use super::{success, ApiResult, LockQuery};
use crate::auth::CurrentUser;
use crate::db::DocumentStore;
use crate::errors::AppError;
use crate::models::{
    AdditionalResponsibleRequest, CreateSeriesRequest, Label, MeetingSeries, Minutes, TopicDoc,
    UpsertLabelRequest, VisibilityRequest,
};
use crate::services::{EditLocks, MinutesFinder, SeriesService};
use crate::AppState;

/// Query for listing the minutes of a series.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MinutesListQuery {
    pub limit: Option<usize>,
    pub last_first: Option<bool>,
}

/// GET /api/series - Series the caller can see or is informed about.
pub async fn list_series(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<Vec<MeetingSeries>> {
    let series = state
        .repo
        .list_series()
        .await?
        .into_iter()
        .filter(|s| {
            s.visible_for.iter().any(|id| id == user.id())
                || s.informed_users.iter().any(|id| id == user.id())
        })
        .collect();
    success(series)
}

/// POST /api/series - Create a series visible to the caller.
pub async fn create_series(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(mut request): Json<CreateSeriesRequest>,
) -> ApiResult<MeetingSeries> {
    if !request.visible_for.iter().any(|id| id == user.id()) {
        request.visible_for.insert(0, user.id().to_string());
    }
    success(SeriesService::new(&*state.repo).create_series(request).await?)
}

/// GET /api/series/:id
pub async fn get_series(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<MeetingSeries> {
    success(SeriesService::new(&*state.repo).get_series(&id).await?)
}

/// DELETE /api/series/:id - Remove a series with its minutes and ledger.
pub async fn delete_series(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<()> {
    if !state.repo.remove_series(&id).await? {
        return Err(AppError::NotFound(format!("Meeting series {} not found", id)));
    }
    tracing::info!(series_id = %id, "Removed meeting series");
    success(())
}

/// GET /api/series/:id/minutes - Minutes ordered by date.
pub async fn list_series_minutes(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<MinutesListQuery>,
) -> ApiResult<Vec<Minutes>> {
    SeriesService::new(&*state.repo).get_series(&id).await?;
    let finder = MinutesFinder::load(&*state.repo, &id).await?;
    let minutes = finder
        .all_minutes_of_series(query.limit, query.last_first.unwrap_or(true))
        .into_iter()
        .cloned()
        .collect();
    success(minutes)
}

/// POST /api/series/:id/minutes - Create the next minutes.
pub async fn create_minutes(
    State(state): State<AppState>,
    Path(id): Path<String>,
    user: CurrentUser,
) -> ApiResult<Minutes> {
    success(
        SeriesService::new(&*state.repo)
            .add_new_minutes(&id, Some(user.id()))
            .await?,
    )
}

/// GET /api/series/:id/ledger - Topics the series carries forward.
pub async fn list_ledger_topics(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Vec<TopicDoc>> {
    SeriesService::new(&*state.repo).get_series(&id).await?;
    success(state.repo.list_ledger_topics(&id).await?)
}

/// PUT /api/series/:id/visibility
pub async fn update_visibility(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<VisibilityRequest>,
) -> ApiResult<MeetingSeries> {
    success(
        SeriesService::new(&*state.repo)
            .set_visible_and_informed_users(&id, request)
            .await?,
    )
}

/// POST /api/series/:id/labels - Insert or replace a label.
pub async fn upsert_label(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpsertLabelRequest>,
) -> ApiResult<Label> {
    success(SeriesService::new(&*state.repo).upsert_label(&id, request).await?)
}

/// DELETE /api/series/:id/labels/:label_id
pub async fn delete_label(
    State(state): State<AppState>,
    Path((id, label_id)): Path<(String, String)>,
) -> ApiResult<()> {
    if !SeriesService::new(&*state.repo).remove_label(&id, &label_id).await? {
        return Err(AppError::NotFound(format!("Label {} not found", label_id)));
    }
    success(())
}

/// POST /api/series/:id/responsibles - Add a free-text responsible.
pub async fn add_additional_responsible(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<AdditionalResponsibleRequest>,
) -> ApiResult<MeetingSeries> {
    success(
        SeriesService::new(&*state.repo)
            .add_additional_responsible(&id, &request.responsible)
            .await?,
    )
}

/// PUT /api/series/:id/lock
pub async fn lock_series(
    State(state): State<AppState>,
    Path(id): Path<String>,
    user: CurrentUser,
) -> ApiResult<()> {
    EditLocks::new(&*state.repo).set_is_edited_series(&id, user.id()).await?;
    success(())
}

/// DELETE /api/series/:id/lock
pub async fn unlock_series(
    State(state): State<AppState>,
    Path(id): Path<String>,
    user: CurrentUser,
    Query(query): Query<LockQuery>,
) -> ApiResult<()> {
    EditLocks::new(&*state.repo)
        .remove_is_edited_series(&id, user.id(), query.ignore_lock)
        .await?;
    success(())
}
