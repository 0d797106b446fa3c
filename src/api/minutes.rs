//! Minutes endpoints: date, participants, finalize workflow and locks.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Serialize;

use super::{success, ApiResult, LockQuery};
use crate::auth::CurrentUser;
use crate::db::DocumentStore;
use crate::errors::AppError;
use crate::models::{Minutes, ParticipantPresenceRequest, UpdateDateRequest};
use crate::services::{EditLocks, Finalizer, SeriesService};
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizedInfo {
    pub info: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnfinalizeAllowed {
    pub allowed: bool,
}

async fn load_minutes(state: &AppState, id: &str) -> Result<Minutes, AppError> {
    state
        .repo
        .get_minutes(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Minutes {} not found", id)))
}

/// GET /api/minutes/:id
pub async fn get_minutes(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Minutes> {
    success(load_minutes(&state, &id).await?)
}

/// DELETE /api/minutes/:id - Remove non-finalized minutes.
pub async fn delete_minutes(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<()> {
    SeriesService::new(&*state.repo).remove_minutes(&id).await?;
    success(())
}

/// PUT /api/minutes/:id/date
pub async fn update_minutes_date(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateDateRequest>,
) -> ApiResult<Minutes> {
    success(
        SeriesService::new(&*state.repo)
            .update_minutes_date(&id, &request.date)
            .await?,
    )
}

/// PUT /api/minutes/:id/participants/:user_id - Mark presence.
pub async fn update_participant(
    State(state): State<AppState>,
    Path((id, user_id)): Path<(String, String)>,
    Json(request): Json<ParticipantPresenceRequest>,
) -> ApiResult<Minutes> {
    let mut minutes = load_minutes(&state, &id).await?;
    minutes.ensure_editable()?;
    if !minutes.update_participant_present(&user_id, request.present) {
        return Err(AppError::NotFound(format!(
            "User {} is not a participant of minutes {}",
            user_id, id
        )));
    }
    state.repo.save_minutes(&minutes).await?;
    success(minutes)
}

/// POST /api/minutes/:id/participants/regenerate - Rebuild from visibility.
pub async fn regenerate_participants(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Minutes> {
    let mut minutes = load_minutes(&state, &id).await?;
    if minutes.generate_new_participants()? {
        state.repo.save_minutes(&minutes).await?;
    }
    success(minutes)
}

/// POST /api/minutes/:id/finalize
pub async fn finalize_minutes(
    State(state): State<AppState>,
    Path(id): Path<String>,
    user: CurrentUser,
) -> ApiResult<Minutes> {
    success(Finalizer::new(&*state.repo).finalize(&id, user.id()).await?)
}

/// POST /api/minutes/:id/unfinalize
pub async fn unfinalize_minutes(
    State(state): State<AppState>,
    Path(id): Path<String>,
    user: CurrentUser,
) -> ApiResult<Minutes> {
    success(Finalizer::new(&*state.repo).unfinalize(&id, user.id()).await?)
}

/// GET /api/minutes/:id/finalized-info
pub async fn get_finalized_info(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<FinalizedInfo> {
    let info = Finalizer::new(&*state.repo).finalized_info(&id).await?;
    success(FinalizedInfo { info })
}

/// GET /api/minutes/:id/unfinalize-allowed
pub async fn get_unfinalize_allowed(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<UnfinalizeAllowed> {
    let allowed = Finalizer::new(&*state.repo)
        .is_unfinalize_minutes_allowed(&id)
        .await?;
    success(UnfinalizeAllowed { allowed })
}

/// DELETE /api/minutes/:id/locks - Release the caller's locks.
pub async fn unlock_minutes(
    State(state): State<AppState>,
    Path(id): Path<String>,
    user: CurrentUser,
    Query(query): Query<LockQuery>,
) -> ApiResult<()> {
    EditLocks::new(&*state.repo)
        .remove_is_edited_minutes(&id, user.id(), query.ignore_lock)
        .await?;
    success(())
}
