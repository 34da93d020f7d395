use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use uuid::Uuid;

use huddle_core::history;
use huddle_types::api::RollbackResponse;

use crate::auth::AppState;
use crate::blocking;
use crate::error::ApiError;
use crate::middleware::CurrentUser;

/// Oldest snapshot first.
pub async fn list_history(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(event_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let entries = blocking(&state, move |db| history::list_history(db, &user, event_id)).await?;
    Ok(Json(entries))
}

pub async fn get_version(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path((event_id, version_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    let entry = blocking(&state, move |db| {
        history::get_version(db, &user, event_id, version_id)
    })
    .await?;
    Ok(Json(entry))
}

pub async fn diff(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path((event_id, version1, version2)): Path<(Uuid, Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    let diff = blocking(&state, move |db| {
        history::diff(db, &user, event_id, version1, version2)
    })
    .await?;
    Ok(Json(diff))
}

pub async fn rollback(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path((event_id, version_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    let rolled = blocking(&state, move |db| history::rollback(db, &user, event_id, version_id)).await?;
    Ok(Json(RollbackResponse {
        event: rolled.event,
        recorded_version_id: rolled.recorded.id,
    }))
}
