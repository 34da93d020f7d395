use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use huddle_core::events;
use huddle_types::api::BatchCreateRequest;
use huddle_types::models::{EventFields, EventPatch};

use crate::auth::AppState;
use crate::blocking;
use crate::error::ApiError;
use crate::middleware::CurrentUser;

pub async fn create_event(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(fields): Json<EventFields>,
) -> Result<impl IntoResponse, ApiError> {
    let event = blocking(&state, move |db| events::create_event(db, &user, fields)).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

/// All-or-nothing: one invalid entry rejects the whole batch.
pub async fn create_batch(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(req): Json<BatchCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let created = blocking(&state, move |db| events::create_events(db, &user, req.events)).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn list_events(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    let owned = blocking(&state, move |db| events::list_owned(db, &user)).await?;
    Ok(Json(owned))
}

pub async fn get_event(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(event_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let event = blocking(&state, move |db| events::get_event(db, &user, event_id)).await?;
    Ok(Json(event))
}

pub async fn update_event(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(event_id): Path<Uuid>,
    Json(patch): Json<EventPatch>,
) -> Result<impl IntoResponse, ApiError> {
    let event = blocking(&state, move |db| events::update_event(db, &user, event_id, patch)).await?;
    Ok(Json(event))
}

pub async fn delete_event(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(event_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    blocking(&state, move |db| events::delete_event(db, &user, event_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
