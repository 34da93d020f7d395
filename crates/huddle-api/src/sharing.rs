use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use huddle_core::sharing;
use huddle_types::api::{PermissionUpdate, ShareRequest};

use crate::auth::AppState;
use crate::blocking;
use crate::error::ApiError;
use crate::middleware::CurrentUser;

pub async fn share(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(req): Json<ShareRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let permission = blocking(&state, move |db| {
        sharing::share(db, &user, req.event_id, req.user_id, req.role)
    })
    .await?;
    Ok(Json(permission))
}

pub async fn list_permissions(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(event_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let permissions = blocking(&state, move |db| sharing::list_permissions(db, &user, event_id)).await?;
    Ok(Json(permissions))
}

pub async fn update_permission(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path((event_id, target)): Path<(Uuid, Uuid)>,
    Json(req): Json<PermissionUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    let permission = blocking(&state, move |db| {
        sharing::update_permission(db, &user, event_id, target, req.role)
    })
    .await?;
    Ok(Json(permission))
}

pub async fn revoke(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path((event_id, target)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    blocking(&state, move |db| sharing::revoke(db, &user, event_id, target)).await?;
    Ok(StatusCode::NO_CONTENT)
}
