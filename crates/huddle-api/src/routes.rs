use axum::{
    Router, middleware,
    routing::{get, post, put},
};

use crate::auth::{self, AppState};
use crate::middleware::require_auth;
use crate::{events, history, sharing};

pub async fn health() -> &'static str {
    "ok"
}

/// Every route of the service. Cross-cutting layers (CORS, tracing) are
/// added by the binary.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/logout", post(auth::logout));

    let protected_routes = Router::new()
        .route("/events", post(events::create_event).get(events::list_events))
        .route("/events/batch", post(events::create_batch))
        .route("/events/share", post(sharing::share))
        .route(
            "/events/{id}",
            get(events::get_event)
                .put(events::update_event)
                .delete(events::delete_event),
        )
        .route("/events/{id}/history", get(history::list_history))
        .route("/events/{id}/history/{version_id}", get(history::get_version))
        .route("/events/{id}/diff/{version1}/{version2}", get(history::diff))
        .route("/events/{id}/rollback/{version_id}", post(history::rollback))
        .route("/events/{id}/permissions", get(sharing::list_permissions))
        .route(
            "/events/{id}/permissions/{user_id}",
            put(sharing::update_permission).delete(sharing::revoke),
        )
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
