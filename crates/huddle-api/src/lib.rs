//! HTTP edge of huddle: axum handlers, bearer-token middleware and the
//! mapping from domain errors to status codes.

pub mod auth;
pub mod error;
pub mod events;
pub mod history;
pub mod middleware;
pub mod routes;
pub mod sharing;

use tracing::error;

use huddle_db::Database;

pub use auth::{AppState, AppStateInner, TokenSettings};
pub use error::ApiError;
pub use routes::router;

/// Run a domain operation off the async runtime.
pub(crate) async fn blocking<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> huddle_core::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::internal("worker task failed")
        })?
        .map_err(ApiError::from)
}
