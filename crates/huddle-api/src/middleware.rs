use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};

use huddle_core::identity;
use huddle_types::api::TokenKind;
use huddle_types::models::User;

use crate::auth::{self, AppState};
use crate::blocking;
use crate::error::ApiError;

/// The caller, as loaded from storage for this request.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Validate the bearer access token and attach the caller's `CurrentUser`.
/// A token for a user that no longer exists is treated like no token.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let bearer = req
        .headers()
        .typed_get::<Authorization<Bearer>>()
        .ok_or_else(ApiError::unauthenticated)?;

    let claims = auth::decode_token(&state.tokens.secret, bearer.token(), TokenKind::Access)?;

    let user_id = claims.sub;
    let user = blocking(&state, move |db| identity::find_by_id(db, user_id))
        .await?
        .ok_or_else(ApiError::unauthenticated)?;

    req.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(req).await)
}
