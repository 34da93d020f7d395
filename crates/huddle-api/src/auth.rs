use std::sync::Arc;

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::{SaltString, rand_core::OsRng}};
use axum::{Json, extract::State, http::{HeaderMap, StatusCode}, response::IntoResponse};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use tracing::{info, warn};
use uuid::Uuid;

use huddle_core::CoreError;
use huddle_core::identity::{self, NewUser};
use huddle_db::Database;
use huddle_types::api::{
    Claims, LoginRequest, LoginResponse, RefreshResponse, RegisterRequest, StatusMessage, TokenKind,
};

use crate::blocking;
use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub tokens: TokenSettings,
}

#[derive(Debug, Clone)]
pub struct TokenSettings {
    pub secret: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl TokenSettings {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            access_ttl: Duration::minutes(30),
            refresh_ttl: Duration::days(7),
        }
    }
}

fn validate_registration(req: &RegisterRequest) -> Result<(), ApiError> {
    let name_len = req.username.chars().count();
    if !(3..=32).contains(&name_len) {
        return Err(ApiError::invalid("username must be 3 to 32 characters"));
    }
    if req.password.chars().count() < 8 {
        return Err(ApiError::invalid("password must be at least 8 characters"));
    }
    if !req.email.contains('@') {
        return Err(ApiError::invalid("email address is malformed"));
    }
    Ok(())
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_registration(&req)?;

    let user = blocking(&state, move |db| {
        // Hash password with Argon2id
        let salt = SaltString::generate(&mut OsRng);
        let credential_hash = Argon2::default()
            .hash_password(req.password.as_bytes(), &salt)
            .map_err(|e| CoreError::Storage(anyhow::anyhow!("password hashing failed: {e}")))?
            .to_string();

        identity::register(
            db,
            NewUser {
                username: req.username,
                email: req.email,
                credential_hash,
                role: req.role,
            },
        )
    })
    .await?;

    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = req.username.clone();
    let user = blocking(&state, move |db| {
        let stored = identity::find_by_username(db, &req.username)?
            .ok_or(CoreError::Unauthenticated)?;

        let parsed_hash = PasswordHash::new(&stored.credential_hash)
            .map_err(|e| CoreError::Storage(anyhow::anyhow!("stored hash is unreadable: {e}")))?;
        Argon2::default()
            .verify_password(req.password.as_bytes(), &parsed_hash)
            .map_err(|_| CoreError::Unauthenticated)?;

        Ok(stored.user)
    })
    .await
    .inspect_err(|_| warn!("Failed login for {}", username))?;
    info!("{} logged in", user.username);

    let access_token = create_token(&state.tokens, user.id, &user.username, TokenKind::Access)?;
    let refresh_token = create_token(&state.tokens, user.id, &user.username, TokenKind::Refresh)?;

    Ok(Json(LoginResponse {
        user_id: user.id,
        username: user.username,
        access_token,
        refresh_token,
        token_type: "Bearer".into(),
    }))
}

/// Trade a refresh token, sent as the bearer credential, for a new access token.
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let bearer = headers
        .typed_get::<Authorization<Bearer>>()
        .ok_or_else(ApiError::unauthenticated)?;
    let claims = decode_token(&state.tokens.secret, bearer.token(), TokenKind::Refresh)?;

    let user_id = claims.sub;
    let user = blocking(&state, move |db| identity::find_by_id(db, user_id))
        .await?
        .ok_or_else(ApiError::unauthenticated)?;

    let access_token = create_token(&state.tokens, user.id, &user.username, TokenKind::Access)?;
    Ok(Json(RefreshResponse {
        access_token,
        token_type: "Bearer".into(),
    }))
}

/// Tokens are stateless; the client discards them.
pub async fn logout() -> Json<StatusMessage> {
    Json(StatusMessage {
        message: "logged out".into(),
    })
}

pub fn create_token(
    settings: &TokenSettings,
    user_id: Uuid,
    username: &str,
    kind: TokenKind,
) -> Result<String, ApiError> {
    let ttl = match kind {
        TokenKind::Access => settings.access_ttl,
        TokenKind::Refresh => settings.refresh_ttl,
    };
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        kind,
        exp: (Utc::now() + ttl).timestamp().max(0) as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(settings.secret.as_bytes()),
    )
    .map_err(|e| ApiError(CoreError::Storage(anyhow::anyhow!("token encoding failed: {e}"))))
}

/// Validate signature, expiry and token kind.
pub fn decode_token(secret: &str, token: &str, expected: TokenKind) -> Result<Claims, ApiError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| ApiError::unauthenticated())?;

    if token_data.claims.kind != expected {
        return Err(ApiError::unauthenticated());
    }
    Ok(token_data.claims)
}
