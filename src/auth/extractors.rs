use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use uuid::Uuid;

use super::{claims::TokenKind, services::JwtKeys};
use crate::{error::AppError, state::AppState};

/// Validated access token whose session is still open.
#[derive(Debug, Clone, Copy)]
pub struct AuthSession {
    pub user_id: Uuid,
    pub session_id: Uuid,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthSession {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| AppError::Authentication("missing Authorization header".into()))?;

        let token = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .ok_or_else(|| AppError::Authentication("invalid auth scheme".into()))?;

        let claims = JwtKeys::from_ref(state).verify(token, TokenKind::Access)?;

        if !state.sessions.contains(claims.sid).await {
            return Err(AppError::session_ended());
        }

        Ok(AuthSession {
            user_id: claims.sub,
            session_id: claims.sid,
        })
    }
}

/// Optional key typed in by the user for the analysis service.
#[derive(Debug)]
pub struct ManualApiKey(pub Option<String>);

pub const MANUAL_KEY_HEADER: &str = "x-analysis-key";

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for ManualApiKey {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(ManualApiKey(
            parts
                .headers
                .get(MANUAL_KEY_HEADER)
                .and_then(|h| h.to_str().ok())
                .map(str::to_string),
        ))
    }
}
