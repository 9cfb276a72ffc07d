use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};

use crate::{
    auth::{
        claims::TokenKind,
        dto::{AuthResponse, LoginRequest, PublicUser, RefreshRequest, RegisterRequest, RegisterResponse},
        extractors::AuthSession,
        repo_types::{Profile, ProfileUpdate},
        services::{self, require_profile, JwtKeys},
    },
    error::AppError,
    session::{handlers::SessionView, Action},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me).put(update_me))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    let user = services::register_user(state.store.as_ref(), payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user: PublicUser::from(&user),
            message: "account created, please log in",
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let (user, _sid, session, tokens) = services::login(&state, payload).await?;
    Ok(Json(AuthResponse {
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
        user: PublicUser::from(&user),
        session: SessionView::from(&session),
    }))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys.verify(&payload.refresh_token, TokenKind::Refresh)?;

    if !state.sessions.contains(claims.sid).await {
        return Err(AppError::session_ended());
    }
    let user = state
        .store
        .find_user(claims.sub)
        .await
        .map_err(AppError::persistence)?
        .ok_or_else(|| AppError::Authentication("user not found".into()))?;

    let tokens = keys.sign_pair(user.id, claims.sid)?;
    let session = state.sessions.snapshot(claims.sid).await;
    Ok(Json(AuthResponse {
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
        user: PublicUser::from(&user),
        session: SessionView::from(&session),
    }))
}

#[instrument(skip(state))]
pub async fn logout(
    State(state): State<AppState>,
    auth: AuthSession,
) -> Json<SessionView> {
    let session = state.sessions.apply(auth.session_id, Action::Logout).await;
    info!(user_id = %auth.user_id, session_id = %auth.session_id, "user logged out");
    Json(SessionView::from(&session))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    auth: AuthSession,
) -> Result<Json<Profile>, AppError> {
    Ok(Json(require_profile(&state, &auth).await?))
}

#[instrument(skip(state, payload))]
pub async fn update_me(
    State(state): State<AppState>,
    auth: AuthSession,
    Json(mut payload): Json<ProfileUpdate>,
) -> Result<Json<Profile>, AppError> {
    if let Some(name) = payload.name.as_mut() {
        *name = name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::validation("name", "name cannot be empty"));
        }
    }
    if let Some(w) = payload.weight_kg {
        if !(w > 0.0 && w <= 500.0) {
            return Err(AppError::validation("weight_kg", "must be between 0 and 500 kg"));
        }
    }

    let user = state
        .store
        .update_profile(auth.user_id, payload)
        .await
        .map_err(AppError::persistence)?;
    match user {
        Some(u) => {
            info!(user_id = %u.id, "profile updated");
            Ok(Json(u.profile()))
        }
        None => require_profile(&state, &auth).await.map(Json),
    }
}
