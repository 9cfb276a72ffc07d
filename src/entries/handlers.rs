use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use super::{
    dto::{AnalyzeRequest, CreateEntryRequest, CreatedEntryResponse, DateQuery},
    model::NutritionEntry,
    services,
};
use crate::{
    auth::{AuthSession, ManualApiKey},
    error::AppError,
    nutrition::NutritionPayload,
    session::handlers::SessionView,
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/entries", post(create_entry).get(list_entries))
        .route("/nutrition/analyze", post(analyze))
}

/// POST /entries
#[instrument(skip(state, key, payload))]
pub async fn create_entry(
    State(state): State<AppState>,
    auth: AuthSession,
    ManualApiKey(key): ManualApiKey,
    Json(payload): Json<CreateEntryRequest>,
) -> Result<(StatusCode, Json<CreatedEntryResponse>), AppError> {
    let (entry, session) = services::log_entry(&state, &auth, payload, key.as_deref()).await?;
    Ok((
        StatusCode::CREATED,
        Json(CreatedEntryResponse {
            entry,
            session: SessionView::from(&session),
        }),
    ))
}

/// GET /entries?date=YYYY-MM-DD
#[instrument(skip(state))]
pub async fn list_entries(
    State(state): State<AppState>,
    auth: AuthSession,
    Query(q): Query<DateQuery>,
) -> Result<Json<Vec<NutritionEntry>>, AppError> {
    let date = q.resolve()?;
    let entries = state
        .store
        .daily_entries(auth.user_id, date)
        .await
        .map_err(AppError::persistence)?;
    Ok(Json(entries))
}

/// POST /nutrition/analyze
#[instrument(skip(state, key, payload))]
pub async fn analyze(
    State(state): State<AppState>,
    auth: AuthSession,
    ManualApiKey(key): ManualApiKey,
    Json(payload): Json<AnalyzeRequest>,
) -> Result<Json<NutritionPayload>, AppError> {
    Ok(Json(
        services::preview_nutrition(&state, &auth, payload, key.as_deref()).await?,
    ))
}
