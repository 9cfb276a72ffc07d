use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use time::Duration;
use tracing::{debug, instrument};

use super::{progress, DailyTargets, DayReport};
use crate::{
    auth::{services::require_profile, AuthSession},
    entries::{
        dto::{today, DateQuery},
        NutritionEntry,
    },
    error::AppError,
    state::AppState,
};

const SUMMARY_PREVIEW: usize = 3;
const DEFAULT_HISTORY_DAYS: u32 = 7;
const MAX_HISTORY_DAYS: u32 = 31;

pub const HIGH_CALORIE_KCAL: f64 = 500.0;
pub const LOW_CALORIE_KCAL: f64 = 100.0;
pub const LOW_WATER_ML: i64 = 500;

#[derive(Debug, Serialize)]
pub struct EntryReport {
    pub entry: NutritionEntry,
    pub water_progress: f64,
    pub exercise_progress: f64,
    pub tips: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    #[serde(flatten)]
    pub report: DayReport,
    pub recent: Vec<NutritionEntry>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub days: Option<u32>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/report", get(report))
        .route("/summary", get(summary))
        .route("/history", get(history))
}

/// Advice shown next to a freshly logged entry.
pub fn report_tips(entry: &NutritionEntry) -> Vec<&'static str> {
    let mut tips = Vec::new();
    let calories = entry.nutrition.calories.unwrap_or(0.0);
    if calories > HIGH_CALORIE_KCAL {
        tips.push("High-calorie meal: balance it with vegetables and lighter meals today.");
    } else if calories < LOW_CALORIE_KCAL {
        tips.push("Light meal: consider a healthy snack to keep your energy up.");
    }
    if entry.water_ml < LOW_WATER_ML {
        tips.push("Drink more water: aim for about 2 liters a day.");
    }
    tips
}

/// GET /report
#[instrument(skip(state))]
pub async fn report(
    State(state): State<AppState>,
    auth: AuthSession,
) -> Result<Json<EntryReport>, AppError> {
    let session = state.sessions.snapshot(auth.session_id).await;
    let entry = session
        .last_entry()
        .cloned()
        .ok_or_else(|| AppError::validation("entry", "log an entry first"))?;
    let profile = require_profile(&state, &auth).await?;
    let targets = DailyTargets::for_weight(profile.weight_kg);

    Ok(Json(EntryReport {
        water_progress: progress(entry.water_ml as f64, targets.water_ml),
        exercise_progress: progress(entry.exercise_min as f64, targets.exercise_min),
        tips: report_tips(&entry),
        entry,
    }))
}

/// GET /summary?date=YYYY-MM-DD
#[instrument(skip(state))]
pub async fn summary(
    State(state): State<AppState>,
    auth: AuthSession,
    Query(q): Query<DateQuery>,
) -> Result<Json<SummaryResponse>, AppError> {
    let date = q.resolve()?;
    let profile = require_profile(&state, &auth).await?;
    let mut entries = state
        .store
        .daily_entries(auth.user_id, date)
        .await
        .map_err(AppError::persistence)?;

    let report = DayReport::build(date, &entries, profile.weight_kg);
    entries.truncate(SUMMARY_PREVIEW);
    Ok(Json(SummaryResponse {
        report,
        recent: entries,
    }))
}

/// GET /history?days=N, newest day first.
#[instrument(skip(state))]
pub async fn history(
    State(state): State<AppState>,
    auth: AuthSession,
    Query(q): Query<HistoryQuery>,
) -> Result<Json<Vec<DayReport>>, AppError> {
    let days = q.days.unwrap_or(DEFAULT_HISTORY_DAYS);
    if !(1..=MAX_HISTORY_DAYS).contains(&days) {
        return Err(AppError::validation(
            "days",
            format!("must be between 1 and {MAX_HISTORY_DAYS}"),
        ));
    }
    let profile = require_profile(&state, &auth).await?;

    let end = today();
    let mut reports = Vec::with_capacity(days as usize);
    for offset in 0..days {
        let date = end - Duration::days(offset.into());
        let entries = state
            .store
            .daily_entries(auth.user_id, date)
            .await
            .map_err(AppError::persistence)?;
        reports.push(DayReport::build(date, &entries, profile.weight_kg));
    }
    debug!(user_id = %auth.user_id, days, "history built");
    Ok(Json(reports))
}
