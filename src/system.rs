use std::path::Path;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use tracing::{instrument, warn};

use crate::{error::AppError, state::AppState};

#[derive(Debug, Serialize, PartialEq)]
pub struct SystemInfo {
    pub total_users: i64,
    pub total_entries: i64,
    pub model_present: bool,
    /// Labels listed in the class-names file; `None` when it cannot be read.
    pub class_names: Option<usize>,
    pub analysis_available: bool,
    pub classifier_available: bool,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/system", get(system_info))
        .route("/health", get(|| async { "ok" }))
}

/// Non-blank lines of the class-names file.
async fn count_class_names(path: &Path) -> Option<usize> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => Some(text.lines().filter(|l| !l.trim().is_empty()).count()),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "class names unavailable");
            None
        }
    }
}

#[instrument(skip(state))]
pub async fn system_info(State(state): State<AppState>) -> Result<Json<SystemInfo>, AppError> {
    let stats = state
        .store
        .database_stats()
        .await
        .map_err(AppError::persistence)?;
    let class_names = count_class_names(&state.config.classifier.class_names_path).await;
    Ok(Json(SystemInfo {
        total_users: stats.total_users,
        total_entries: stats.total_entries,
        model_present: state.config.classifier.model_path.is_file(),
        class_names,
        analysis_available: state.analyzer.is_available(),
        classifier_available: state.classifier.is_available(),
    }))
}
