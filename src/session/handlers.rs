use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use super::router::{Action, Page, SessionState, SessionUser};
use crate::{
    auth::AuthSession, classifier::PredictionCandidate, error::AppError, state::AppState,
};

/// Shortcut foods offered on the home page.
pub const QUICK_FOODS: [&str; 8] = [
    "Nasi Goreng",
    "Ayam Goreng",
    "Tempe Goreng",
    "Buah Pisang",
    "Sayur Bayam",
    "Telur Rebus",
    "Sate Ayam",
    "Rendang",
];

#[derive(Debug, Serialize)]
pub struct LastEntryView {
    pub id: Uuid,
    pub food_label: String,
    pub calories: Option<f64>,
}

/// Client-facing view of one session.
#[derive(Debug, Serialize)]
pub struct SessionView {
    pub page: Page,
    pub user: Option<SessionUser>,
    pub pending_food: Option<String>,
    pub has_image: bool,
    pub predictions: Vec<PredictionCandidate>,
    pub selected: Option<usize>,
    pub last_entry: Option<LastEntryView>,
}

impl From<&SessionState> for SessionView {
    fn from(s: &SessionState) -> Self {
        let predictions = s.scratch.predictions.as_ref();
        Self {
            page: s.page(),
            user: s.user().cloned(),
            pending_food: s.scratch.pending_food.clone(),
            has_image: s.scratch.pending_image.is_some(),
            predictions: predictions
                .map(|p| p.candidates().to_vec())
                .unwrap_or_default(),
            selected: predictions.map(|p| p.selected_index()),
            last_entry: s.last_entry().map(|e| LastEntryView {
                id: e.id,
                food_label: e.food_label.clone(),
                calories: e.nutrition.calories,
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct NavigateRequest {
    pub page: Page,
}

#[derive(Debug, Deserialize)]
pub struct PendingFoodRequest {
    pub food: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/session", get(current))
        .route("/session/navigate", post(navigate))
        .route("/session/home", post(return_home))
        .route("/session/food", post(set_pending_food))
        .route("/quick-foods", get(quick_foods))
}

#[instrument(skip(state))]
pub async fn current(State(state): State<AppState>, auth: AuthSession) -> Json<SessionView> {
    Json(SessionView::from(&state.sessions.snapshot(auth.session_id).await))
}

#[instrument(skip(state))]
pub async fn navigate(
    State(state): State<AppState>,
    auth: AuthSession,
    Json(payload): Json<NavigateRequest>,
) -> Json<SessionView> {
    let session = state
        .sessions
        .apply(auth.session_id, Action::Navigate(payload.page))
        .await;
    Json(SessionView::from(&session))
}

#[instrument(skip(state))]
pub async fn return_home(State(state): State<AppState>, auth: AuthSession) -> Json<SessionView> {
    let session = state.sessions.apply(auth.session_id, Action::ReturnHome).await;
    Json(SessionView::from(&session))
}

/// Stages a food label (typed or a quick food) for the next entry.
#[instrument(skip(state, payload))]
pub async fn set_pending_food(
    State(state): State<AppState>,
    auth: AuthSession,
    Json(payload): Json<PendingFoodRequest>,
) -> Result<Json<SessionView>, AppError> {
    let food = payload.food.trim();
    if food.is_empty() {
        return Err(AppError::validation("food", "food name is required"));
    }
    let view = state
        .sessions
        .update(auth.session_id, |s| {
            s.scratch.pending_food = Some(food.to_string());
            SessionView::from(&*s)
        })
        .await
        .ok_or_else(AppError::session_ended)?;
    info!(session_id = %auth.session_id, food, "pending food staged");
    Ok(Json(view))
}

pub async fn quick_foods() -> Json<Vec<&'static str>> {
    Json(QUICK_FOODS.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{PredictionSelection, DEFAULT_TOP_K};

    #[test]
    fn view_reflects_scratch() {
        let mut s = SessionState::new().apply(Action::LoginSucceeded(SessionUser {
            id: Uuid::new_v4(),
            email: "demo@example.com".into(),
            name: "Demo".into(),
        }));
        s.scratch.pending_food = Some("Rendang".into());
        let mut sel = PredictionSelection::new(
            vec![
                PredictionCandidate::new("Fried Rice", 0.82),
                PredictionCandidate::new("Noodles", 0.11),
            ],
            DEFAULT_TOP_K,
        )
        .unwrap();
        sel.select(1).unwrap();
        s.scratch.predictions = Some(sel);

        let view = SessionView::from(&s);
        assert_eq!(view.page, Page::Home);
        assert_eq!(view.pending_food.as_deref(), Some("Rendang"));
        assert!(!view.has_image);
        assert_eq!(view.predictions.len(), 2);
        assert_eq!(view.selected, Some(1));
        assert!(view.last_entry.is_none());
    }

    #[test]
    fn logged_out_view_is_empty() {
        let view = SessionView::from(&SessionState::new());
        assert_eq!(view.page, Page::Login);
        assert!(view.user.is_none());
        assert!(view.predictions.is_empty());
        assert_eq!(view.selected, None);
    }
}
