use tracing::{error, info, warn};

use super::{
    dto::{today, AnalyzeRequest, CreateEntryRequest},
    model::{EntrySource, NutritionEntry},
    validator::EntryInput,
};
use crate::{
    analysis,
    auth::AuthSession,
    error::AppError,
    nutrition::{NutritionPayload, PortionCategory},
    session::{Action, SessionState},
    state::AppState,
};

/// Label typed in the request, else the one staged in the session.
fn resolve_food(explicit: Option<&str>, session: &SessionState) -> String {
    explicit
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .or(session.scratch.pending_food.as_deref())
        .unwrap_or_default()
        .to_string()
}

/// Validates, analyzes and persists one entry for today, then moves the
/// session on to the report page.
///
/// Nothing is stored and the page does not change when any step fails.
pub async fn log_entry(
    state: &AppState,
    auth: &AuthSession,
    req: CreateEntryRequest,
    manual_key: Option<&str>,
) -> Result<(NutritionEntry, SessionState), AppError> {
    let session = state.sessions.snapshot(auth.session_id).await;

    let (food_label, prediction_confidence, source) = if req.use_prediction {
        let selection = session
            .scratch
            .predictions
            .as_ref()
            .ok_or_else(|| AppError::validation("selection", "upload an image first"))?;
        let picked = selection.selected();
        (picked.label.clone(), Some(picked.confidence), EntrySource::Image)
    } else {
        (resolve_food(req.food.as_deref(), &session), None, EntrySource::Manual)
    };

    let checked = EntryInput {
        food_label,
        portion: req.portion,
        water_ml: req.water_ml,
        exercise_min: req.exercise_min,
        prediction_confidence,
        source,
    }
    .check()?;

    let payload: NutritionPayload = match req.nutrition {
        Some(manual) => manual.into(),
        None => {
            analysis::for_request(&state.analyzer, manual_key)
                .analyze_food_nutrition(&checked.food_label, checked.portion)
                .await
        }
    };
    if payload.source.is_degraded() {
        warn!(food = %checked.food_label, "using estimated nutrition values");
    }

    let new_entry = checked.into_entry(&payload, today());
    let entry = state
        .store
        .add_daily_entry(auth.user_id, new_entry)
        .await
        .map_err(|e| {
            error!(error = %e, user_id = %auth.user_id, "saving entry failed");
            AppError::persistence(e)
        })?;

    let session = state
        .sessions
        .apply(auth.session_id, Action::EntryPersisted(Box::new(entry.clone())))
        .await;
    info!(
        user_id = %auth.user_id,
        entry_id = %entry.id,
        food = %entry.food_label,
        calories = ?entry.nutrition.calories,
        "entry logged"
    );
    Ok((entry, session))
}

/// Nutrition preview for a label without saving anything.
pub async fn preview_nutrition(
    state: &AppState,
    auth: &AuthSession,
    req: AnalyzeRequest,
    manual_key: Option<&str>,
) -> Result<NutritionPayload, AppError> {
    let session = state.sessions.snapshot(auth.session_id).await;
    let food = resolve_food(req.food.as_deref(), &session);
    if food.is_empty() {
        return Err(AppError::validation("food", "enter a food name first"));
    }
    let portion: PortionCategory = req.portion.parse()?;
    Ok(analysis::for_request(&state.analyzer, manual_key)
        .analyze_food_nutrition(&food, portion)
        .await)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use time::Date;
    use uuid::Uuid;

    use super::*;
    use crate::{
        analysis::NutritionAnalyzer,
        auth::repo_types::{NewUser, ProfileUpdate, User},
        classifier::{PredictionCandidate, PredictionSelection, DEFAULT_TOP_K},
        entries::{dto::ManualNutrition, model::NewEntry},
        nutrition::PayloadSource,
        session::{Page, SessionUser},
        store::{DatabaseStats, MemoryStore, NutritionStore},
        summary::DailySummary,
    };

    struct StubAnalyzer;

    #[async_trait]
    impl NutritionAnalyzer for StubAnalyzer {
        async fn analyze_food_nutrition(&self, _food: &str, _portion: PortionCategory) -> NutritionPayload {
            NutritionPayload {
                calories: Some("650 kcal".into()),
                protein: Some("15 g".into()),
                ..NutritionPayload::empty(PayloadSource::AnalysisService)
            }
        }

        fn is_available(&self) -> bool {
            true
        }
    }

    /// Delegates to memory but refuses to save entries.
    struct ReadOnlyStore(MemoryStore);

    #[async_trait]
    impl NutritionStore for ReadOnlyStore {
        async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
            self.0.find_user_by_email(email).await
        }
        async fn find_user(&self, id: Uuid) -> anyhow::Result<Option<User>> {
            self.0.find_user(id).await
        }
        async fn insert_user(&self, user: NewUser) -> anyhow::Result<User> {
            self.0.insert_user(user).await
        }
        async fn update_profile(&self, id: Uuid, update: ProfileUpdate) -> anyhow::Result<Option<User>> {
            self.0.update_profile(id, update).await
        }
        async fn daily_entries(&self, user_id: Uuid, date: Date) -> anyhow::Result<Vec<NutritionEntry>> {
            self.0.daily_entries(user_id, date).await
        }
        async fn add_daily_entry(&self, _user_id: Uuid, _entry: NewEntry) -> anyhow::Result<NutritionEntry> {
            anyhow::bail!("database is read-only")
        }
        async fn database_stats(&self) -> anyhow::Result<DatabaseStats> {
            self.0.database_stats().await
        }
    }

    async fn logged_in(state: &AppState) -> AuthSession {
        let user = state
            .store
            .create_user("demo@example.com", "demo123", "Demo")
            .await
            .unwrap();
        let session = SessionState::new().apply(Action::LoginSucceeded(SessionUser {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
        }));
        AuthSession {
            user_id: user.id,
            session_id: state.sessions.open(session).await,
        }
    }

    fn request(food: &str, water_ml: i64) -> CreateEntryRequest {
        CreateEntryRequest {
            food: Some(food.into()),
            portion: "Normal".into(),
            water_ml,
            exercise_min: 0,
            nutrition: None,
            use_prediction: false,
        }
    }

    #[tokio::test]
    async fn logging_an_entry_updates_the_daily_summary() {
        let state = AppState::fake().with_analyzer(Arc::new(StubAnalyzer));
        let auth = logged_in(&state).await;

        let (entry, session) = log_entry(&state, &auth, request("Fried Rice", 500), None)
            .await
            .unwrap();
        assert_eq!(session.page(), Page::Report);
        assert_eq!(entry.nutrition.calories, Some(650.0));
        assert_eq!(entry.provenance, Some(PayloadSource::AnalysisService));

        let entries = state.store.daily_entries(auth.user_id, today()).await.unwrap();
        let summary = DailySummary::from_entries(&entries);
        assert_eq!(summary.entry_count, 1);
        assert_eq!(summary.calories, 650.0);
        assert_eq!(summary.protein, 15.0);
        assert_eq!(summary.water_ml, 500.0);
    }

    #[tokio::test]
    async fn invalid_water_is_rejected_before_saving() {
        let state = AppState::fake().with_analyzer(Arc::new(StubAnalyzer));
        let auth = logged_in(&state).await;

        let err = log_entry(&state, &auth, request("Fried Rice", 6000), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { field: "water_ml", .. }));
        assert!(state.store.daily_entries(auth.user_id, today()).await.unwrap().is_empty());
        assert_eq!(state.sessions.snapshot(auth.session_id).await.page(), Page::Home);
    }

    #[tokio::test]
    async fn failed_save_keeps_the_page() {
        let state = AppState::fake().with_store(Arc::new(ReadOnlyStore(MemoryStore::new())));
        let auth = logged_in(&state).await;

        let err = log_entry(&state, &auth, request("Tempe", 250), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Persistence(_)));
        assert_eq!(state.sessions.snapshot(auth.session_id).await.page(), Page::Home);
    }

    #[tokio::test]
    async fn selected_prediction_becomes_the_label() {
        let state = AppState::fake();
        let auth = logged_in(&state).await;

        let mut selection = PredictionSelection::new(
            vec![
                PredictionCandidate::new("Fried Rice", 0.82),
                PredictionCandidate::new("Noodles", 0.11),
            ],
            DEFAULT_TOP_K,
        )
        .unwrap();
        selection.select(1).unwrap();
        state
            .sessions
            .update(auth.session_id, |s| s.scratch.predictions = Some(selection))
            .await
            .unwrap();

        let mut req = request("", 0);
        req.food = None;
        req.use_prediction = true;
        let (entry, session) = log_entry(&state, &auth, req, None).await.unwrap();
        assert_eq!(entry.food_label, "Noodles");
        assert_eq!(entry.source, EntrySource::Image);
        assert_eq!(entry.prediction_confidence, Some(0.11));
        assert_eq!(entry.provenance, Some(PayloadSource::FallbackEstimation));
        assert!(session.scratch.is_empty());
    }

    #[tokio::test]
    async fn manual_nutrition_skips_the_analyzer() {
        let state = AppState::fake().with_analyzer(Arc::new(StubAnalyzer));
        let auth = logged_in(&state).await;

        let mut req = request("Salad", 0);
        req.nutrition = Some(ManualNutrition {
            calories: Some("120".into()),
            ..Default::default()
        });
        let (entry, _) = log_entry(&state, &auth, req, None).await.unwrap();
        assert_eq!(entry.nutrition.calories, Some(120.0));
        assert_eq!(entry.provenance, Some(PayloadSource::Manual));
    }

    #[tokio::test]
    async fn preview_uses_pending_food() {
        let state = AppState::fake();
        let auth = logged_in(&state).await;

        let err = preview_nutrition(
            &state,
            &auth,
            AnalyzeRequest { food: None, portion: "normal".into() },
            None,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation { field: "food", .. }));

        state
            .sessions
            .update(auth.session_id, |s| s.scratch.pending_food = Some("Nasi Goreng".into()))
            .await
            .unwrap();

        let payload = preview_nutrition(
            &state,
            &auth,
            AnalyzeRequest { food: None, portion: "large".into() },
            None,
        )
        .await
        .unwrap();
        assert_eq!(payload.facts().calories, Some(975.0));
    }
}
