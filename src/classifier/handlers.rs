use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    routing::post,
    Json, Router,
};
use bytes::Bytes;
use serde::Deserialize;
use tracing::{info, instrument, warn};

use super::{PredictionSelection, DEFAULT_TOP_K};
use crate::{
    auth::AuthSession,
    error::AppError,
    session::handlers::SessionView,
    state::AppState,
};

const ALLOWED_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];
const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Deserialize)]
pub struct SelectRequest {
    pub index: usize,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/predictions", post(upload_image))
        .route("/predictions/select", post(select_prediction))
        .layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES))
}

fn is_supported_image(file_name: Option<&str>, content_type: Option<&str>) -> bool {
    let by_name = file_name
        .and_then(|n| n.rsplit_once('.'))
        .map(|(_, ext)| ALLOWED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false);
    let by_type = content_type
        .and_then(|ct| ct.strip_prefix("image/"))
        .map(|sub| ALLOWED_EXTENSIONS.contains(&sub))
        .unwrap_or(false);
    by_name || by_type
}

async fn read_image(mut mp: Multipart) -> Result<Bytes, AppError> {
    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|e| AppError::validation("image", e.to_string()))?
    {
        if field.name() != Some("image") {
            continue;
        }
        if !is_supported_image(field.file_name(), field.content_type()) {
            return Err(AppError::validation("image", "only jpg, jpeg, png or webp images are accepted"));
        }
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::validation("image", e.to_string()))?;
        if data.is_empty() {
            return Err(AppError::validation("image", "image is empty"));
        }
        return Ok(data);
    }
    Err(AppError::validation("image", "multipart field `image` is required"))
}

/// POST /predictions (multipart, field `image`)
///
/// Ranks the top candidates and stores them in the session. When nothing is
/// recognized the predictions are cleared and the user continues manually.
#[instrument(skip(state, mp))]
pub async fn upload_image(
    State(state): State<AppState>,
    auth: AuthSession,
    mp: Multipart,
) -> Result<Json<SessionView>, AppError> {
    let image = read_image(mp).await?;
    let raw = state.classifier.predict(image.clone(), DEFAULT_TOP_K).await?;

    let selection = PredictionSelection::new(raw, DEFAULT_TOP_K);
    let view = state
        .sessions
        .update(auth.session_id, |s| {
            s.scratch.pending_image = Some(image);
            s.scratch.predictions = selection.as_ref().ok().cloned();
            SessionView::from(&*s)
        })
        .await
        .ok_or_else(AppError::session_ended)?;

    match selection {
        Ok(selection) => {
            info!(
                session_id = %auth.session_id,
                top = %selection.top().label,
                confidence = selection.top().confidence,
                "image recognized"
            );
            Ok(Json(view))
        }
        Err(e) => {
            warn!(session_id = %auth.session_id, "no food recognized, manual entry required");
            Err(e)
        }
    }
}

/// POST /predictions/select { index }
#[instrument(skip(state))]
pub async fn select_prediction(
    State(state): State<AppState>,
    auth: AuthSession,
    Json(payload): Json<SelectRequest>,
) -> Result<Json<SessionView>, AppError> {
    let view = state
        .sessions
        .update(auth.session_id, |s| -> Result<SessionView, AppError> {
            let selection = s
                .scratch
                .predictions
                .as_mut()
                .ok_or_else(|| AppError::validation("selection", "no predictions to choose from"))?;
            let label = selection.select(payload.index)?.label.clone();
            s.scratch.pending_food = Some(label);
            Ok(SessionView::from(&*s))
        })
        .await
        .ok_or_else(AppError::session_ended)??;
    Ok(Json(view))
}
