use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::error::AppError;

pub mod handlers;
pub mod selector;

pub use selector::{PredictionCandidate, PredictionSelection, DEFAULT_TOP_K};

const SERVICE: &str = "image classifier";

/// Food recognition for a single image.
///
/// Returns candidates ordered by descending confidence, possibly empty.
#[async_trait]
pub trait FoodClassifier: Send + Sync {
    async fn predict(&self, image: Bytes, top_k: usize) -> Result<Vec<PredictionCandidate>, AppError>;

    fn is_available(&self) -> bool;
}

/// Used when no inference endpoint is configured: nothing is recognized,
/// so the caller falls back to manual entry.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableClassifier;

#[async_trait]
impl FoodClassifier for UnavailableClassifier {
    async fn predict(&self, _image: Bytes, _top_k: usize) -> Result<Vec<PredictionCandidate>, AppError> {
        Ok(Vec::new())
    }

    fn is_available(&self) -> bool {
        false
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InferenceReply {
    Wrapped { predictions: Vec<PredictionCandidate> },
    Bare(Vec<PredictionCandidate>),
}

/// Posts the raw image to a model-serving endpoint that answers with
/// `[{"label": .., "confidence": ..}]` (optionally under `predictions`).
#[derive(Clone)]
pub struct HttpClassifier {
    client: Client,
    endpoint: String,
}

impl HttpClassifier {
    pub fn new(endpoint: &str, timeout: Duration) -> anyhow::Result<Self> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            endpoint: endpoint.to_string(),
        })
    }
}

#[async_trait]
impl FoodClassifier for HttpClassifier {
    #[instrument(skip(self, image), fields(bytes = image.len()))]
    async fn predict(&self, image: Bytes, top_k: usize) -> Result<Vec<PredictionCandidate>, AppError> {
        let res = self
            .client
            .post(&self.endpoint)
            .query(&[("top_k", top_k)])
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(image)
            .send()
            .await
            .map_err(|e| AppError::external(SERVICE, e))?;

        let status = res.status();
        if !status.is_success() {
            return Err(AppError::external(SERVICE, format!("status {status}")));
        }
        let reply: InferenceReply = res.json().await.map_err(|e| AppError::external(SERVICE, e))?;
        let candidates = match reply {
            InferenceReply::Wrapped { predictions } => predictions,
            InferenceReply::Bare(list) => list,
        };
        debug!(count = candidates.len(), "classifier predictions");
        Ok(candidates)
    }

    fn is_available(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unavailable_classifier_recognizes_nothing() {
        let out = UnavailableClassifier
            .predict(Bytes::from_static(b"\xff\xd8"), DEFAULT_TOP_K)
            .await
            .unwrap();
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_external_error() {
        let c = HttpClassifier::new("http://127.0.0.1:9/predict", Duration::from_secs(2)).unwrap();
        let err = c.predict(Bytes::from_static(b"img"), 3).await.unwrap_err();
        assert!(matches!(err, AppError::ExternalService { .. }));
    }

    #[test]
    fn inference_reply_accepts_both_shapes() {
        let bare: InferenceReply =
            serde_json::from_str(r#"[{"label":"Fried Rice","confidence":0.82}]"#).unwrap();
        assert!(matches!(bare, InferenceReply::Bare(ref v) if v.len() == 1));
        let wrapped: InferenceReply =
            serde_json::from_str(r#"{"predictions":[{"label":"Noodles","confidence":0.1}]}"#).unwrap();
        assert!(matches!(wrapped, InferenceReply::Wrapped { .. }));
    }
}
