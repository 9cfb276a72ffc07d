use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Number of candidates kept from a single image.
pub const DEFAULT_TOP_K: usize = 3;

/// One classifier guess for an image.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PredictionCandidate {
    pub label: String,
    pub confidence: f64,
}

impl PredictionCandidate {
    pub fn new(label: impl Into<String>, confidence: f64) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }
}

/// Ranked candidates for one image plus the index the user picked.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PredictionSelection {
    candidates: Vec<PredictionCandidate>,
    selected: usize,
}

impl PredictionSelection {
    /// Normalizes classifier output and keeps at most `top_k` candidates.
    ///
    /// Labels are trimmed and blanks dropped, confidences clamped to `[0, 1]`
    /// (NaN counts as 0), then a stable descending sort so an already ranked
    /// list keeps its order. Nothing left means no recognizable food.
    pub fn new(raw: Vec<PredictionCandidate>, top_k: usize) -> Result<Self, AppError> {
        let mut candidates: Vec<PredictionCandidate> = raw
            .into_iter()
            .filter_map(|c| {
                let label = c.label.trim();
                if label.is_empty() {
                    return None;
                }
                let confidence = if c.confidence.is_nan() {
                    0.0
                } else {
                    c.confidence.clamp(0.0, 1.0)
                };
                Some(PredictionCandidate::new(label, confidence))
            })
            .collect();

        candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        candidates.truncate(top_k.max(1));

        if candidates.is_empty() {
            return Err(AppError::EmptyPrediction);
        }
        Ok(Self {
            candidates,
            selected: 0,
        })
    }

    pub fn candidates(&self) -> &[PredictionCandidate] {
        &self.candidates
    }

    pub fn top(&self) -> &PredictionCandidate {
        &self.candidates[0]
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn selected(&self) -> &PredictionCandidate {
        &self.candidates[self.selected]
    }

    pub fn select(&mut self, index: usize) -> Result<&PredictionCandidate, AppError> {
        if index >= self.candidates.len() {
            return Err(AppError::validation(
                "selection",
                format!(
                    "index {index} out of range, {} candidates available",
                    self.candidates.len()
                ),
            ));
        }
        self.selected = index;
        Ok(&self.candidates[index])
    }
}
