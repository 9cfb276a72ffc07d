use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::extract::extract_magnitude;

/// Where a nutrition payload came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PayloadSource {
    /// Structured answer from the analysis service.
    AnalysisService,
    /// Values scraped from an unstructured service reply.
    TextExtraction,
    /// Heuristic estimate used when the service is unavailable.
    FallbackEstimation,
    /// Typed in by the user.
    Manual,
}

impl PayloadSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AnalysisService => "analysis_service",
            Self::TextExtraction => "text_extraction",
            Self::FallbackEstimation => "fallback_estimation",
            Self::Manual => "manual",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "analysis_service" => Some(Self::AnalysisService),
            "text_extraction" => Some(Self::TextExtraction),
            "fallback_estimation" => Some(Self::FallbackEstimation),
            "manual" => Some(Self::Manual),
            _ => None,
        }
    }

    pub fn is_degraded(self) -> bool {
        matches!(self, Self::FallbackEstimation)
    }
}

/// Nutrition breakdown as reported by a collaborator: every nutrient is a
/// magnitude+unit string such as `"650 kcal"` or `"15 g"`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NutritionPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calories: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protein: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fat: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carbs: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fiber: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sugar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sodium: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub source: PayloadSource,
    #[serde(with = "time::serde::rfc3339")]
    pub analyzed_at: OffsetDateTime,
}

impl NutritionPayload {
    pub fn empty(source: PayloadSource) -> Self {
        Self {
            calories: None,
            protein: None,
            fat: None,
            carbs: None,
            fiber: None,
            sugar: None,
            sodium: None,
            notes: None,
            source,
            analyzed_at: OffsetDateTime::now_utc(),
        }
    }

    /// Numeric view of the payload, clamped to non-negative values.
    pub fn facts(&self) -> NutritionFacts {
        let num = |v: &Option<String>| v.as_deref().map(extract_magnitude);
        NutritionFacts {
            calories: num(&self.calories),
            protein: num(&self.protein),
            fat: num(&self.fat),
            carbs: num(&self.carbs),
            fiber: num(&self.fiber),
            sugar: num(&self.sugar),
            sodium: num(&self.sodium),
        }
    }
}

/// Numeric nutrients stored with an entry. Units: kcal, grams, sodium in mg.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct NutritionFacts {
    pub calories: Option<f64>,
    pub protein: Option<f64>,
    pub fat: Option<f64>,
    pub carbs: Option<f64>,
    pub fiber: Option<f64>,
    pub sugar: Option<f64>,
    pub sodium: Option<f64>,
}
