use serde::{Deserialize, Serialize};
use time::{macros::format_description, Date, OffsetDateTime};

use super::model::NutritionEntry;
use crate::{
    error::AppError,
    nutrition::{NutritionPayload, PayloadSource},
    session::handlers::SessionView,
};

/// Nutrient values typed in by the user, e.g. `"650 kcal"` or `"15"`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ManualNutrition {
    pub calories: Option<String>,
    pub protein: Option<String>,
    pub fat: Option<String>,
    pub carbs: Option<String>,
    pub fiber: Option<String>,
    pub sugar: Option<String>,
    pub sodium: Option<String>,
    pub notes: Option<String>,
}

impl From<ManualNutrition> for NutritionPayload {
    fn from(m: ManualNutrition) -> Self {
        Self {
            calories: m.calories,
            protein: m.protein,
            fat: m.fat,
            carbs: m.carbs,
            fiber: m.fiber,
            sugar: m.sugar,
            sodium: m.sodium,
            notes: m.notes,
            ..NutritionPayload::empty(PayloadSource::Manual)
        }
    }
}

fn default_portion() -> String {
    "normal".into()
}

#[derive(Debug, Deserialize)]
pub struct CreateEntryRequest {
    pub food: Option<String>,
    #[serde(default = "default_portion")]
    pub portion: String,
    #[serde(default)]
    pub water_ml: i64,
    #[serde(default)]
    pub exercise_min: i64,
    pub nutrition: Option<ManualNutrition>,
    #[serde(default)]
    pub use_prediction: bool,
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub food: Option<String>,
    #[serde(default = "default_portion")]
    pub portion: String,
}

#[derive(Debug, Serialize)]
pub struct CreatedEntryResponse {
    pub entry: NutritionEntry,
    pub session: SessionView,
}

#[derive(Debug, Default, Deserialize)]
pub struct DateQuery {
    pub date: Option<String>,
}

impl DateQuery {
    /// Requested day, or today (UTC) when absent.
    pub fn resolve(&self) -> Result<Date, AppError> {
        match self.date.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
            Some(raw) => parse_date(raw),
            None => Ok(today()),
        }
    }
}

pub fn today() -> Date {
    OffsetDateTime::now_utc().date()
}

pub fn parse_date(raw: &str) -> Result<Date, AppError> {
    Date::parse(raw, format_description!("[year]-[month]-[day]"))
        .map_err(|_| AppError::validation("date", "expected YYYY-MM-DD"))
}
