use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::nutrition::{NutritionFacts, PayloadSource, PortionCategory};

/// How the food label of an entry was obtained.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum EntrySource {
    #[default]
    Manual,
    Image,
}

impl EntrySource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Image => "image",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "manual" => Some(Self::Manual),
            "image" => Some(Self::Image),
            _ => None,
        }
    }
}

/// A validated entry that has not been persisted yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEntry {
    pub food_label: String,
    pub portion: PortionCategory,
    pub nutrition: NutritionFacts,
    pub notes: Option<String>,
    pub provenance: Option<PayloadSource>,
    pub water_ml: i64,
    pub exercise_min: i64,
    pub log_date: Date,
    pub prediction_confidence: Option<f64>,
    pub source: EntrySource,
}

/// One logged food/water/exercise record. Immutable once stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NutritionEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub food_label: String,
    pub portion: PortionCategory,
    pub nutrition: NutritionFacts,
    pub notes: Option<String>,
    pub provenance: Option<PayloadSource>,
    pub water_ml: i64,
    pub exercise_min: i64,
    pub log_date: Date,
    pub prediction_confidence: Option<f64>,
    pub source: EntrySource,
    pub created_at: OffsetDateTime,
}

impl NutritionEntry {
    pub fn from_new(id: Uuid, user_id: Uuid, new: NewEntry, created_at: OffsetDateTime) -> Self {
        Self {
            id,
            user_id,
            food_label: new.food_label,
            portion: new.portion,
            nutrition: new.nutrition,
            notes: new.notes,
            provenance: new.provenance,
            water_ml: new.water_ml,
            exercise_min: new.exercise_min,
            log_date: new.log_date,
            prediction_confidence: new.prediction_confidence,
            source: new.source,
            created_at,
        }
    }
}
