use std::ops::RangeInclusive;

use time::Date;

use super::model::{EntrySource, NewEntry};
use crate::{
    error::AppError,
    nutrition::{NutritionPayload, PortionCategory},
};

pub const WATER_RANGE_ML: RangeInclusive<i64> = 0..=5000;
pub const EXERCISE_RANGE_MIN: RangeInclusive<i64> = 0..=300;

/// Raw entry fields as submitted by the user.
#[derive(Debug, Clone)]
pub struct EntryInput {
    pub food_label: String,
    pub portion: String,
    pub water_ml: i64,
    pub exercise_min: i64,
    pub prediction_confidence: Option<f64>,
    pub source: EntrySource,
}

/// Fields that passed validation, before a nutrition payload is attached.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckedInput {
    pub food_label: String,
    pub portion: PortionCategory,
    pub water_ml: i64,
    pub exercise_min: i64,
    pub prediction_confidence: Option<f64>,
    pub source: EntrySource,
}

impl EntryInput {
    /// Field checks only; cheap enough to run before calling the analyzer.
    pub fn check(&self) -> Result<CheckedInput, AppError> {
        let food_label = self.food_label.trim();
        if food_label.is_empty() {
            return Err(AppError::validation("food", "enter a food name first"));
        }
        let portion: PortionCategory = self.portion.parse()?;
        if !WATER_RANGE_ML.contains(&self.water_ml) {
            return Err(AppError::validation(
                "water_ml",
                format!(
                    "must be between {} and {} ml",
                    WATER_RANGE_ML.start(),
                    WATER_RANGE_ML.end()
                ),
            ));
        }
        if !EXERCISE_RANGE_MIN.contains(&self.exercise_min) {
            return Err(AppError::validation(
                "exercise_min",
                format!(
                    "must be between {} and {} minutes",
                    EXERCISE_RANGE_MIN.start(),
                    EXERCISE_RANGE_MIN.end()
                ),
            ));
        }
        if let Some(c) = self.prediction_confidence {
            if !(0.0..=1.0).contains(&c) {
                return Err(AppError::validation(
                    "prediction_confidence",
                    "must be between 0 and 1",
                ));
            }
        }
        Ok(CheckedInput {
            food_label: food_label.to_string(),
            portion,
            water_ml: self.water_ml,
            exercise_min: self.exercise_min,
            prediction_confidence: self.prediction_confidence,
            source: self.source,
        })
    }
}

impl CheckedInput {
    pub fn into_entry(self, nutrition: &NutritionPayload, log_date: Date) -> NewEntry {
        NewEntry {
            food_label: self.food_label,
            portion: self.portion,
            nutrition: nutrition.facts(),
            notes: nutrition.notes.clone(),
            provenance: Some(nutrition.source),
            water_ml: self.water_ml,
            exercise_min: self.exercise_min,
            log_date,
            prediction_confidence: self.prediction_confidence,
            source: self.source,
        }
    }
}

/// Validates `input` and assembles the entry to persist for `log_date`.
pub fn validate(
    input: &EntryInput,
    nutrition: &NutritionPayload,
    log_date: Date,
) -> Result<NewEntry, AppError> {
    Ok(input.check()?.into_entry(nutrition, log_date))
}
