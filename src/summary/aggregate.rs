use serde::Serialize;
use time::Date;

use crate::entries::model::NutritionEntry;

/// Daily calorie need per kilogram of body weight.
pub const KCAL_PER_KG: f64 = 30.0;
pub const WATER_TARGET_ML: f64 = 2000.0;
pub const EXERCISE_TARGET_MIN: f64 = 30.0;

/// Totals for one user on one day. Derived, never stored.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq)]
pub struct DailySummary {
    pub entry_count: usize,
    pub calories: f64,
    pub protein: f64,
    pub water_ml: f64,
    pub exercise_min: f64,
}

impl DailySummary {
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a NutritionEntry>) -> Self {
        entries.into_iter().fold(Self::default(), |mut acc, e| {
            acc.entry_count += 1;
            acc.calories += e.nutrition.calories.unwrap_or(0.0).max(0.0);
            acc.protein += e.nutrition.protein.unwrap_or(0.0).max(0.0);
            acc.water_ml += e.water_ml.max(0) as f64;
            acc.exercise_min += e.exercise_min.max(0) as f64;
            acc
        })
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct DailyTargets {
    pub calories: f64,
    pub water_ml: f64,
    pub exercise_min: f64,
}

impl DailyTargets {
    pub fn for_weight(weight_kg: f64) -> Self {
        Self {
            calories: weight_kg.max(0.0) * KCAL_PER_KG,
            water_ml: WATER_TARGET_ML,
            exercise_min: EXERCISE_TARGET_MIN,
        }
    }
}

/// Share of a target reached, in `[0, 1]`. Zero when the target is not
/// positive or the total is NaN; an overflowed total counts as reached.
pub fn progress(total: f64, target: f64) -> f64 {
    if target > 0.0 && !total.is_nan() {
        (total / target).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct TargetProgress {
    pub calories: f64,
    pub water: f64,
    pub exercise: f64,
}

impl TargetProgress {
    pub fn of(summary: &DailySummary, targets: &DailyTargets) -> Self {
        Self {
            calories: progress(summary.calories, targets.calories),
            water: progress(summary.water_ml, targets.water_ml),
            exercise: progress(summary.exercise_min, targets.exercise_min),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DayReport {
    pub date: Date,
    pub summary: DailySummary,
    pub targets: DailyTargets,
    pub progress: TargetProgress,
}

impl DayReport {
    pub fn build(date: Date, entries: &[NutritionEntry], weight_kg: f64) -> Self {
        let summary = DailySummary::from_entries(entries);
        let targets = DailyTargets::for_weight(weight_kg);
        Self {
            date,
            progress: TargetProgress::of(&summary, &targets),
            summary,
            targets,
        }
    }
}

#[cfg(test)]
mod tests {
    use time::{macros::date, OffsetDateTime};
    use uuid::Uuid;

    use super::*;
    use crate::{
        entries::model::EntrySource,
        nutrition::{NutritionFacts, PortionCategory},
    };

    fn entry(calories: Option<f64>, protein: Option<f64>, water: i64, exercise: i64) -> NutritionEntry {
        NutritionEntry {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            food_label: "x".into(),
            portion: PortionCategory::Normal,
            nutrition: NutritionFacts {
                calories,
                protein,
                ..NutritionFacts::default()
            },
            notes: None,
            provenance: None,
            water_ml: water,
            exercise_min: exercise,
            log_date: date!(2024 - 02 - 02),
            prediction_confidence: None,
            source: EntrySource::Manual,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    fn sample() -> Vec<NutritionEntry> {
        vec![
            entry(Some(650.0), Some(15.0), 500, 0),
            entry(None, Some(3.5), 250, 20),
            entry(Some(120.0), None, 0, 15),
        ]
    }

    #[test]
    fn sums_with_missing_fields_as_zero() {
        let s = DailySummary::from_entries(&sample());
        assert_eq!(s.entry_count, 3);
        assert_eq!(s.calories, 770.0);
        assert_eq!(s.protein, 18.5);
        assert_eq!(s.water_ml, 750.0);
        assert_eq!(s.exercise_min, 35.0);
    }

    #[test]
    fn is_idempotent_and_order_independent() {
        let entries = sample();
        let first = DailySummary::from_entries(&entries);
        let second = DailySummary::from_entries(&entries);
        assert_eq!(first, second);

        let mut reversed = entries.clone();
        reversed.reverse();
        assert_eq!(DailySummary::from_entries(&reversed), first);
    }

    #[test]
    fn empty_day_is_all_zero() {
        let s = DailySummary::from_entries(&Vec::<NutritionEntry>::new());
        assert_eq!(s, DailySummary::default());
    }

    #[test]
    fn progress_is_capped_and_zero_for_missing_target() {
        assert_eq!(progress(1000.0, 2000.0), 0.5);
        assert_eq!(progress(2000.0, 2000.0), 1.0);
        assert_eq!(progress(9000.0, 2000.0), 1.0);
        assert_eq!(progress(50.0, 0.0), 0.0);
        assert_eq!(progress(-10.0, 30.0), 0.0);
    }

    #[test]
    fn overflowed_totals_still_cap() {
        assert_eq!(progress(f64::MAX + f64::MAX, 1950.0), 1.0);
        assert_eq!(progress(f64::INFINITY, 2000.0), 1.0);
        assert_eq!(progress(f64::NEG_INFINITY, 30.0), 0.0);
        assert_eq!(progress(f64::NAN, 30.0), 0.0);
    }

    #[test]
    fn targets_follow_body_weight() {
        let t = DailyTargets::for_weight(65.0);
        assert_eq!(t.calories, 1950.0);
        assert_eq!(t.water_ml, 2000.0);
        assert_eq!(t.exercise_min, 30.0);
    }

    #[test]
    fn day_report_combines_totals_and_progress() {
        let report = DayReport::build(date!(2024 - 02 - 02), &sample(), 70.0);
        assert_eq!(report.targets.calories, 2100.0);
        assert_eq!(report.progress.exercise, 1.0);
        assert_eq!(report.progress.water, 0.375);
    }
}
