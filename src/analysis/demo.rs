use async_trait::async_trait;

use super::NutritionAnalyzer;
use crate::nutrition::{NutritionPayload, PayloadSource, PortionCategory};

/// Per normal portion: kcal, protein g, fat g, carbs g, fiber g, sugar g, sodium mg.
type Profile = [f64; 7];

const KNOWN_FOODS: &[(&[&str], Profile)] = &[
    (&["fried rice", "nasi goreng"], [650.0, 15.0, 22.0, 90.0, 3.0, 4.0, 900.0]),
    (&["fried chicken", "ayam goreng"], [400.0, 30.0, 25.0, 10.0, 0.5, 0.0, 700.0]),
    (&["tempeh", "tempe"], [220.0, 15.0, 14.0, 10.0, 4.0, 1.0, 200.0]),
    (&["banana", "pisang"], [105.0, 1.3, 0.4, 27.0, 3.1, 14.0, 1.0]),
    (&["spinach", "bayam"], [40.0, 3.0, 1.0, 5.0, 3.0, 1.0, 150.0]),
    (&["boiled egg", "telur"], [78.0, 6.3, 5.3, 0.6, 0.0, 0.6, 62.0]),
    (&["satay", "sate"], [350.0, 28.0, 20.0, 12.0, 1.0, 8.0, 600.0]),
    (&["rendang"], [470.0, 35.0, 32.0, 8.0, 2.0, 4.0, 800.0]),
    (&["noodle", "mie", "mi goreng"], [450.0, 12.0, 15.0, 65.0, 3.0, 3.0, 1000.0]),
    (&["salad"], [150.0, 4.0, 8.0, 15.0, 5.0, 8.0, 200.0]),
];

const GENERIC_MEAL: Profile = [300.0, 10.0, 10.0, 40.0, 3.0, 5.0, 400.0];

/// Heuristic estimates from a small built-in table; used in demo mode and as
/// the fallback of the remote analyzer.
#[derive(Debug, Clone, Copy, Default)]
pub struct DemoAnalyzer;

impl DemoAnalyzer {
    pub fn estimate(&self, food: &str, portion: PortionCategory, source: PayloadSource) -> NutritionPayload {
        let needle = food.trim().to_lowercase();
        let (known, base) = KNOWN_FOODS
            .iter()
            .find(|(names, _)| names.iter().any(|n| needle.contains(n)))
            .map(|(_, p)| (true, *p))
            .unwrap_or((false, GENERIC_MEAL));
        let k = portion.scale();
        let [kcal, protein, fat, carbs, fiber, sugar, sodium] = base.map(|v| v * k);

        let mut payload = NutritionPayload::empty(source);
        payload.calories = Some(format!("{kcal:.0} kcal"));
        payload.protein = Some(format!("{protein:.1} g"));
        payload.fat = Some(format!("{fat:.1} g"));
        payload.carbs = Some(format!("{carbs:.1} g"));
        payload.fiber = Some(format!("{fiber:.1} g"));
        payload.sugar = Some(format!("{sugar:.1} g"));
        payload.sodium = Some(format!("{sodium:.0} mg"));
        payload.notes = Some(if known {
            format!("Estimated values for a {portion} portion of {}", food.trim())
        } else {
            format!("Generic estimate for a {portion} portion; {} is not in the reference table", food.trim())
        });
        payload
    }
}

#[async_trait]
impl NutritionAnalyzer for DemoAnalyzer {
    async fn analyze_food_nutrition(&self, food: &str, portion: PortionCategory) -> NutritionPayload {
        self.estimate(food, portion, PayloadSource::FallbackEstimation)
    }

    fn is_available(&self) -> bool {
        false
    }
}
