use std::sync::Arc;

use async_trait::async_trait;

use crate::nutrition::{NutritionPayload, PortionCategory};

pub mod deepseek;
pub mod demo;

pub use deepseek::DeepSeekAnalyzer;
pub use demo::DemoAnalyzer;

/// Nutrition estimates for a food label.
///
/// Implementations never fail: when the backing service is unavailable they
/// return an estimate tagged `FallbackEstimation`.
#[async_trait]
pub trait NutritionAnalyzer: Send + Sync {
    async fn analyze_food_nutrition(&self, food: &str, portion: PortionCategory) -> NutritionPayload;

    /// Whether a real analysis backend is configured.
    fn is_available(&self) -> bool;

    /// Same analyzer authenticated with a caller-supplied key, if supported.
    fn with_api_key(&self, _key: &str) -> Option<Arc<dyn NutritionAnalyzer>> {
        None
    }
}

/// Picks the analyzer for one request, honouring a manually entered key.
pub fn for_request(
    base: &Arc<dyn NutritionAnalyzer>,
    manual_key: Option<&str>,
) -> Arc<dyn NutritionAnalyzer> {
    manual_key
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .and_then(|k| base.with_api_key(k))
        .unwrap_or_else(|| Arc::clone(base))
}
