pub mod extract;
pub mod payload;
pub mod portion;

pub use extract::{extract_magnitude, extract_number};
pub use payload::{NutritionFacts, NutritionPayload, PayloadSource};
pub use portion::PortionCategory;
