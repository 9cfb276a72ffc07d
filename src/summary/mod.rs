pub mod aggregate;
pub mod handlers;

use axum::Router;

use crate::state::AppState;

pub use aggregate::{progress, DailySummary, DailyTargets, DayReport};

pub fn router() -> Router<AppState> {
    handlers::routes()
}
