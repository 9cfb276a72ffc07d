pub mod dto;
pub mod handlers;
pub mod model;
pub mod services;
pub mod validator;

use axum::Router;

use crate::state::AppState;

pub use model::{EntrySource, NewEntry, NutritionEntry};

pub fn router() -> Router<AppState> {
    handlers::routes()
}
