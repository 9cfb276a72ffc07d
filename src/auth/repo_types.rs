use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Weight assumed for calorie targets when the profile has none.
pub const DEFAULT_WEIGHT_KG: f64 = 65.0;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,        // Argon2 hash, not exposed in JSON
    pub weight_kg: Option<f64>,
    pub created_at: OffsetDateTime,
}

impl User {
    pub fn profile(&self) -> Profile {
        Profile {
            id: self.id,
            email: self.email.clone(),
            name: self.name.clone(),
            weight_kg: self.weight_kg.unwrap_or(DEFAULT_WEIGHT_KG),
        }
    }
}

/// Fields needed to insert a user; the password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub password_hash: String,
}

/// Public profile attributes.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub weight_kg: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub weight_kg: Option<f64>,
}
