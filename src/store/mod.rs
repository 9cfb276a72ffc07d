use async_trait::async_trait;
use serde::Serialize;
use time::Date;
use uuid::Uuid;

use crate::{
    auth::{
        password::{hash_password, verify_password},
        repo_types::{NewUser, Profile, ProfileUpdate, User},
    },
    entries::model::{NewEntry, NutritionEntry},
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Returned by `insert_user` when the email is already taken.
#[derive(Debug, thiserror::Error)]
#[error("email already registered")]
pub struct DuplicateEmail;

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct DatabaseStats {
    pub total_users: i64,
    pub total_entries: i64,
}

/// Persistence for users and their daily entries.
///
/// Entries are append-only. Two writers for the same user and date are not
/// ordered against each other; whichever commits last is simply one more
/// row in the next read.
#[async_trait]
pub trait NutritionStore: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    async fn find_user(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    async fn insert_user(&self, user: NewUser) -> anyhow::Result<User>;
    async fn update_profile(&self, id: Uuid, update: ProfileUpdate)
        -> anyhow::Result<Option<User>>;
    /// Entries for the day in insertion order.
    async fn daily_entries(&self, user_id: Uuid, date: Date) -> anyhow::Result<Vec<NutritionEntry>>;
    async fn add_daily_entry(&self, user_id: Uuid, entry: NewEntry)
        -> anyhow::Result<NutritionEntry>;
    async fn database_stats(&self) -> anyhow::Result<DatabaseStats>;

    /// Returns the user only when the password matches the stored hash.
    async fn authenticate_user(&self, email: &str, password: &str) -> anyhow::Result<Option<User>> {
        let Some(user) = self.find_user_by_email(email).await? else {
            return Ok(None);
        };
        if verify_password(password, &user.password_hash)? {
            Ok(Some(user))
        } else {
            Ok(None)
        }
    }

    async fn user_exists(&self, email: &str) -> anyhow::Result<bool> {
        Ok(self.find_user_by_email(email).await?.is_some())
    }

    async fn create_user(&self, email: &str, password: &str, name: &str) -> anyhow::Result<User> {
        let password_hash = hash_password(password)?;
        self.insert_user(NewUser {
            email: email.to_string(),
            name: name.to_string(),
            password_hash,
        })
        .await
    }

    async fn user_profile(&self, id: Uuid) -> anyhow::Result<Option<Profile>> {
        Ok(self.find_user(id).await?.map(|u| u.profile()))
    }
}
