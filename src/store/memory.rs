use std::collections::HashMap;

use async_trait::async_trait;
use time::{Date, OffsetDateTime};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{DatabaseStats, DuplicateEmail, NutritionStore};
use crate::{
    auth::repo_types::{NewUser, ProfileUpdate, User},
    entries::model::{NewEntry, NutritionEntry},
};

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    entries: Vec<NutritionEntry>,
}

/// Process-local store used when no database is configured.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NutritionStore for MemoryStore {
    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_user(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn insert_user(&self, user: NewUser) -> anyhow::Result<User> {
        let mut inner = self.inner.write().await;
        if inner.users.values().any(|u| u.email == user.email) {
            return Err(DuplicateEmail.into());
        }
        let user = User {
            id: Uuid::new_v4(),
            email: user.email,
            name: user.name,
            password_hash: user.password_hash,
            weight_kg: None,
            created_at: OffsetDateTime::now_utc(),
        };
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update_profile(
        &self,
        id: Uuid,
        update: ProfileUpdate,
    ) -> anyhow::Result<Option<User>> {
        let mut inner = self.inner.write().await;
        let Some(user) = inner.users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = update.name {
            user.name = name;
        }
        if let Some(weight) = update.weight_kg {
            user.weight_kg = Some(weight);
        }
        Ok(Some(user.clone()))
    }

    async fn daily_entries(&self, user_id: Uuid, date: Date) -> anyhow::Result<Vec<NutritionEntry>> {
        let inner = self.inner.read().await;
        Ok(inner
            .entries
            .iter()
            .filter(|e| e.user_id == user_id && e.log_date == date)
            .cloned()
            .collect())
    }

    async fn add_daily_entry(
        &self,
        user_id: Uuid,
        entry: NewEntry,
    ) -> anyhow::Result<NutritionEntry> {
        let mut inner = self.inner.write().await;
        anyhow::ensure!(inner.users.contains_key(&user_id), "unknown user {user_id}");
        let stored = NutritionEntry::from_new(Uuid::new_v4(), user_id, entry, OffsetDateTime::now_utc());
        inner.entries.push(stored.clone());
        Ok(stored)
    }

    async fn database_stats(&self) -> anyhow::Result<DatabaseStats> {
        let inner = self.inner.read().await;
        Ok(DatabaseStats {
            total_users: inner.users.len() as i64,
            total_entries: inner.entries.len() as i64,
        })
    }
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use super::*;
    use crate::{entries::model::EntrySource, nutrition::{NutritionFacts, PortionCategory}};

    fn entry(label: &str, log_date: Date) -> NewEntry {
        NewEntry {
            food_label: label.into(),
            portion: PortionCategory::Normal,
            nutrition: NutritionFacts::default(),
            notes: None,
            provenance: None,
            water_ml: 250,
            exercise_min: 0,
            log_date,
            prediction_confidence: None,
            source: EntrySource::Manual,
        }
    }

    #[tokio::test]
    async fn create_and_authenticate_user() {
        let store = MemoryStore::new();
        let user = store.create_user("a@b.co", "secret1", "Ana").await.unwrap();
        assert!(store.user_exists("a@b.co").await.unwrap());

        let ok = store.authenticate_user("a@b.co", "secret1").await.unwrap();
        assert_eq!(ok.map(|u| u.id), Some(user.id));
        assert!(store.authenticate_user("a@b.co", "wrong").await.unwrap().is_none());
        assert!(store.authenticate_user("x@b.co", "secret1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let store = MemoryStore::new();
        store.create_user("a@b.co", "secret1", "Ana").await.unwrap();
        let err = store.create_user("a@b.co", "secret2", "Other").await.unwrap_err();
        assert!(err.is::<DuplicateEmail>());
    }

    #[tokio::test]
    async fn entries_are_filtered_by_user_and_date_in_order() {
        let store = MemoryStore::new();
        let user = store.create_user("a@b.co", "secret1", "Ana").await.unwrap();
        let today = date!(2024 - 03 - 10);
        store.add_daily_entry(user.id, entry("first", today)).await.unwrap();
        store.add_daily_entry(user.id, entry("yesterday", date!(2024 - 03 - 09))).await.unwrap();
        store.add_daily_entry(user.id, entry("second", today)).await.unwrap();

        let labels: Vec<_> = store
            .daily_entries(user.id, today)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.food_label)
            .collect();
        assert_eq!(labels, vec!["first", "second"]);

        let stats = store.database_stats().await.unwrap();
        assert_eq!(stats, DatabaseStats { total_users: 1, total_entries: 3 });
    }

    #[tokio::test]
    async fn entry_for_unknown_user_fails() {
        let store = MemoryStore::new();
        let today = date!(2024 - 03 - 10);
        assert!(store.add_daily_entry(Uuid::new_v4(), entry("x", today)).await.is_err());
    }
}
