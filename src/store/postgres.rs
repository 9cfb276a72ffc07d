use anyhow::Context;
use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use super::{DatabaseStats, DuplicateEmail, NutritionStore};
use crate::{
    auth::repo_types::{NewUser, ProfileUpdate, User},
    entries::model::{EntrySource, NewEntry, NutritionEntry},
    nutrition::{NutritionFacts, PayloadSource, PortionCategory},
};

#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[derive(Debug, FromRow)]
struct EntryRow {
    id: Uuid,
    user_id: Uuid,
    food_label: String,
    portion: String,
    calories: Option<f64>,
    protein_g: Option<f64>,
    fat_g: Option<f64>,
    carbs_g: Option<f64>,
    fiber_g: Option<f64>,
    sugar_g: Option<f64>,
    sodium_mg: Option<f64>,
    notes: Option<String>,
    provenance: Option<String>,
    water_ml: i64,
    exercise_min: i64,
    log_date: Date,
    prediction_confidence: Option<f64>,
    source: String,
    created_at: OffsetDateTime,
}

impl TryFrom<EntryRow> for NutritionEntry {
    type Error = anyhow::Error;

    fn try_from(r: EntryRow) -> anyhow::Result<Self> {
        let portion: PortionCategory = r
            .portion
            .parse()
            .map_err(|e| anyhow::anyhow!("entry {}: {}", r.id, e))?;
        let source = EntrySource::parse(&r.source)
            .with_context(|| format!("entry {}: unknown source {}", r.id, r.source))?;
        Ok(Self {
            id: r.id,
            user_id: r.user_id,
            food_label: r.food_label,
            portion,
            nutrition: NutritionFacts {
                calories: r.calories,
                protein: r.protein_g,
                fat: r.fat_g,
                carbs: r.carbs_g,
                fiber: r.fiber_g,
                sugar: r.sugar_g,
                sodium: r.sodium_mg,
            },
            notes: r.notes,
            provenance: r.provenance.as_deref().and_then(PayloadSource::parse),
            water_ml: r.water_ml,
            exercise_min: r.exercise_min,
            log_date: r.log_date,
            prediction_confidence: r.prediction_confidence,
            source,
            created_at: r.created_at,
        })
    }
}

const ENTRY_COLUMNS: &str = r#"
    id, user_id, food_label, portion, calories, protein_g, fat_g, carbs_g,
    fiber_g, sugar_g, sodium_mg, notes, provenance, water_ml, exercise_min,
    log_date, prediction_confidence, source, created_at
"#;

#[async_trait]
impl NutritionStore for PgStore {
    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, name, password_hash, weight_kg, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .context("find user by email")?;
        Ok(user)
    }

    async fn find_user(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, name, password_hash, weight_kg, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("find user by id")?;
        Ok(user)
    }

    async fn insert_user(&self, user: NewUser) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, name, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING id, email, name, password_hash, weight_kg, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.password_hash)
        .fetch_one(&self.db)
        .await
        .map_err(|e| match e.as_database_error() {
            Some(db) if db.is_unique_violation() => anyhow::Error::new(DuplicateEmail),
            _ => anyhow::Error::new(e).context("insert user"),
        })?;
        Ok(user)
    }

    async fn update_profile(
        &self,
        id: Uuid,
        update: ProfileUpdate,
    ) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
               SET name = COALESCE($2, name),
                   weight_kg = COALESCE($3, weight_kg)
             WHERE id = $1
            RETURNING id, email, name, password_hash, weight_kg, created_at
            "#,
        )
        .bind(id)
        .bind(update.name)
        .bind(update.weight_kg)
        .fetch_optional(&self.db)
        .await
        .context("update profile")?;
        Ok(user)
    }

    async fn daily_entries(&self, user_id: Uuid, date: Date) -> anyhow::Result<Vec<NutritionEntry>> {
        let rows = sqlx::query_as::<_, EntryRow>(&format!(
            r#"
            SELECT {ENTRY_COLUMNS}
              FROM daily_entries
             WHERE user_id = $1 AND log_date = $2
             ORDER BY created_at ASC
            "#
        ))
        .bind(user_id)
        .bind(date)
        .fetch_all(&self.db)
        .await
        .context("list daily entries")?;

        rows.into_iter().map(NutritionEntry::try_from).collect()
    }

    async fn add_daily_entry(
        &self,
        user_id: Uuid,
        entry: NewEntry,
    ) -> anyhow::Result<NutritionEntry> {
        let row = sqlx::query_as::<_, EntryRow>(&format!(
            r#"
            INSERT INTO daily_entries (
                id, user_id, food_label, portion, calories, protein_g, fat_g, carbs_g,
                fiber_g, sugar_g, sodium_mg, notes, provenance, water_ml, exercise_min,
                log_date, prediction_confidence, source
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            RETURNING {ENTRY_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(&entry.food_label)
        .bind(entry.portion.as_str())
        .bind(entry.nutrition.calories)
        .bind(entry.nutrition.protein)
        .bind(entry.nutrition.fat)
        .bind(entry.nutrition.carbs)
        .bind(entry.nutrition.fiber)
        .bind(entry.nutrition.sugar)
        .bind(entry.nutrition.sodium)
        .bind(&entry.notes)
        .bind(entry.provenance.map(PayloadSource::as_str))
        .bind(entry.water_ml)
        .bind(entry.exercise_min)
        .bind(entry.log_date)
        .bind(entry.prediction_confidence)
        .bind(entry.source.as_str())
        .fetch_one(&self.db)
        .await
        .context("insert daily entry")?;

        NutritionEntry::try_from(row)
    }

    async fn database_stats(&self) -> anyhow::Result<DatabaseStats> {
        let (total_users, total_entries): (i64, i64) = sqlx::query_as(
            r#"
            SELECT (SELECT COUNT(*) FROM users),
                   (SELECT COUNT(*) FROM daily_entries)
            "#,
        )
        .fetch_one(&self.db)
        .await
        .context("database stats")?;
        Ok(DatabaseStats {
            total_users,
            total_entries,
        })
    }
}
