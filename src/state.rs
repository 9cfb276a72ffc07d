use std::{sync::Arc, time::Duration};

use tracing::{info, warn};

use crate::{
    analysis::{DeepSeekAnalyzer, DemoAnalyzer, NutritionAnalyzer},
    classifier::{FoodClassifier, HttpClassifier, UnavailableClassifier},
    config::{
        AnalysisConfig, AnalysisMode, AppConfig, ClassifierConfig, JwtConfig, DEFAULT_MODEL_FILE,
        DEFAULT_PORT,
    },
    session::SessionRegistry,
    store::{MemoryStore, NutritionStore, PgStore},
};

/// Shared, read-only after start-up, except for the session registry.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn NutritionStore>,
    pub config: Arc<AppConfig>,
    pub analyzer: Arc<dyn NutritionAnalyzer>,
    pub classifier: Arc<dyn FoodClassifier>,
    pub sessions: Arc<SessionRegistry>,
}

impl AppState {
    /// Builds every collaborator exactly once.
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let store: Arc<dyn NutritionStore> = match &config.database_url {
            Some(url) => {
                let db = sqlx::postgres::PgPoolOptions::new()
                    .max_connections(10)
                    .connect(url)
                    .await?;
                if let Err(e) = sqlx::migrate!("./migrations").run(&db).await {
                    warn!(error = %e, "migration failed; continuing");
                }
                Arc::new(PgStore::new(db))
            }
            None => {
                warn!("DATABASE_URL not set; entries are kept in memory only");
                Arc::new(MemoryStore::new())
            }
        };

        let analyzer = build_analyzer(&config.analysis)?;
        let classifier = build_classifier(&config.classifier)?;

        Ok(Self::from_parts(store, config, analyzer, classifier))
    }

    pub fn from_parts(
        store: Arc<dyn NutritionStore>,
        config: Arc<AppConfig>,
        analyzer: Arc<dyn NutritionAnalyzer>,
        classifier: Arc<dyn FoodClassifier>,
    ) -> Self {
        Self {
            store,
            config,
            analyzer,
            classifier,
            sessions: Arc::new(SessionRegistry::new()),
        }
    }

    pub fn with_analyzer(mut self, analyzer: Arc<dyn NutritionAnalyzer>) -> Self {
        self.analyzer = analyzer;
        self
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn FoodClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_store(mut self, store: Arc<dyn NutritionStore>) -> Self {
        self.store = store;
        self
    }

    /// In-memory state with demo collaborators, for tests.
    pub fn fake() -> Self {
        let config = Arc::new(AppConfig {
            database_url: None,
            host: "127.0.0.1".into(),
            port: DEFAULT_PORT,
            jwt: JwtConfig {
                secret: "test".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 5,
                refresh_ttl_minutes: 60,
            },
            analysis: AnalysisConfig {
                mode: AnalysisMode::Demo,
                api_key: None,
                base_url: "http://127.0.0.1:9".into(),
                model: "test".into(),
                timeout_secs: 1,
            },
            classifier: ClassifierConfig {
                endpoint: None,
                model_path: DEFAULT_MODEL_FILE.into(),
                class_names_path: "class_names.txt".into(),
                timeout_secs: 1,
            },
            seed_demo_user: false,
        });

        Self::from_parts(
            Arc::new(MemoryStore::new()),
            config,
            Arc::new(DemoAnalyzer),
            Arc::new(UnavailableClassifier),
        )
    }
}

fn build_analyzer(cfg: &AnalysisConfig) -> anyhow::Result<Arc<dyn NutritionAnalyzer>> {
    match cfg.mode {
        AnalysisMode::Demo => {
            info!("analysis in demo mode");
            Ok(Arc::new(DemoAnalyzer))
        }
        AnalysisMode::Env if cfg.api_key.is_none() => {
            warn!("DEEPSEEK_API_KEY not found; analysis falls back to estimates");
            Ok(Arc::new(DeepSeekAnalyzer::new(cfg)?))
        }
        AnalysisMode::Env | AnalysisMode::Manual => Ok(Arc::new(DeepSeekAnalyzer::new(cfg)?)),
    }
}

fn build_classifier(cfg: &ClassifierConfig) -> anyhow::Result<Arc<dyn FoodClassifier>> {
    match &cfg.endpoint {
        Some(url) => {
            info!(%url, "using remote food classifier");
            Ok(Arc::new(HttpClassifier::new(
                url,
                Duration::from_secs(cfg.timeout_secs),
            )?))
        }
        None => {
            warn!("CLASSIFIER_URL not set; image recognition disabled");
            Ok(Arc::new(UnavailableClassifier))
        }
    }
}
