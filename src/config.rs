use std::{path::PathBuf, str::FromStr};

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

/// Where the analysis API key comes from.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    /// `DEEPSEEK_API_KEY` from the environment.
    Env,
    /// Supplied by the user per request (`X-Analysis-Key`).
    Manual,
    /// No key; built-in estimates only.
    Demo,
}

impl FromStr for AnalysisMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "env" | "environment" => Ok(Self::Env),
            "manual" => Ok(Self::Manual),
            "demo" | "free" => Ok(Self::Demo),
            other => anyhow::bail!("unknown ANALYSIS_MODE '{other}' (expected env, manual or demo)"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    pub mode: AnalysisMode,
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierConfig {
    pub endpoint: Option<String>,
    pub model_path: PathBuf,
    pub class_names_path: PathBuf,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub host: String,
    pub port: u16,
    pub jwt: JwtConfig,
    pub analysis: AnalysisConfig,
    pub classifier: ClassifierConfig,
    pub seed_demo_user: bool,
}

pub const DEFAULT_PORT: u16 = 8501;
pub const DEFAULT_MODEL_FILE: &str = "best_food_effnet.keras";

fn var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parsed<T: FromStr>(name: &str, default: T) -> T {
    var(name).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn flag(name: &str) -> bool {
    var(name)
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")
                .map_err(|_| anyhow::anyhow!("JWT_SECRET must be set"))?,
            issuer: var("JWT_ISSUER").unwrap_or_else(|| "nutriassist".into()),
            audience: var("JWT_AUDIENCE").unwrap_or_else(|| "nutriassist-users".into()),
            ttl_minutes: parsed("JWT_TTL_MINUTES", 60),
            refresh_ttl_minutes: parsed("JWT_REFRESH_TTL_MINUTES", 60 * 24 * 14),
        };

        let mode = match var("ANALYSIS_MODE") {
            Some(v) => v.parse()?,
            None => AnalysisMode::Env,
        };
        let analysis = AnalysisConfig {
            mode,
            api_key: match mode {
                AnalysisMode::Env => var("DEEPSEEK_API_KEY"),
                AnalysisMode::Manual | AnalysisMode::Demo => None,
            },
            base_url: var("DEEPSEEK_BASE_URL").unwrap_or_else(|| "https://api.deepseek.com/v1".into()),
            model: var("DEEPSEEK_MODEL").unwrap_or_else(|| "deepseek-chat".into()),
            timeout_secs: parsed("ANALYSIS_TIMEOUT_SECS", 30),
        };

        let classifier = ClassifierConfig {
            endpoint: var("CLASSIFIER_URL"),
            model_path: var("MODEL_PATH")
                .unwrap_or_else(|| DEFAULT_MODEL_FILE.into())
                .into(),
            class_names_path: var("CLASS_NAMES_PATH")
                .unwrap_or_else(|| "class_names.txt".into())
                .into(),
            timeout_secs: parsed("CLASSIFIER_TIMEOUT_SECS", 20),
        };

        Ok(Self {
            database_url: var("DATABASE_URL"),
            host: var("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parsed("APP_PORT", DEFAULT_PORT),
            jwt,
            analysis,
            classifier,
            seed_demo_user: flag("SEED_DEMO_USER"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analysis_mode_parsing() {
        assert_eq!("ENV".parse::<AnalysisMode>().unwrap(), AnalysisMode::Env);
        assert_eq!("manual".parse::<AnalysisMode>().unwrap(), AnalysisMode::Manual);
        assert_eq!("free".parse::<AnalysisMode>().unwrap(), AnalysisMode::Demo);
        assert!("cloud".parse::<AnalysisMode>().is_err());
    }
}
