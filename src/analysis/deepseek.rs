use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::{DemoAnalyzer, NutritionAnalyzer};
use crate::{
    config::AnalysisConfig,
    error::AppError,
    nutrition::{NutritionPayload, PayloadSource, PortionCategory},
};

const SERVICE: &str = "nutrition analysis";

const SYSTEM_PROMPT: &str = "You are a nutrition assistant. Reply with one JSON object with the keys \
calories, protein, fat, carbs, fiber, sugar, sodium and notes. Every nutrient value is a string with \
its unit, for example \"250 kcal\", \"12 g\" or \"300 mg\".";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage; 2],
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// Nutrient fields as the model may return them: strings or bare numbers.
#[derive(Debug, Default, Deserialize)]
struct ReplyFields {
    calories: Option<Value>,
    protein: Option<Value>,
    fat: Option<Value>,
    carbs: Option<Value>,
    fiber: Option<Value>,
    sugar: Option<Value>,
    sodium: Option<Value>,
    notes: Option<Value>,
}

/// Client for an OpenAI-compatible chat completion endpoint (DeepSeek by
/// default). Falls back to [`DemoAnalyzer`] estimates on any failure.
#[derive(Clone)]
pub struct DeepSeekAnalyzer {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    fallback: DemoAnalyzer,
}

impl DeepSeekAnalyzer {
    pub fn new(cfg: &AnalysisConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            model: cfg.model.clone(),
            api_key: cfg.api_key.clone().filter(|k| !k.trim().is_empty()),
            fallback: DemoAnalyzer,
        })
    }

    #[instrument(skip(self), fields(model = %self.model))]
    async fn request(&self, food: &str, portion: PortionCategory) -> Result<NutritionPayload, AppError> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::external(SERVICE, "no API key configured"))?;

        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: format!("Estimate the nutrition of a {portion} portion of {food}."),
                },
            ],
            temperature: 0.2,
        };

        let res = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::external(SERVICE, e))?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(AppError::external(SERVICE, format!("status {status}: {text}")));
        }

        let parsed: ChatResponse = res.json().await.map_err(|e| AppError::external(SERVICE, e))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| AppError::external(SERVICE, "empty completion"))?;
        debug!(len = content.len(), "analysis reply received");

        parse_reply(&content).ok_or_else(|| AppError::external(SERVICE, "reply has no nutrition values"))
    }
}

#[async_trait]
impl NutritionAnalyzer for DeepSeekAnalyzer {
    async fn analyze_food_nutrition(&self, food: &str, portion: PortionCategory) -> NutritionPayload {
        match self.request(food, portion).await {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, food, "analysis failed, using estimate");
                self.fallback.estimate(food, portion, PayloadSource::FallbackEstimation)
            }
        }
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    fn with_api_key(&self, key: &str) -> Option<Arc<dyn NutritionAnalyzer>> {
        let mut keyed = self.clone();
        keyed.api_key = Some(key.to_string());
        Some(Arc::new(keyed))
    }
}

/// Structured JSON first, then `label: value` lines.
fn parse_reply(content: &str) -> Option<NutritionPayload> {
    parse_json_reply(content).or_else(|| parse_text_reply(content))
}

fn parse_json_reply(content: &str) -> Option<NutritionPayload> {
    let start = content.find('{')?;
    let end = content.rfind('}')?;
    if end <= start {
        return None;
    }
    let fields: ReplyFields = serde_json::from_str(&content[start..=end]).ok()?;

    let mut p = NutritionPayload::empty(PayloadSource::AnalysisService);
    p.calories = value_text(fields.calories, "kcal");
    p.protein = value_text(fields.protein, "g");
    p.fat = value_text(fields.fat, "g");
    p.carbs = value_text(fields.carbs, "g");
    p.fiber = value_text(fields.fiber, "g");
    p.sugar = value_text(fields.sugar, "g");
    p.sodium = value_text(fields.sodium, "mg");
    p.notes = value_text(fields.notes, "");
    p.calories.as_ref()?;
    Some(p)
}

fn value_text(v: Option<Value>, unit: &str) -> Option<String> {
    match v? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) if unit.is_empty() => Some(n.to_string()),
        Value::Number(n) => Some(format!("{n} {unit}")),
        _ => None,
    }
}

lazy_static! {
    static ref LINE_RE: Regex = Regex::new(
        r"(?im)^[\s*\-•]*(calories|kalori|energy|protein|fat|lemak|carbs|carbohydrates?|karbohidrat|fiber|serat|sugar|gula|sodium|natrium)\**\s*[:=]\s*(.+?)\s*$"
    )
    .unwrap();
}

fn parse_text_reply(content: &str) -> Option<NutritionPayload> {
    let mut p = NutritionPayload::empty(PayloadSource::TextExtraction);
    for cap in LINE_RE.captures_iter(content) {
        let value = cap[2].trim_matches(|c: char| c == '*' || c == ',').trim().to_string();
        let slot = match cap[1].to_lowercase().as_str() {
            "calories" | "kalori" | "energy" => &mut p.calories,
            "protein" => &mut p.protein,
            "fat" | "lemak" => &mut p.fat,
            "fiber" | "serat" => &mut p.fiber,
            "sugar" | "gula" => &mut p.sugar,
            "sodium" | "natrium" => &mut p.sodium,
            _ => &mut p.carbs,
        };
        if slot.is_none() && !value.is_empty() {
            *slot = Some(value);
        }
    }
    p.calories.as_ref()?;
    p.notes = Some("Values extracted from an unstructured reply".into());
    Some(p)
}
