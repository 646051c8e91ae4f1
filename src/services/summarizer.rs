//! Narrative summarizer backed by a chat-completion API.

use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use crate::config::Config;
use crate::constants::HTTP_TIMEOUT_SECS;
use crate::error::{AppError, Result};

/// Opaque text transform: prompt in, summary out. The output is persisted
/// as-is and never parsed or validated.
#[allow(async_fn_in_trait)]
pub trait NarrativeSummarizer {
    async fn summarize(&self, prompt: &str) -> Result<String>;
}

const SYSTEM_PROMPT: &str =
    "You are an experienced market analyst who condenses complex market data \
     into short, meaningful insights.";
const MAX_TOKENS: u32 = 800;
const TEMPERATURE: f64 = 0.7;

pub struct OpenAiSummarizer {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiSummarizer {
    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = config
            .openai_api_key
            .clone()
            .ok_or_else(|| AppError::Config("OPENAI_API_KEY is not set".into()))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: config.openai_base_url.clone(),
            api_key,
            model: config.openai_model.clone(),
        })
    }
}

impl NarrativeSummarizer for OpenAiSummarizer {
    async fn summarize(&self, prompt: &str) -> Result<String> {
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": prompt }
            ],
            "max_tokens": MAX_TOKENS,
            "temperature": TEMPERATURE,
        });

        debug!("requesting completion from model {}", self.model);
        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::Network(format!(
                "completion request returned {}",
                response.status()
            )));
        }

        let payload: Value = response.json().await?;
        extract_completion(&payload)
    }
}

fn extract_completion(payload: &Value) -> Result<String> {
    payload["choices"][0]["message"]["content"]
        .as_str()
        .map(|content| content.trim().to_string())
        .ok_or_else(|| AppError::Network("malformed completion payload".into()))
}
