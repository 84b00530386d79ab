use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{Recommender, truncate_body};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const MODEL: &str = "gpt-3.5-turbo-instruct";
const MAX_TOKENS: u32 = 150;

/// Text completion client used for clothing advice.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenAiClient {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(api_key: String, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Self { api_key, base_url, http: Client::new() }
    }
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    text: String,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[async_trait]
impl Recommender for OpenAiClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/v1/completions", self.base_url);

        let res = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&CompletionRequest { model: MODEL, prompt, max_tokens: MAX_TOKENS })
            .send()
            .await
            .context("Failed to send request to OpenAI (completions)")?;

        let status = res.status();
        let body = res.text().await.context("Failed to read OpenAI response body")?;

        if !status.is_success() {
            return Err(anyhow!(
                "OpenAI completion request failed with status {}: {}",
                status,
                truncate_body(&body),
            ));
        }

        let parsed: CompletionResponse =
            serde_json::from_str(&body).context("Failed to parse OpenAI completion JSON")?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.text.trim().to_string())
            .ok_or_else(|| anyhow!("OpenAI completion response contained no choices"))
    }
}
