use crate::{
    Config, CurrentWeatherSample, ForecastPayload, Location,
    provider::{accuweather::AccuWeatherClient, openai::OpenAiClient},
};
use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc};

pub mod accuweather;
pub mod openai;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    AccuWeather,
    OpenAi,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::AccuWeather => "accuweather",
            ProviderId::OpenAi => "openai",
        }
    }

    pub const fn all() -> &'static [ProviderId] {
        &[ProviderId::AccuWeather, ProviderId::OpenAi]
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ProviderId {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::all()
            .iter()
            .copied()
            .find(|id| id.as_str().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "Unknown provider '{value}'. Supported providers: accuweather, openai."
                )
            })
    }
}

/// Place search and key resolution.
#[async_trait]
pub trait LocationLookup: Send + Sync + Debug {
    async fn autocomplete(&self, query: &str) -> anyhow::Result<Vec<Location>>;

    /// `Ok(None)` when the key is unknown to the provider.
    async fn by_key(&self, key: &str) -> anyhow::Result<Option<Location>>;
}

#[async_trait]
pub trait WeatherSource: Send + Sync + Debug {
    /// Zero or one sample; anything else is for the joiner to judge.
    async fn current(&self, key: &str) -> anyhow::Result<Vec<CurrentWeatherSample>>;

    async fn forecast(&self, key: &str) -> anyhow::Result<ForecastPayload>;
}

/// Free-text advice for a weather sample. Best effort only.
#[async_trait]
pub trait Recommender: Send + Sync + Debug {
    async fn generate(&self, prompt: &str) -> anyhow::Result<String>;
}

/// Construct the AccuWeather client from config.
pub fn accuweather_from_config(config: &Config) -> anyhow::Result<Arc<AccuWeatherClient>> {
    let id = ProviderId::AccuWeather;
    let api_key = config.provider_api_key(id).ok_or_else(|| {
        anyhow::anyhow!(
            "No API key configured for provider '{id}'.\n\
                 Hint: run `skycast configure {id}` and enter your API key."
        )
    })?;

    let client = match config.provider_base_url(id) {
        Some(base) => AccuWeatherClient::with_base_url(api_key.to_owned(), base),
        None => AccuWeatherClient::new(api_key.to_owned()),
    };
    Ok(Arc::new(client))
}

/// Recommendations are optional: no key simply means no advice.
pub fn recommender_from_config(config: &Config) -> Option<Arc<dyn Recommender>> {
    let id = ProviderId::OpenAi;
    let api_key = config.provider_api_key(id)?;
    let client = match config.provider_base_url(id) {
        Some(base) => OpenAiClient::with_base_url(api_key.to_owned(), base),
        None => OpenAiClient::new(api_key.to_owned()),
    };
    Some(Arc::new(client))
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}
