use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;

use crate::model::{
    CurrentWeatherSample, DualTemperature, ForecastDay, ForecastPayload, Location, Reading,
    TemperatureUnit,
};

use super::{LocationLookup, WeatherSource, truncate_body};

pub const DEFAULT_BASE_URL: &str = "https://dataservice.accuweather.com";

/// AccuWeather location, current-conditions and daily-forecast endpoints.
#[derive(Debug, Clone)]
pub struct AccuWeatherClient {
    api_key: String,
    base_url: String,
    http: Client,
}

impl AccuWeatherClient {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(api_key: String, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Self { api_key, base_url, http: Client::new() }
    }

    /// Path segments are appended one by one, so a location key can never
    /// reach another endpoint or smuggle in query parameters.
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .with_context(|| format!("Invalid AccuWeather base URL: {}", self.base_url))?;
        url.path_segments_mut()
            .map_err(|()| anyhow!("AccuWeather base URL cannot take a path: {}", self.base_url))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get(
        &self,
        segments: &[&str],
        extra: &[(&str, &str)],
        what: &str,
    ) -> Result<(StatusCode, String)> {
        let url = self.url(segments)?;

        let res = self
            .http
            .get(url)
            .query(&[("apikey", self.api_key.as_str())])
            .query(extra)
            .send()
            .await
            .with_context(|| format!("Failed to send request to AccuWeather ({what})"))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .with_context(|| format!("Failed to read AccuWeather {what} response body"))?;

        Ok((status, body))
    }

    async fn get_ok(
        &self,
        segments: &[&str],
        extra: &[(&str, &str)],
        what: &str,
    ) -> Result<String> {
        let (status, body) = self.get(segments, extra, what).await?;
        if !status.is_success() {
            return Err(anyhow!(
                "AccuWeather {} request failed with status {}: {}",
                what,
                status,
                truncate_body(&body),
            ));
        }
        Ok(body)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AwLocationHead {
    key: String,
    localized_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AwValue {
    value: f64,
    #[serde(default)]
    unit: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AwDualTemperature {
    metric: AwValue,
    imperial: AwValue,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AwCurrent {
    weather_text: String,
    epoch_time: Option<i64>,
    temperature: AwDualTemperature,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AwRange {
    minimum: AwValue,
    maximum: AwValue,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AwHalfDay {
    icon_phrase: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AwDailyForecast {
    date: DateTime<FixedOffset>,
    temperature: AwRange,
    day: Option<AwHalfDay>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AwForecastResponse {
    #[serde(default)]
    daily_forecasts: Option<Vec<AwDailyForecast>>,
}

fn location_from_value(value: serde_json::Value) -> Result<Location> {
    let head: AwLocationHead = serde_json::from_value(value.clone())
        .context("AccuWeather location record lacks Key/LocalizedName")?;
    Ok(Location { key: head.key, name: head.localized_name, raw: value })
}

fn reading(value: &AwValue, fallback: TemperatureUnit) -> Reading {
    let unit = TemperatureUnit::from_label(&value.unit).unwrap_or(fallback);
    Reading { value: value.value, unit }
}

impl From<AwCurrent> for CurrentWeatherSample {
    fn from(raw: AwCurrent) -> Self {
        let observed_at = raw
            .epoch_time
            .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0))
            .unwrap_or_else(Utc::now);

        CurrentWeatherSample {
            condition: raw.weather_text,
            temperature: DualTemperature {
                metric: reading(&raw.temperature.metric, TemperatureUnit::Celsius),
                imperial: reading(&raw.temperature.imperial, TemperatureUnit::Fahrenheit),
            },
            observed_at,
        }
    }
}

impl From<AwDailyForecast> for ForecastDay {
    fn from(raw: AwDailyForecast) -> Self {
        // We always ask for metric=true, so an unlabelled reading is Celsius.
        ForecastDay {
            date: raw.date.date_naive(),
            minimum: reading(&raw.temperature.minimum, TemperatureUnit::Celsius),
            maximum: reading(&raw.temperature.maximum, TemperatureUnit::Celsius),
            headline: raw.day.map(|d| d.icon_phrase).unwrap_or_default(),
        }
    }
}

#[async_trait]
impl LocationLookup for AccuWeatherClient {
    async fn autocomplete(&self, query: &str) -> Result<Vec<Location>> {
        let body = self
            .get_ok(&["locations", "v1", "cities", "autocomplete"], &[("q", query)], "autocomplete")
            .await?;

        let parsed: Vec<serde_json::Value> =
            serde_json::from_str(&body).context("Failed to parse AccuWeather autocomplete JSON")?;

        let found = parsed
            .into_iter()
            .filter_map(|entry| match location_from_value(entry) {
                Ok(location) => Some(location),
                Err(e) => {
                    let error = format!("{e:#}");
                    tracing::warn!(%query, %error, "skipping malformed location record");
                    None
                }
            })
            .collect();

        Ok(found)
    }

    async fn by_key(&self, key: &str) -> Result<Option<Location>> {
        let (status, body) = self.get(&["locations", "v1", key], &[], "location").await?;

        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(anyhow!(
                "AccuWeather location request failed with status {}: {}",
                status,
                truncate_body(&body),
            ));
        }

        let value: serde_json::Value = match body.trim() {
            "" => return Ok(None),
            text => {
                serde_json::from_str(text).context("Failed to parse AccuWeather location JSON")?
            }
        };
        if value.is_null() {
            return Ok(None);
        }

        location_from_value(value).map(Some)
    }
}

#[async_trait]
impl WeatherSource for AccuWeatherClient {
    async fn current(&self, key: &str) -> Result<Vec<CurrentWeatherSample>> {
        let body = self
            .get_ok(&["currentconditions", "v1", key], &[], "current conditions")
            .await?;

        let parsed: serde_json::Value =
            serde_json::from_str(&body).context("Failed to parse AccuWeather current JSON")?;

        // Shape problems are reported as an empty list; the joiner decides what that means.
        let serde_json::Value::Array(entries) = parsed else {
            tracing::warn!(%key, "current conditions payload is not a list");
            return Ok(Vec::new());
        };

        let samples = entries
            .into_iter()
            .filter_map(|entry| match serde_json::from_value::<AwCurrent>(entry) {
                Ok(raw) => Some(CurrentWeatherSample::from(raw)),
                Err(e) => {
                    tracing::warn!(%key, error = %e, "skipping malformed current conditions entry");
                    None
                }
            })
            .collect();

        Ok(samples)
    }

    async fn forecast(&self, key: &str) -> Result<ForecastPayload> {
        let body = self
            .get_ok(&["forecasts", "v1", "daily", "5day", key], &[("metric", "true")], "forecast")
            .await?;

        let parsed: AwForecastResponse =
            serde_json::from_str(&body).context("Failed to parse AccuWeather forecast JSON")?;

        Ok(ForecastPayload {
            daily_forecasts: parsed
                .daily_forecasts
                .map(|days| days.into_iter().map(ForecastDay::from).collect()),
        })
    }
}
