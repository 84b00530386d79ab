use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A resolved place. Immutable once fetched; favorites persist it as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub key: String,
    pub name: String,
    /// Untouched provider record, kept so favorites round-trip everything we were given.
    #[serde(default)]
    pub raw: serde_json::Value,
}

impl Location {
    pub fn new(key: impl Into<String>, name: impl Into<String>) -> Self {
        Self { key: key.into(), name: name.into(), raw: serde_json::Value::Null }
    }

    /// A selection only counts when it carries a key.
    pub fn is_valid(&self) -> bool {
        !self.key.is_empty()
    }
}

/// Physical unit a reading was reported in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TemperatureUnit {
    Celsius,
    Fahrenheit,
}

impl TemperatureUnit {
    /// Parse a provider unit label ("C" / "F").
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim() {
            "C" | "c" => Some(Self::Celsius),
            "F" | "f" => Some(Self::Fahrenheit),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub value: f64,
    pub unit: TemperatureUnit,
}

impl Reading {
    pub fn celsius(value: f64) -> Self {
        Self { value, unit: TemperatureUnit::Celsius }
    }

    pub fn fahrenheit(value: f64) -> Self {
        Self { value, unit: TemperatureUnit::Fahrenheit }
    }
}

/// Temperature reported by the provider in both systems.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DualTemperature {
    pub metric: Reading,
    pub imperial: Reading,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentWeatherSample {
    pub condition: String,
    pub temperature: DualTemperature,
    pub observed_at: DateTime<Utc>,
}

impl CurrentWeatherSample {
    /// Question put to the recommender for this sample.
    pub fn clothing_prompt(&self) -> String {
        format!(
            "Based on the temperature of {}°C and the weather condition of \"{}\", \
             what clothes should I wear today?",
            self.temperature.metric.value, self.condition
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastDay {
    pub date: NaiveDate,
    pub minimum: Reading,
    pub maximum: Reading,
    pub headline: String,
}

/// Forecast response as delivered; a missing daily list is a shape problem the joiner reports.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForecastPayload {
    pub daily_forecasts: Option<Vec<ForecastDay>>,
}
