//! Cached weather data plus its unit-dependent display.

use chrono::{DateTime, NaiveDate, Utc};

use crate::{
    model::{CurrentWeatherSample, ForecastDay},
    units::{TemperatureDisplay, UnitSystem},
};

#[derive(Debug, Clone, PartialEq)]
pub struct CurrentDisplay {
    pub condition: String,
    pub temperature: TemperatureDisplay,
    pub observed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForecastDisplay {
    pub date: NaiveDate,
    pub minimum: TemperatureDisplay,
    pub maximum: TemperatureDisplay,
    pub headline: String,
}

/// Holds the last fetched sample and forecast. Display values are rebuilt
/// from scratch on every data change and every unit broadcast.
#[derive(Debug, Default)]
pub struct WeatherPanel {
    sample: Option<CurrentWeatherSample>,
    forecast: Vec<ForecastDay>,
    current_display: Option<CurrentDisplay>,
    forecast_display: Vec<ForecastDisplay>,
}

impl WeatherPanel {
    pub fn set_current(&mut self, sample: Option<CurrentWeatherSample>, units: UnitSystem) {
        self.sample = sample;
        self.recompute_current(units);
    }

    pub fn set_forecast(&mut self, days: Vec<ForecastDay>, units: UnitSystem) {
        self.forecast = days;
        self.recompute_forecast(units);
    }

    pub fn recompute(&mut self, units: UnitSystem) {
        self.recompute_current(units);
        self.recompute_forecast(units);
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn sample(&self) -> Option<&CurrentWeatherSample> {
        self.sample.as_ref()
    }

    pub fn current_display(&self) -> Option<&CurrentDisplay> {
        self.current_display.as_ref()
    }

    pub fn forecast_display(&self) -> &[ForecastDisplay] {
        &self.forecast_display
    }

    fn recompute_current(&mut self, units: UnitSystem) {
        self.current_display = self.sample.as_ref().map(|sample| {
            // The provider reports both systems; pick the matching side.
            let reading = match units {
                UnitSystem::Metric => sample.temperature.metric,
                UnitSystem::Imperial => sample.temperature.imperial,
            };
            CurrentDisplay {
                condition: sample.condition.clone(),
                temperature: TemperatureDisplay::of(reading, units),
                observed_at: sample.observed_at,
            }
        });
    }

    fn recompute_forecast(&mut self, units: UnitSystem) {
        self.forecast_display = self
            .forecast
            .iter()
            .map(|day| ForecastDisplay {
                date: day.date,
                minimum: TemperatureDisplay::of(day.minimum, units),
                maximum: TemperatureDisplay::of(day.maximum, units),
                headline: day.headline.clone(),
            })
            .collect();
    }
}
