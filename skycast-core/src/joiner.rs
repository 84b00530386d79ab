//! Fork/join of the current-conditions and forecast fetches.
//!
//! Both branches always run to completion. A failure in one is folded into a
//! [`Branch::Failed`] and never cancels or short-circuits the other.

use crate::{
    error::{FetchBranch, FetchError},
    loader::{LoaderCounter, LoaderGuard},
    model::{CurrentWeatherSample, ForecastDay},
    provider::WeatherSource,
};

#[derive(Debug)]
pub enum Branch<T> {
    Ready(T),
    Failed(FetchError),
}

impl<T> Branch<T> {
    pub fn is_ready(&self) -> bool {
        matches!(self, Branch::Ready(_))
    }

    pub fn error(&self) -> Option<&FetchError> {
        match self {
            Branch::Ready(_) => None,
            Branch::Failed(err) => Some(err),
        }
    }

    pub fn ready(self) -> Option<T> {
        match self {
            Branch::Ready(value) => Some(value),
            Branch::Failed(_) => None,
        }
    }
}

#[derive(Debug)]
pub struct WeatherReport {
    pub current: Branch<CurrentWeatherSample>,
    pub forecast: Branch<Vec<ForecastDay>>,
}

impl WeatherReport {
    /// One entry per failed branch, current conditions first.
    pub fn failures(&self) -> impl Iterator<Item = &FetchError> {
        self.current.error().into_iter().chain(self.forecast.error())
    }
}

/// Open a loader group and run both fetches.
pub async fn fetch_weather(
    source: &dyn WeatherSource,
    key: &str,
    loader: &LoaderCounter,
) -> WeatherReport {
    join_weather(source, key, loader.begin()).await
}

/// Run both fetches under an already opened loader group. The guard is
/// released only after both branches have settled.
pub async fn join_weather(
    source: &dyn WeatherSource,
    key: &str,
    busy: LoaderGuard,
) -> WeatherReport {
    let (current, forecast) =
        tokio::join!(current_branch(source, key), forecast_branch(source, key));
    drop(busy);

    let report = WeatherReport { current, forecast };
    for failure in report.failures() {
        tracing::warn!(%key, error = %failure, "weather branch failed");
    }
    report
}

async fn current_branch(source: &dyn WeatherSource, key: &str) -> Branch<CurrentWeatherSample> {
    match source.current(key).await {
        Ok(samples) => match samples.into_iter().next() {
            Some(sample) => Branch::Ready(sample),
            None => Branch::Failed(FetchError::Shape {
                branch: FetchBranch::Current,
                missing: "a current conditions entry",
            }),
        },
        Err(cause) => {
            Branch::Failed(FetchError::Transport { branch: FetchBranch::Current, source: cause })
        }
    }
}

async fn forecast_branch(source: &dyn WeatherSource, key: &str) -> Branch<Vec<ForecastDay>> {
    match source.forecast(key).await {
        Ok(payload) => match payload.daily_forecasts {
            Some(days) => Branch::Ready(days),
            None => Branch::Failed(FetchError::Shape {
                branch: FetchBranch::Forecast,
                missing: "the daily forecasts list",
            }),
        },
        Err(cause) => {
            Branch::Failed(FetchError::Transport { branch: FetchBranch::Forecast, source: cause })
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use async_trait::async_trait;
    use chrono::{NaiveDate, Utc};

    use super::*;
    use crate::model::{DualTemperature, ForecastPayload, Reading};

    #[derive(Debug, Default)]
    struct Scripted {
        current_delay: Duration,
        forecast_delay: Duration,
        current_fails: bool,
        current_empty: bool,
        forecast_fails: bool,
        forecast_missing_days: bool,
    }

    #[async_trait]
    impl WeatherSource for Scripted {
        async fn current(&self, _key: &str) -> anyhow::Result<Vec<CurrentWeatherSample>> {
            tokio::time::sleep(self.current_delay).await;
            if self.current_fails {
                anyhow::bail!("connection reset");
            }
            if self.current_empty {
                return Ok(Vec::new());
            }
            Ok(vec![CurrentWeatherSample {
                condition: "Clear".into(),
                temperature: DualTemperature {
                    metric: Reading::celsius(20.0),
                    imperial: Reading::fahrenheit(68.0),
                },
                observed_at: Utc::now(),
            }])
        }

        async fn forecast(&self, _key: &str) -> anyhow::Result<ForecastPayload> {
            tokio::time::sleep(self.forecast_delay).await;
            if self.forecast_fails {
                anyhow::bail!("status 500");
            }
            if self.forecast_missing_days {
                return Ok(ForecastPayload { daily_forecasts: None });
            }
            Ok(ForecastPayload {
                daily_forecasts: Some(vec![ForecastDay {
                    date: NaiveDate::from_ymd_opt(2024, 6, 10).unwrap(),
                    minimum: Reading::celsius(18.0),
                    maximum: Reading::celsius(27.0),
                    headline: "Clear".into(),
                }]),
            })
        }
    }

    #[tokio::test]
    async fn both_branches_ready() {
        let loader = LoaderCounter::new();
        let report = fetch_weather(&Scripted::default(), "1", &loader).await;

        assert!(report.current.is_ready());
        assert!(report.forecast.is_ready());
        assert_eq!(report.failures().count(), 0);
        assert_eq!(loader.count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_branch_does_not_cut_the_other_short() {
        let loader = LoaderCounter::new();
        let source = Arc::new(Scripted {
            current_fails: true,
            forecast_delay: Duration::from_millis(500),
            ..Default::default()
        });

        let task = {
            let (loader, source) = (loader.clone(), source.clone());
            tokio::spawn(async move { fetch_weather(source.as_ref(), "1", &loader).await })
        };

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(loader.is_busy(), "joiner must wait for the slow forecast");

        let report = task.await.unwrap();
        assert!(matches!(report.current.error(), Some(FetchError::Transport { .. })));
        assert_eq!(report.forecast.ready().map(|days| days.len()), Some(1));
        assert_eq!(loader.count(), 0);
    }

    #[tokio::test]
    async fn shape_problems_are_flagged_per_branch() {
        let loader = LoaderCounter::new();
        let source =
            Scripted { current_empty: true, forecast_missing_days: true, ..Default::default() };

        let report = fetch_weather(&source, "1", &loader).await;
        let messages: Vec<_> = report.failures().map(FetchError::user_message).collect();

        assert_eq!(messages, ["Invalid weather data received.", "Invalid forecast data received."]);
        assert_eq!(loader.count(), 0);
    }

    #[tokio::test]
    async fn both_failing_still_balances_loader() {
        let loader = LoaderCounter::new();
        let source = Scripted { current_fails: true, forecast_fails: true, ..Default::default() };

        let report = fetch_weather(&source, "1", &loader).await;
        assert_eq!(report.failures().count(), 2);
        assert!(!loader.is_busy());
    }
}
