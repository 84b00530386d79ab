//! Scripted collaborators for driving a search view under paused time.

#![allow(dead_code)]

use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use parking_lot::Mutex;
use skycast_core::{
    ChannelNotifier, CurrentWeatherSample, DualTemperature, Favorites, ForecastDay,
    ForecastPayload, Location, LocationLookup, MemoryStore, Notice, Reading, Recommender,
    SearchSettings, Services, Shared, ViewHandle, ViewState, WeatherSource, spawn_view,
};
use tokio::sync::mpsc;

pub fn tel_aviv() -> Location {
    Location::new("215854", "Tel Aviv")
}

pub fn place(key: &str, name: &str) -> Location {
    Location::new(key, name)
}

#[derive(Debug, Clone)]
struct Scripted<T> {
    delay: Duration,
    outcome: Result<T, String>,
}

#[derive(Debug, Default)]
pub struct FakeLookup {
    autocomplete: Mutex<HashMap<String, Scripted<Vec<Location>>>>,
    by_key: Mutex<HashMap<String, Scripted<Option<Location>>>>,
    pub queries: Mutex<Vec<String>>,
}

impl FakeLookup {
    pub fn candidates(&self, query: &str, delay_ms: u64, found: Vec<Location>) {
        self.autocomplete.lock().insert(
            query.to_string(),
            Scripted { delay: Duration::from_millis(delay_ms), outcome: Ok(found) },
        );
    }

    pub fn failing(&self, query: &str) {
        self.autocomplete.lock().insert(
            query.to_string(),
            Scripted { delay: Duration::ZERO, outcome: Err("status 503".into()) },
        );
    }

    pub fn resolves(&self, key: &str, location: Option<Location>) {
        self.resolves_after(key, 0, location);
    }

    pub fn resolves_after(&self, key: &str, delay_ms: u64, location: Option<Location>) {
        self.by_key.lock().insert(
            key.to_string(),
            Scripted { delay: Duration::from_millis(delay_ms), outcome: Ok(location) },
        );
    }

    pub fn key_fails(&self, key: &str) {
        self.by_key.lock().insert(
            key.to_string(),
            Scripted { delay: Duration::ZERO, outcome: Err("status 500".into()) },
        );
    }

    pub fn issued(&self) -> Vec<String> {
        self.queries.lock().clone()
    }
}

#[async_trait]
impl LocationLookup for FakeLookup {
    async fn autocomplete(&self, query: &str) -> anyhow::Result<Vec<Location>> {
        self.queries.lock().push(query.to_string());
        let script = self.autocomplete.lock().get(query).cloned();
        let Some(script) = script else {
            return Ok(Vec::new());
        };
        tokio::time::sleep(script.delay).await;
        script.outcome.map_err(anyhow::Error::msg)
    }

    async fn by_key(&self, key: &str) -> anyhow::Result<Option<Location>> {
        let script = self.by_key.lock().get(key).cloned();
        let Some(script) = script else {
            return Ok(None);
        };
        tokio::time::sleep(script.delay).await;
        script.outcome.map_err(anyhow::Error::msg)
    }
}

#[derive(Debug, Clone)]
struct WeatherScript {
    delay: Duration,
    celsius: f64,
    current_fails: bool,
    forecast_fails: bool,
}

#[derive(Debug, Default)]
pub struct FakeWeather {
    scripts: Mutex<HashMap<String, WeatherScript>>,
    pub fetched: Mutex<Vec<String>>,
}

impl FakeWeather {
    pub fn reports(&self, key: &str, delay_ms: u64, celsius: f64) {
        self.script(key, delay_ms, celsius, false, false);
    }

    pub fn current_fails(&self, key: &str) {
        self.script(key, 0, 20.0, true, false);
    }

    pub fn forecast_fails(&self, key: &str) {
        self.script(key, 0, 20.0, false, true);
    }

    fn script(
        &self,
        key: &str,
        delay_ms: u64,
        celsius: f64,
        current_fails: bool,
        forecast_fails: bool,
    ) {
        let script = WeatherScript {
            delay: Duration::from_millis(delay_ms),
            celsius,
            current_fails,
            forecast_fails,
        };
        self.scripts.lock().insert(key.to_string(), script);
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().clone()
    }

    fn script_for(&self, key: &str) -> WeatherScript {
        self.scripts.lock().get(key).cloned().unwrap_or(WeatherScript {
            delay: Duration::ZERO,
            celsius: 20.0,
            current_fails: false,
            forecast_fails: false,
        })
    }
}

#[async_trait]
impl WeatherSource for FakeWeather {
    async fn current(&self, key: &str) -> anyhow::Result<Vec<CurrentWeatherSample>> {
        self.fetched.lock().push(key.to_string());
        let script = self.script_for(key);
        tokio::time::sleep(script.delay).await;
        if script.current_fails {
            anyhow::bail!("connection reset");
        }
        Ok(vec![CurrentWeatherSample {
            condition: format!("weather at {key}"),
            temperature: DualTemperature {
                metric: Reading::celsius(script.celsius),
                imperial: Reading::fahrenheit(script.celsius * 9.0 / 5.0 + 32.0),
            },
            observed_at: Utc::now(),
        }])
    }

    async fn forecast(&self, key: &str) -> anyhow::Result<ForecastPayload> {
        let script = self.script_for(key);
        tokio::time::sleep(script.delay).await;
        if script.forecast_fails {
            anyhow::bail!("status 500");
        }
        Ok(ForecastPayload {
            daily_forecasts: Some(vec![ForecastDay {
                date: NaiveDate::from_ymd_opt(2024, 6, 10).expect("valid date"),
                minimum: Reading::celsius(script.celsius - 5.0),
                maximum: Reading::celsius(script.celsius + 5.0),
                headline: format!("forecast for {key}"),
            }]),
        })
    }
}

#[derive(Debug)]
pub struct FixedAdvice;

#[async_trait]
impl Recommender for FixedAdvice {
    async fn generate(&self, prompt: &str) -> anyhow::Result<String> {
        Ok(format!("Dress for: {}", prompt.len()))
    }
}

pub struct Harness {
    pub lookup: Arc<FakeLookup>,
    pub weather: Arc<FakeWeather>,
    pub favorites: Arc<Favorites>,
    pub shared: Shared,
    pub settings: SearchSettings,
    pub recommender: Option<Arc<dyn Recommender>>,
    notifier: ChannelNotifier,
    notices: mpsc::UnboundedReceiver<Notice>,
}

impl Harness {
    /// No seed query, so nothing happens until the test acts.
    pub fn new() -> Self {
        let (notifier, notices) = ChannelNotifier::new();
        Self {
            lookup: Arc::default(),
            weather: Arc::default(),
            favorites: Arc::new(
                Favorites::open(Box::new(MemoryStore::default())).expect("empty store opens"),
            ),
            shared: Shared::default(),
            settings: SearchSettings { seed_query: String::new(), ..SearchSettings::default() },
            recommender: None,
            notifier,
            notices,
        }
    }

    pub fn seeded(seed: &str) -> Self {
        let mut harness = Self::new();
        harness.settings.seed_query = seed.to_string();
        harness
    }

    pub fn start(&self, deep_link: Option<&str>) -> ViewHandle {
        let services = Services {
            lookup: self.lookup.clone(),
            weather: self.weather.clone(),
            favorites: self.favorites.clone(),
            notifier: Arc::new(self.notifier.clone()),
            recommender: self.recommender.clone(),
        };
        let deep_link = deep_link.map(str::to_string);
        spawn_view(services, self.shared.clone(), self.settings.clone(), deep_link)
    }

    pub fn drain_notices(&mut self) -> Vec<Notice> {
        let mut out = Vec::new();
        while let Ok(notice) = self.notices.try_recv() {
            out.push(notice);
        }
        out
    }
}

/// Wait (in paused time) until the view publishes a state matching `pred`.
pub async fn until(view: &ViewHandle, pred: impl FnMut(&ViewState) -> bool) -> ViewState {
    let mut rx = view.state();
    let state = tokio::time::timeout(Duration::from_secs(60), rx.wait_for(pred))
        .await
        .expect("view never reached the expected state")
        .expect("view task ended");
    (*state).clone()
}

pub async fn settle(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}
