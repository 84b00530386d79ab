//! Core library for the `skycast` weather lookup tool.
//!
//! This crate defines:
//! - The search view orchestrator (debounced autocomplete, deep-link preload,
//!   weather fetch joining, unit recompute, favorites)
//! - Configuration & credentials handling
//! - Collaborator traits and their AccuWeather / OpenAI implementations
//! - Shared domain models
//!
//! It is used by `skycast-cli`, but can also be driven by any other front end.

pub mod config;
pub mod error;
pub mod favorites;
pub mod joiner;
pub mod loader;
pub mod model;
pub mod notify;
pub mod panel;
pub mod provider;
pub mod query;
pub mod selection;
pub mod units;
pub mod view;

pub use config::{Config, ProviderConfig, SearchSettings};
pub use error::{CounterInvariantViolation, FetchError, LookupError, QueryError};
pub use favorites::{Favorites, FavoritesStore, FileStore, KeyValueStore, MemoryStore};
pub use loader::{LoaderCounter, LoaderGuard};
pub use model::{
    CurrentWeatherSample, DualTemperature, ForecastDay, ForecastPayload, Location, Reading,
    TemperatureUnit,
};
pub use notify::{ChannelNotifier, Notice, Notifier};
pub use provider::{LocationLookup, ProviderId, Recommender, WeatherSource};
pub use units::{TemperatureDisplay, UnitBroadcast, UnitSystem};
pub use view::{Services, Shared, ViewHandle, ViewState, spawn_view};
