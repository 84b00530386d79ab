//! Global metric/imperial flag with change broadcast.
//!
//! The broadcast carries no value. Subscribers call [`UnitBroadcast::current`]
//! when notified, so nothing derived from the flag survives a toggle.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::model::{Reading, TemperatureUnit};

const CHANNEL_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitSystem {
    #[default]
    Metric,
    Imperial,
}

impl UnitSystem {
    pub fn label(self) -> &'static str {
        match self {
            UnitSystem::Metric => "C",
            UnitSystem::Imperial => "F",
        }
    }

    /// Provider unit-type code (17 = Celsius, 18 = Fahrenheit).
    pub fn unit_type(self) -> u8 {
        match self {
            UnitSystem::Metric => 17,
            UnitSystem::Imperial => 18,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            UnitSystem::Metric => UnitSystem::Imperial,
            UnitSystem::Imperial => UnitSystem::Metric,
        }
    }

    fn temperature_unit(self) -> TemperatureUnit {
        match self {
            UnitSystem::Metric => TemperatureUnit::Celsius,
            UnitSystem::Imperial => TemperatureUnit::Fahrenheit,
        }
    }
}

pub fn celsius_to_fahrenheit(celsius: f64) -> f64 {
    celsius * 9.0 / 5.0 + 32.0
}

pub fn fahrenheit_to_celsius(fahrenheit: f64) -> f64 {
    (fahrenheit - 32.0) * 5.0 / 9.0
}

/// A temperature ready to show. Value, label and code always come from one flag read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemperatureDisplay {
    pub value: i32,
    pub label: &'static str,
    pub unit_type: u8,
}

impl TemperatureDisplay {
    pub fn of(reading: Reading, system: UnitSystem) -> Self {
        let value = match (reading.unit, system.temperature_unit()) {
            (from, to) if from == to => reading.value,
            (TemperatureUnit::Celsius, _) => celsius_to_fahrenheit(reading.value),
            (TemperatureUnit::Fahrenheit, _) => fahrenheit_to_celsius(reading.value),
        };
        Self { value: value.round() as i32, label: system.label(), unit_type: system.unit_type() }
    }
}

impl std::fmt::Display for TemperatureDisplay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}°{}", self.value, self.label)
    }
}

/// Payload-free change notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitsChanged;

/// Shared handle to the process-wide unit flag. Cloning shares the flag.
#[derive(Debug, Clone)]
pub struct UnitBroadcast {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    imperial: AtomicBool,
    changed: broadcast::Sender<UnitsChanged>,
}

impl UnitBroadcast {
    pub fn new(initial: UnitSystem) -> Self {
        let (changed, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                imperial: AtomicBool::new(initial == UnitSystem::Imperial),
                changed,
            }),
        }
    }

    pub fn current(&self) -> UnitSystem {
        if self.inner.imperial.load(Ordering::Acquire) {
            UnitSystem::Imperial
        } else {
            UnitSystem::Metric
        }
    }

    /// Flip the flag and notify every subscriber. Returns the new system.
    pub fn toggle(&self) -> UnitSystem {
        let was_imperial = self.inner.imperial.fetch_xor(true, Ordering::AcqRel);
        let now = if was_imperial { UnitSystem::Metric } else { UnitSystem::Imperial };
        tracing::debug!(units = ?now, "unit system toggled");
        // No receivers is fine: nothing is displayed yet.
        let _ = self.inner.changed.send(UnitsChanged);
        now
    }

    pub fn subscribe(&self) -> broadcast::Receiver<UnitsChanged> {
        self.inner.changed.subscribe()
    }
}

impl Default for UnitBroadcast {
    fn default() -> Self {
        Self::new(UnitSystem::default())
    }
}
