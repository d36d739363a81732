//! Irrigation zone configuration.
//!
//! [`IrrigationConfig`] is an immutable value: runtime changes replace the
//! whole struct through [`ConfigStore`], never merge fields.  Presets for
//! common soil types mirror agronomic retention characteristics — clay
//! holds water, sand drains fast.

use std::path::Path;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Tunable thresholds and durations for one irrigation zone.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IrrigationConfig {
    /// Human-readable zone label used in logs and status payloads.
    pub zone_name: String,
    /// Soil type label ("Clay", "Sandy", ...); empty for custom configs.
    pub soil_type: String,
    /// Filtered moisture (%) below which watering becomes eligible.
    pub low_moisture_threshold: f64,
    /// Filtered moisture (%) at which watering stops (hysteresis high side).
    pub high_moisture_threshold: f64,
    /// Hard cap on a single watering cycle (seconds).
    pub max_watering_seconds: u64,
    /// Soak period after watering before monitoring resumes (minutes).
    pub wait_minutes: u64,
    /// Minimum spacing between watering cycles (minutes).
    pub min_watering_interval_minutes: u64,
}

impl Default for IrrigationConfig {
    fn default() -> Self {
        Self {
            zone_name: "Main Zone".to_string(),
            soil_type: String::new(),
            low_moisture_threshold: 30.0,
            high_moisture_threshold: 60.0,
            max_watering_seconds: 60,
            wait_minutes: 1,
            min_watering_interval_minutes: 1,
        }
    }
}

impl IrrigationConfig {
    /// Clay retains water well: higher thresholds, conservative cadence.
    pub fn for_clay(name: &str) -> Self {
        Self {
            zone_name: name.to_string(),
            soil_type: "Clay".to_string(),
            low_moisture_threshold: 40.0,
            high_moisture_threshold: 70.0,
            max_watering_seconds: 45,
            wait_minutes: 20,
            min_watering_interval_minutes: 45,
        }
    }

    /// Sandy soil drains quickly: lower thresholds, shorter cycles.
    pub fn for_sandy(name: &str) -> Self {
        Self {
            zone_name: name.to_string(),
            soil_type: "Sandy".to_string(),
            low_moisture_threshold: 25.0,
            high_moisture_threshold: 55.0,
            max_watering_seconds: 30,
            wait_minutes: 10,
            min_watering_interval_minutes: 20,
        }
    }

    /// Loam is balanced between retention and drainage.
    pub fn for_loam(name: &str) -> Self {
        Self {
            zone_name: name.to_string(),
            soil_type: "Loam".to_string(),
            low_moisture_threshold: 30.0,
            high_moisture_threshold: 60.0,
            max_watering_seconds: 40,
            wait_minutes: 15,
            min_watering_interval_minutes: 30,
        }
    }

    /// Peat holds moisture but dries irreversibly if neglected.
    pub fn for_peat(name: &str) -> Self {
        Self {
            zone_name: name.to_string(),
            soil_type: "Peat".to_string(),
            low_moisture_threshold: 35.0,
            high_moisture_threshold: 65.0,
            max_watering_seconds: 35,
            wait_minutes: 18,
            min_watering_interval_minutes: 40,
        }
    }

    /// Range-validate the config.  Rejects values that would wedge the
    /// state machine (inverted hysteresis, zero-length watering cap)
    /// rather than silently clamping them.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.zone_name.is_empty() {
            return Err(ConfigError::ValidationFailed("zone_name must not be empty"));
        }
        if self.low_moisture_threshold >= self.high_moisture_threshold {
            return Err(ConfigError::ValidationFailed(
                "low_moisture_threshold must be below high_moisture_threshold",
            ));
        }
        if !(0.0..=100.0).contains(&self.low_moisture_threshold)
            || !(0.0..=100.0).contains(&self.high_moisture_threshold)
        {
            return Err(ConfigError::ValidationFailed(
                "moisture thresholds must lie within 0-100%",
            ));
        }
        if self.max_watering_seconds == 0 {
            return Err(ConfigError::ValidationFailed(
                "max_watering_seconds must be positive",
            ));
        }
        Ok(())
    }

    /// Load and validate a config from a JSON file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }
}

/// Thread-safe holder of the active [`IrrigationConfig`].
///
/// Readers take a snapshot clone; writers replace the value wholesale.
/// No partial update is ever visible, and the lock is held only for the
/// copy — no I/O inside the critical section.
#[derive(Debug)]
pub struct ConfigStore {
    inner: Mutex<IrrigationConfig>,
}

impl ConfigStore {
    pub fn new(config: IrrigationConfig) -> Self {
        Self {
            inner: Mutex::new(config),
        }
    }

    /// Snapshot copy of the current config.
    pub fn get(&self) -> IrrigationConfig {
        self.inner.lock().clone()
    }

    /// Atomically replace the whole config.
    pub fn replace(&self, config: IrrigationConfig) {
        *self.inner.lock() = config;
    }
}
