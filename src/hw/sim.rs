//! Physics-based hardware simulator.
//!
//! Models a capacitive soil-moisture probe and a 12 V pump well enough to
//! exercise every controller path without a garden: diurnal temperature
//! and humidity curves, saturation-dependent evaporation, absorption
//! falloff as the soil saturates, first-order sensor lag, and gaussian
//! electronic noise.
//!
//! One [`SimulatedHardware`] handle is cloned wherever a capability is
//! needed — controller sensor, controller pump, status reporting — all
//! views of the same locked core.

use std::sync::Arc;
use std::time::Instant;

use chrono::Timelike;
use log::info;
use parking_lot::Mutex;
use rand::Rng;

use super::{PumpPort, SensorPort};

// Raw probe counts: 200 reads as 0 % moisture, 800 as 100 %.
const MIN_MOISTURE: f64 = 200.0;
const MAX_MOISTURE: f64 = 800.0;

// Water-balance tuning (raw units per second).
const BASE_EVAPORATION: f64 = 2.5;
const PUMP_INPUT_RATE: f64 = 25.0;
const DEFAULT_RAIN_RATE: f64 = 5.0;

// First-order sensor lag time constant (seconds) and noise sigma.
const SENSOR_RESPONSE_SECS: f64 = 2.0;
const NOISE_SIGMA: f64 = 0.5;

/// Sample N(mean, sigma) from twelve uniforms (Irwin-Hall).
fn gaussian(rng: &mut impl Rng, mean: f64, sigma: f64) -> f64 {
    let mut sum = 0.0;
    for _ in 0..12 {
        sum += rng.random::<f64>();
    }
    mean + sigma * (sum - 6.0)
}

struct SimCore {
    /// What the probe reports: lagged, noisy view of the ground truth.
    moisture_level: f64,
    /// Ground-truth soil moisture in raw units.
    actual_moisture_level: f64,
    humidity: f64,
    temperature: f64,
    raining: bool,
    rain_intensity: f64,
    pump_running: bool,
    healthy: bool,
    last_update: Instant,
}

impl SimCore {
    fn new() -> Self {
        Self {
            moisture_level: 500.0,
            actual_moisture_level: 500.0,
            humidity: 50.0,
            temperature: 25.0,
            raining: false,
            rain_intensity: 0.0,
            pump_running: false,
            healthy: true,
            last_update: Instant::now(),
        }
    }

    fn moisture_percent(&self) -> f64 {
        let pct = (self.moisture_level - MIN_MOISTURE) / (MAX_MOISTURE - MIN_MOISTURE) * 100.0;
        pct.clamp(0.0, 100.0)
    }

    fn step(&mut self, hour_of_day: u32) {
        let now = Instant::now();
        let dt = now.duration_since(self.last_update).as_secs_f64();
        self.last_update = now;

        self.temperature = diurnal_temperature(hour_of_day);
        self.humidity = diurnal_humidity(hour_of_day);

        let saturation =
            (self.actual_moisture_level - MIN_MOISTURE) / (MAX_MOISTURE - MIN_MOISTURE);

        // Evaporation peaks mid-afternoon, scales with heat and dryness of air.
        let time_multiplier = if (6..=18).contains(&hour_of_day) {
            0.3 + 0.7 * (((hour_of_day - 6) as f64 / 12.0) * std::f64::consts::PI).sin()
        } else {
            0.15
        };
        let temp_multiplier = 1.07_f64.powf(self.temperature - 20.0).clamp(0.1, 3.0);
        let humidity_multiplier = 1.0 - self.humidity / 100.0;
        let evaporation =
            BASE_EVAPORATION * saturation * time_multiplier * temp_multiplier * humidity_multiplier
                * dt;

        // Water input: absorption falls off as the soil saturates.
        let mut input = 0.0;
        if self.pump_running {
            input += PUMP_INPUT_RATE * (1.0 - saturation.powf(2.0)) * dt;
        }
        if self.raining {
            let rate = if self.rain_intensity > 0.0 {
                self.rain_intensity
            } else {
                DEFAULT_RAIN_RATE
            };
            input += rate * (1.0 - saturation.powf(1.5)) * dt;
        }

        self.actual_moisture_level =
            (self.actual_moisture_level + input - evaporation).clamp(MIN_MOISTURE, MAX_MOISTURE);

        // Probe chases ground truth with first-order lag plus noise.
        let alpha = 1.0 - (-dt / SENSOR_RESPONSE_SECS).exp();
        let mut rng = rand::rng();
        let noise = gaussian(&mut rng, 0.0, NOISE_SIGMA);
        self.moisture_level = (self.moisture_level
            + alpha * (self.actual_moisture_level - self.moisture_level)
            + noise)
            .clamp(MIN_MOISTURE, MAX_MOISTURE);
    }
}

/// Temperature follows a sine through the day, peaking at 15:00.
fn diurnal_temperature(hour_of_day: u32) -> f64 {
    25.0 + 8.0 * (((hour_of_day as f64 - 6.0) / 12.0) * std::f64::consts::PI).sin()
}

/// Humidity runs inverse to temperature, bottoming out at 15:00.
fn diurnal_humidity(hour_of_day: u32) -> f64 {
    let h = 50.0 + 20.0 * (((hour_of_day as f64 - 6.0) / 12.0) * std::f64::consts::PI).cos();
    h.clamp(0.0, 100.0)
}

/// Cloneable handle over the shared simulation core.  Implements both
/// capability traits so a single instance serves as sensor and pump.
#[derive(Clone)]
pub struct SimulatedHardware {
    core: Arc<Mutex<SimCore>>,
}

impl SimulatedHardware {
    pub fn new() -> Self {
        Self {
            core: Arc::new(Mutex::new(SimCore::new())),
        }
    }

    /// Advance the physics by wall-clock time since the last step.
    /// Call once per control-loop iteration.
    pub fn step(&self) {
        let hour = chrono::Local::now().hour();
        self.core.lock().step(hour);
    }

    // ── Scenario hooks (demos and tests) ─────────────────────

    pub fn set_rain(&self, raining: bool, intensity: f64) {
        let mut core = self.core.lock();
        core.raining = raining;
        core.rain_intensity = intensity;
        info!("sim: rain={} intensity={:.1}", raining, intensity);
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.core.lock().healthy = healthy;
    }

    /// Force both ground truth and probe to a moisture percentage.
    pub fn set_moisture_percent(&self, percent: f64) {
        let raw = MIN_MOISTURE + percent.clamp(0.0, 100.0) / 100.0 * (MAX_MOISTURE - MIN_MOISTURE);
        let mut core = self.core.lock();
        core.actual_moisture_level = raw;
        core.moisture_level = raw;
    }
}

impl Default for SimulatedHardware {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorPort for SimulatedHardware {
    fn initialize(&mut self) -> bool {
        self.core.lock().last_update = Instant::now();
        info!("sim: sensor stack initialised");
        true
    }

    fn moisture(&mut self) -> f64 {
        self.core.lock().moisture_percent()
    }

    fn temperature(&mut self) -> f64 {
        self.core.lock().temperature
    }

    fn humidity(&mut self) -> f64 {
        self.core.lock().humidity
    }

    fn rain_detected(&mut self) -> bool {
        self.core.lock().raining
    }

    fn healthy(&mut self) -> bool {
        self.core.lock().healthy
    }
}

impl PumpPort for SimulatedHardware {
    fn initialize(&mut self) -> bool {
        true
    }

    fn activate(&mut self) {
        self.core.lock().pump_running = true;
    }

    fn deactivate(&mut self) {
        self.core.lock().pump_running = false;
    }

    fn is_active(&self) -> bool {
        self.core.lock().pump_running
    }
}
