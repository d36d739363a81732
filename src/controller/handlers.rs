//! Per-state behavior, one method per state.
//!
//! Each handler performs this tick's reads and side effects and returns
//! the state to be in next tick.  Returning the current state means "stay
//! put".  Handlers never sleep and never hold a lock across a port call.

use std::time::Duration;

use log::{debug, info, warn};

use crate::error::FaultKind;
use crate::history::SensorReading;
use crate::hw::{PumpPort, SensorPort};
use crate::logic;

use super::{
    Controller, SystemState, IDLE_STABILIZE_SECS, MANUAL_PUMP_TIMEOUT_SECS, MAX_READ_FAILURES,
    MOISTURE_OVERFLOW_PCT, RECOVERY_INTERVAL_SECS,
};

impl<S: SensorPort, P: PumpPort> Controller<S, P> {
    /// IDLE: settle for [`IDLE_STABILIZE_SECS`] of clean readings before
    /// entering the monitoring loop.  The pump must be off here; a stray
    /// active pump is switched off rather than trusted.
    pub(super) fn idle_state(&mut self) -> SystemState {
        if self.pump.is_active() {
            warn!("IDLE: pump found active, forcing off");
            self.pump.deactivate();
        }

        let moisture = self.sensor.moisture();
        let temperature = self.sensor.temperature();
        let humidity = self.sensor.humidity();
        let healthy = self.sensor.healthy();
        let raining = self.sensor.rain_detected();

        self.history.push(SensorReading::capture(moisture));
        debug!(
            "IDLE: moisture={:.1}% temp={:.1}C rh={:.1}%",
            moisture, temperature, humidity
        );

        if healthy {
            self.consecutive_read_failures = 0;
        } else {
            // Any unhealthy tick restarts the stability window.
            self.stable_since = std::time::Instant::now();
            self.consecutive_read_failures += 1;
            warn!(
                "IDLE: sensor unhealthy ({}/{})",
                self.consecutive_read_failures, MAX_READ_FAILURES
            );
            if self.consecutive_read_failures >= MAX_READ_FAILURES {
                warn!("IDLE: escalating to error: {}", FaultKind::SensorFailure);
                return SystemState::Error;
            }
        }

        if healthy
            && !raining
            && self.consecutive_read_failures == 0
            && self.stable_since.elapsed().as_secs() >= IDLE_STABILIZE_SECS
        {
            info!("IDLE: readings stable, starting monitoring");
            return SystemState::Monitoring;
        }
        SystemState::Idle
    }

    /// MONITORING: track filtered moisture and decide when a watering
    /// cycle is warranted.
    pub(super) fn monitoring_state(&mut self) -> SystemState {
        let moisture = self.sensor.moisture();
        let reading = SensorReading::capture(moisture);
        let valid = reading.is_valid;
        self.history.push(reading);

        if !valid {
            self.consecutive_read_failures += 1;
            warn!(
                "MONITORING: invalid reading {:.1}% ({}/{})",
                moisture, self.consecutive_read_failures, MAX_READ_FAILURES
            );
            if self.consecutive_read_failures >= MAX_READ_FAILURES {
                warn!("MONITORING: escalating to error: {}", FaultKind::SensorFailure);
                return SystemState::Error;
            }
            return SystemState::Monitoring;
        }
        self.consecutive_read_failures = 0;

        let config = self.shared.config.get();
        let filtered = logic::filtered_moisture(&self.history);

        if filtered < config.low_moisture_threshold {
            self.consecutive_low_readings += 1;
        } else {
            self.consecutive_low_readings = 0;
        }

        let since_last = self
            .last_watering
            .map_or(Duration::MAX, |t| t.elapsed());

        if logic::should_start_watering(
            filtered,
            config.low_moisture_threshold,
            self.consecutive_low_readings,
            since_last,
            config.min_watering_interval_minutes,
        ) {
            info!(
                "MONITORING: filtered {:.1}% below {:.1}%, starting watering for '{}'",
                filtered, config.low_moisture_threshold, config.zone_name
            );
            self.watering_start = std::time::Instant::now();
            return SystemState::Watering;
        }
        SystemState::Monitoring
    }

    /// WATERING: run the pump toward the high threshold, stopping on
    /// target, timeout, or stagnation.  Rain pauses the pump but leaves
    /// the cycle open.
    pub(super) fn watering_state(&mut self) -> SystemState {
        if self.sensor.rain_detected() {
            if self.pump.is_active() {
                info!("WATERING: rain detected, pausing pump");
                self.pump.deactivate();
            }
        } else if !self.pump.is_active() {
            self.pump.activate();
        }

        let moisture = self.sensor.moisture();
        self.history.push(SensorReading::capture(moisture));

        let config = self.shared.config.get();
        let filtered = logic::filtered_moisture(&self.history);
        let rate = logic::moisture_change_rate(&self.history);
        let duration = self.watering_start.elapsed();

        if logic::should_stop_watering(
            filtered,
            config.high_moisture_threshold,
            duration,
            config.max_watering_seconds,
            rate,
        ) {
            self.pump.deactivate();
            self.last_watering = Some(std::time::Instant::now());

            if filtered >= config.high_moisture_threshold {
                info!(
                    "WATERING: target reached at {:.1}% after {:.0}s",
                    filtered,
                    duration.as_secs_f64()
                );
                return SystemState::Waiting;
            }
            if duration.as_secs() >= config.max_watering_seconds {
                warn!(
                    "WATERING: {} at {:.1}% after {:.0}s",
                    FaultKind::WateringTimeout,
                    filtered,
                    duration.as_secs_f64()
                );
                return SystemState::Error;
            }
            if let Some(r) = rate {
                if r < logic::STAGNATION_RATE_PCT_PER_MIN {
                    warn!(
                        "WATERING: {}: moisture stagnant at {:.2}%/min",
                        FaultKind::PumpStall,
                        r
                    );
                    return SystemState::Error;
                }
            }
            return SystemState::Waiting;
        }
        SystemState::Watering
    }

    /// WAITING: let the soil absorb before resuming measurement-driven
    /// decisions.
    pub(super) fn waiting_state(&mut self) -> SystemState {
        let config = self.shared.config.get();
        if logic::should_resume_monitoring(self.state_entry.elapsed(), config.wait_minutes) {
            info!("WAITING: soak period over, resuming monitoring");
            self.consecutive_low_readings = 0;
            return SystemState::Monitoring;
        }
        SystemState::Waiting
    }

    /// ERROR: pump stays off; periodically probe whether conditions allow
    /// a return to monitoring.
    pub(super) fn error_state(&mut self) -> SystemState {
        if self.pump.is_active() {
            warn!("ERROR: pump found active, forcing off");
            self.pump.deactivate();
        }

        let moisture = self.sensor.moisture();
        let reading_ok = logic::is_reading_valid(moisture);

        if logic::can_recover_from_error(
            self.consecutive_read_failures,
            self.state_entry.elapsed(),
            RECOVERY_INTERVAL_SECS,
            reading_ok,
        ) {
            info!("ERROR: conditions clear, resuming monitoring");
            self.consecutive_read_failures = 0;
            self.consecutive_low_readings = 0;
            return SystemState::Monitoring;
        }

        debug!(
            "ERROR: holding (failures={}, elapsed={}s, reading_ok={})",
            self.consecutive_read_failures,
            self.state_entry.elapsed().as_secs(),
            reading_ok
        );
        SystemState::Error
    }

    /// MANUAL: the operator owns the pump, the controller only enforces
    /// safety rails.  Exit happens through commands or the extended-idle
    /// fallback in the tick loop, never from here.
    pub(super) fn manual_state(&mut self) -> SystemState {
        let moisture = self.sensor.moisture();
        self.history.push(SensorReading::capture(moisture));

        if !self.sensor.healthy() {
            if self.pump.is_active() {
                warn!("MANUAL: sensor unhealthy, forcing pump off");
                self.pump.deactivate();
            }
            self.pump_active_since = None;
            return SystemState::Manual;
        }

        if self.pump.is_active() {
            let since = *self
                .pump_active_since
                .get_or_insert_with(std::time::Instant::now);

            if since.elapsed().as_secs() >= MANUAL_PUMP_TIMEOUT_SECS {
                warn!(
                    "MANUAL: pump ran for {}s, forcing off",
                    MANUAL_PUMP_TIMEOUT_SECS
                );
                self.pump.deactivate();
                self.pump_active_since = None;
            } else if moisture >= MOISTURE_OVERFLOW_PCT {
                warn!(
                    "MANUAL: moisture {:.1}% at overflow guard, forcing pump off",
                    moisture
                );
                self.pump.deactivate();
                self.pump_active_since = None;
            }
        } else {
            self.pump_active_since = None;
        }
        SystemState::Manual
    }
}
