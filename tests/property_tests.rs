//! Property-based checks over the decision functions and the controller.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use proptest::prelude::*;

use soilguard::config::IrrigationConfig;
use soilguard::controller::{Command, Controller, SystemState};
use soilguard::history::{ReadingHistory, SensorReading};
use soilguard::hw::{PumpPort, SensorPort};
use soilguard::logic;

// ── Minimal scriptable hardware ──────────────────────────────

#[derive(Debug, Default)]
struct Env {
    moisture: f64,
    healthy: bool,
    rain: bool,
    pump_on: bool,
}

#[derive(Clone)]
struct PropHw(Arc<Mutex<Env>>);

impl PropHw {
    fn new() -> Self {
        Self(Arc::new(Mutex::new(Env {
            moisture: 50.0,
            healthy: true,
            ..Env::default()
        })))
    }
}

impl SensorPort for PropHw {
    fn initialize(&mut self) -> bool {
        true
    }
    fn moisture(&mut self) -> f64 {
        self.0.lock().moisture
    }
    fn temperature(&mut self) -> f64 {
        22.0
    }
    fn humidity(&mut self) -> f64 {
        55.0
    }
    fn rain_detected(&mut self) -> bool {
        self.0.lock().rain
    }
    fn healthy(&mut self) -> bool {
        self.0.lock().healthy
    }
}

impl PumpPort for PropHw {
    fn initialize(&mut self) -> bool {
        true
    }
    fn activate(&mut self) {
        self.0.lock().pump_on = true;
    }
    fn deactivate(&mut self) {
        self.0.lock().pump_on = false;
    }
    fn is_active(&self) -> bool {
        self.0.lock().pump_on
    }
}

fn history_of(moistures: &[f64]) -> ReadingHistory {
    let mut h = ReadingHistory::new();
    for &m in moistures {
        h.push(SensorReading::capture(m));
    }
    h
}

fn arb_command() -> impl Strategy<Value = Command> {
    prop_oneof![
        Just(Command::StartAuto),
        Just(Command::EnableManual),
        Just(Command::DisableManual),
        Just(Command::EmergencyStop),
    ]
}

proptest! {
    /// The filtered value never leaves the range spanned by the samples
    /// it averages over.
    #[test]
    fn filtered_moisture_bounded_by_samples(
        samples in prop::collection::vec(0.0f64..=100.0, 1..=10)
    ) {
        let h = history_of(&samples);
        let filtered = logic::filtered_moisture(&h);

        let window_start = samples.len().saturating_sub(5);
        let window = &samples[window_start..];
        let lo = window.iter().cloned().fold(f64::INFINITY, f64::min);
        let hi = window.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        prop_assert!(filtered >= lo - 1e-9);
        prop_assert!(filtered <= hi + 1e-9);
    }

    /// Raising the low threshold can only make watering more likely,
    /// never less.
    #[test]
    fn start_decision_monotone_in_threshold(
        moisture in 0.0f64..=100.0,
        threshold in 0.0f64..=100.0,
        bump in 0.0f64..=50.0,
        streak in 0u32..=10,
        since_mins in 0u64..=240,
        interval in 0u64..=120,
    ) {
        let since = Duration::from_secs(since_mins * 60);
        let starts_low =
            logic::should_start_watering(moisture, threshold, streak, since, interval);
        let starts_high =
            logic::should_start_watering(moisture, threshold + bump, streak, since, interval);
        prop_assert!(!starts_low || starts_high);
    }

    /// Stop conditions only accumulate: once a cycle would stop, a longer
    /// duration never un-stops it.
    #[test]
    fn stop_decision_monotone_in_duration(
        moisture in 0.0f64..=100.0,
        target in 0.0f64..=100.0,
        secs in 0u64..=600,
        extra in 0u64..=600,
        max_secs in 1u64..=600,
    ) {
        let stops_now = logic::should_stop_watering(
            moisture, target, Duration::from_secs(secs), max_secs, None);
        let stops_later = logic::should_stop_watering(
            moisture, target, Duration::from_secs(secs + extra), max_secs, None);
        prop_assert!(!stops_now || stops_later);
    }

    /// Under arbitrary command and environment sequences the controller
    /// stays inside its six defined states, and the pump is never left
    /// running in Idle or Error.
    #[test]
    fn controller_invariants_under_arbitrary_input(
        script in prop::collection::vec(
            (prop::option::of(arb_command()), -20.0f64..=120.0, any::<bool>(), any::<bool>()),
            1..=50,
        )
    ) {
        let hw = PropHw::new();
        let mut ctrl = Controller::new(
            hw.clone(),
            hw.clone(),
            IrrigationConfig {
                min_watering_interval_minutes: 0,
                wait_minutes: 0,
                ..IrrigationConfig::default()
            },
        );
        let handle = ctrl.handle();

        for (cmd, moisture, healthy, rain) in script {
            {
                let mut env = hw.0.lock();
                env.moisture = moisture;
                env.healthy = healthy;
                env.rain = rain;
            }
            if let Some(cmd) = cmd {
                handle.submit_command(cmd);
            }
            ctrl.update();

            let state = ctrl.state();
            prop_assert!(matches!(
                state,
                SystemState::Idle
                    | SystemState::Monitoring
                    | SystemState::Watering
                    | SystemState::Waiting
                    | SystemState::Error
                    | SystemState::Manual
            ));
            if matches!(state, SystemState::Idle | SystemState::Error) {
                prop_assert!(!hw.0.lock().pump_on, "pump must be off in {:?}", state);
            }
            prop_assert_eq!(handle.current_state(), state);
        }
    }
}
