//! SoilGuard daemon entry point.
//!
//! Wires hardware (simulated by default, GPIO with `--real`), the
//! controller, and the MQTT transport together, then runs the control
//! loop at 100 ms with a status publication every 5 s.
//!
//! Environment:
//! - `SOILGUARD_CONFIG`: path to a JSON config file (default config if unset)
//! - `MQTT_HOST` / `MQTT_PORT`: broker address (defaults `localhost:1883`)
//! - `RUST_LOG`: log filter (defaults `info`)

use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use log::{info, warn};

use soilguard::config::IrrigationConfig;
use soilguard::controller::Controller;
use soilguard::hw::gpio::GpioHardware;
use soilguard::hw::sim::SimulatedHardware;
use soilguard::hw::{PumpPort, SensorPort};
use soilguard::mqtt::{MqttLink, StatusReport};

const TICK_INTERVAL: Duration = Duration::from_millis(100);
const STATUS_INTERVAL: Duration = Duration::from_secs(5);

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = load_config()?;
    info!(
        "starting zone '{}' (low {:.0}%, high {:.0}%)",
        config.zone_name, config.low_moisture_threshold, config.high_moisture_threshold
    );

    let use_real_hw = std::env::args().any(|a| a == "--real");
    if use_real_hw {
        info!("hardware: raspberry pi gpio");
        let hw = GpioHardware::new();
        run(hw.clone(), hw, config, None)
    } else {
        info!("hardware: simulator");
        let sim = SimulatedHardware::new();
        run(sim.clone(), sim.clone(), config, Some(sim))
    }
}

fn load_config() -> Result<IrrigationConfig> {
    match std::env::var("SOILGUARD_CONFIG") {
        Ok(path) => IrrigationConfig::load_from_file(Path::new(&path))
            .with_context(|| format!("failed to load config from {path}")),
        Err(_) => Ok(IrrigationConfig::default()),
    }
}

fn run<S, P>(
    mut sensor: S,
    mut pump: P,
    config: IrrigationConfig,
    sim: Option<SimulatedHardware>,
) -> Result<()>
where
    S: SensorPort + Clone + Send + 'static,
    P: PumpPort + Send + 'static,
{
    if !sensor.initialize() {
        bail!("sensor initialization failed");
    }
    if !pump.initialize() {
        bail!("pump initialization failed");
    }

    let mut controller = Controller::new(sensor.clone(), pump, config);
    let handle = controller.handle();

    let mqtt_host = std::env::var("MQTT_HOST").unwrap_or_else(|_| "localhost".to_string());
    let mqtt_port = std::env::var("MQTT_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(1883);
    let link = match MqttLink::connect(&mqtt_host, mqtt_port, handle.clone()) {
        Ok(link) => Some(link),
        Err(e) => {
            warn!("mqtt unavailable ({e}), running standalone");
            None
        }
    };

    let mut last_status = Instant::now();
    loop {
        if let Some(sim) = &sim {
            sim.step();
        }
        controller.update();

        if last_status.elapsed() >= STATUS_INTERVAL {
            last_status = Instant::now();
            let state = handle.current_state();
            let report = StatusReport::new(
                state,
                sensor.moisture(),
                sensor.temperature(),
                sensor.humidity(),
                controller.pump_active(),
                sensor.rain_detected(),
            );
            info!(
                "status: {} moisture={:.1}% pump={}",
                state.as_str(),
                report.moisture,
                report.pump_active
            );
            if let Some(link) = &link {
                link.publish_status(&report)?;
            }
        }

        thread::sleep(TICK_INTERVAL);
    }
}
