//! MQTT transport adapter.
//!
//! Bridges a broker to the controller surfaces: inbound payloads on the
//! command topic become [`Command`]s, and a compact JSON status document
//! is published on a fixed cadence by the main loop.  The adapter owns a
//! background thread that drives the rumqttc connection and re-subscribes
//! after every reconnect.

use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use log::{debug, info, warn};
use rumqttc::{Client, Event, MqttOptions, Packet, QoS};
use serde::Serialize;

use crate::controller::{Command, ControllerHandle, SystemState};

pub const COMMAND_TOPIC: &str = "irrigation/command";
pub const STATUS_TOPIC: &str = "irrigation/status";

/// Map a raw command payload to a [`Command`].  Unknown payloads are
/// rejected rather than guessed at.
pub fn parse_command(payload: &str) -> Option<Command> {
    match payload.trim() {
        "START" => Some(Command::StartAuto),
        "MANUAL_ON" => Some(Command::EnableManual),
        "MANUAL_OFF" => Some(Command::DisableManual),
        "STOP" => Some(Command::EmergencyStop),
        _ => None,
    }
}

/// Wire form of one status publication.  Keys are single letters and the
/// state and flags go out as integers, keeping the payload small on
/// constrained links and stable for existing consumers.
#[derive(Debug, Serialize)]
pub struct StatusReport {
    /// Controller state index.
    #[serde(rename = "s")]
    pub state: u8,
    /// Soil moisture, percent.
    #[serde(rename = "m")]
    pub moisture: f64,
    /// Ambient temperature, °C.
    #[serde(rename = "t")]
    pub temperature: f64,
    /// Relative humidity, percent.
    #[serde(rename = "h")]
    pub humidity: f64,
    /// Pump energised, `0|1`.
    #[serde(rename = "p")]
    pub pump_active: u8,
    /// Rain detected, `0|1`.
    #[serde(rename = "r")]
    pub raining: u8,
}

impl StatusReport {
    pub fn new(
        state: SystemState,
        moisture: f64,
        temperature: f64,
        humidity: f64,
        pump_active: bool,
        raining: bool,
    ) -> Self {
        Self {
            state: state as u8,
            moisture,
            temperature,
            humidity,
            pump_active: u8::from(pump_active),
            raining: u8::from(raining),
        }
    }
}

/// A live broker connection plus the thread that services it.
pub struct MqttLink {
    client: Client,
}

impl MqttLink {
    /// Connect, subscribe to the command topic, and spawn the connection
    /// driver thread.  Inbound commands are forwarded to `handle`.
    pub fn connect(host: &str, port: u16, handle: ControllerHandle) -> Result<Self> {
        let mut options = MqttOptions::new("soilguard", host, port);
        options.set_keep_alive(Duration::from_secs(15));

        let (client, mut connection) = Client::new(options, 16);
        client
            .subscribe(COMMAND_TOPIC, QoS::AtLeastOnce)
            .context("initial command-topic subscribe failed")?;

        let resub = client.clone();
        thread::Builder::new()
            .name("mqtt".into())
            .spawn(move || {
                for event in connection.iter() {
                    match event {
                        Ok(Event::Incoming(Packet::ConnAck(_))) => {
                            info!("mqtt: connected, subscribing to {COMMAND_TOPIC}");
                            if let Err(e) = resub.subscribe(COMMAND_TOPIC, QoS::AtLeastOnce) {
                                warn!("mqtt: resubscribe failed: {e}");
                            }
                        }
                        Ok(Event::Incoming(Packet::Publish(publish))) => {
                            let payload = String::from_utf8_lossy(&publish.payload);
                            match parse_command(&payload) {
                                Some(cmd) => handle.submit_command(cmd),
                                None => {
                                    warn!("mqtt: ignoring unknown command payload '{payload}'");
                                }
                            }
                        }
                        Ok(event) => debug!("mqtt: {event:?}"),
                        Err(e) => {
                            warn!("mqtt: connection error: {e}, retrying");
                            thread::sleep(Duration::from_secs(1));
                        }
                    }
                }
            })
            .context("failed to spawn mqtt thread")?;

        Ok(Self { client })
    }

    /// Publish a status document.  Non-blocking: a full outbound queue
    /// drops this sample rather than stalling the control loop.
    pub fn publish_status(&self, report: &StatusReport) -> Result<()> {
        let payload = serde_json::to_vec(report).context("status serialization failed")?;
        if let Err(e) = self
            .client
            .try_publish(STATUS_TOPIC, QoS::AtMostOnce, false, payload)
        {
            debug!("mqtt: status publish skipped: {e}");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_commands() {
        assert_eq!(parse_command("START"), Some(Command::StartAuto));
        assert_eq!(parse_command("MANUAL_ON"), Some(Command::EnableManual));
        assert_eq!(parse_command("MANUAL_OFF"), Some(Command::DisableManual));
        assert_eq!(parse_command("STOP"), Some(Command::EmergencyStop));
    }

    #[test]
    fn trims_whitespace_before_matching() {
        assert_eq!(parse_command("  START\n"), Some(Command::StartAuto));
    }

    #[test]
    fn rejects_unknown_payloads() {
        assert_eq!(parse_command(""), None);
        assert_eq!(parse_command("start"), None);
        assert_eq!(parse_command("WATER_NOW"), None);
    }

    #[test]
    fn status_report_publishes_integer_state_and_flags() {
        let report = StatusReport::new(SystemState::Watering, 42.5, 25.0, 50.0, true, false);
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"s\":2"));
        assert!(json.contains("\"m\":42.5"));
        assert!(json.contains("\"p\":1"));
        assert!(json.contains("\"r\":0"));
    }

    #[test]
    fn status_report_state_indices_are_stable() {
        for (state, idx) in [
            (SystemState::Idle, 0),
            (SystemState::Monitoring, 1),
            (SystemState::Watering, 2),
            (SystemState::Waiting, 3),
            (SystemState::Error, 4),
            (SystemState::Manual, 5),
        ] {
            let report = StatusReport::new(state, 0.0, 0.0, 0.0, false, false);
            assert_eq!(report.state, idx);
        }
    }
}
