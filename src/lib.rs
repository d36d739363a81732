//! SoilGuard — autonomous soil-irrigation controller.
//!
//! A single control thread drives a finite-state machine
//! (Idle → Monitoring → Watering → Waiting, with Error and Manual to the
//! side) over filtered soil-moisture readings.  Hysteresis thresholds, a
//! dry-streak requirement, and a minimum re-watering interval keep the
//! pump from oscillating; a watering timeout and a stagnation heuristic
//! catch hardware faults mid-cycle.
//!
//! Layering, outside in:
//! - [`mqtt`]: broker transport; commands in, status JSON out.
//! - [`controller`]: the state machine and its thread-safe surfaces.
//! - [`logic`]: pure decision functions, unit-testable as truth tables.
//! - [`history`] / [`config`]: the data the decisions run on.
//! - [`hw`]: sensor/pump capability traits with simulated and GPIO
//!   implementations.

pub mod config;
pub mod controller;
pub mod error;
pub mod history;
pub mod hw;
pub mod logic;
pub mod mqtt;

pub use config::IrrigationConfig;
pub use controller::{Command, Controller, ControllerHandle, SystemState};
