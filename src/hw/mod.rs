//! Hardware capability traits — the boundary between the decision core
//! and the physical (or simulated) world.
//!
//! ```text
//!   SimulatedHardware / GpioHardware ──▶ SensorPort + PumpPort ──▶ Controller
//! ```
//!
//! The controller consumes these via generics, so a simulator and real
//! GPIO hardware substitute for each other without touching control
//! logic.  Implementations own all I/O; the controller never blocks on
//! them inside a critical section.

pub mod gpio;
pub mod sim;

/// Read-side capability: the controller polls this every tick.
pub trait SensorPort {
    /// Bring the sensor stack up.  Returns `false` on failure.
    fn initialize(&mut self) -> bool;

    /// Soil moisture in percent, nominally `[0, 100]`.
    fn moisture(&mut self) -> f64;

    /// Ambient temperature in °C.
    fn temperature(&mut self) -> f64;

    /// Relative humidity in percent.
    fn humidity(&mut self) -> f64;

    /// True while rain is detected.
    fn rain_detected(&mut self) -> bool;

    /// Overall sensor health; `false` feeds the failure counter.
    fn healthy(&mut self) -> bool;
}

/// Write-side capability: the controller commands the pump through this.
pub trait PumpPort {
    /// Bring the pump driver up.  Returns `false` on failure.
    fn initialize(&mut self) -> bool;

    /// Switch the pump on.  Idempotent.
    fn activate(&mut self);

    /// Switch the pump off.  Idempotent.
    fn deactivate(&mut self);

    /// Whether the pump is currently energised.
    fn is_active(&self) -> bool;
}
