//! Raspberry Pi GPIO hardware.
//!
//! Stub implementation: pump switching is tracked in-process and logged,
//! sensor reads return safe defaults.
// TODO: drive the pump relay and read the capacitive probe ADC via rppal
// once the carrier board pinout is finalised.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::info;

use super::{PumpPort, SensorPort};

/// Cloneable GPIO handle; implements both capability traits.
#[derive(Clone, Default)]
pub struct GpioHardware {
    pump_on: Arc<AtomicBool>,
}

impl GpioHardware {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SensorPort for GpioHardware {
    fn initialize(&mut self) -> bool {
        info!("gpio: initialising sensor pins (stub)");
        true
    }

    fn moisture(&mut self) -> f64 {
        0.0
    }

    fn temperature(&mut self) -> f64 {
        0.0
    }

    fn humidity(&mut self) -> f64 {
        0.0
    }

    fn rain_detected(&mut self) -> bool {
        false
    }

    fn healthy(&mut self) -> bool {
        true
    }
}

impl PumpPort for GpioHardware {
    fn initialize(&mut self) -> bool {
        info!("gpio: initialising pump relay pin (stub)");
        true
    }

    fn activate(&mut self) {
        info!("gpio: pump ON (stub)");
        self.pump_on.store(true, Ordering::Release);
    }

    fn deactivate(&mut self) {
        info!("gpio: pump OFF (stub)");
        self.pump_on.store(false, Ordering::Release);
    }

    fn is_active(&self) -> bool {
        self.pump_on.load(Ordering::Acquire)
    }
}
