//! Error and fault types for the SoilGuard controller.
//!
//! The decision core itself never returns errors — every control decision
//! is a pure boolean over explicit arguments, and faults surface only as a
//! transition into the Error state plus a diagnostic log line.  The types
//! here cover the two remaining concerns: configuration loading (the one
//! genuinely fallible path) and the fault taxonomy used for those
//! diagnostic lines.

use std::fmt;

// ---------------------------------------------------------------------------
// Fault taxonomy
// ---------------------------------------------------------------------------

/// Why the controller escalated to the Error state.
///
/// Carried only in log output; no fault value crosses the controller
/// boundary and nothing is persisted across restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// Sensor reported unhealthy or out-of-range readings three ticks in a row.
    SensorFailure,
    /// Moisture failed to rise during watering beyond the grace period.
    PumpStall,
    /// Watering exceeded the configured maximum duration.
    WateringTimeout,
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SensorFailure => write!(f, "sensor failure"),
            Self::PumpStall => write!(f, "suspected pump stall"),
            Self::WateringTimeout => write!(f, "watering timeout"),
        }
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from loading or validating an [`IrrigationConfig`](crate::config::IrrigationConfig).
#[derive(Debug)]
pub enum ConfigError {
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// The config file could not be read.
    Io(std::io::Error),
    /// The config file is not valid JSON for an `IrrigationConfig`.
    Parse(serde_json::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::Io(e) => write!(f, "I/O error: {}", e),
            Self::Parse(e) => write!(f, "parse error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Parse(e) => Some(e),
            Self::ValidationFailed(_) => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e)
    }
}
