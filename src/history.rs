//! Bounded, time-ordered record of recent sensor samples.
//!
//! The controller appends one reading per tick; the decision functions in
//! [`logic`](crate::logic) read the record.  Capacity is fixed at 10 —
//! the oldest entry is evicted FIFO on overflow, so the record never
//! allocates after construction.

use std::time::Instant;

use heapless::Deque;

use crate::logic;

/// Maximum number of readings retained.
pub const HISTORY_CAPACITY: usize = 10;

/// A single moisture sample taken by the controller on one tick.
#[derive(Debug, Clone, Copy)]
pub struct SensorReading {
    /// Soil moisture in percent.  May lie outside `[0, 100]` when the
    /// sensor misbehaves; see [`logic::is_reading_valid`].
    pub moisture_percent: f64,
    /// Monotonic instant the sample was taken.
    pub timestamp: Instant,
    /// Result of [`logic::is_reading_valid`] at capture time.
    pub is_valid: bool,
}

impl SensorReading {
    /// Capture a reading now, computing validity from the raw value.
    pub fn capture(moisture_percent: f64) -> Self {
        Self {
            moisture_percent,
            timestamp: Instant::now(),
            is_valid: logic::is_reading_valid(moisture_percent),
        }
    }
}

/// Fixed-capacity FIFO of [`SensorReading`]s, insertion order = time order.
///
/// Owned exclusively by the controller and mutated only on its tick path,
/// so no lock guards it.
#[derive(Debug, Default)]
pub struct ReadingHistory {
    readings: Deque<SensorReading, HISTORY_CAPACITY>,
}

impl ReadingHistory {
    pub fn new() -> Self {
        Self {
            readings: Deque::new(),
        }
    }

    /// Append a reading, evicting the oldest entry when full.
    pub fn push(&mut self, reading: SensorReading) {
        if self.readings.is_full() {
            let _ = self.readings.pop_front();
        }
        // Cannot fail: a slot was just freed if the deque was full.
        let _ = self.readings.push_back(reading);
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// Oldest retained reading.
    pub fn oldest(&self) -> Option<&SensorReading> {
        self.readings.front()
    }

    /// Most recent reading.
    pub fn newest(&self) -> Option<&SensorReading> {
        self.readings.back()
    }

    /// Iterate oldest → newest.
    pub fn iter(&self) -> impl Iterator<Item = &SensorReading> {
        self.readings.iter()
    }
}
