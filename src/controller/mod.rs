//! Finite-state irrigation controller.
//!
//! ```text
//!  IDLE ──[stable 30s]──▶ MONITORING ──[dry streak]──▶ WATERING
//!    ▲                        ▲    ▲                      │
//!    │                 [soak done] └──[recovered]   [target/fault]
//!    │                        │           │               ▼
//!    │                     WAITING      ERROR ◀───────────┘
//!    │                                    ▲
//!  (start)      any state ──[EMERGENCY_STOP]──┘
//!
//!  MANUAL is entered/left by command only (plus an extended-idle fallback).
//! ```
//!
//! A single driver thread calls [`Controller::update`] on a fixed cadence
//! (≈100 ms).  Each tick drains the command inbox, applies at most one
//! pending transition, runs the current state's handler, and republishes
//! the state for lock-free cross-thread reads.  Other threads interact
//! only through the [`ControllerHandle`] surfaces; every critical section
//! is a short copy or queue operation with no I/O and no port calls.

mod handlers;

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Instant;

use log::{info, warn};
use parking_lot::Mutex;

use crate::config::{ConfigStore, IrrigationConfig};
use crate::history::ReadingHistory;
use crate::hw::{PumpPort, SensorPort};

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Enumeration of all controller states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SystemState {
    Idle = 0,
    Monitoring = 1,
    Watering = 2,
    Waiting = 3,
    Error = 4,
    Manual = 5,
}

impl SystemState {
    /// Convert a `u8` index back to `SystemState`.  Panics on
    /// out-of-range in debug builds; returns `Error` in release
    /// (safe fallback).
    pub fn from_index(idx: u8) -> Self {
        match idx {
            0 => Self::Idle,
            1 => Self::Monitoring,
            2 => Self::Watering,
            3 => Self::Waiting,
            4 => Self::Error,
            5 => Self::Manual,
            _ => {
                debug_assert!(false, "invalid state index: {idx}");
                Self::Error
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::Monitoring => "MONITORING",
            Self::Watering => "WATERING",
            Self::Waiting => "WAITING",
            Self::Error => "ERROR",
            Self::Manual => "MANUAL",
        }
    }
}

// ---------------------------------------------------------------------------
// Commands and their per-tick translation
// ---------------------------------------------------------------------------

/// Externally submitted commands, queued FIFO until the next tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    StartAuto,
    EnableManual,
    DisableManual,
    EmergencyStop,
}

impl Command {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::StartAuto => "START_AUTO",
            Self::EnableManual => "ENABLE_MANUAL",
            Self::DisableManual => "DISABLE_MANUAL",
            Self::EmergencyStop => "EMERGENCY_STOP",
        }
    }
}

/// Intermediate translation of the most recently drained command.
///
/// Only the last translation in a drained batch survives the tick;
/// earlier commands are logged but otherwise lost.  Intentional,
/// load-bearing behavior — do not coalesce into a queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PendingAction {
    #[default]
    None,
    EnterAuto,
    EnterManual,
    ExitManual,
    EmergencyStop,
}

// ---------------------------------------------------------------------------
// Thread-safe surfaces
// ---------------------------------------------------------------------------

/// FIFO command queue accepting submissions from any thread.
#[derive(Debug, Default)]
struct CommandInbox {
    queue: Mutex<VecDeque<Command>>,
}

impl CommandInbox {
    fn push(&self, cmd: Command) {
        self.queue.lock().push_back(cmd);
    }

    /// Take the whole queue in one short critical section.
    fn drain(&self) -> VecDeque<Command> {
        std::mem::take(&mut *self.queue.lock())
    }
}

/// State shared between the controller and its handles.
struct Shared {
    inbox: CommandInbox,
    config: ConfigStore,
    /// Last published state, written once per tick by the control thread
    /// only; read lock-free from any thread.
    published: AtomicU8,
}

/// Cloneable cross-thread access to a running [`Controller`].
///
/// This is the only way other threads (transport callbacks, status
/// reporting) touch the controller; none of its methods block the
/// control thread beyond a short lock hold.
#[derive(Clone)]
pub struct ControllerHandle {
    shared: Arc<Shared>,
}

impl ControllerHandle {
    /// Enqueue a command for the next tick.
    pub fn submit_command(&self, cmd: Command) {
        self.shared.inbox.push(cmd);
    }

    /// Lock-free read of the last published state.
    pub fn current_state(&self) -> SystemState {
        SystemState::from_index(self.shared.published.load(Ordering::Acquire))
    }

    /// Snapshot copy of the active config.
    pub fn config(&self) -> IrrigationConfig {
        self.shared.config.get()
    }

    /// Atomically replace the active config.
    pub fn update_config(&self, config: IrrigationConfig) {
        info!("config replaced for zone '{}'", config.zone_name);
        self.shared.config.replace(config);
    }
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

/// Per-state timing and safety constants.
const MAX_READ_FAILURES: u32 = 3;
const IDLE_STABILIZE_SECS: u64 = 30;
const RECOVERY_INTERVAL_SECS: u64 = 300;
const MANUAL_PUMP_TIMEOUT_SECS: u64 = 3600;
const MANUAL_IDLE_EXIT_SECS: u64 = 7200;
const MOISTURE_OVERFLOW_PCT: f64 = 95.0;

/// The irrigation state machine.  Owns the sensor/pump capabilities, the
/// reading history, and all per-state counters; driven by exactly one
/// thread via [`update`](Self::update).
pub struct Controller<S: SensorPort, P: PumpPort> {
    sensor: S,
    pump: P,
    shared: Arc<Shared>,

    current_state: SystemState,
    pending: PendingAction,
    history: ReadingHistory,

    consecutive_read_failures: u32,
    consecutive_low_readings: u32,

    state_entry: Instant,
    /// Start of the current run of healthy idle readings.
    stable_since: Instant,
    watering_start: Instant,
    last_watering: Option<Instant>,
    pump_active_since: Option<Instant>,
}

impl<S: SensorPort, P: PumpPort> Controller<S, P> {
    /// Construct a controller starting in [`SystemState::Idle`] with an
    /// empty history and zeroed counters.
    pub fn new(sensor: S, pump: P, config: IrrigationConfig) -> Self {
        let now = Instant::now();
        Self {
            sensor,
            pump,
            shared: Arc::new(Shared {
                inbox: CommandInbox::default(),
                config: ConfigStore::new(config),
                published: AtomicU8::new(SystemState::Idle as u8),
            }),
            current_state: SystemState::Idle,
            pending: PendingAction::None,
            history: ReadingHistory::new(),
            consecutive_read_failures: 0,
            consecutive_low_readings: 0,
            state_entry: now,
            stable_since: now,
            watering_start: now,
            last_watering: None,
            pump_active_since: None,
        }
    }

    /// A cloneable handle for cross-thread command/config/state access.
    pub fn handle(&self) -> ControllerHandle {
        ControllerHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Current state as seen by the control thread.
    pub fn state(&self) -> SystemState {
        self.current_state
    }

    /// Whether the pump is currently energised.
    pub fn pump_active(&self) -> bool {
        self.pump.is_active()
    }

    /// Advance the controller by one tick.
    ///
    /// Not re-entrant: exactly one thread may call this.
    pub fn update(&mut self) {
        // 1. Drain queued commands FIFO; last translation wins.
        for cmd in self.shared.inbox.drain() {
            info!("command received: {}", cmd.as_str());
            self.pending = match cmd {
                Command::StartAuto => PendingAction::EnterAuto,
                Command::EnableManual => PendingAction::EnterManual,
                Command::DisableManual => PendingAction::ExitManual,
                Command::EmergencyStop => PendingAction::EmergencyStop,
            };
        }

        // 2. Apply the surviving pending transition, bypassing whatever
        //    the state handler would have decided this tick.
        if self.pending != PendingAction::None {
            let target = match self.pending {
                PendingAction::EnterAuto | PendingAction::ExitManual => SystemState::Monitoring,
                PendingAction::EnterManual => SystemState::Manual,
                PendingAction::EmergencyStop => SystemState::Error,
                PendingAction::None => unreachable!(),
            };
            self.transition_to(target);
            self.pending = PendingAction::None;
        }

        // 3. Manual runs for side effects only; its return value is
        //    ignored — exit happens via DISABLE_MANUAL above or the
        //    extended-idle fallback below.
        if self.current_state == SystemState::Manual {
            let _ = self.manual_state();
            if !self.pump.is_active()
                && self.state_entry.elapsed().as_secs() >= MANUAL_IDLE_EXIT_SECS
            {
                info!("MANUAL: no activity for {}s, falling back to monitoring", MANUAL_IDLE_EXIT_SECS);
                self.transition_to(SystemState::Monitoring);
            }
            self.publish();
            return;
        }

        // 4. Dispatch the current state's handler.
        let next = match self.current_state {
            SystemState::Idle => self.idle_state(),
            SystemState::Monitoring => self.monitoring_state(),
            SystemState::Watering => self.watering_state(),
            SystemState::Waiting => self.waiting_state(),
            SystemState::Error => self.error_state(),
            // Unreachable via this path; handled in step 3.
            SystemState::Manual => SystemState::Manual,
        };
        if next != self.current_state {
            self.transition_to(next);
        }
        self.publish();
    }

    // ── Internal ──────────────────────────────────────────────

    fn transition_to(&mut self, next: SystemState) {
        if next == self.current_state {
            return;
        }
        info!(
            "state transition: {} -> {} after {:.1}s",
            self.current_state.as_str(),
            next.as_str(),
            self.state_entry.elapsed().as_secs_f64()
        );
        // Pump must never survive into Error, whatever path led here.
        if next == SystemState::Error && self.pump.is_active() {
            warn!("forcing pump off on error entry");
            self.pump.deactivate();
        }
        // Operator pump control ends with manual mode.
        if self.current_state == SystemState::Manual && self.pump.is_active() {
            warn!("forcing pump off on manual exit");
            self.pump.deactivate();
            self.pump_active_since = None;
        }
        self.current_state = next;
        self.state_entry = Instant::now();
    }

    fn publish(&self) {
        self.shared
            .published
            .store(self.current_state as u8, Ordering::Release);
    }

    // ── Test support ──────────────────────────────────────────

    /// Backdate the current state's entry time and stability anchor
    /// (tests only).
    #[cfg(test)]
    fn rewind_state_entry(&mut self, by: std::time::Duration) {
        self.state_entry = self.state_entry.checked_sub(by).unwrap_or(self.state_entry);
        self.stable_since = self
            .stable_since
            .checked_sub(by)
            .unwrap_or(self.stable_since);
    }

    #[cfg(test)]
    fn rewind_watering_start(&mut self, by: std::time::Duration) {
        self.watering_start = self
            .watering_start
            .checked_sub(by)
            .unwrap_or(self.watering_start);
    }
}
