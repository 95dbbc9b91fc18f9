//! Shared mutable context threaded through every FSM handler.
//!
//! `RoasterContext` is the blackboard state handlers read from and write
//! to: the conditioned temperatures, actuator command outputs, the PID
//! controller, roast-session bookkeeping, and the last latched fault.
//! Only the service turns `commands` into hardware writes.

use crate::config::RoasterConfig;
use crate::control::pid::{GainSchedule, PidController};
use crate::control::time_proportion::{level_to_percent, percent_to_level};
use crate::error::{FaultCode, FaultMessage};
use crate::fsm::StateId;
use crate::safety::LatchedFault;
use crate::sensors::{ChamberSnapshot, TemperatureConditioner};

// ---------------------------------------------------------------------------
// Actuator commands (written by state handlers; consumed by the service)
// ---------------------------------------------------------------------------

/// Requested actuator state.  Applied to the ports after each tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActuatorCommands {
    pub fan_enabled: bool,
    /// Fan duty (0–100 %).
    pub fan_duty: u8,
    pub heater_enabled: bool,
    /// Heater demand on the 0–255 PID scale.
    pub heater_level: u8,
    /// Heater demand as shown to the operator (0–100 %).
    pub heater_power_pct: u8,
}

impl ActuatorCommands {
    /// All actuators off: safe default.
    pub fn all_off() -> Self {
        Self::default()
    }

    pub fn fan_on(&mut self, duty: u8) {
        self.fan_enabled = true;
        self.fan_duty = duty.min(100);
    }

    pub fn fan_off(&mut self) {
        self.fan_enabled = false;
        self.fan_duty = 0;
    }

    /// Enable the heater at zero demand.
    pub fn heater_on(&mut self) {
        self.heater_enabled = true;
        self.heater_level = 0;
        self.heater_power_pct = 0;
    }

    pub fn heater_off(&mut self) {
        self.heater_enabled = false;
        self.heater_level = 0;
        self.heater_power_pct = 0;
    }

    /// Demand from the PID (0–255).
    pub fn set_heater_level(&mut self, level: u8) {
        self.heater_level = level;
        self.heater_power_pct = level_to_percent(level);
    }

    /// Demand from the operator (0–100 %).
    pub fn set_heater_percent(&mut self, percent: u8) {
        let percent = percent.min(100);
        self.heater_power_pct = percent;
        self.heater_level = percent_to_level(percent);
    }
}

// ---------------------------------------------------------------------------
// Roast session
// ---------------------------------------------------------------------------

/// Per-session bookkeeping owned by the state machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoastSession {
    /// Set once on entering PREHEAT; cleared on entering OFF.
    pub start_ms: Option<u64>,
    pub preheat_start_ms: Option<u64>,
    /// First-crack mark, as elapsed session time.
    pub first_crack_ms: Option<u64>,
    pub setpoint_c: f32,
    pub preheat_target_c: f32,
    pub manual_fan_pct: u8,
    pub manual_heater_pct: u8,
    pub fan_only_pct: u8,
}

impl RoastSession {
    pub fn new(config: &RoasterConfig) -> Self {
        Self {
            start_ms: None,
            preheat_start_ms: None,
            first_crack_ms: None,
            setpoint_c: config.default_roast_setpoint_c,
            preheat_target_c: config.default_preheat_c,
            manual_fan_pct: config.fan_manual_default,
            manual_heater_pct: 0,
            fan_only_pct: config.fan_only_default,
        }
    }

    /// Elapsed session time, 0 when no session is running.
    pub fn elapsed_ms(&self, now_ms: u64) -> u64 {
        self.start_ms.map_or(0, |start| now_ms.saturating_sub(start))
    }
}

/// A fatal condition detected by a state handler, to be latched by the
/// safety supervisor.
#[derive(Debug, Clone, PartialEq)]
pub struct FaultRequest {
    pub code: FaultCode,
    pub message: FaultMessage,
}

// ---------------------------------------------------------------------------
// RoasterContext
// ---------------------------------------------------------------------------

/// The shared context passed to every state handler function.
pub struct RoasterContext {
    // -- Timing --
    /// Monotonic milliseconds of the current tick.
    pub now_ms: u64,

    // -- Sensor data --
    /// Latest conditioned temperatures.  Updated before each FSM tick.
    pub chamber: ChamberSnapshot,
    /// Filter and RoR state; entry actions reset it at session boundaries.
    pub conditioner: TemperatureConditioner,

    // -- Control --
    pub pid: PidController,
    pub commands: ActuatorCommands,
    pub session: RoastSession,

    // -- Configuration --
    pub config: RoasterConfig,

    // -- Faults --
    /// Snapshot of the latched fault while in `Error`.
    pub error: Option<LatchedFault>,
    /// Set by a state handler; drained by the service each tick.
    pub fault_request: Option<FaultRequest>,
}

impl RoasterContext {
    /// Create a new context with the given configuration.
    pub fn new(config: RoasterConfig) -> Self {
        Self {
            now_ms: 0,
            chamber: ChamberSnapshot::default(),
            conditioner: TemperatureConditioner::new(&config),
            pid: PidController::new(
                GainSchedule::from_config(&config),
                config.default_roast_setpoint_c,
            ),
            commands: ActuatorCommands::all_off(),
            session: RoastSession::new(&config),
            config,
            error: None,
            fault_request: None,
        }
    }

    /// Setpoint reported to the operator: the preheat target during
    /// PREHEAT, the roast setpoint otherwise.
    pub fn active_setpoint(&self, mode: StateId) -> f32 {
        if mode == StateId::Preheat {
            self.session.preheat_target_c
        } else {
            self.session.setpoint_c
        }
    }

    /// Replace the configuration.  The caller validates first.
    pub fn apply_config(&mut self, config: RoasterConfig) {
        self.conditioner.reconfigure(&config);
        self.pid.set_schedule(GainSchedule::from_config(&config));
        self.config = config;
    }
}
