//! Outbound application events.
//!
//! The [`RoasterService`](super::service::RoasterService) emits these
//! through the [`EventSink`](super::ports::EventSink) port.  Adapters on
//! the other side decide what to do with them: write a log line, or
//! encode the wire messages in [`crate::rpc::messages`].

use serde::Serialize;

use crate::diagnostics::ActuatorReport;
use crate::error::{CommandError, bounded};
use crate::fsm::StateId;
use crate::safety::LatchedFault;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The service has started (carries initial state).
    Started(StateId),

    /// Periodic or on-demand telemetry snapshot.
    Telemetry(TelemetryData),

    /// The FSM changed mode.
    StateChanged { from: StateId, to: StateId },

    /// A safety fault was latched and the FSM forced into `Error`.
    FaultLatched { at_ms: u64, fault: LatchedFault },

    /// The operator cleared the latched fault.
    FaultCleared,

    /// First crack was marked.
    FirstCrack {
        at_ms: u64,
        roast_time_ms: u64,
        chamber_c: Option<f32>,
    },

    /// The command link went from idle to active.
    LinkConnected { at_ms: u64 },

    /// The command link went silent past the disconnect timeout.
    LinkLost,

    /// Answer to a `debugFan` request.
    ActuatorReport(ActuatorReport),

    /// An inbound message was rejected.  Only emitted when
    /// `report_unknown_commands` is set.
    CommandRejected(CommandError),

    /// Operator-facing log line for the console.
    Log {
        at_ms: u64,
        level: LogLevel,
        source: LogSource,
        message: LogMessage,
    },
}

impl AppEvent {
    /// Build a [`AppEvent::Log`], truncating `source` and `message` to
    /// their capacities.
    pub fn log(at_ms: u64, level: LogLevel, source: &str, message: &str) -> Self {
        Self::Log {
            at_ms,
            level,
            source: bounded(source),
            message: bounded(message),
        }
    }
}

/// Maximum length of a console log message.
pub const LOG_MESSAGE_CAP: usize = 96;

/// Maximum length of a console log source tag.
pub const LOG_SOURCE_CAP: usize = 8;

pub type LogMessage = heapless::String<LOG_MESSAGE_CAP>;
pub type LogSource = heapless::String<LOG_SOURCE_CAP>;

/// Severity of a console log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// The `roasterState` payload.  Field names are the console contract.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryData {
    #[serde(skip)]
    pub timestamp_ms: u64,
    pub state: StateId,
    pub state_id: u8,
    pub chamber_temp: Option<f32>,
    pub heater_temp: f32,
    pub setpoint: f32,
    pub fan_speed: u8,
    pub heater_power: u8,
    pub heater_enabled: bool,
    pub pid_enabled: bool,
    pub roast_time_ms: u64,
    pub first_crack_marked: bool,
    pub first_crack_time_ms: Option<u64>,
    pub ror: f32,
    pub error: Option<LatchedFault>,
}

/// Round to one decimal place for display.
pub fn round1(value: f32) -> f32 {
    (value * 10.0).round() / 10.0
}
