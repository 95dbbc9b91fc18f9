//! Unified error types for the roaster firmware.
//!
//! A single `Error` enum that every subsystem can convert into, keeping the
//! top-level tick loop's error handling uniform.  All variants are `Copy` so
//! they can be passed through the safety supervisor and FSM without
//! allocation.
//!
//! Latched safety faults are *not* errors in this sense: they are a
//! [`FaultCode`] plus a bounded message held by the fault latch, and they
//! drive the FSM into `Error` rather than propagating through `?`.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Maximum length of a latched fault message.
pub const FAULT_MESSAGE_CAP: usize = 128;

/// Bounded, owned fault message.
pub type FaultMessage = heapless::String<FAULT_MESSAGE_CAP>;

/// Copy `text` into a bounded string, stopping at the last whole char
/// that fits.
pub fn bounded<const N: usize>(text: &str) -> heapless::String<N> {
    let mut out = heapless::String::new();
    for c in text.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}

/// Build a [`FaultMessage`], truncating if `text` does not fit.
pub fn fault_message(text: &str) -> FaultMessage {
    bounded(text)
}

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A sensor could not be read or returned unusable data.
    Sensor(SensorError),
    /// Configuration is invalid or could not be loaded.
    Config(ConfigError),
    /// An inbound command could not be decoded.
    Command(CommandError),
    /// A maintenance routine was refused.
    Maintenance(MaintenanceError),
    /// An actuator pin or PWM channel rejected a write.
    Actuator(ActuatorError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Command(e) => write!(f, "command: {e}"),
            Self::Maintenance(e) => write!(f, "maintenance: {e}"),
            Self::Actuator(e) => write!(f, "actuator: {e}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// The thermocouple frame transfer failed on the bus.
    Bus,
    /// The safety ADC could not be sampled.
    AdcRead,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bus => write!(f, "thermocouple bus transfer failed"),
            Self::AdcRead => write!(f, "safety ADC read failed"),
        }
    }
}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// No config found in storage (first boot).
    NotFound,
    /// Stored config failed deserialization.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` names the field and the rule.
    ValidationFailed(&'static str),
    /// Backend I/O failure.
    IoError,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {msg}"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::error::Error for ConfigError {}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Command errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandError {
    /// Payload was not a JSON object with a string `type` field.
    Malformed,
    /// `type` named a command outside the vocabulary.
    Unknown,
    /// A required value field was missing or not a number.
    MissingValue,
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed => write!(f, "malformed command"),
            Self::Unknown => write!(f, "unknown command type"),
            Self::MissingValue => write!(f, "missing command value"),
        }
    }
}

impl From<CommandError> for Error {
    fn from(e: CommandError) -> Self {
        Self::Command(e)
    }
}

// ---------------------------------------------------------------------------
// Actuator errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorError {
    Pin(embedded_hal::digital::ErrorKind),
    Pwm(embedded_hal::pwm::ErrorKind),
}

impl fmt::Display for ActuatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pin(kind) => write!(f, "pin write failed: {kind}"),
            Self::Pwm(kind) => write!(f, "PWM write failed: {kind}"),
        }
    }
}

impl From<ActuatorError> for Error {
    fn from(e: ActuatorError) -> Self {
        Self::Actuator(e)
    }
}

// ---------------------------------------------------------------------------
// Maintenance errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaintenanceError {
    /// Maintenance routines only run with the roaster OFF.
    NotIdle,
}

impl fmt::Display for MaintenanceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotIdle => write!(f, "roaster must be OFF"),
        }
    }
}

impl From<MaintenanceError> for Error {
    fn from(e: MaintenanceError) -> Self {
        Self::Maintenance(e)
    }
}

// ---------------------------------------------------------------------------
// Latched safety fault codes
// ---------------------------------------------------------------------------

/// Codes carried by the fault latch and reported in telemetry.
///
/// Serialized in SCREAMING_SNAKE_CASE, which is the wire contract the
/// operator console matches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FaultCode {
    /// Filtered chamber temperature reached the hard maximum.
    OverTempChamber,
    /// Heater thermistor exceeded the optional cutoff.
    OverTempHeater,
    /// Heater energized without adequate airflow.
    FanInterlock,
    /// Persistent critical thermocouple fault while heating.
    ThermocoupleFault,
    /// Preheat ran past its ceiling without the operator loading beans.
    PreheatTimeout,
}

impl FaultCode {
    /// Wire name of the code.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OverTempChamber => "OVER_TEMP_CHAMBER",
            Self::OverTempHeater => "OVER_TEMP_HEATER",
            Self::FanInterlock => "FAN_INTERLOCK",
            Self::ThermocoupleFault => "THERMOCOUPLE_FAULT",
            Self::PreheatTimeout => "PREHEAT_TIMEOUT",
        }
    }
}

impl fmt::Display for FaultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
