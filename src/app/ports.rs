//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ RoasterService (domain)
//! ```
//!
//! Driven adapters (sensor bus, actuators, event sinks, storage) implement
//! these traits.  The [`RoasterService`](super::service::RoasterService)
//! consumes them via generics, so the domain core never touches hardware
//! directly and tests can script every input.

use crate::error::ConfigError;

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Raw sample sources.  Only already-captured words cross this boundary;
/// decoding and validation happen in the domain.
pub trait SensorPort {
    /// Clock one 32-bit frame out of the thermocouple digitizer.
    fn read_thermocouple_frame(&mut self) -> u32;

    /// Sample the safety thermistor divider (raw ADC code).
    fn read_safety_adc(&mut self) -> u16;
}

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Write-side port: the domain calls this to command actuators.
pub trait ActuatorPort {
    /// Set blower enable and duty (0–100 %).
    fn set_fan(&mut self, enabled: bool, duty: u8);

    /// Drive the heater at `level` (0–255).  Called every tick while the
    /// heater is enabled; the adapter time-proportions the output.
    fn drive_heater(&mut self, level: u8, now_ms: u64);

    /// De-energize the heater immediately.
    fn heater_off(&mut self);

    /// Kill all actuators: safe shutdown.
    fn all_off(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Maintenance port (offline diagnostics only)
// ───────────────────────────────────────────────────────────────

/// Direct pin access for bench diagnostics.  Only reachable through a
/// [`MaintenanceSession`](super::service::MaintenanceSession), never from
/// the tick path.
pub trait MaintenancePort {
    /// Drive every blower driver input high (or low), bypassing the driver
    /// state.
    fn force_fan_pins(&mut self, high: bool);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go (log, serial line,
/// WebSocket frame).
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Blob storage for the encoded configuration.
///
/// Encoding and validation live in [`crate::config`]; the port only
/// moves bytes.  A missing blob is [`ConfigError::NotFound`].
pub trait ConfigPort {
    fn load(&self) -> Result<Vec<u8>, ConfigError>;

    fn save(&mut self, bytes: &[u8]) -> Result<(), ConfigError>;
}
