//! System configuration parameters
//!
//! All tunable parameters for the roaster: temperature limits, PID gains,
//! fan duties, timings and sensor constants.  Defaults match the shipped
//! hardware (MAX31855 thermocouple, 100k NTC safety thermistor, L298N
//! blower driver, SSR heater).

use anyhow::Context;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigPort;
use crate::error::ConfigError;

/// One PID gain triple.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PidGains {
    pub kp: f32,
    pub ki: f32,
    pub kd: f32,
}

impl PidGains {
    pub const fn new(kp: f32, ki: f32, kd: f32) -> Self {
        Self { kp, ki, kd }
    }
}

/// Core roaster configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoasterConfig {
    // --- Temperature targets ---
    /// Preheat target when `startPreheat` carries no value (°C)
    pub default_preheat_c: f32,
    /// Roast setpoint when `loadBeans` carries no value (°C)
    pub default_roast_setpoint_c: f32,
    /// Cooling is complete below this filtered chamber temperature (°C)
    pub cooling_target_c: f32,

    // --- Safety ---
    /// Hard chamber limit; reaching it latches a fatal fault (°C)
    pub max_chamber_c: f32,
    /// Chamber warning threshold, log only (°C)
    pub warn_chamber_c: f32,
    /// Optional heater-thermistor cutoff (°C). `None` disables the check.
    pub heater_cutoff_c: Option<f32>,
    /// Minimum fan duty whenever the heater is enabled (%)
    pub min_fan_when_heating: u8,
    /// Longest allowed preheat before a fatal timeout (ms)
    pub preheat_timeout_ms: u64,
    /// Consecutive identical thermocouple faults before the fault is persistent
    pub tc_fault_threshold: u8,
    /// Consecutive good readings that clear the thermocouple debounce
    pub tc_good_threshold: u8,

    // --- PID ---
    /// Gains used when |error| exceeds `pid_threshold_c`
    pub pid_aggressive: PidGains,
    /// Gains used when |error| is at or below `pid_threshold_c`
    pub pid_conservative: PidGains,
    /// Gain-schedule switch point (°C).  No hysteresis band.
    pub pid_threshold_c: f32,
    /// Time-proportioning window for the heater SSR (ms)
    pub heater_window_ms: u32,

    // --- Fan ---
    /// Fan duty during preheat (%)
    pub fan_preheat_duty: u8,
    /// Fan duty on entering roasting (%)
    pub fan_roast_default: u8,
    /// Operator floor for fan duty while roasting (%)
    pub fan_roast_min_duty: u8,
    /// Fan duty during cooling (%)
    pub fan_cooling_duty: u8,
    /// Fan duty on entering manual mode (%)
    pub fan_manual_default: u8,
    /// Fan duty for fan-only mode when no speed is given (%)
    pub fan_only_default: u8,

    // --- Conditioning ---
    /// EMA smoothing coefficient, 0 < alpha <= 1 (lower = smoother)
    pub filter_alpha: f32,
    /// Rate-of-rise sample interval (ms)
    pub ror_interval_ms: u64,
    /// Safety thermistor divider and curve
    pub thermistor: ThermistorParams,

    // --- Comms ---
    /// Telemetry emission interval (ms)
    pub telemetry_interval_ms: u64,
    /// Link silence before a DISCONNECTED event (ms)
    pub disconnect_timeout_ms: u64,
    /// Emit a structured rejection for unknown commands instead of ignoring
    pub report_unknown_commands: bool,
}

/// NTC thermistor in a voltage divider, read by a 10-bit ADC.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThermistorParams {
    /// Divider supply (V)
    pub vcc: f32,
    /// Fixed divider resistor (ohm)
    pub r_fixed: f32,
    /// Thermistor resistance at `t0_k` (ohm)
    pub r0: f32,
    /// Reference temperature (K)
    pub t0_k: f32,
    /// Beta coefficient
    pub beta: f32,
    /// Full-scale ADC code
    pub adc_max: u16,
}

impl Default for ThermistorParams {
    fn default() -> Self {
        Self {
            vcc: 5.0,
            r_fixed: 100_000.0,
            r0: 100_000.0,
            t0_k: 298.15,
            beta: 3950.0,
            adc_max: 1023,
        }
    }
}

impl Default for RoasterConfig {
    fn default() -> Self {
        Self {
            // Targets
            default_preheat_c: 180.0,
            default_roast_setpoint_c: 200.0,
            cooling_target_c: 50.0,

            // Safety
            max_chamber_c: 260.0,
            warn_chamber_c: 250.0,
            heater_cutoff_c: None,
            min_fan_when_heating: 40,
            preheat_timeout_ms: 15 * 60 * 1000,
            tc_fault_threshold: 10,
            tc_good_threshold: 3,

            // PID
            pid_aggressive: PidGains::new(120.0, 30.0, 60.0),
            pid_conservative: PidGains::new(70.0, 15.0, 10.0),
            pid_threshold_c: 10.0,
            heater_window_ms: 2000,

            // Fan
            fan_preheat_duty: 50,
            fan_roast_default: 90,
            fan_roast_min_duty: 30,
            fan_cooling_duty: 100,
            fan_manual_default: 50,
            fan_only_default: 50,

            // Conditioning
            filter_alpha: 0.15,
            ror_interval_ms: 30_000,
            thermistor: ThermistorParams::default(),

            // Comms
            telemetry_interval_ms: 1000,
            disconnect_timeout_ms: 5000,
            report_unknown_commands: false,
        }
    }
}

impl RoasterConfig {
    /// Fan floor while the heater runs under PID.  Never below the
    /// interlock minimum, so an operator request cannot trip the interlock.
    pub fn heating_fan_floor(&self) -> u8 {
        self.fan_roast_min_duty.max(self.min_fan_when_heating)
    }

    /// Reject values that would defeat a safety check.  Never clamps.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.filter_alpha > 0.0 && self.filter_alpha <= 1.0) {
            return Err(ConfigError::ValidationFailed("filter_alpha must be in (0, 1]"));
        }
        if !self.max_chamber_c.is_finite() || self.max_chamber_c <= 0.0 {
            return Err(ConfigError::ValidationFailed("max_chamber_c must be positive"));
        }
        if self.warn_chamber_c >= self.max_chamber_c {
            return Err(ConfigError::ValidationFailed(
                "warn_chamber_c must be below max_chamber_c",
            ));
        }
        if self.default_preheat_c >= self.max_chamber_c
            || self.default_roast_setpoint_c >= self.max_chamber_c
        {
            return Err(ConfigError::ValidationFailed(
                "default targets must be below max_chamber_c",
            ));
        }
        if let Some(cutoff) = self.heater_cutoff_c {
            if !cutoff.is_finite() || cutoff <= 0.0 {
                return Err(ConfigError::ValidationFailed("heater_cutoff_c must be positive"));
            }
        }
        if self.min_fan_when_heating == 0 || self.min_fan_when_heating > 100 {
            return Err(ConfigError::ValidationFailed(
                "min_fan_when_heating must be in 1..=100",
            ));
        }
        if self.fan_preheat_duty < self.min_fan_when_heating
            || self.fan_roast_default < self.min_fan_when_heating
            || self.fan_manual_default < self.min_fan_when_heating
        {
            return Err(ConfigError::ValidationFailed(
                "heating fan duties must meet min_fan_when_heating",
            ));
        }
        let duties = [
            self.fan_preheat_duty,
            self.fan_roast_default,
            self.fan_roast_min_duty,
            self.fan_cooling_duty,
            self.fan_manual_default,
            self.fan_only_default,
        ];
        if duties.iter().any(|d| *d > 100) {
            return Err(ConfigError::ValidationFailed("fan duties must be <= 100"));
        }
        if self.fan_cooling_duty == 0 {
            return Err(ConfigError::ValidationFailed("fan_cooling_duty must be non-zero"));
        }
        if self.preheat_timeout_ms == 0 {
            return Err(ConfigError::ValidationFailed("preheat_timeout_ms must be non-zero"));
        }
        if self.tc_fault_threshold == 0 || self.tc_good_threshold == 0 {
            return Err(ConfigError::ValidationFailed(
                "thermocouple debounce thresholds must be non-zero",
            ));
        }
        for gains in [self.pid_aggressive, self.pid_conservative] {
            if gains.kp < 0.0 || gains.ki < 0.0 || gains.kd < 0.0 {
                return Err(ConfigError::ValidationFailed("PID gains must be non-negative"));
            }
        }
        if self.heater_window_ms == 0 {
            return Err(ConfigError::ValidationFailed("heater_window_ms must be non-zero"));
        }
        if self.ror_interval_ms == 0 || self.telemetry_interval_ms == 0 {
            return Err(ConfigError::ValidationFailed("intervals must be non-zero"));
        }
        Ok(())
    }

    /// Encode for a persisted config blob.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ConfigError> {
        postcard::to_allocvec(self).map_err(|_| ConfigError::Corrupted)
    }

    /// Decode and validate a persisted config blob.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ConfigError> {
        let config: Self = postcard::from_bytes(bytes).map_err(|_| ConfigError::Corrupted)?;
        config.validate()?;
        Ok(config)
    }
}

/// Load configuration through a [`ConfigPort`].
///
/// First boot (nothing stored) yields the defaults.  A stored blob that
/// fails to decode or validate is an error; the caller decides whether to
/// fall back.
pub fn load(port: &impl ConfigPort) -> anyhow::Result<RoasterConfig> {
    match port.load() {
        Ok(bytes) => {
            let config = RoasterConfig::from_bytes(&bytes)
                .context("stored roaster config rejected")?;
            info!("Config loaded from storage");
            Ok(config)
        }
        Err(ConfigError::NotFound) => {
            warn!("No stored config, using defaults");
            Ok(RoasterConfig::default())
        }
        Err(e) => Err(e).context("reading roaster config"),
    }
}
