//! Safety supervisor.
//!
//! Runs **every tick before the FSM**.  Unlike a self-clearing fault mask,
//! a fault here is one-shot: once latched it stays latched, and the
//! supervisor stops evaluating until the operator clears it.
//!
//! ## Check order
//!
//! 1. Chamber over-temperature (filtered value).  Warning band logs only.
//! 2. Heater thermistor cutoff, when configured.
//! 3. Fan/heater interlock.
//! 4. Thermocouple fault debounce.
//!
//! The first fatal finding wins.  The preheat timeout is detected by the
//! FSM and routed through [`SafetySupervisor::trigger_fault`] so every
//! fatal condition shares one latch.

use log::{error, info, warn};
use serde::Serialize;

use crate::config::RoasterConfig;
use crate::error::{FaultCode, FaultMessage, fault_message};
use crate::sensors::thermocouple::ThermocoupleFault;

/// Thermistor readings outside this band are treated as a broken sensor
/// and skipped by the cutoff check.
const HEATER_PLAUSIBLE_C: (f32, f32) = (-50.0, 500.0);

/// A fault held by the latch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatchedFault {
    pub code: FaultCode,
    pub message: FaultMessage,
    pub fatal: bool,
}

/// Everything one evaluation needs, sampled once per tick.
#[derive(Debug, Clone, Copy)]
pub struct SafetyInputs {
    /// Filtered chamber temperature; `None` before the first valid reading.
    pub chamber_c: Option<f32>,
    /// Heater thermistor temperature (may be the out-of-range sentinel).
    pub heater_c: f32,
    /// Fault classification of this tick's thermocouple frame.
    pub tc_fault: ThermocoupleFault,
    pub heater_enabled: bool,
    pub fan_enabled: bool,
    pub fan_duty: u8,
}

/// Result of one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SafetyStatus {
    Ok,
    /// A fault latched during this evaluation.
    Tripped,
    /// A fault was already latched; nothing was evaluated.
    Latched,
}

impl SafetyStatus {
    pub fn is_ok(self) -> bool {
        self == Self::Ok
    }
}

/// Limits copied out of [`RoasterConfig`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SafetyLimits {
    pub max_chamber_c: f32,
    pub warn_chamber_c: f32,
    pub heater_cutoff_c: Option<f32>,
    pub min_fan_when_heating: u8,
    pub tc_fault_threshold: u8,
    pub tc_good_threshold: u8,
}

impl SafetyLimits {
    pub fn from_config(config: &RoasterConfig) -> Self {
        Self {
            max_chamber_c: config.max_chamber_c,
            warn_chamber_c: config.warn_chamber_c,
            heater_cutoff_c: config.heater_cutoff_c,
            min_fan_when_heating: config.min_fan_when_heating,
            tc_fault_threshold: config.tc_fault_threshold,
            tc_good_threshold: config.tc_good_threshold,
        }
    }
}

/// Consecutive-reading debounce for thermocouple faults.
#[derive(Debug, Clone, Default)]
pub struct ThermocoupleDebounce {
    fault_count: u8,
    good_count: u8,
    last_fault: Option<ThermocoupleFault>,
    warned: bool,
}

impl ThermocoupleDebounce {
    /// Feed one reading's fault code.  Returns the fault once it has been
    /// seen `fault_threshold` times in a row.
    pub fn observe(
        &mut self,
        fault: ThermocoupleFault,
        fault_threshold: u8,
        good_threshold: u8,
    ) -> Option<ThermocoupleFault> {
        if fault == ThermocoupleFault::None {
            self.good_count = self.good_count.saturating_add(1);
            if self.good_count >= good_threshold {
                self.fault_count = 0;
                self.last_fault = None;
                self.warned = false;
            }
            return None;
        }

        if self.last_fault == Some(fault) {
            self.fault_count = self.fault_count.saturating_add(1);
        } else {
            self.fault_count = 1;
            self.last_fault = Some(fault);
            self.warned = false;
        }
        self.good_count = 0;

        (self.fault_count >= fault_threshold).then_some(fault)
    }

    pub fn fault_count(&self) -> u8 {
        self.fault_count
    }

    pub fn good_count(&self) -> u8 {
        self.good_count
    }
}

/// Safety supervisor.
#[derive(Debug, Clone)]
pub struct SafetySupervisor {
    limits: SafetyLimits,
    latch: Option<LatchedFault>,
    debounce: ThermocoupleDebounce,
    /// Set while the chamber sits in the warning band.
    in_warn_band: bool,
}

impl SafetySupervisor {
    pub fn new(config: &RoasterConfig) -> Self {
        Self {
            limits: SafetyLimits::from_config(config),
            latch: None,
            debounce: ThermocoupleDebounce::default(),
            in_warn_band: false,
        }
    }

    pub fn set_limits(&mut self, limits: SafetyLimits) {
        self.limits = limits;
    }

    /// Evaluate all checks against this tick's inputs.
    pub fn evaluate(&mut self, inputs: &SafetyInputs) -> SafetyStatus {
        if self.latch.is_some() {
            return SafetyStatus::Latched;
        }

        // ── Chamber temperature ──────────────────────────────────
        if let Some(chamber) = inputs.chamber_c {
            if chamber >= self.limits.max_chamber_c {
                self.trigger_fault(
                    FaultCode::OverTempChamber,
                    &format!(
                        "Chamber temperature {chamber:.1} C exceeded maximum safe limit {:.0} C",
                        self.limits.max_chamber_c
                    ),
                    true,
                );
                return SafetyStatus::Tripped;
            }
            let warn_band = chamber >= self.limits.warn_chamber_c;
            if warn_band && !self.in_warn_band {
                warn!("Chamber temperature high: {chamber:.1} C");
            }
            self.in_warn_band = warn_band;
        }

        // ── Heater thermistor ────────────────────────────────────
        if let Some(cutoff) = self.limits.heater_cutoff_c {
            let c = inputs.heater_c;
            let plausible = c > HEATER_PLAUSIBLE_C.0 && c < HEATER_PLAUSIBLE_C.1;
            if plausible && c >= cutoff {
                self.trigger_fault(
                    FaultCode::OverTempHeater,
                    &format!("Heater temperature {c:.1} C exceeded cutoff {cutoff:.0} C"),
                    true,
                );
                return SafetyStatus::Tripped;
            }
        }

        // ── Fan / heater interlock ───────────────────────────────
        if inputs.heater_enabled
            && (!inputs.fan_enabled || inputs.fan_duty < self.limits.min_fan_when_heating)
        {
            self.trigger_fault(
                FaultCode::FanInterlock,
                "Fan speed too low or disabled while heater is on",
                true,
            );
            return SafetyStatus::Tripped;
        }

        // ── Thermocouple debounce ────────────────────────────────
        let persistent = self.debounce.observe(
            inputs.tc_fault,
            self.limits.tc_fault_threshold,
            self.limits.tc_good_threshold,
        );
        if let Some(fault) = persistent {
            let message = format!("Thermocouple fault: {}", fault.describe());
            if fault.is_critical() && inputs.heater_enabled {
                self.trigger_fault(FaultCode::ThermocoupleFault, &message, true);
                return SafetyStatus::Tripped;
            }
            if !self.debounce.warned {
                warn!("{message}");
                self.debounce.warned = true;
            }
        }

        SafetyStatus::Ok
    }

    /// Latch a fault.  No-op if one is already latched.
    ///
    /// Returns `true` when this call latched the fault.  The caller is
    /// responsible for forcing the FSM into `Error`.
    pub fn trigger_fault(&mut self, code: FaultCode, message: &str, fatal: bool) -> bool {
        if self.latch.is_some() {
            return false;
        }
        error!("SAFETY FAULT LATCHED: {code} ({message}) fatal={fatal}");
        self.latch = Some(LatchedFault {
            code,
            message: fault_message(message),
            fatal,
        });
        true
    }

    /// Release the latch.  The caller drives the FSM out of `Error`.
    pub fn clear_fault(&mut self) {
        if let Some(fault) = self.latch.take() {
            info!("Safety fault cleared: {}", fault.code);
        }
    }

    pub fn is_ok(&self) -> bool {
        self.latch.is_none()
    }

    pub fn latched(&self) -> Option<&LatchedFault> {
        self.latch.as_ref()
    }

    pub fn debounce(&self) -> &ThermocoupleDebounce {
        &self.debounce
    }
}
