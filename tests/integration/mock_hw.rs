//! Mock hardware adapter for integration tests.
//!
//! Scripts the sensor words and records every actuator call so tests can
//! assert on the full command history without touching real pins.

use roaster::app::events::AppEvent;
use roaster::app::ports::{ActuatorPort, EventSink, SensorPort};
use roaster::sensors::thermocouple::{encode_fault_frame, encode_frame};

// ── Actuator call record ──────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum ActuatorCall {
    SetFan { enabled: bool, duty: u8 },
    DriveHeater { level: u8 },
    HeaterOff,
    AllOff,
}

// ── MockHardware ──────────────────────────────────────────────

pub struct MockHardware {
    /// Frame returned on every thermocouple read.
    pub frame: u32,
    /// Code returned on every safety ADC read (512 ≈ 25 °C).
    pub adc: u16,
    pub calls: Vec<ActuatorCall>,
}

#[allow(dead_code)]
impl MockHardware {
    pub fn new() -> Self {
        Self {
            frame: encode_frame(25.0),
            adc: 512,
            calls: Vec::new(),
        }
    }

    pub fn set_chamber(&mut self, celsius: f32) {
        self.frame = encode_frame(celsius);
    }

    pub fn set_tc_fault(&mut self, bits: u8) {
        self.frame = encode_fault_frame(bits);
    }

    pub fn fan_on(&self) -> bool {
        self.calls
            .iter()
            .rev()
            .find_map(|c| match c {
                ActuatorCall::SetFan { enabled, .. } => Some(*enabled),
                ActuatorCall::AllOff => Some(false),
                _ => None,
            })
            .unwrap_or(false)
    }

    pub fn fan_duty(&self) -> u8 {
        self.calls
            .iter()
            .rev()
            .find_map(|c| match c {
                ActuatorCall::SetFan { enabled: true, duty } => Some(*duty),
                ActuatorCall::SetFan { enabled: false, .. } | ActuatorCall::AllOff => Some(0),
                _ => None,
            })
            .unwrap_or(0)
    }

    pub fn heater_driven(&self) -> bool {
        self.calls
            .iter()
            .rev()
            .find_map(|c| match c {
                ActuatorCall::DriveHeater { .. } => Some(true),
                ActuatorCall::HeaterOff | ActuatorCall::AllOff => Some(false),
                _ => None,
            })
            .unwrap_or(false)
    }
}

impl Default for MockHardware {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorPort for MockHardware {
    fn read_thermocouple_frame(&mut self) -> u32 {
        self.frame
    }

    fn read_safety_adc(&mut self) -> u16 {
        self.adc
    }
}

impl ActuatorPort for MockHardware {
    fn set_fan(&mut self, enabled: bool, duty: u8) {
        self.calls.push(ActuatorCall::SetFan { enabled, duty });
    }

    fn drive_heater(&mut self, level: u8, _now_ms: u64) {
        self.calls.push(ActuatorCall::DriveHeater { level });
    }

    fn heater_off(&mut self) {
        self.calls.push(ActuatorCall::HeaterOff);
    }

    fn all_off(&mut self) {
        self.calls.push(ActuatorCall::AllOff);
    }
}

// ── Collecting event sink ─────────────────────────────────────

#[derive(Default)]
pub struct CollectSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl CollectSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for CollectSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}
