//! MAX31855 thermocouple digitizer frame decoding.
//!
//! The digitizer shifts out one 32-bit word per conversion:
//!
//! ```text
//!  31        18 17  16  15        4  3   2   1   0
//! ┌────────────┬───┬───┬───────────┬───┬───┬───┬───┐
//! │ TC temp 14b│res│FLT│ CJ temp12b│res│SCV│SCG│ OC│
//! └────────────┴───┴───┴───────────┴───┴───┴───┴───┘
//! ```
//!
//! Only the captured word is consumed here; clocking it out of the SPI
//! bus belongs to the hardware adapter.

use serde::Serialize;

/// Fault flag (bit 16).
const FAULT_BIT: u32 = 1 << 16;
/// Fault sub-code bits [2:0].
const FAULT_CODE_MASK: u32 = 0b111;
/// Bits compared between the two validation samples.
pub const STATUS_MASK: u32 = FAULT_BIT | FAULT_CODE_MASK;

const TC_LSB_C: f32 = 0.25;
const CJ_LSB_C: f32 = 0.0625;

/// Classified thermocouple fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ThermocoupleFault {
    #[default]
    None,
    /// Probe disconnected.
    OpenCircuit,
    /// Probe shorted to ground.  Never fatal.
    ShortGnd,
    /// Probe shorted to supply.
    ShortVcc,
    /// Fault flag set with no sub-code.
    Unknown,
}

impl ThermocoupleFault {
    /// Classify the sub-code bits of a faulted frame.  Lowest set bit wins.
    pub fn from_bits(bits: u8) -> Self {
        if bits & 0b001 != 0 {
            Self::OpenCircuit
        } else if bits & 0b010 != 0 {
            Self::ShortGnd
        } else if bits & 0b100 != 0 {
            Self::ShortVcc
        } else {
            Self::Unknown
        }
    }

    /// Critical faults may latch a safety fault while heating.
    pub fn is_critical(self) -> bool {
        matches!(self, Self::OpenCircuit | Self::ShortVcc | Self::Unknown)
    }

    pub fn describe(self) -> &'static str {
        match self {
            Self::None => "no fault",
            Self::OpenCircuit => "Open circuit - thermocouple disconnected",
            Self::ShortGnd => "Short to GND",
            Self::ShortVcc => "Short to VCC",
            Self::Unknown => "Unknown thermocouple fault",
        }
    }
}

/// One decoded conversion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemperatureReading {
    /// Hot-junction temperature; `None` when the frame carried a fault.
    pub celsius: Option<f32>,
    pub fault: ThermocoupleFault,
    /// Raw bits [2:0] of a faulted frame, 0 otherwise.
    pub fault_bits: u8,
    /// Internal reference temperature.  Informational only.
    pub cold_junction_c: f32,
}

impl TemperatureReading {
    pub fn is_valid(&self) -> bool {
        self.celsius.is_some()
    }
}

/// Decode one raw digitizer word.
pub fn decode_frame(raw: u32) -> TemperatureReading {
    let cold_junction_c = sign_extend((raw >> 4) & 0x0FFF, 12) as f32 * CJ_LSB_C;

    if raw & FAULT_BIT != 0 {
        let fault_bits = (raw & FAULT_CODE_MASK) as u8;
        return TemperatureReading {
            celsius: None,
            fault: ThermocoupleFault::from_bits(fault_bits),
            fault_bits,
            cold_junction_c,
        };
    }

    let counts = sign_extend((raw >> 18) & 0x3FFF, 14);
    TemperatureReading {
        celsius: Some(counts as f32 * TC_LSB_C),
        fault: ThermocoupleFault::None,
        fault_bits: 0,
        cold_junction_c,
    }
}

/// Encode a temperature into a fault-free frame.  Used by simulators and
/// tests to script a frame source.
pub fn encode_frame(celsius: f32) -> u32 {
    let counts = (celsius / TC_LSB_C).round() as i32;
    ((counts as u32) & 0x3FFF) << 18
}

/// Encode a faulted frame with the given sub-code bits.
pub fn encode_fault_frame(bits: u8) -> u32 {
    FAULT_BIT | (u32::from(bits) & FAULT_CODE_MASK)
}

/// Double-sample validation.
///
/// Takes two frames; if their fault status disagrees, a third frame is
/// taken and treated as authoritative.  This filters single-frame transport
/// glitches before they reach the filter or the fault debounce.
pub fn read_validated(mut sample: impl FnMut() -> u32) -> u32 {
    let first = sample();
    let second = sample();
    if first & STATUS_MASK == second & STATUS_MASK {
        first
    } else {
        sample()
    }
}

fn sign_extend(value: u32, bits: u32) -> i32 {
    let shift = 32 - bits;
    ((value << shift) as i32) >> shift
}
