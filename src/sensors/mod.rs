//! Sensor conditioning: raw words in, a [`ChamberSnapshot`] out.
//!
//! The [`TemperatureConditioner`] owns the filter and rate-of-rise state
//! and produces one snapshot per tick, which the service writes into
//! `RoasterContext.chamber`.  Reading the bus is the adapter's job; only
//! the captured frame and ADC code arrive here.

pub mod filter;
pub mod ror;
pub mod thermistor;
pub mod thermocouple;

use crate::config::{RoasterConfig, ThermistorParams};
use filter::LowPassFilter;
use ror::RateOfRise;
use thermocouple::{TemperatureReading, ThermocoupleFault};

/// Conditioned temperatures for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChamberSnapshot {
    /// This tick's decoded (validated) thermocouple frame.
    pub reading: TemperatureReading,
    /// Filtered chamber temperature.  `None` until the first valid reading.
    pub filtered_c: Option<f32>,
    /// Rate of rise (°C/min).
    pub ror_c_per_min: f32,
    /// Heater thermistor temperature, or the out-of-range sentinel.
    pub heater_c: f32,
}

impl Default for ChamberSnapshot {
    fn default() -> Self {
        Self {
            reading: TemperatureReading {
                celsius: None,
                fault: ThermocoupleFault::None,
                fault_bits: 0,
                cold_junction_c: 0.0,
            },
            filtered_c: None,
            ror_c_per_min: 0.0,
            heater_c: thermistor::OUT_OF_RANGE_C,
        }
    }
}

/// Filter + rate-of-rise + thermistor conversion.
#[derive(Debug, Clone)]
pub struct TemperatureConditioner {
    filter: LowPassFilter,
    ror: RateOfRise,
    thermistor: ThermistorParams,
}

impl TemperatureConditioner {
    pub fn new(config: &RoasterConfig) -> Self {
        Self {
            filter: LowPassFilter::new(config.filter_alpha),
            ror: RateOfRise::new(config.ror_interval_ms),
            thermistor: config.thermistor,
        }
    }

    /// Condition one tick's raw inputs.
    pub fn condition(&mut self, raw_frame: u32, safety_adc: u16, now_ms: u64) -> ChamberSnapshot {
        let reading = thermocouple::decode_frame(raw_frame);
        let filtered_c = self.filter.update(&reading);
        let ror_c_per_min = match filtered_c {
            Some(c) => self.ror.update(c, now_ms),
            None => self.ror.rate(),
        };

        ChamberSnapshot {
            reading,
            filtered_c,
            ror_c_per_min,
            heater_c: thermistor::adc_to_celsius(safety_adc, &self.thermistor),
        }
    }

    /// Drop thermal history at the start of a roast session.
    pub fn reset_session(&mut self) {
        self.filter.reset();
        self.ror.reset();
    }

    pub fn reset_ror(&mut self) {
        self.ror.reset();
    }

    /// Apply a new configuration without losing the held value.
    pub fn reconfigure(&mut self, config: &RoasterConfig) {
        self.filter.set_alpha(config.filter_alpha);
        self.ror.set_interval(config.ror_interval_ms);
        self.thermistor = config.thermistor;
    }
}
