//! NTC safety thermistor (100 kOhm @ 25 C, B = 3950).
//!
//! Wired as the low side of a divider with a fixed 100 kOhm resistor to
//! VCC.  The simplified Beta (Steinhart-Hart) equation converts resistance
//! to temperature.

use crate::config::ThermistorParams;

/// Returned instead of NaN when the input cannot be converted.
pub const OUT_OF_RANGE_C: f32 = 999.0;

/// Convert a raw ADC code.  A zero code is degenerate.
pub fn adc_to_celsius(code: u16, params: &ThermistorParams) -> f32 {
    if code == 0 || params.adc_max == 0 {
        return OUT_OF_RANGE_C;
    }
    let voltage = f32::from(code) / f32::from(params.adc_max) * params.vcc;
    voltage_to_celsius(voltage, params)
}

/// Convert a divider voltage.
pub fn voltage_to_celsius(voltage: f32, params: &ThermistorParams) -> f32 {
    if !(voltage > 0.0) {
        return OUT_OF_RANGE_C;
    }
    let resistance = params.r_fixed * (params.vcc / voltage - 1.0);
    if !(resistance > 0.0) {
        return OUT_OF_RANGE_C;
    }
    let inv_t = 1.0 / params.t0_k + (1.0 / params.beta) * (resistance / params.r0).ln();
    let celsius = 1.0 / inv_t - 273.15;
    if celsius.is_finite() { celsius } else { OUT_OF_RANGE_C }
}
