//! Exponential moving average over chamber readings.
//!
//! Invalid readings never reach downstream as zero or NaN: the filter
//! holds its last good value instead.

use super::thermocouple::TemperatureReading;

#[derive(Debug, Clone)]
pub struct LowPassFilter {
    alpha: f32,
    value: Option<f32>,
    initialized: bool,
}

impl LowPassFilter {
    /// `alpha` in (0, 1]; validated by [`RoasterConfig::validate`](crate::config::RoasterConfig::validate).
    pub fn new(alpha: f32) -> Self {
        Self {
            alpha,
            value: None,
            initialized: false,
        }
    }

    /// Feed one reading and return the filtered value.
    ///
    /// `None` only until the first valid reading ever arrives.
    pub fn update(&mut self, reading: &TemperatureReading) -> Option<f32> {
        let Some(raw) = reading.celsius else {
            return self.value;
        };

        let next = match self.value {
            Some(prev) if self.initialized => self.alpha * raw + (1.0 - self.alpha) * prev,
            _ => raw,
        };
        self.initialized = true;
        self.value = Some(next);
        self.value
    }

    /// Forget thermal history.  The next valid reading seeds the filter;
    /// until then the last value is still held.
    pub fn reset(&mut self) {
        self.initialized = false;
    }

    pub fn value(&self) -> Option<f32> {
        self.value
    }

    pub fn set_alpha(&mut self, alpha: f32) {
        self.alpha = alpha;
    }
}
