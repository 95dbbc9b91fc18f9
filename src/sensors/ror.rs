//! Rate of rise (°C/min), sampled on a fixed interval.

#[derive(Debug, Clone)]
pub struct RateOfRise {
    interval_ms: u64,
    last_sample: Option<(f32, u64)>,
    rate: f32,
}

impl RateOfRise {
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            last_sample: None,
            rate: 0.0,
        }
    }

    /// Feed the current filtered temperature.
    ///
    /// Returns 0 until one interval has passed since the first sample;
    /// between recomputations the previous rate is returned unchanged.
    pub fn update(&mut self, celsius: f32, now_ms: u64) -> f32 {
        let Some((last_c, last_ms)) = self.last_sample else {
            self.last_sample = Some((celsius, now_ms));
            return 0.0;
        };

        let elapsed = now_ms.saturating_sub(last_ms);
        if elapsed >= self.interval_ms {
            let minutes = elapsed as f32 / 60_000.0;
            self.rate = (celsius - last_c) / minutes;
            self.last_sample = Some((celsius, now_ms));
        }
        self.rate
    }

    pub fn rate(&self) -> f32 {
        self.rate
    }

    pub fn reset(&mut self) {
        self.last_sample = None;
        self.rate = 0.0;
    }

    pub fn set_interval(&mut self, interval_ms: u64) {
        self.interval_ms = interval_ms;
    }
}
