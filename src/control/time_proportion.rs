//! Slow PWM for the heater SSR.
//!
//! A 0–255 demand becomes an on-time at the start of a fixed window.  The
//! window restarts from the current time once it has fully elapsed.

#[derive(Debug, Clone)]
pub struct TimeProportioner {
    window_ms: u32,
    window_start_ms: Option<u64>,
}

impl TimeProportioner {
    pub fn new(window_ms: u32) -> Self {
        Self {
            window_ms,
            window_start_ms: None,
        }
    }

    /// On-time within one window for `level` (0–255).
    pub fn on_time_ms(&self, level: u8) -> u32 {
        (u32::from(level) * self.window_ms) / 255
    }

    /// Whether the output should be energized at `now_ms`.
    pub fn is_on(&mut self, level: u8, now_ms: u64) -> bool {
        let start = *self.window_start_ms.get_or_insert(now_ms);
        let mut elapsed = now_ms.saturating_sub(start);
        if elapsed >= u64::from(self.window_ms) {
            self.window_start_ms = Some(now_ms);
            elapsed = 0;
        }
        elapsed < u64::from(self.on_time_ms(level))
    }

    /// Begin a fresh window on the next call.
    pub fn restart(&mut self) {
        self.window_start_ms = None;
    }

    pub fn window_ms(&self) -> u32 {
        self.window_ms
    }
}

/// Operator percentage (0–100) to the 0–255 heater scale.
pub fn percent_to_level(percent: u8) -> u8 {
    ((u16::from(percent.min(100)) * 255) / 100) as u8
}

/// 0–255 heater scale to a display percentage.
pub fn level_to_percent(level: u8) -> u8 {
    ((u16::from(level) * 100) / 255) as u8
}
