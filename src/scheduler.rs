//! Periodic timers for the tick loop.
//!
//! The control loop runs on its own cadence; slower duties (telemetry
//! emission) ride on a [`PeriodicTimer`] polled from `tick()`.

/// Fires at most once per `interval_ms`, measured from the last fire.
///
/// The first fire happens one full interval after time zero, so a fresh
/// timer stays quiet until the system has produced a meaningful sample.
#[derive(Debug, Clone, Copy)]
pub struct PeriodicTimer {
    interval_ms: u64,
    last_fire_ms: u64,
}

impl PeriodicTimer {
    pub const fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            last_fire_ms: 0,
        }
    }

    /// Returns `true` when the interval has elapsed, and re-arms.
    pub fn poll(&mut self, now_ms: u64) -> bool {
        if now_ms.saturating_sub(self.last_fire_ms) >= self.interval_ms {
            self.last_fire_ms = now_ms;
            true
        } else {
            false
        }
    }

    pub fn set_interval(&mut self, interval_ms: u64) {
        self.interval_ms = interval_ms;
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }
}
