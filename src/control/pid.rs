//! Gain-scheduled PID controller for chamber temperature.
//!
//! Output is on the 0–255 heater scale.  The integral is clamped to
//! ±output_max/ki and the derivative acts on the measurement, so setpoint
//! steps never kick the output.

use log::debug;

use crate::config::{PidGains, RoasterConfig};

/// Two gain triples and the |error| threshold that selects between them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GainSchedule {
    pub aggressive: PidGains,
    pub conservative: PidGains,
    pub threshold_c: f32,
}

impl GainSchedule {
    pub fn from_config(config: &RoasterConfig) -> Self {
        Self {
            aggressive: config.pid_aggressive,
            conservative: config.pid_conservative,
            threshold_c: config.pid_threshold_c,
        }
    }

    /// Above the threshold is aggressive; at or below is conservative.
    /// There is no hysteresis band, so an error sitting on the threshold
    /// may switch every tick.
    pub fn select(&self, abs_error: f32) -> TuningMode {
        if abs_error > self.threshold_c {
            TuningMode::Aggressive
        } else {
            TuningMode::Conservative
        }
    }

    fn gains(&self, mode: TuningMode) -> PidGains {
        match mode {
            TuningMode::Aggressive => self.aggressive,
            TuningMode::Conservative => self.conservative,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TuningMode {
    Aggressive,
    #[default]
    Conservative,
}

/// PID controller
#[derive(Debug, Clone)]
pub struct PidController {
    schedule: GainSchedule,
    mode: TuningMode,
    setpoint: f32,
    integral: f32,
    last_error: f32,
    last_input: f32,
    /// `None` means the next update primes instead of computing.
    last_update_ms: Option<u64>,
    output: f32,
    output_min: f32,
    output_max: f32,
    enabled: bool,
}

impl PidController {
    pub const OUTPUT_MAX: f32 = 255.0;

    pub fn new(schedule: GainSchedule, setpoint: f32) -> Self {
        Self {
            schedule,
            mode: TuningMode::Conservative,
            setpoint,
            integral: 0.0,
            last_error: 0.0,
            last_input: 0.0,
            last_update_ms: None,
            output: 0.0,
            output_min: 0.0,
            output_max: Self::OUTPUT_MAX,
            enabled: false,
        }
    }

    /// Update setpoint.  Accumulators are untouched.
    pub fn set_setpoint(&mut self, setpoint: f32) {
        self.setpoint = setpoint;
    }

    pub fn set_schedule(&mut self, schedule: GainSchedule) {
        self.schedule = schedule;
    }

    /// Compute a new output from the current measurement.
    ///
    /// The first call after [`enable`](Self::enable) or
    /// [`reset`](Self::reset) only records the measurement and time.
    pub fn update(&mut self, measurement: f32, now_ms: u64) -> f32 {
        if !self.enabled {
            self.output = 0.0;
            return self.output;
        }

        let error = self.setpoint - measurement;

        let Some(last_ms) = self.last_update_ms else {
            self.last_update_ms = Some(now_ms);
            self.last_input = measurement;
            self.last_error = error;
            debug!("PID primed at {measurement:.1} C");
            return self.output;
        };

        let dt = now_ms.saturating_sub(last_ms) as f32 / 1000.0;
        if dt <= 0.0 {
            return self.output;
        }

        let mode = self.schedule.select(error.abs());
        if mode != self.mode {
            debug!("PID gains -> {mode:?} (|e| = {:.1})", error.abs());
            self.mode = mode;
        }
        let gains = self.schedule.gains(mode);

        // Proportional
        let p = gains.kp * error;

        // Integral, clamped so ki * integral alone cannot exceed the output range
        self.integral += error * dt;
        if gains.ki > 0.0 {
            let limit = self.output_max / gains.ki;
            self.integral = self.integral.clamp(-limit, limit);
        }
        let i = gains.ki * self.integral;

        // Derivative on measurement
        let d = -gains.kd * (measurement - self.last_input) / dt;

        self.output = (p + i + d).clamp(self.output_min, self.output_max);

        self.last_update_ms = Some(now_ms);
        self.last_input = measurement;
        self.last_error = error;

        self.output
    }

    /// Reset controller state
    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.last_error = 0.0;
        self.last_input = 0.0;
        self.last_update_ms = None;
        self.output = 0.0;
    }

    pub fn enable(&mut self) {
        self.enabled = true;
        self.last_update_ms = None;
    }

    pub fn disable(&mut self) {
        self.enabled = false;
        self.output = 0.0;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn output(&self) -> f32 {
        self.output
    }

    pub fn setpoint(&self) -> f32 {
        self.setpoint
    }

    pub fn tuning_mode(&self) -> TuningMode {
        self.mode
    }

    pub fn integral(&self) -> f32 {
        self.integral
    }

    pub fn last_error(&self) -> f32 {
        self.last_error
    }
}
