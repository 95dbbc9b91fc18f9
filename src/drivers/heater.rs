//! Heater SSR driver.
//!
//! The SSR is switched in slow time-proportioned windows: a 0–255 demand
//! becomes an on-time at the start of each window.  The pin may be wired
//! active-high (default) or active-low.

use embedded_hal::digital::{Error as _, OutputPin};

use crate::control::time_proportion::TimeProportioner;
use crate::error::{ActuatorError, Result};

pub struct HeaterDriver<P> {
    pin: P,
    /// If true, heater ON = pin LOW.
    inverted: bool,
    window: TimeProportioner,
    /// Heater is being driven (windows running).
    enabled: bool,
    /// Current output state (true = SSR energized).
    on: bool,
}

impl<P: OutputPin> HeaterDriver<P> {
    /// Take the pin and force the heater off.
    pub fn new(pin: P, window_ms: u32, inverted: bool) -> Result<Self> {
        let mut heater = Self {
            pin,
            inverted,
            window: TimeProportioner::new(window_ms),
            enabled: false,
            on: false,
        };
        heater.write(false)?;
        Ok(heater)
    }

    pub fn new_active_high(pin: P, window_ms: u32) -> Result<Self> {
        Self::new(pin, window_ms, false)
    }

    /// Drive at `level` (0–255).  Call every tick while heating; the first
    /// call after [`off`](Self::off) starts a fresh window.
    pub fn drive(&mut self, level: u8, now_ms: u64) -> Result<()> {
        if !self.enabled {
            self.enabled = true;
            self.window.restart();
        }
        let on = self.window.is_on(level, now_ms);
        if on != self.on {
            self.write(on)?;
        }
        Ok(())
    }

    /// De-energize immediately.
    pub fn off(&mut self) -> Result<()> {
        self.enabled = false;
        self.write(false)
    }

    fn write(&mut self, on: bool) -> Result<()> {
        // Normal: on=true, inverted=false → high
        // Inverted: on=true, inverted=true → low
        let res = if on != self.inverted {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        res.map_err(|e| ActuatorError::Pin(e.kind()))?;
        self.on = on;
        Ok(())
    }

    pub fn is_on(&self) -> bool {
        self.on
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}
