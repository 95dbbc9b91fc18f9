//! Blower motor driver (L298N-style H-bridge).
//!
//! Variable speed via a PWM enable channel; two direction inputs.  The
//! blower only ever runs forward: IN1 high, IN2 low.
//!
//! ## Safety contract
//!
//! The heater must never run without airflow.  Enforced by the safety
//! supervisor; this driver is a dumb actuator.

use embedded_hal::digital::{Error as _, OutputPin, PinState};
use embedded_hal::pwm::{Error as _, SetDutyCycle};

use crate::error::{ActuatorError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanState {
    Stopped,
    Running { duty: u8 },
}

pub struct FanDriver<PWM, IN1, IN2> {
    pwm: PWM,
    in1: IN1,
    in2: IN2,
    state: FanState,
}

impl<PWM, IN1, IN2> FanDriver<PWM, IN1, IN2>
where
    PWM: SetDutyCycle,
    IN1: OutputPin,
    IN2: OutputPin,
{
    /// Take ownership of the pins and force the blower off.
    pub fn new(pwm: PWM, in1: IN1, in2: IN2) -> Result<Self> {
        let mut fan = Self {
            pwm,
            in1,
            in2,
            state: FanState::Stopped,
        };
        fan.stop()?;
        Ok(fan)
    }

    /// Run forward at `duty` percent.  Zero stops the blower.
    pub fn set(&mut self, duty: u8) -> Result<()> {
        let duty = duty.min(100);
        if duty == 0 {
            return self.stop();
        }

        self.set_direction(PinState::High, PinState::Low)?;
        self.set_duty_hw(duty)?;
        self.state = FanState::Running { duty };
        Ok(())
    }

    pub fn stop(&mut self) -> Result<()> {
        self.set_duty_hw(0)?;
        self.set_direction(PinState::Low, PinState::Low)?;
        self.state = FanState::Stopped;
        Ok(())
    }

    /// Drive every input to `high`, bypassing the tracked state.  Bench
    /// diagnostics only.
    pub fn force_pins(&mut self, high: bool) -> Result<()> {
        let level = PinState::from(high);
        self.set_direction(level, level)?;
        let res = if high {
            self.pwm.set_duty_cycle_fully_on()
        } else {
            self.pwm.set_duty_cycle_fully_off()
        };
        res.map_err(|e| ActuatorError::Pwm(e.kind()))?;
        self.state = FanState::Stopped;
        Ok(())
    }

    fn set_direction(&mut self, in1: PinState, in2: PinState) -> Result<()> {
        self.in1
            .set_state(in1)
            .map_err(|e| ActuatorError::Pin(e.kind()))?;
        self.in2
            .set_state(in2)
            .map_err(|e| ActuatorError::Pin(e.kind()))?;
        Ok(())
    }

    /// Percent to an 8-bit compare value, then scaled to the channel.
    fn set_duty_hw(&mut self, duty: u8) -> Result<()> {
        let duty_8bit = (u16::from(duty) * 255) / 100;
        self.pwm
            .set_duty_cycle_fraction(duty_8bit, 255)
            .map_err(|e| ActuatorError::Pwm(e.kind()))?;
        Ok(())
    }

    pub fn state(&self) -> FanState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        !matches!(self.state, FanState::Stopped)
    }

    pub fn current_duty(&self) -> u8 {
        match self.state {
            FanState::Running { duty } => duty,
            FanState::Stopped => 0,
        }
    }
}
