//! Actuator diagnostics.
//!
//! [`ActuatorReport`] answers the `debugFan` console command with the
//! commanded actuator state.  [`run_fan_pin_test`] is the bench pin check;
//! it blocks for seconds, so it is only reachable from a
//! [`MaintenanceSession`](crate::app::service::MaintenanceSession).

use embedded_hal::delay::DelayNs;
use log::info;
use serde::Serialize;

use crate::app::ports::MaintenancePort;
use crate::fsm::StateId;
use crate::fsm::context::ActuatorCommands;

/// How long the pin test holds the blower inputs high.
pub const FAN_PIN_TEST_HOLD_MS: u32 = 5000;

/// Snapshot of the commanded actuators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActuatorReport {
    pub state: StateId,
    pub fan_enabled: bool,
    pub fan_duty: u8,
    /// PWM compare value the fan driver will write (0–255).
    pub fan_pwm: u8,
    pub heater_enabled: bool,
    pub heater_level: u8,
    pub heater_power_pct: u8,
    pub safety_ok: bool,
}

impl ActuatorReport {
    pub fn new(state: StateId, commands: &ActuatorCommands, safety_ok: bool) -> Self {
        let fan_pwm = if commands.fan_enabled {
            (u16::from(commands.fan_duty.min(100)) * 255 / 100) as u8
        } else {
            0
        };
        Self {
            state,
            fan_enabled: commands.fan_enabled,
            fan_duty: commands.fan_duty,
            fan_pwm,
            heater_enabled: commands.heater_enabled,
            heater_level: commands.heater_level,
            heater_power_pct: commands.heater_power_pct,
            safety_ok,
        }
    }
}

/// Drive every blower input high for `hold_ms`, then release them low.
pub fn run_fan_pin_test(port: &mut impl MaintenancePort, delay: &mut impl DelayNs, hold_ms: u32) {
    info!("Fan pin test: all blower inputs HIGH for {hold_ms} ms");
    port.force_fan_pins(true);
    delay.delay_ms(hold_ms);
    port.force_fan_pins(false);
    info!("Fan pin test: released");
}
