//! Hardware adapter: bridges real peripherals to domain port traits.
//!
//! Owns the thermocouple digitizer, the safety ADC source and both
//! actuator drivers, exposing them through [`SensorPort`],
//! [`ActuatorPort`] and [`MaintenancePort`].  This is the only module in
//! the system that touches actual hardware.
//!
//! Ports are infallible from the domain's point of view.  A failed bus
//! read is reported as a faulted thermocouple frame, so the safety
//! supervisor's debounce sees it; a failed actuator write is logged.

use embedded_hal::digital::OutputPin;
use embedded_hal::pwm::SetDutyCycle;
use embedded_hal::spi::SpiDevice;
use log::error;

use crate::app::ports::{ActuatorPort, MaintenancePort, SensorPort};
use crate::drivers::fan::FanDriver;
use crate::drivers::heater::HeaterDriver;
use crate::drivers::max31855::Max31855;
use crate::error::SensorError;
use crate::sensors::thermocouple::encode_fault_frame;

/// Concrete adapter that combines all hardware behind port traits.
///
/// `ADC` samples the safety thermistor divider; there is no
/// `embedded-hal` 1.0 ADC trait, so the board crate passes a closure.
pub struct HardwareAdapter<SPI, ADC, PWM, IN1, IN2, SSR> {
    thermocouple: Max31855<SPI>,
    safety_adc: ADC,
    fan: FanDriver<PWM, IN1, IN2>,
    heater: HeaterDriver<SSR>,
}

impl<SPI, ADC, PWM, IN1, IN2, SSR> HardwareAdapter<SPI, ADC, PWM, IN1, IN2, SSR>
where
    SPI: SpiDevice,
    ADC: FnMut() -> Option<u16>,
    PWM: SetDutyCycle,
    IN1: OutputPin,
    IN2: OutputPin,
    SSR: OutputPin,
{
    pub fn new(
        thermocouple: Max31855<SPI>,
        safety_adc: ADC,
        fan: FanDriver<PWM, IN1, IN2>,
        heater: HeaterDriver<SSR>,
    ) -> Self {
        Self {
            thermocouple,
            safety_adc,
            fan,
            heater,
        }
    }

    pub fn fan(&self) -> &FanDriver<PWM, IN1, IN2> {
        &self.fan
    }

    pub fn heater(&self) -> &HeaterDriver<SSR> {
        &self.heater
    }
}

// ── SensorPort implementation ─────────────────────────────────

impl<SPI, ADC, PWM, IN1, IN2, SSR> SensorPort for HardwareAdapter<SPI, ADC, PWM, IN1, IN2, SSR>
where
    SPI: SpiDevice,
    ADC: FnMut() -> Option<u16>,
    PWM: SetDutyCycle,
    IN1: OutputPin,
    IN2: OutputPin,
    SSR: OutputPin,
{
    fn read_thermocouple_frame(&mut self) -> u32 {
        match self.thermocouple.read_frame() {
            Ok(frame) => frame,
            Err(e) => {
                error!("{e}");
                encode_fault_frame(0)
            }
        }
    }

    /// A failed sample reads as code 0, which converts to the
    /// out-of-range sentinel and is skipped by the heater cutoff.
    fn read_safety_adc(&mut self) -> u16 {
        (self.safety_adc)().unwrap_or_else(|| {
            error!("{}", SensorError::AdcRead);
            0
        })
    }
}

// ── ActuatorPort implementation ───────────────────────────────

impl<SPI, ADC, PWM, IN1, IN2, SSR> ActuatorPort for HardwareAdapter<SPI, ADC, PWM, IN1, IN2, SSR>
where
    SPI: SpiDevice,
    ADC: FnMut() -> Option<u16>,
    PWM: SetDutyCycle,
    IN1: OutputPin,
    IN2: OutputPin,
    SSR: OutputPin,
{
    fn set_fan(&mut self, enabled: bool, duty: u8) {
        let res = if enabled {
            self.fan.set(duty)
        } else {
            self.fan.stop()
        };
        if let Err(e) = res {
            error!("Fan write failed: {e}");
        }
    }

    fn drive_heater(&mut self, level: u8, now_ms: u64) {
        if let Err(e) = self.heater.drive(level, now_ms) {
            error!("Heater write failed: {e}");
        }
    }

    fn heater_off(&mut self) {
        if let Err(e) = self.heater.off() {
            error!("Heater off failed: {e}");
        }
    }

    fn all_off(&mut self) {
        // Heater first: never leave it energized with the fan stopped.
        self.heater_off();
        if let Err(e) = self.fan.stop() {
            error!("Fan stop failed: {e}");
        }
    }
}

// ── MaintenancePort implementation ────────────────────────────

impl<SPI, ADC, PWM, IN1, IN2, SSR> MaintenancePort for HardwareAdapter<SPI, ADC, PWM, IN1, IN2, SSR>
where
    SPI: SpiDevice,
    ADC: FnMut() -> Option<u16>,
    PWM: SetDutyCycle,
    IN1: OutputPin,
    IN2: OutputPin,
    SSR: OutputPin,
{
    fn force_fan_pins(&mut self, high: bool) {
        if let Err(e) = self.fan.force_pins(high) {
            error!("Fan pin test write failed: {e}");
        }
    }
}
