//! `HardwareAdapter` over `embedded-hal` fakes, driven by the service.
//!
//! Pin and PWM state live in shared cells so the test can observe them
//! after the adapter has taken ownership of the peripherals.

use std::cell::Cell;
use std::convert::Infallible;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType as PinErrorType, OutputPin};
use embedded_hal::pwm::{ErrorType as PwmErrorType, SetDutyCycle};
use embedded_hal::spi::{ErrorType as SpiErrorType, Operation, SpiDevice};

use crate::mock_hw::CollectSink;

use roaster::adapters::hardware::HardwareAdapter;
use roaster::app::commands::Command;
use roaster::app::service::RoasterService;
use roaster::config::RoasterConfig;
use roaster::drivers::fan::FanDriver;
use roaster::drivers::heater::HeaterDriver;
use roaster::drivers::max31855::Max31855;
use roaster::error::MaintenanceError;
use roaster::fsm::StateId;
use roaster::sensors::thermocouple::encode_frame;

#[derive(Clone, Default)]
struct Pin(Rc<Cell<bool>>);

impl PinErrorType for Pin {
    type Error = Infallible;
}

impl OutputPin for Pin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.0.set(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.0.set(true);
        Ok(())
    }
}

#[derive(Clone, Default)]
struct Pwm(Rc<Cell<u16>>);

impl PwmErrorType for Pwm {
    type Error = Infallible;
}

impl SetDutyCycle for Pwm {
    fn max_duty_cycle(&self) -> u16 {
        255
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Infallible> {
        self.0.set(duty);
        Ok(())
    }
}

#[derive(Clone)]
struct Spi(Rc<Cell<u32>>);

impl SpiErrorType for Spi {
    type Error = Infallible;
}

impl SpiDevice for Spi {
    fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), Infallible> {
        let bytes = self.0.get().to_be_bytes();
        for op in operations {
            if let Operation::Read(buf) = op {
                buf.copy_from_slice(&bytes[..buf.len()]);
            }
        }
        Ok(())
    }
}

struct NoDelay(u32);

impl DelayNs for NoDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.0 += ns / 1_000_000;
    }
}

struct Rig {
    frame: Rc<Cell<u32>>,
    pwm: Pwm,
    in1: Pin,
    in2: Pin,
    ssr: Pin,
}

fn rig() -> (
    Rig,
    HardwareAdapter<Spi, impl FnMut() -> Option<u16>, Pwm, Pin, Pin, Pin>,
) {
    let rig = Rig {
        frame: Rc::new(Cell::new(encode_frame(25.0))),
        pwm: Pwm::default(),
        in1: Pin::default(),
        in2: Pin::default(),
        ssr: Pin::default(),
    };
    let fan = FanDriver::new(rig.pwm.clone(), rig.in1.clone(), rig.in2.clone()).unwrap();
    let heater = HeaterDriver::new_active_high(rig.ssr.clone(), 2000).unwrap();
    let adapter = HardwareAdapter::new(
        Max31855::new(Spi(rig.frame.clone())),
        || Some(512),
        fan,
        heater,
    );
    (rig, adapter)
}

#[test]
fn preheat_drives_real_pins() {
    let (rig, mut hw) = rig();
    let mut sink = CollectSink::new();
    let mut app = RoasterService::new(RoasterConfig::default());
    app.start(&mut sink);

    rig.frame.set(encode_frame(120.0));
    app.handle_command(Command::StartPreheat { target_c: Some(180.0) }, 0, &mut hw, &mut sink);
    app.tick(100, &mut hw, &mut sink);
    app.tick(200, &mut hw, &mut sink);

    assert_eq!(app.state(), StateId::Preheat);
    assert!(rig.in1.0.get());
    assert!(!rig.in2.0.get());
    assert_eq!(rig.pwm.0.get(), 127);
    // 60 °C below target: the PID saturates and the SSR is on.
    assert!(rig.ssr.0.get());
    assert!(hw.heater().is_on());
    assert_eq!(hw.fan().current_duty(), 50);
}

#[test]
fn over_temperature_drops_every_output() {
    let (rig, mut hw) = rig();
    let mut sink = CollectSink::new();
    let mut app = RoasterService::new(RoasterConfig::default());
    app.start(&mut sink);

    app.handle_command(Command::StartPreheat { target_c: None }, 0, &mut hw, &mut sink);
    rig.frame.set(encode_frame(265.0));
    app.tick(100, &mut hw, &mut sink);

    assert_eq!(app.state(), StateId::Error);
    assert!(!rig.ssr.0.get());
    assert!(!rig.in1.0.get());
    assert!(!rig.in2.0.get());
    assert_eq!(rig.pwm.0.get(), 0);
}

#[test]
fn maintenance_pin_test_runs_only_when_off() {
    let (rig, mut hw) = rig();
    let mut sink = CollectSink::new();
    let mut app = RoasterService::new(RoasterConfig::default());
    app.start(&mut sink);
    let mut delay = NoDelay(0);

    {
        let mut session = app.enter_maintenance().expect("OFF allows maintenance");
        session.fan_pin_test(&mut hw, &mut delay);
        assert!(!session.actuator_report().fan_enabled);
    }
    assert_eq!(delay.0, 5000);
    // Restored to the commanded (off) state afterwards.
    assert!(!rig.in1.0.get());
    assert!(!rig.in2.0.get());
    assert_eq!(rig.pwm.0.get(), 0);

    app.handle_command(Command::EnterManual, 0, &mut hw, &mut sink);
    assert_eq!(
        app.enter_maintenance().err(),
        Some(MaintenanceError::NotIdle)
    );
}
