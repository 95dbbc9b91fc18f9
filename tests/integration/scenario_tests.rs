//! End-to-end roast scenarios through `RoasterService`.
//!
//! Commands go in through the same API the console transport uses;
//! assertions are made on the recorded actuator calls and emitted events.

use crate::mock_hw::{ActuatorCall, CollectSink, MockHardware};

use roaster::app::commands::Command;
use roaster::app::events::AppEvent;
use roaster::app::service::RoasterService;
use roaster::config::RoasterConfig;
use roaster::error::FaultCode;
use roaster::events::CommandQueue;
use roaster::fsm::StateId;

fn make_app() -> (RoasterService, MockHardware, CollectSink) {
    let mut app = RoasterService::new(RoasterConfig::default());
    let hw = MockHardware::new();
    let mut sink = CollectSink::new();
    app.start(&mut sink);
    (app, hw, sink)
}

/// OFF → PREHEAT with the chamber reading `chamber_c`, plus one tick.
fn preheat(app: &mut RoasterService, hw: &mut MockHardware, sink: &mut CollectSink, chamber_c: f32) {
    hw.set_chamber(chamber_c);
    app.handle_command(Command::StartPreheat { target_c: Some(180.0) }, 0, hw, sink);
    app.tick(100, hw, sink);
}

/// OFF → PREHEAT → ROASTING with the chamber at `chamber_c`.
fn roast(app: &mut RoasterService, hw: &mut MockHardware, sink: &mut CollectSink, chamber_c: f32) {
    preheat(app, hw, sink, chamber_c);
    app.handle_command(Command::LoadBeans { setpoint_c: Some(205.0) }, 200, hw, sink);
    app.tick(300, hw, sink);
    assert_eq!(app.state(), StateId::Roasting);
}

// ── Scenario A: START_PREHEAT from OFF ───────────────────────

#[test]
fn start_preheat_enables_fan_heater_pid_and_timer() {
    let (mut app, mut hw, mut sink) = make_app();
    assert_eq!(app.state(), StateId::Off);

    app.handle_command(Command::StartPreheat { target_c: Some(180.0) }, 1000, &mut hw, &mut sink);

    assert_eq!(app.state(), StateId::Preheat);
    assert!(hw.fan_on());
    assert_eq!(hw.fan_duty(), 50);
    assert!(hw.heater_driven());

    let t = app.build_telemetry();
    assert_eq!(t.setpoint, 180.0);
    assert!(t.pid_enabled);
    assert!(t.heater_enabled);

    app.tick(6000, &mut hw, &mut sink);
    assert_eq!(app.build_telemetry().roast_time_ms, 5000);
    assert!(sink.events.contains(&AppEvent::StateChanged {
        from: StateId::Off,
        to: StateId::Preheat
    }));
}

// ── Scenario B: over-temperature in PREHEAT ──────────────────

#[test]
fn chamber_over_limit_latches_and_forces_outputs_off() {
    // The filter is reseeded at PREHEAT entry, so the first reading is
    // taken as-is.
    let (mut app, mut hw, mut sink) = make_app();
    preheat(&mut app, &mut hw, &mut sink, 261.0);

    assert_eq!(app.state(), StateId::Error);
    let fault = app.latched_fault().expect("fault latched");
    assert_eq!(fault.code, FaultCode::OverTempChamber);
    assert!(fault.fatal);
    assert_eq!(hw.calls.last(), Some(&ActuatorCall::AllOff));
    assert!(!hw.fan_on());
    assert!(!hw.heater_driven());

    let t = app.build_telemetry();
    assert_eq!(t.state, StateId::Error);
    assert_eq!(t.error.map(|e| e.code), Some(FaultCode::OverTempChamber));
}

#[test]
fn latched_fault_survives_until_cleared() {
    let (mut app, mut hw, mut sink) = make_app();
    preheat(&mut app, &mut hw, &mut sink, 261.0);
    assert_eq!(app.state(), StateId::Error);

    hw.set_chamber(25.0);
    for t in 2..20 {
        app.tick(t * 100, &mut hw, &mut sink);
        assert_eq!(app.state(), StateId::Error);
    }
    app.handle_command(Command::Stop, 2000, &mut hw, &mut sink);
    app.handle_command(Command::StartPreheat { target_c: None }, 2000, &mut hw, &mut sink);
    assert_eq!(app.state(), StateId::Error);

    app.handle_command(Command::ClearFault, 2100, &mut hw, &mut sink);
    assert_eq!(app.state(), StateId::Off);
    assert!(app.latched_fault().is_none());
}

// ── Scenario C: invalid event for mode ───────────────────────

#[test]
fn load_beans_while_roasting_is_a_no_op() {
    let (mut app, mut hw, mut sink) = make_app();
    roast(&mut app, &mut hw, &mut sink, 190.0);
    let before = app.build_telemetry();
    let events_before = sink.events.len();

    app.handle_command(Command::LoadBeans { setpoint_c: Some(230.0) }, 400, &mut hw, &mut sink);

    assert_eq!(app.state(), StateId::Roasting);
    assert_eq!(app.build_telemetry().setpoint, before.setpoint);
    assert_eq!(sink.events.len(), events_before);
}

// ── Scenario D: cooling completes ────────────────────────────

#[test]
fn cooling_below_target_returns_to_off_and_resets_session() {
    let (mut app, mut hw, mut sink) = make_app();
    roast(&mut app, &mut hw, &mut sink, 200.0);
    app.handle_command(Command::MarkFirstCrack, 60_000, &mut hw, &mut sink);
    assert!(app.build_telemetry().first_crack_marked);

    app.handle_command(Command::EndRoast, 90_000, &mut hw, &mut sink);
    assert_eq!(app.state(), StateId::Cooling);
    assert_eq!(hw.fan_duty(), 100);
    assert!(!hw.heater_driven());

    hw.set_chamber(40.0);
    let mut t = 90_000;
    while app.state() == StateId::Cooling && t < 200_000 {
        t += 1000;
        app.tick(t, &mut hw, &mut sink);
    }

    assert_eq!(app.state(), StateId::Off);
    let telem = app.build_telemetry();
    assert_eq!(telem.roast_time_ms, 0);
    assert!(!telem.first_crack_marked);
    assert_eq!(telem.first_crack_time_ms, None);
    assert!(!hw.fan_on());
}

// ── Link supervision ─────────────────────────────────────────

#[test]
fn link_silence_during_roast_cools_once() {
    let (mut app, mut hw, mut sink) = make_app();
    hw.set_chamber(190.0);
    app.receive(br#"{"type":"startPreheat"}"#, 0, &mut hw, &mut sink);
    app.receive(br#"{"type":"loadBeans","setpoint":210}"#, 1000, &mut hw, &mut sink);
    assert_eq!(app.state(), StateId::Roasting);

    for t in (2000..=6000).step_by(1000) {
        app.tick(t, &mut hw, &mut sink);
    }
    assert_eq!(app.state(), StateId::Roasting);

    app.tick(6001, &mut hw, &mut sink);
    assert_eq!(app.state(), StateId::Cooling);

    for t in (7000..12_000).step_by(1000) {
        app.tick(t, &mut hw, &mut sink);
    }
    assert_eq!(sink.count(|e| *e == AppEvent::LinkLost), 1);
    assert_eq!(app.state(), StateId::Cooling);
}

#[test]
fn link_silence_in_fan_only_turns_off() {
    let (mut app, mut hw, mut sink) = make_app();
    app.receive(br#"{"type":"enterFanOnly","fanSpeed":70}"#, 0, &mut hw, &mut sink);
    assert_eq!(app.state(), StateId::FanOnly);
    assert_eq!(hw.fan_duty(), 70);

    app.tick(5001, &mut hw, &mut sink);
    assert_eq!(app.state(), StateId::Off);
}

// ── Manual mode ──────────────────────────────────────────────

#[test]
fn manual_mode_drives_heater_and_keeps_interlock_satisfied() {
    let (mut app, mut hw, mut sink) = make_app();
    app.handle_command(Command::EnterManual, 0, &mut hw, &mut sink);
    assert_eq!(app.state(), StateId::Manual);

    app.handle_command(Command::SetHeaterPower(50.0), 100, &mut hw, &mut sink);
    assert_eq!(hw.calls.last(), Some(&ActuatorCall::DriveHeater { level: 127 }));

    // Below the interlock minimum: clamped up rather than tripping.
    app.handle_command(Command::SetFanSpeed(10.0), 200, &mut hw, &mut sink);
    assert_eq!(hw.fan_duty(), app.config().min_fan_when_heating);
    for t in 3..10 {
        app.tick(t * 100, &mut hw, &mut sink);
    }
    assert_eq!(app.state(), StateId::Manual);
    assert!(hw.fan_duty() >= app.config().min_fan_when_heating);

    app.handle_command(Command::ExitManual, 1000, &mut hw, &mut sink);
    assert_eq!(app.state(), StateId::Off);
    assert!(!hw.heater_driven());
}

#[test]
fn heater_is_never_driven_without_adequate_fan() {
    let (mut app, mut hw, mut sink) = make_app();
    roast(&mut app, &mut hw, &mut sink, 180.0);
    app.handle_command(Command::SetFanSpeed(5.0), 400, &mut hw, &mut sink);
    for t in 5..40 {
        app.tick(t * 100, &mut hw, &mut sink);
    }

    let min = app.config().min_fan_when_heating;
    let mut fan_duty = 0;
    for call in &hw.calls {
        match call {
            ActuatorCall::SetFan { enabled, duty } => fan_duty = if *enabled { *duty } else { 0 },
            ActuatorCall::AllOff => fan_duty = 0,
            ActuatorCall::DriveHeater { .. } => assert!(fan_duty >= min),
            ActuatorCall::HeaterOff => {}
        }
    }
}

// ── Command queue ────────────────────────────────────────────

#[test]
fn queued_commands_are_applied_in_order() {
    let (mut app, mut hw, mut sink) = make_app();
    let mut queue = CommandQueue::new();
    let (mut tx, mut rx) = queue.split();

    tx.push(br#"{"type":"startPreheat","targetTemp":190}"#).unwrap();
    tx.push(br#"{"type":"setSetpoint","value":195}"#).unwrap();
    tx.push(b"garbage").unwrap();

    app.drain_commands(&mut rx, 0, &mut hw, &mut sink);
    assert!(rx.is_empty());
    assert_eq!(app.state(), StateId::Preheat);
    assert_eq!(app.build_telemetry().setpoint, 195.0);
    assert!(app.link_active());
}
