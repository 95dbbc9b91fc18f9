//! Concrete state handler functions and table builder.
//!
//! ```text
//!            ┌──[START_FAN_ONLY]──▶ FAN_ONLY ──[EXIT / DISCONNECTED]──┐
//!            │                         │                              │
//!   OFF ◀────┤                 [START_PREHEAT]                        │
//!    │ ▲     │                         ▼                              │
//!    │ │     └──[START_PREHEAT]──▶ PREHEAT ──[LOAD_BEANS]──▶ ROASTING │
//!    │ │                               │                        │     │
//!    │ │                       [DISCONNECTED]          [END_ROAST /   │
//!    │ │                               ▼                DISCONNECTED] │
//!    │ └────────[COOL_COMPLETE]──── COOLING ◀───────────────────┘     │
//!    │                                                                │
//!    └──[ENTER_MANUAL]──▶ MANUAL ──[EXIT / DISCONNECTED]──▶ OFF ◀─────┘
//!
//!  Any mode except OFF/ERROR ──[STOP]──▶ OFF
//!  Any mode ──[fatal fault]──▶ ERROR ──[CLEAR_FAULT]──▶ OFF
//! ```

use super::context::{FaultRequest, RoasterContext};
use super::{Event, StateDescriptor, StateId};
use crate::error::{FaultCode, fault_message};
use log::{error, info};

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static state table.  Called once at startup.
pub fn build_state_table() -> [StateDescriptor; StateId::COUNT] {
    [
        // Index 0: Off
        StateDescriptor {
            id: StateId::Off,
            on_enter: Some(off_enter),
            on_exit: None,
            on_event: Some(off_event),
            on_update: no_update,
        },
        // Index 1: FanOnly
        StateDescriptor {
            id: StateId::FanOnly,
            on_enter: Some(fan_only_enter),
            on_exit: None,
            on_event: Some(fan_only_event),
            on_update: no_update,
        },
        // Index 2: Preheat
        StateDescriptor {
            id: StateId::Preheat,
            on_enter: Some(preheat_enter),
            on_exit: None,
            on_event: Some(preheat_event),
            on_update: preheat_update,
        },
        // Index 3: Roasting
        StateDescriptor {
            id: StateId::Roasting,
            on_enter: Some(roasting_enter),
            on_exit: None,
            on_event: Some(roasting_event),
            on_update: roasting_update,
        },
        // Index 4: Cooling
        StateDescriptor {
            id: StateId::Cooling,
            on_enter: Some(cooling_enter),
            on_exit: None,
            on_event: None,
            on_update: cooling_update,
        },
        // Index 5: Manual
        StateDescriptor {
            id: StateId::Manual,
            on_enter: Some(manual_enter),
            on_exit: Some(manual_exit),
            on_event: Some(manual_event),
            on_update: manual_update,
        },
        // Index 6: Error
        StateDescriptor {
            id: StateId::Error,
            on_enter: Some(error_enter),
            on_exit: None,
            on_event: None,
            on_update: no_update,
        },
    ]
}

/// Record a transition event's payload before the destination's entry
/// action runs.
pub(crate) fn stage_transition(ctx: &mut RoasterContext, event: &Event) {
    match *event {
        Event::StartFanOnly(speed) => {
            ctx.session.fan_only_pct = clamp_percent(speed).max(1);
        }
        Event::StartPreheat(target) if target > 0.0 => {
            ctx.session.preheat_target_c = target;
        }
        Event::LoadBeans(setpoint) if setpoint > 0.0 => {
            ctx.session.setpoint_c = setpoint;
        }
        Event::ClearFault => {
            ctx.error = None;
        }
        _ => {}
    }
}

fn clamp_percent(value: f32) -> u8 {
    value.clamp(0.0, 100.0) as u8
}

fn no_update(_ctx: &mut RoasterContext) -> Option<StateId> {
    None
}

/// Shared in-place setpoint change for OFF, PREHEAT and ROASTING.
fn apply_setpoint(ctx: &mut RoasterContext, value: f32) {
    ctx.session.setpoint_c = value;
    info!("Setpoint changed to {value:.1} C");
}

/// Run the PID against the filtered chamber temperature and feed the heater.
fn run_pid(ctx: &mut RoasterContext) {
    if let Some(temp) = ctx.chamber.filtered_c {
        let output = ctx.pid.update(temp, ctx.now_ms);
        ctx.commands.set_heater_level(output as u8);
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  OFF
// ═══════════════════════════════════════════════════════════════════════════

fn off_enter(ctx: &mut RoasterContext) {
    ctx.commands.fan_off();
    ctx.commands.heater_off();
    ctx.pid.disable();

    ctx.session.start_ms = None;
    ctx.session.preheat_start_ms = None;
    ctx.session.first_crack_ms = None;
    ctx.conditioner.reset_ror();
    info!("OFF: outputs disabled");
}

fn off_event(ctx: &mut RoasterContext, event: &Event) {
    if let Event::SetSetpoint(v) = *event {
        apply_setpoint(ctx, v);
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  FAN_ONLY: airflow without heat
// ═══════════════════════════════════════════════════════════════════════════

fn fan_only_enter(ctx: &mut RoasterContext) {
    ctx.commands.heater_off();
    ctx.pid.disable();
    ctx.commands.fan_on(ctx.session.fan_only_pct);
    info!("FAN_ONLY: fan at {}%", ctx.session.fan_only_pct);
}

fn fan_only_event(ctx: &mut RoasterContext, event: &Event) {
    if let Event::SetFanSpeed(v) = *event {
        let speed = clamp_percent(v).max(1);
        ctx.session.fan_only_pct = speed;
        ctx.commands.fan_on(speed);
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  PREHEAT: bring the empty chamber up to temperature
// ═══════════════════════════════════════════════════════════════════════════

fn preheat_enter(ctx: &mut RoasterContext) {
    let now = ctx.now_ms;
    if ctx.session.start_ms.is_none() {
        ctx.session.start_ms = Some(now);
        ctx.conditioner.reset_session();
    }
    ctx.session.preheat_start_ms = Some(now);

    ctx.commands.fan_on(ctx.config.fan_preheat_duty);

    ctx.pid.set_setpoint(ctx.session.preheat_target_c);
    ctx.pid.reset();
    ctx.pid.enable();

    ctx.commands.heater_on();
    info!("PREHEAT: target {:.1} C", ctx.session.preheat_target_c);
}

fn preheat_event(ctx: &mut RoasterContext, event: &Event) {
    match *event {
        Event::SetSetpoint(v) => {
            apply_setpoint(ctx, v);
            ctx.session.preheat_target_c = v;
            ctx.pid.set_setpoint(v);
        }
        Event::SetFanSpeed(v) => heating_fan(ctx, v),
        _ => {}
    }
}

fn preheat_update(ctx: &mut RoasterContext) -> Option<StateId> {
    run_pid(ctx);

    let elapsed = ctx
        .session
        .preheat_start_ms
        .map_or(0, |start| ctx.now_ms.saturating_sub(start));
    if elapsed > ctx.config.preheat_timeout_ms && ctx.fault_request.is_none() {
        ctx.fault_request = Some(FaultRequest {
            code: FaultCode::PreheatTimeout,
            message: fault_message(&format!(
                "Preheat exceeded {} minute limit",
                ctx.config.preheat_timeout_ms / 60_000
            )),
        });
    }
    None
}

/// Fan request while the heater is under PID: never below the heating floor.
fn heating_fan(ctx: &mut RoasterContext, value: f32) {
    let speed = clamp_percent(value).max(ctx.config.heating_fan_floor());
    ctx.commands.fan_on(speed);
    info!("Fan speed changed to {speed}%");
}

// ═══════════════════════════════════════════════════════════════════════════
//  ROASTING: beans loaded, PID holds the roast setpoint
// ═══════════════════════════════════════════════════════════════════════════

fn roasting_enter(ctx: &mut RoasterContext) {
    ctx.session.first_crack_ms = None;

    ctx.pid.set_setpoint(ctx.session.setpoint_c);
    ctx.pid.reset();
    ctx.pid.enable();

    ctx.commands.fan_on(ctx.config.fan_roast_default);
    ctx.commands.heater_on();
    ctx.conditioner.reset_ror();
    info!("ROASTING: setpoint {:.1} C", ctx.session.setpoint_c);
}

fn roasting_event(ctx: &mut RoasterContext, event: &Event) {
    match *event {
        Event::SetSetpoint(v) => {
            apply_setpoint(ctx, v);
            ctx.pid.set_setpoint(v);
        }
        Event::SetFanSpeed(v) => heating_fan(ctx, v),
        Event::FirstCrack if ctx.session.first_crack_ms.is_none() => {
            let mark = ctx.session.elapsed_ms(ctx.now_ms);
            ctx.session.first_crack_ms = Some(mark);
            info!("First crack marked at {} s", mark / 1000);
        }
        _ => {}
    }
}

fn roasting_update(ctx: &mut RoasterContext) -> Option<StateId> {
    run_pid(ctx);
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  COOLING: heater off, full airflow until the chamber is cool
// ═══════════════════════════════════════════════════════════════════════════

fn cooling_enter(ctx: &mut RoasterContext) {
    ctx.commands.heater_off();
    ctx.pid.disable();
    ctx.commands.fan_on(ctx.config.fan_cooling_duty);
    info!("COOLING: heater off, fan {}%", ctx.config.fan_cooling_duty);
}

fn cooling_update(ctx: &mut RoasterContext) -> Option<StateId> {
    match ctx.chamber.filtered_c {
        Some(temp) if temp < ctx.config.cooling_target_c => {
            info!("Cooling complete at {temp:.1} C");
            Some(StateId::Off)
        }
        _ => None,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  MANUAL: operator drives fan and heater directly
// ═══════════════════════════════════════════════════════════════════════════

fn manual_enter(ctx: &mut RoasterContext) {
    ctx.session.manual_fan_pct = ctx.config.fan_manual_default;
    ctx.session.manual_heater_pct = 0;

    ctx.commands.fan_on(ctx.session.manual_fan_pct);
    ctx.commands.heater_on();
    ctx.pid.disable();
    info!("MANUAL: direct control");
}

fn manual_exit(ctx: &mut RoasterContext) {
    ctx.session.manual_heater_pct = 0;
}

fn manual_event(ctx: &mut RoasterContext, event: &Event) {
    match *event {
        Event::SetFanSpeed(v) => {
            // The heater stays enabled for the whole mode, so the interlock
            // minimum is the floor here too.
            let speed = clamp_percent(v).max(ctx.config.min_fan_when_heating);
            ctx.session.manual_fan_pct = speed;
            ctx.commands.fan_on(speed);
        }
        Event::SetHeaterPower(v) => {
            let power = clamp_percent(v);
            ctx.session.manual_heater_pct = power;
            ctx.commands.set_heater_percent(power);
            info!("Heater power changed to {power}%");
        }
        _ => {}
    }
}

fn manual_update(ctx: &mut RoasterContext) -> Option<StateId> {
    ctx.commands.set_heater_percent(ctx.session.manual_heater_pct);
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  ERROR: outputs off until the operator clears the fault
// ═══════════════════════════════════════════════════════════════════════════

fn error_enter(ctx: &mut RoasterContext) {
    ctx.commands.fan_off();
    ctx.commands.heater_off();
    ctx.pid.disable();

    match &ctx.error {
        Some(fault) => error!("ERROR: {} - {}", fault.code, fault.message),
        None => error!("ERROR: entered without a latched fault"),
    }
}
