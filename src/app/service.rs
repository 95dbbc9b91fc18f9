//! Application service: the hexagonal core.
//!
//! [`RoasterService`] owns the FSM, safety supervisor, link monitor and
//! shared context.  It exposes a clean, hardware-agnostic API.  All I/O
//! flows through port traits injected at call sites, making the entire
//! service testable with mock adapters.
//!
//! ```text
//!  SensorPort ──▶ ┌────────────────────────┐ ──▶ EventSink
//!                 │     RoasterService     │
//! ActuatorPort ◀──│  FSM · Safety · PID    │
//!                 └────────────────────────┘
//! ```

use embedded_hal::delay::DelayNs;
use log::{debug, info, warn};

use crate::config::RoasterConfig;
use crate::diagnostics::{self, ActuatorReport, FAN_PIN_TEST_HOLD_MS};
use crate::error::{CommandError, ConfigError, MaintenanceError};
use crate::events::CommandConsumer;
use crate::fsm::context::RoasterContext;
use crate::fsm::states::build_state_table;
use crate::fsm::{Decision, Event, Fsm, StateId};
use crate::rpc::link::{LinkEvent, LinkMonitor};
use crate::rpc::messages::decode_command;
use crate::safety::{LatchedFault, SafetyInputs, SafetyLimits, SafetyStatus, SafetySupervisor};
use crate::scheduler::PeriodicTimer;
use crate::sensors::thermocouple::read_validated;

use super::commands::Command;
use super::events::{AppEvent, LogLevel, TelemetryData, round1};
use super::ports::{ActuatorPort, ConfigPort, EventSink, MaintenancePort, SensorPort};

/// Quiet period after the last config change before auto-save.
const CONFIG_SAVE_DELAY_MS: u64 = 5000;

/// Source tag on console log lines about the actuators.
const HW_LOG_SOURCE: &str = "HW";

/// Actuator outputs as last reported on the console.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct ReportedOutputs {
    /// Fan duty (%) while running.
    fan: Option<u8>,
    heater: bool,
}

// ───────────────────────────────────────────────────────────────
// RoasterService
// ───────────────────────────────────────────────────────────────

/// The application service orchestrates all domain logic.
pub struct RoasterService {
    fsm: Fsm,
    ctx: RoasterContext,
    safety: SafetySupervisor,
    link: LinkMonitor,
    telemetry: PeriodicTimer,
    reported: ReportedOutputs,
    config_dirty: bool,
    dirty_since_ms: u64,
}

impl RoasterService {
    /// Construct the service from an already validated configuration
    /// (see [`crate::config::load`]).
    ///
    /// Does **not** start the FSM: call [`start`](Self::start) next.
    pub fn new(config: RoasterConfig) -> Self {
        let safety = SafetySupervisor::new(&config);
        let link = LinkMonitor::new(config.disconnect_timeout_ms);
        let telemetry = PeriodicTimer::new(config.telemetry_interval_ms);
        let ctx = RoasterContext::new(config);
        let fsm = Fsm::new(build_state_table(), StateId::Off);

        Self {
            fsm,
            ctx,
            safety,
            link,
            telemetry,
            reported: ReportedOutputs::default(),
            config_dirty: false,
            dirty_since_ms: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Start the FSM in OFF.
    pub fn start(&mut self, sink: &mut impl EventSink) {
        self.fsm.start(&mut self.ctx);
        sink.emit(&AppEvent::Started(self.fsm.current_state()));
        info!("RoasterService started in {}", self.fsm.current_state().name());
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one full control cycle:
    /// sense → condition → safety → FSM → actuators.
    ///
    /// `hw` implements both [`SensorPort`] and [`ActuatorPort`]; one
    /// mutable borrow covers sensing and actuation.
    pub fn tick(
        &mut self,
        now_ms: u64,
        hw: &mut (impl SensorPort + ActuatorPort),
        sink: &mut impl EventSink,
    ) {
        self.advance_clock(now_ms);
        let prev_state = self.fsm.current_state();

        // 0. Link supervision
        if self.link.poll(now_ms) == Some(LinkEvent::Disconnected) {
            sink.emit(&AppEvent::LinkLost);
            self.fsm.handle_event(&Event::Disconnected, &mut self.ctx);
        }

        // 1. Sense
        let raw_frame = read_validated(|| hw.read_thermocouple_frame());
        let safety_adc = hw.read_safety_adc();

        // 2. Condition
        self.ctx.chamber = self.ctx.conditioner.condition(raw_frame, safety_adc, now_ms);

        // 3. Safety evaluation (overrides anything the FSM wants this tick)
        let inputs = self.safety_inputs();
        match self.safety.evaluate(&inputs) {
            SafetyStatus::Tripped => self.enter_error(sink),
            SafetyStatus::Latched if self.fsm.current_state() != StateId::Error => {
                self.enter_error(sink);
            }
            _ => {}
        }

        // 4. FSM tick, then route any fault a state handler raised
        self.fsm.tick(&mut self.ctx);
        if let Some(request) = self.ctx.fault_request.take() {
            if self.safety.trigger_fault(request.code, &request.message, true) {
                self.enter_error(sink);
            }
        }

        // 5. Apply actuator commands via ActuatorPort
        self.apply_actuators(hw);
        self.report_outputs(sink);

        // 6. Emit state change if the FSM moved
        self.emit_state_change(prev_state, sink);

        // 7. Periodic telemetry
        if self.telemetry.poll(now_ms) {
            sink.emit(&AppEvent::Telemetry(self.build_telemetry()));
        }
    }

    // ── Command handling ──────────────────────────────────────

    /// Process one raw inbound message.  Any message, valid or not,
    /// counts as link activity.
    pub fn receive(
        &mut self,
        bytes: &[u8],
        now_ms: u64,
        hw: &mut impl ActuatorPort,
        sink: &mut impl EventSink,
    ) {
        if self.link.on_receive(now_ms) == Some(LinkEvent::Connected) {
            sink.emit(&AppEvent::LinkConnected { at_ms: now_ms });
        }
        match decode_command(bytes) {
            Ok(cmd) => self.handle_command(cmd, now_ms, hw, sink),
            Err(e) => self.reject(e, sink),
        }
    }

    /// Drain every message queued by the transport side.
    pub fn drain_commands(
        &mut self,
        queue: &mut CommandConsumer<'_>,
        now_ms: u64,
        hw: &mut impl ActuatorPort,
        sink: &mut impl EventSink,
    ) {
        while let Some(message) = queue.pop() {
            self.receive(&message, now_ms, hw, sink);
        }
    }

    /// Process a decoded operator command.
    pub fn handle_command(
        &mut self,
        cmd: Command,
        now_ms: u64,
        hw: &mut impl ActuatorPort,
        sink: &mut impl EventSink,
    ) {
        self.advance_clock(now_ms);
        match cmd {
            Command::GetState => {
                sink.emit(&AppEvent::Telemetry(self.build_telemetry()));
            }
            Command::DebugFan => {
                let report = self.actuator_report();
                info!("Actuator report: {report:?}");
                sink.emit(&AppEvent::ActuatorReport(report));
            }
            Command::TestFanPins => {
                warn!("testFanPins refused: only available in a maintenance session");
            }
            _ => {
                if let Some(event) = cmd.to_event(&self.ctx.config) {
                    self.apply_event(&event, hw, sink);
                }
            }
        }
    }

    // ── Configuration ─────────────────────────────────────────

    /// Replace the live configuration.  Rejected configs leave the
    /// current one untouched.
    pub fn update_config(&mut self, config: RoasterConfig) -> Result<(), ConfigError> {
        if let Err(e) = config.validate() {
            warn!("Config update rejected: {e}");
            return Err(e);
        }
        self.safety.set_limits(SafetyLimits::from_config(&config));
        self.link.set_timeout(config.disconnect_timeout_ms);
        self.telemetry.set_interval(config.telemetry_interval_ms);
        self.ctx.apply_config(config);
        self.mark_config_dirty();
        info!("Configuration updated at runtime");
        Ok(())
    }

    /// Mark the config as modified.
    pub fn mark_config_dirty(&mut self) {
        if !self.config_dirty {
            self.config_dirty = true;
            self.dirty_since_ms = self.ctx.now_ms;
        }
    }

    /// Save the config once it has been stable for a few seconds.
    /// Returns `true` if the config was saved.
    pub fn auto_save_if_needed(&mut self, storage: &mut impl ConfigPort) -> bool {
        if !self.config_dirty
            || self.ctx.now_ms.saturating_sub(self.dirty_since_ms) < CONFIG_SAVE_DELAY_MS
        {
            return false;
        }
        self.save_config(storage)
    }

    /// Force-save if dirty (call before power-down).
    pub fn force_save_if_dirty(&mut self, storage: &mut impl ConfigPort) {
        if self.config_dirty {
            self.save_config(storage);
        }
    }

    fn save_config(&mut self, storage: &mut impl ConfigPort) -> bool {
        match self.ctx.config.to_bytes().and_then(|bytes| storage.save(&bytes)) {
            Ok(()) => {
                self.config_dirty = false;
                info!("Config saved");
                true
            }
            Err(e) => {
                warn!("Config save failed: {e}");
                false
            }
        }
    }

    // ── Maintenance ───────────────────────────────────────────

    /// Open an offline maintenance session.  Only allowed in OFF; the
    /// session borrows the service exclusively, so no tick can run
    /// until it is dropped.
    pub fn enter_maintenance(&mut self) -> Result<MaintenanceSession<'_>, MaintenanceError> {
        let state = self.fsm.current_state();
        if state != StateId::Off {
            warn!("Maintenance refused in {}", state.name());
            return Err(MaintenanceError::NotIdle);
        }
        info!("Maintenance session opened");
        Ok(MaintenanceSession { service: self })
    }

    // ── Queries ───────────────────────────────────────────────

    /// Build a telemetry snapshot from the current context.
    pub fn build_telemetry(&self) -> TelemetryData {
        let state = self.fsm.current_state();
        let ctx = &self.ctx;
        let chamber_temp = if ctx.chamber.reading.is_valid() {
            ctx.chamber.filtered_c.map(round1)
        } else {
            None
        };

        TelemetryData {
            timestamp_ms: ctx.now_ms,
            state,
            state_id: state as u8,
            chamber_temp,
            heater_temp: round1(ctx.chamber.heater_c),
            setpoint: round1(ctx.active_setpoint(state)),
            fan_speed: if ctx.commands.fan_enabled {
                ctx.commands.fan_duty
            } else {
                0
            },
            heater_power: ctx.commands.heater_power_pct,
            heater_enabled: ctx.commands.heater_enabled,
            pid_enabled: ctx.pid.is_enabled(),
            roast_time_ms: ctx.session.elapsed_ms(ctx.now_ms),
            first_crack_marked: ctx.session.first_crack_ms.is_some(),
            first_crack_time_ms: ctx.session.first_crack_ms,
            ror: round1(ctx.chamber.ror_c_per_min),
            error: if state == StateId::Error {
                ctx.error.clone()
            } else {
                None
            },
        }
    }

    pub fn actuator_report(&self) -> ActuatorReport {
        ActuatorReport::new(
            self.fsm.current_state(),
            &self.ctx.commands,
            self.safety.is_ok(),
        )
    }

    /// Current FSM state.
    pub fn state(&self) -> StateId {
        self.fsm.current_state()
    }

    pub fn latched_fault(&self) -> Option<&LatchedFault> {
        self.safety.latched()
    }

    pub fn safety(&self) -> &SafetySupervisor {
        &self.safety
    }

    /// Read-only view of the blackboard.
    pub fn context(&self) -> &RoasterContext {
        &self.ctx
    }

    pub fn config(&self) -> &RoasterConfig {
        &self.ctx.config
    }

    pub fn is_config_dirty(&self) -> bool {
        self.config_dirty
    }

    pub fn link_active(&self) -> bool {
        self.link.is_active()
    }

    // ── Internal ──────────────────────────────────────────────

    /// Commands may arrive stamped slightly behind the last tick; time
    /// never moves backwards inside the context.
    fn advance_clock(&mut self, now_ms: u64) {
        self.ctx.now_ms = self.ctx.now_ms.max(now_ms);
    }

    fn apply_event(&mut self, event: &Event, hw: &mut impl ActuatorPort, sink: &mut impl EventSink) {
        let prev_state = self.fsm.current_state();
        let crack_before = self.ctx.session.first_crack_ms;

        let decision = self.fsm.handle_event(event, &mut self.ctx);

        if *event == Event::ClearFault && decision != Decision::Ignore {
            self.safety.clear_fault();
            sink.emit(&AppEvent::FaultCleared);
        }

        if let (None, Some(mark)) = (crack_before, self.ctx.session.first_crack_ms) {
            sink.emit(&AppEvent::FirstCrack {
                at_ms: self.ctx.now_ms,
                roast_time_ms: mark,
                chamber_c: self.ctx.chamber.filtered_c.map(round1),
            });
        }

        self.apply_actuators(hw);
        self.report_outputs(sink);
        self.emit_state_change(prev_state, sink);
    }

    fn reject(&self, error: CommandError, sink: &mut impl EventSink) {
        if self.ctx.config.report_unknown_commands {
            warn!("Inbound message rejected: {error}");
            sink.emit(&AppEvent::CommandRejected(error));
        } else {
            debug!("Inbound message ignored: {error}");
        }
    }

    fn safety_inputs(&self) -> SafetyInputs {
        let chamber = &self.ctx.chamber;
        let cmds = &self.ctx.commands;
        SafetyInputs {
            chamber_c: chamber.filtered_c,
            heater_c: chamber.heater_c,
            tc_fault: chamber.reading.fault,
            heater_enabled: cmds.heater_enabled,
            fan_enabled: cmds.fan_enabled,
            fan_duty: cmds.fan_duty,
        }
    }

    /// Force the FSM into `Error` with the supervisor's latched fault.
    fn enter_error(&mut self, sink: &mut impl EventSink) {
        let Some(fault) = self.safety.latched().cloned() else {
            return;
        };
        self.fsm.force_error(fault.clone(), &mut self.ctx);
        sink.emit(&AppEvent::FaultLatched {
            at_ms: self.ctx.now_ms,
            fault,
        });
    }

    fn emit_state_change(&self, prev_state: StateId, sink: &mut impl EventSink) {
        let new_state = self.fsm.current_state();
        if new_state != prev_state {
            sink.emit(&AppEvent::StateChanged {
                from: prev_state,
                to: new_state,
            });
        }
    }

    /// Put a console log line on the event stream for every fan or
    /// heater change since the last report.
    fn report_outputs(&mut self, sink: &mut impl EventSink) {
        let r = self.actuator_report();
        let live = r.safety_ok && r.state != StateId::Error;
        let now = ReportedOutputs {
            fan: (live && r.fan_enabled).then_some(r.fan_duty),
            heater: live && r.heater_enabled,
        };
        let before = self.reported;
        self.reported = now;

        let at_ms = self.ctx.now_ms;
        let mut emit = |level: LogLevel, message: &str| {
            sink.emit(&AppEvent::log(at_ms, level, HW_LOG_SOURCE, message));
        };

        match (before.fan, now.fan) {
            (None, Some(duty)) => emit(
                LogLevel::Info,
                &format!("Fan enabled at {duty}% (PWM={})", r.fan_pwm),
            ),
            (Some(_), None) => emit(LogLevel::Info, "Fan disabled"),
            (Some(old), Some(duty)) if old != duty => emit(
                LogLevel::Debug,
                &format!("Fan speed set to {duty}% (PWM={})", r.fan_pwm),
            ),
            _ => {}
        }
        match (before.heater, now.heater) {
            (false, true) => emit(LogLevel::Info, "Heater enabled"),
            (true, false) => emit(LogLevel::Info, "Heater disabled"),
            _ => {}
        }
    }

    /// Translate the commanded actuator state into port calls.  The fan
    /// is written before the heater so the heater never leads airflow.
    fn apply_actuators(&self, hw: &mut impl ActuatorPort) {
        if self.fsm.current_state() == StateId::Error || !self.safety.is_ok() {
            hw.all_off();
            return;
        }

        let cmds = &self.ctx.commands;
        hw.set_fan(cmds.fan_enabled, cmds.fan_duty);
        if cmds.heater_enabled {
            hw.drive_heater(cmds.heater_level, self.ctx.now_ms);
        } else {
            hw.heater_off();
        }
    }
}

// ───────────────────────────────────────────────────────────────
// MaintenanceSession
// ───────────────────────────────────────────────────────────────

/// Exclusive, offline access for bench diagnostics.
pub struct MaintenanceSession<'a> {
    service: &'a mut RoasterService,
}

impl MaintenanceSession<'_> {
    /// Hold the blower inputs high for five seconds, then restore the
    /// commanded (all off) actuator state.
    pub fn fan_pin_test(
        &mut self,
        hw: &mut (impl MaintenancePort + ActuatorPort),
        delay: &mut impl DelayNs,
    ) {
        diagnostics::run_fan_pin_test(hw, delay, FAN_PIN_TEST_HOLD_MS);
        self.service.apply_actuators(hw);
    }

    pub fn actuator_report(&self) -> ActuatorReport {
        self.service.actuator_report()
    }
}

impl Drop for MaintenanceSession<'_> {
    fn drop(&mut self) {
        info!("Maintenance session closed");
    }
}
