//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the `log` facade (UART / USB-CDC in production).  The JSON console
//! link is a separate sink, [`super::json_sink::JsonLineSink`].

use log::{Level, error, info, log, warn};

use crate::app::events::{AppEvent, LogLevel};
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Telemetry(t) => {
                let chamber = t
                    .chamber_temp
                    .map_or_else(|| "--".into(), |c| format!("{c:.1}"));
                info!(
                    "TELEM | state={} | T={}\u{00b0}C sp={:.1} ror={:.1} | heater={:.1}\u{00b0}C {}% | \
                     fan={}% | pid={} | t={}s",
                    t.state.name(),
                    chamber,
                    t.setpoint,
                    t.ror,
                    t.heater_temp,
                    t.heater_power,
                    t.fan_speed,
                    if t.pid_enabled { "on" } else { "off" },
                    t.roast_time_ms / 1000,
                );
            }
            AppEvent::StateChanged { from, to } => {
                info!("STATE | {} -> {}", from.name(), to.name());
            }
            AppEvent::FaultLatched { fault, .. } => {
                error!("FAULT | {} {} fatal={}", fault.code, fault.message, fault.fatal);
            }
            AppEvent::FaultCleared => {
                info!("FAULT | cleared");
            }
            AppEvent::FirstCrack { roast_time_ms, .. } => {
                info!("ROAST | first crack at {}s", roast_time_ms / 1000);
            }
            AppEvent::LinkConnected { .. } => {
                info!("LINK | connected");
            }
            AppEvent::LinkLost => {
                warn!("LINK | lost");
            }
            AppEvent::ActuatorReport(r) => {
                info!(
                    "ACT | fan={} duty={}% pwm={} | heater={} level={} ({}%) | safety_ok={}",
                    r.fan_enabled,
                    r.fan_duty,
                    r.fan_pwm,
                    r.heater_enabled,
                    r.heater_level,
                    r.heater_power_pct,
                    r.safety_ok,
                );
            }
            AppEvent::CommandRejected(e) => {
                warn!("CMD | rejected: {e}");
            }
            AppEvent::Started(state) => {
                info!("START | initial_state={}", state.name());
            }
            AppEvent::Log {
                level,
                source,
                message,
                ..
            } => {
                let level = match level {
                    LogLevel::Debug => Level::Debug,
                    LogLevel::Info => Level::Info,
                    LogLevel::Warn => Level::Warn,
                    LogLevel::Error => Level::Error,
                };
                log!(level, "{source} | {message}");
            }
        }
    }
}
