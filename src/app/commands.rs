//! Inbound operator commands.
//!
//! The wire decoder ([`crate::rpc::messages::decode_command`]) produces
//! these; the [`RoasterService`](super::service::RoasterService) maps
//! most of them onto FSM [`Event`]s.  Absent values stay `None` here and
//! are resolved against the configuration in [`Command::to_event`].

use crate::config::RoasterConfig;
use crate::fsm::Event;

/// Commands that external adapters can send into the application core.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    StartPreheat { target_c: Option<f32> },
    LoadBeans { setpoint_c: Option<f32> },
    EndRoast,
    MarkFirstCrack,
    Stop,
    StartFanOnly { fan_speed: Option<f32> },
    ExitFanOnly,
    EnterManual,
    ExitManual,
    ClearFault,
    SetSetpoint(f32),
    SetFanSpeed(f32),
    SetHeaterPower(f32),

    /// Emit a telemetry snapshot now.
    GetState,
    /// Emit an actuator status report.
    DebugFan,
    /// Bench pin test.  Refused on the control path.
    TestFanPins,
}

impl Command {
    /// FSM event for this command, or `None` for commands the service
    /// answers itself.
    pub fn to_event(&self, config: &RoasterConfig) -> Option<Event> {
        let event = match *self {
            Self::StartPreheat { target_c } => {
                Event::StartPreheat(target_c.unwrap_or(config.default_preheat_c))
            }
            Self::LoadBeans { setpoint_c } => {
                Event::LoadBeans(setpoint_c.unwrap_or(config.default_roast_setpoint_c))
            }
            Self::EndRoast => Event::EndRoast,
            Self::MarkFirstCrack => Event::FirstCrack,
            Self::Stop => Event::Stop,
            Self::StartFanOnly { fan_speed } => {
                Event::StartFanOnly(fan_speed.unwrap_or(f32::from(config.fan_only_default)))
            }
            Self::ExitFanOnly => Event::ExitFanOnly,
            Self::EnterManual => Event::EnterManual,
            Self::ExitManual => Event::ExitManual,
            Self::ClearFault => Event::ClearFault,
            Self::SetSetpoint(v) => Event::SetSetpoint(v),
            Self::SetFanSpeed(v) => Event::SetFanSpeed(v),
            Self::SetHeaterPower(v) => Event::SetHeaterPower(v),
            Self::GetState | Self::DebugFan | Self::TestFanPins => return None,
        };
        Some(event)
    }
}
