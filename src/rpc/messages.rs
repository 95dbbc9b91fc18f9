//! JSON message contract with the operator console.
//!
//! Inbound: one object per message with a string `type` field and an
//! optional numeric value field.  Value fields are read from the top
//! level, or from a nested `payload` object when one is present.
//!
//! Outbound: every message is an envelope
//! `{"type":..,"timestamp":<ms>,"payload":{..}}`.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::app::commands::Command;
use crate::app::events::{AppEvent, LogLevel, TelemetryData};
use crate::error::CommandError;
use crate::safety::LatchedFault;

/// Firmware version reported in the `connected` message.
pub const FIRMWARE_VERSION: &str = env!("CARGO_PKG_VERSION");

// ───────────────────────────────────────────────────────────────
// Inbound
// ───────────────────────────────────────────────────────────────

/// Decode one inbound message.
///
/// Absent optional values stay `None`; the service fills them from the
/// configuration.  Non-finite numbers count as absent.
pub fn decode_command(bytes: &[u8]) -> Result<Command, CommandError> {
    let value: Value = serde_json::from_slice(bytes).map_err(|_| CommandError::Malformed)?;
    let object = value.as_object().ok_or(CommandError::Malformed)?;
    let kind = object
        .get("type")
        .and_then(Value::as_str)
        .ok_or(CommandError::Malformed)?;
    let fields = object
        .get("payload")
        .and_then(Value::as_object)
        .unwrap_or(object);

    let command = match kind {
        "startPreheat" => Command::StartPreheat {
            target_c: number(fields, "targetTemp"),
        },
        "loadBeans" => Command::LoadBeans {
            setpoint_c: number(fields, "setpoint"),
        },
        "endRoast" => Command::EndRoast,
        "markFirstCrack" => Command::MarkFirstCrack,
        "stop" => Command::Stop,
        "enterFanOnly" | "startFanOnly" => Command::StartFanOnly {
            fan_speed: number(fields, "fanSpeed"),
        },
        "exitFanOnly" => Command::ExitFanOnly,
        "enterManual" => Command::EnterManual,
        "exitManual" => Command::ExitManual,
        "clearFault" => Command::ClearFault,
        "setSetpoint" => Command::SetSetpoint(required(fields, "value")?),
        "setFanSpeed" => Command::SetFanSpeed(required(fields, "value")?),
        "setHeaterPower" => Command::SetHeaterPower(required(fields, "value")?),
        "getState" => Command::GetState,
        "debugFan" => Command::DebugFan,
        "testFanPins" => Command::TestFanPins,
        _ => return Err(CommandError::Unknown),
    };
    Ok(command)
}

fn number(fields: &Map<String, Value>, key: &str) -> Option<f32> {
    fields
        .get(key)
        .and_then(Value::as_f64)
        .map(|v| v as f32)
        .filter(|v| v.is_finite())
}

fn required(fields: &Map<String, Value>, key: &str) -> Result<f32, CommandError> {
    number(fields, key).ok_or(CommandError::MissingValue)
}

// ───────────────────────────────────────────────────────────────
// Outbound
// ───────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct Envelope<'a, P: Serialize> {
    #[serde(rename = "type")]
    kind: &'static str,
    timestamp: u64,
    payload: &'a P,
}

#[derive(Serialize)]
struct ConnectedPayload {
    firmware: &'static str,
}

#[derive(Serialize)]
struct LogPayload<'a> {
    level: LogLevel,
    source: &'a str,
    message: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RoastEventPayload {
    event: &'static str,
    roast_time_ms: u64,
    chamber_temp: Option<f32>,
}

fn envelope<P: Serialize>(
    kind: &'static str,
    timestamp: u64,
    payload: &P,
) -> Result<String, serde_json::Error> {
    serde_json::to_string(&Envelope {
        kind,
        timestamp,
        payload,
    })
}

/// `roasterState` message.
pub fn encode_telemetry(data: &TelemetryData) -> Result<String, serde_json::Error> {
    envelope("roasterState", data.timestamp_ms, data)
}

/// `error` message for a newly latched fault.
pub fn encode_fault(at_ms: u64, fault: &LatchedFault) -> Result<String, serde_json::Error> {
    envelope("error", at_ms, fault)
}

/// `connected` message.
pub fn encode_connected(at_ms: u64) -> Result<String, serde_json::Error> {
    envelope(
        "connected",
        at_ms,
        &ConnectedPayload {
            firmware: FIRMWARE_VERSION,
        },
    )
}

/// `roastEvent` message for first crack.
pub fn encode_first_crack(
    at_ms: u64,
    roast_time_ms: u64,
    chamber_c: Option<f32>,
) -> Result<String, serde_json::Error> {
    envelope(
        "roastEvent",
        at_ms,
        &RoastEventPayload {
            event: "FIRST_CRACK",
            roast_time_ms,
            chamber_temp: chamber_c,
        },
    )
}

/// `log` message.  Quotes, backslashes and control characters in
/// `message` are escaped by the JSON encoder.
pub fn encode_log(
    at_ms: u64,
    level: LogLevel,
    source: &str,
    message: &str,
) -> Result<String, serde_json::Error> {
    envelope(
        "log",
        at_ms,
        &LogPayload {
            level,
            source,
            message,
        },
    )
}

/// Wire message for an application event, if the console contract has one.
pub fn encode_event(event: &AppEvent) -> Result<Option<String>, serde_json::Error> {
    let line = match event {
        AppEvent::Telemetry(data) => encode_telemetry(data)?,
        AppEvent::FaultLatched { at_ms, fault } => encode_fault(*at_ms, fault)?,
        AppEvent::LinkConnected { at_ms } => encode_connected(*at_ms)?,
        AppEvent::FirstCrack {
            at_ms,
            roast_time_ms,
            chamber_c,
        } => encode_first_crack(*at_ms, *roast_time_ms, *chamber_c)?,
        AppEvent::Log {
            at_ms,
            level,
            source,
            message,
        } => encode_log(*at_ms, *level, source, message)?,
        _ => return Ok(None),
    };
    Ok(Some(line))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FaultCode, fault_message};
    use crate::fsm::StateId;

    #[test]
    fn decodes_values_and_defaults() {
        assert_eq!(
            decode_command(br#"{"type":"startPreheat","targetTemp":190}"#),
            Ok(Command::StartPreheat { target_c: Some(190.0) })
        );
        assert_eq!(
            decode_command(br#"{"type":"startPreheat"}"#),
            Ok(Command::StartPreheat { target_c: None })
        );
        assert_eq!(
            decode_command(br#"{"type":"setFanSpeed","value":75}"#),
            Ok(Command::SetFanSpeed(75.0))
        );
    }

    #[test]
    fn reads_values_from_nested_payload() {
        assert_eq!(
            decode_command(br#"{"type":"setSetpoint","payload":{"value":205.5}}"#),
            Ok(Command::SetSetpoint(205.5))
        );
    }

    #[test]
    fn fan_only_has_two_spellings() {
        let a = decode_command(br#"{"type":"enterFanOnly","fanSpeed":60}"#);
        let b = decode_command(br#"{"type":"startFanOnly","fanSpeed":60}"#);
        assert_eq!(a, b);
        assert_eq!(a, Ok(Command::StartFanOnly { fan_speed: Some(60.0) }));
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!(decode_command(b"not json"), Err(CommandError::Malformed));
        assert_eq!(decode_command(b"[1,2]"), Err(CommandError::Malformed));
        assert_eq!(decode_command(br#"{"type":7}"#), Err(CommandError::Malformed));
        assert_eq!(decode_command(br#"{"type":"selfDestruct"}"#), Err(CommandError::Unknown));
        assert_eq!(
            decode_command(br#"{"type":"setSetpoint"}"#),
            Err(CommandError::MissingValue)
        );
        assert_eq!(
            decode_command(br#"{"type":"setHeaterPower","value":"hot"}"#),
            Err(CommandError::MissingValue)
        );
    }

    fn telemetry() -> TelemetryData {
        TelemetryData {
            timestamp_ms: 12_000,
            state: StateId::Roasting,
            state_id: 3,
            chamber_temp: Some(201.3),
            heater_temp: 240.0,
            setpoint: 205.0,
            fan_speed: 90,
            heater_power: 64,
            heater_enabled: true,
            pid_enabled: true,
            roast_time_ms: 5000,
            first_crack_marked: false,
            first_crack_time_ms: None,
            ror: 12.5,
            error: None,
        }
    }

    #[test]
    fn telemetry_envelope_shape() {
        let json: Value = serde_json::from_str(&encode_telemetry(&telemetry()).unwrap()).unwrap();
        assert_eq!(json["type"], "roasterState");
        assert_eq!(json["timestamp"], 12_000);
        let p = &json["payload"];
        assert_eq!(p["state"], "ROASTING");
        assert_eq!(p["stateId"], 3);
        assert_eq!(p["chamberTemp"].as_f64().map(|v| (v * 10.0).round()), Some(2013.0));
        assert_eq!(p["fanSpeed"], 90);
        assert_eq!(p["heaterEnabled"], true);
        assert_eq!(p["firstCrackMarked"], false);
        assert!(p["firstCrackTimeMs"].is_null());
        assert!(p["error"].is_null());
        assert!(p.get("timestampMs").is_none());
    }

    #[test]
    fn invalid_chamber_reads_null() {
        let mut t = telemetry();
        t.chamber_temp = None;
        let json: Value = serde_json::from_str(&encode_telemetry(&t).unwrap()).unwrap();
        assert!(json["payload"]["chamberTemp"].is_null());
    }

    #[test]
    fn error_payload_carries_code_message_fatal() {
        let fault = LatchedFault {
            code: FaultCode::FanInterlock,
            message: fault_message("Heater enabled without adequate fan"),
            fatal: true,
        };
        let mut t = telemetry();
        t.state = StateId::Error;
        t.error = Some(fault.clone());
        let json: Value = serde_json::from_str(&encode_telemetry(&t).unwrap()).unwrap();
        assert_eq!(json["payload"]["error"]["code"], "FAN_INTERLOCK");
        assert_eq!(json["payload"]["error"]["fatal"], true);

        let json: Value = serde_json::from_str(&encode_fault(5, &fault).unwrap()).unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["payload"]["message"], "Heater enabled without adequate fan");
    }

    #[test]
    fn connected_and_roast_event_messages() {
        let json: Value = serde_json::from_str(&encode_connected(10).unwrap()).unwrap();
        assert_eq!(json["type"], "connected");
        assert_eq!(json["payload"]["firmware"], FIRMWARE_VERSION);

        let json: Value =
            serde_json::from_str(&encode_first_crack(20, 480_000, Some(196.5)).unwrap()).unwrap();
        assert_eq!(json["type"], "roastEvent");
        assert_eq!(json["payload"]["event"], "FIRST_CRACK");
        assert_eq!(json["payload"]["roastTimeMs"], 480_000);
    }

    #[test]
    fn log_message_is_escaped() {
        let line = encode_log(7, LogLevel::Warn, "HW", "pin \"ENA\" stuck\nretrying").unwrap();
        assert!(!line.contains('\n'));
        assert!(line.contains(r#"pin \"ENA\" stuck\nretrying"#));

        let json: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(json["type"], "log");
        assert_eq!(json["timestamp"], 7);
        assert_eq!(json["payload"]["level"], "warn");
        assert_eq!(json["payload"]["source"], "HW");
        assert_eq!(json["payload"]["message"], "pin \"ENA\" stuck\nretrying");
    }

    #[test]
    fn internal_events_have_no_wire_form() {
        assert_eq!(encode_event(&AppEvent::LinkLost).unwrap(), None);
        assert_eq!(
            encode_event(&AppEvent::StateChanged {
                from: StateId::Off,
                to: StateId::Preheat
            })
            .unwrap(),
            None
        );
    }
}
