//! Fuzz target: `decode_command`
//!
//! Arbitrary inbound bytes must decode to a command or a typed rejection,
//! never a panic.  Decoded values are always finite.
//!
//! cargo fuzz run fuzz_command_decoder

#![no_main]

use libfuzzer_sys::fuzz_target;
use roaster::app::commands::Command;
use roaster::rpc::messages::decode_command;

fuzz_target!(|data: &[u8]| {
    match decode_command(data) {
        Ok(Command::SetSetpoint(v) | Command::SetFanSpeed(v) | Command::SetHeaterPower(v)) => {
            assert!(v.is_finite());
        }
        Ok(
            Command::StartPreheat { target_c: Some(v) }
            | Command::LoadBeans { setpoint_c: Some(v) }
            | Command::StartFanOnly { fan_speed: Some(v) },
        ) => assert!(v.is_finite()),
        Ok(_) | Err(_) => {}
    }
});
