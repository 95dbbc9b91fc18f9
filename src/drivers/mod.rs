//! Peripheral drivers over `embedded-hal` traits.

pub mod fan;
pub mod heater;
pub mod max31855;
