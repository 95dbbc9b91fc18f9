//! Closed-loop heater control.

pub mod pid;
pub mod time_proportion;
