//! Fluid-bed coffee roaster controller library.
//!
//! Pure control logic (conditioning, PID, safety supervision, the mode
//! FSM) behind port traits, plus `embedded-hal` drivers and adapters for
//! the board.  The embedding binary owns the tick loop and the logger.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod control;
pub mod diagnostics;
pub mod error;
pub mod events;
pub mod fsm;
pub mod rpc;
pub mod safety;
pub mod scheduler;
pub mod sensors;

pub mod adapters;
pub mod drivers;
