//! Driven adapters: concrete implementations of the [`crate::app::ports`]
//! traits.

pub mod hardware;
pub mod json_sink;
pub mod log_sink;
