//! Command-link supervision.
//!
//! The console has no explicit session handshake, so liveness is inferred
//! from traffic: any received message marks the link active, and silence
//! longer than the timeout on an active link is reported once as a
//! disconnect.

use log::{info, warn};

/// Link state changes reported to the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    /// First traffic on an idle link.
    Connected,
    /// An active link went silent past the timeout.
    Disconnected,
}

#[derive(Debug, Clone, Copy)]
pub struct LinkMonitor {
    timeout_ms: u64,
    last_rx_ms: u64,
    active: bool,
}

impl LinkMonitor {
    pub const fn new(timeout_ms: u64) -> Self {
        Self {
            timeout_ms,
            last_rx_ms: 0,
            active: false,
        }
    }

    /// Record inbound traffic at `now_ms`.
    pub fn on_receive(&mut self, now_ms: u64) -> Option<LinkEvent> {
        self.last_rx_ms = now_ms;
        if self.active {
            return None;
        }
        self.active = true;
        info!("Command link active");
        Some(LinkEvent::Connected)
    }

    /// Check for a timeout.  Reports [`LinkEvent::Disconnected`] once per
    /// silent period.
    pub fn poll(&mut self, now_ms: u64) -> Option<LinkEvent> {
        if self.active && now_ms.saturating_sub(self.last_rx_ms) > self.timeout_ms {
            self.active = false;
            warn!(
                "Command link silent for {} ms; treating as disconnected",
                now_ms.saturating_sub(self.last_rx_ms)
            );
            return Some(LinkEvent::Disconnected);
        }
        None
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_timeout(&mut self, timeout_ms: u64) {
        self.timeout_ms = timeout_ms;
    }
}
