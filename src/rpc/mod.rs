//! Console link: framing, message contract, and liveness.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │  Serial / WebSocket bytes                                  │
//! │       │                                                    │
//! │       ▼                                                    │
//! │  ┌──────────┐   ┌──────────┐   ┌───────────────────────┐   │
//! │  │  codec   │──▶│ Command  │──▶│  messages::decode     │   │
//! │  │ (lines)  │   │  Queue   │   │  → RoasterService     │   │
//! │  └──────────┘   └──────────┘   └───────────────────────┘   │
//! │                                            │               │
//! │  ┌──────────┐   ┌──────────────────────────┘               │
//! │  │  link    │   ▼                                          │
//! │  │ monitor  │  messages::encode_event ──▶ transport write  │
//! │  └──────────┘                                              │
//! └────────────────────────────────────────────────────────────┘
//! ```

pub mod codec;
pub mod link;
pub mod messages;
