//! Newline-delimited line codec for the serial command stream.
//!
//! Wire format: one JSON object per line.
//! ```text
//! {"type":"startPreheat","targetTemp":190}\n
//! {"type":"getState"}\r\n
//! ```
//!
//! The decoder accumulates incoming bytes and yields complete lines.
//! This handles partial reads gracefully: a single UART read may return
//! half a line, or several lines concatenated.

use crate::events::MAX_MESSAGE_LEN;

/// Decoder state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecoderState {
    /// Collecting bytes of the current line.
    Collecting { len: usize },
    /// The current line overflowed; drop bytes until the next newline.
    Discarding,
}

/// Streaming line decoder with a fixed buffer.
pub struct LineDecoder {
    state: DecoderState,
    buf: [u8; MAX_MESSAGE_LEN],
    dropped: u32,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self {
            state: DecoderState::Collecting { len: 0 },
            buf: [0; MAX_MESSAGE_LEN],
            dropped: 0,
        }
    }

    /// Push one byte.  Returns the completed line (without terminator)
    /// when `byte` ends a non-empty line that fit in the buffer.
    ///
    /// The returned slice is valid until the next call.
    pub fn push(&mut self, byte: u8) -> Option<&[u8]> {
        match (self.state, byte) {
            (DecoderState::Discarding, b'\n') => {
                self.state = DecoderState::Collecting { len: 0 };
                None
            }
            (DecoderState::Discarding, _) => None,
            (DecoderState::Collecting { len }, b'\n') => {
                self.state = DecoderState::Collecting { len: 0 };
                if len == 0 {
                    None
                } else {
                    Some(&self.buf[..len])
                }
            }
            (DecoderState::Collecting { .. }, b'\r') => None,
            (DecoderState::Collecting { len }, _) => {
                if len == MAX_MESSAGE_LEN {
                    log::warn!("Inbound line exceeds {MAX_MESSAGE_LEN} bytes; dropped");
                    self.dropped = self.dropped.saturating_add(1);
                    self.state = DecoderState::Discarding;
                } else {
                    self.buf[len] = byte;
                    self.state = DecoderState::Collecting { len: len + 1 };
                }
                None
            }
        }
    }

    /// Feed a chunk, calling `on_line` for every completed line.
    pub fn feed(&mut self, data: &[u8], mut on_line: impl FnMut(&[u8])) {
        for &byte in data {
            if let Some(line) = self.push(byte) {
                on_line(line);
            }
        }
    }

    /// Drop any partial line (e.g. after a transport reconnect).
    pub fn reset(&mut self) {
        self.state = DecoderState::Collecting { len: 0 };
    }

    /// Lines dropped for exceeding the buffer since construction.
    pub fn dropped(&self) -> u32 {
        self.dropped
    }
}

impl Default for LineDecoder {
    fn default() -> Self {
        Self::new()
    }
}
