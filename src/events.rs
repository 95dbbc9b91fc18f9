//! Inbound command queue.
//!
//! A transport task (serial reader, WebSocket handler, ISR) produces raw
//! command lines; the tick loop consumes them, decodes them, and applies
//! them to the service.  All core mutation therefore stays in the tick
//! loop's context.
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ Serial RX   │────▶│              │     │              │
//! │ WebSocket   │────▶│ CommandQueue │────▶│  Tick loop   │
//! │             │     │  (SPSC)      │     │  (consumer)  │
//! └─────────────┘     └──────────────┘     └──────────────┘
//! ```

use core::fmt;

use heapless::spsc::{Consumer, Producer, Queue};

/// Longest accepted command line (bytes).
pub const MAX_MESSAGE_LEN: usize = 256;

/// Queue slots.  One slot is reserved by the SPSC ring, so at most
/// `QUEUE_SLOTS - 1` messages are pending at once.
pub const QUEUE_SLOTS: usize = 8;

/// One raw inbound message.
pub type InboundMessage = heapless::Vec<u8, MAX_MESSAGE_LEN>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    /// The consumer has fallen behind; the message was dropped.
    Full,
    /// The message exceeds [`MAX_MESSAGE_LEN`].
    TooLong,
}

impl fmt::Display for QueueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => write!(f, "command queue full"),
            Self::TooLong => write!(f, "command exceeds {MAX_MESSAGE_LEN} bytes"),
        }
    }
}

/// Owned SPSC ring.  Split it once at startup and hand the halves to
/// the producer and consumer contexts.
pub struct CommandQueue {
    queue: Queue<InboundMessage, QUEUE_SLOTS>,
}

impl CommandQueue {
    pub const fn new() -> Self {
        Self {
            queue: Queue::new(),
        }
    }

    pub fn split(&mut self) -> (CommandProducer<'_>, CommandConsumer<'_>) {
        let (producer, consumer) = self.queue.split();
        (CommandProducer { inner: producer }, CommandConsumer { inner: consumer })
    }
}

impl Default for CommandQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Transport side of the queue.
pub struct CommandProducer<'a> {
    inner: Producer<'a, InboundMessage, QUEUE_SLOTS>,
}

impl CommandProducer<'_> {
    /// Enqueue one raw message.  Never blocks.
    pub fn push(&mut self, bytes: &[u8]) -> Result<(), QueueError> {
        let message = InboundMessage::from_slice(bytes).map_err(|_| QueueError::TooLong)?;
        self.inner.enqueue(message).map_err(|_| QueueError::Full)
    }

    pub fn is_full(&self) -> bool {
        !self.inner.ready()
    }
}

/// Tick-loop side of the queue.
pub struct CommandConsumer<'a> {
    inner: Consumer<'a, InboundMessage, QUEUE_SLOTS>,
}

impl CommandConsumer<'_> {
    pub fn pop(&mut self) -> Option<InboundMessage> {
        self.inner.dequeue()
    }

    /// Pending message count.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
