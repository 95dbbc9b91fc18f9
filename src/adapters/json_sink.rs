//! Console link sink.
//!
//! Encodes the application events that have a wire form and hands each
//! JSON line to a writer (serial port, WebSocket broadcast).

use log::warn;

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;
use crate::rpc::messages::encode_event;

pub struct JsonLineSink<W> {
    write: W,
}

impl<W: FnMut(&str)> JsonLineSink<W> {
    pub fn new(write: W) -> Self {
        Self { write }
    }
}

impl<W: FnMut(&str)> EventSink for JsonLineSink<W> {
    fn emit(&mut self, event: &AppEvent) {
        match encode_event(event) {
            Ok(Some(line)) => (self.write)(&line),
            Ok(None) => {}
            Err(e) => warn!("Dropping outbound message: {e}"),
        }
    }
}

/// Fan one event out to two sinks.
pub struct Tee<A, B>(pub A, pub B);

impl<A: EventSink, B: EventSink> EventSink for Tee<A, B> {
    fn emit(&mut self, event: &AppEvent) {
        self.0.emit(event);
        self.1.emit(event);
    }
}
