//! Fuzz target: `LineDecoder::feed` and `decode_frame`
//!
//! Drives arbitrary byte sequences into the line decoder and asserts that
//! it never yields an empty or oversized line.  The same bytes are also
//! read as thermocouple words: a faulted word must never carry a
//! temperature.
//!
//! cargo fuzz run fuzz_frame_decoder

#![no_main]

use libfuzzer_sys::fuzz_target;
use roaster::events::MAX_MESSAGE_LEN;
use roaster::rpc::codec::LineDecoder;
use roaster::sensors::thermocouple::{decode_frame, ThermocoupleFault};

fuzz_target!(|data: &[u8]| {
    let mut decoder = LineDecoder::new();

    decoder.feed(data, |line| {
        assert!(!line.is_empty(), "decoder must not yield empty lines");
        assert!(line.len() <= MAX_MESSAGE_LEN, "line exceeds buffer");
        assert!(!line.contains(&b'\n'), "terminator leaked into line");
    });

    // After a reset the decoder must accept bytes cleanly again.
    decoder.reset();
    decoder.feed(data, |_| {});

    for word in data.chunks_exact(4) {
        let raw = u32::from_be_bytes([word[0], word[1], word[2], word[3]]);
        let reading = decode_frame(raw);
        if reading.fault != ThermocoupleFault::None {
            assert!(reading.celsius.is_none());
        } else {
            let c = reading.celsius.unwrap_or(f32::NAN);
            assert!(c.is_finite() && (-2048.0..2048.0).contains(&c));
        }
    }
});
