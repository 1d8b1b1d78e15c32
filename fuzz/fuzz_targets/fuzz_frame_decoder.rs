//! Fuzz target: RD-03D `FrameDecoder`
//!
//! Drives arbitrary byte sequences into the streaming decoder and asserts
//! that it never panics, that every decoded target round-trips through the
//! wire encoding, and that a reset leaves it able to decode a clean frame.
//!
//! cargo fuzz run fuzz_frame_decoder

#![no_main]

use libfuzzer_sys::fuzz_target;
use themeplayer::sensors::frame::{Decoded, FrameDecoder, RadarFrame};

fuzz_target!(|data: &[u8]| {
    let mut decoder = FrameDecoder::new();
    let mut malformed = 0u32;

    decoder.feed(data, |d| match d {
        Decoded::Frame(frame) => {
            // Re-encoding a decoded frame must decode to the same frame.
            let mut again = FrameDecoder::new();
            let mut back = None;
            again.feed(&frame.encode(), |d| {
                if let Decoded::Frame(f) = d {
                    back = Some(f);
                }
            });
            assert_eq!(back, Some(frame));
            if let Some(d) = frame.nearest_distance_m() {
                assert!(d.is_finite() && d >= 0.0);
            }
        }
        Decoded::Malformed => malformed += 1,
    });
    assert_eq!(decoder.malformed_count(), malformed);

    // After a reset the decoder must accept a clean frame again.
    decoder.reset();
    let mut recovered = false;
    decoder.feed(&RadarFrame::single(-250, 1200).encode(), |d| {
        recovered |= matches!(d, Decoded::Frame(_));
    });
    assert!(recovered, "decoder stuck after reset");
});
