//! Fuzz target: `SerialReadings` over a scripted port
//!
//! Splits the input into reads of fuzzer-chosen sizes and pulls readings
//! until the port runs dry.  Every reading must carry a sane distance and
//! no byte stream, however corrupt, may surface as a fault.
//!
//! cargo fuzz run fuzz_serial_readings

#![no_main]

use embassy_time::Duration;
use libfuzzer_sys::fuzz_target;
use themeplayer::error::SensorFault;
use themeplayer::sensors::ranged::SerialReadings;
use themeplayer::sensors::{FrameSource, ReadingSource, SensorReading};

struct Chunks<'a> {
    data: &'a [u8],
}

impl FrameSource for Chunks<'_> {
    fn read(&mut self, buf: &mut [u8], _timeout: Duration) -> Result<usize, SensorFault> {
        let Some((&len, rest)) = self.data.split_first() else {
            return Ok(0);
        };
        let n = usize::from(len).min(buf.len()).min(rest.len());
        buf[..n].copy_from_slice(&rest[..n]);
        self.data = &rest[n..];
        Ok(n)
    }
}

fuzz_target!(|data: &[u8]| {
    let mut src = SerialReadings::new(Chunks { data });
    // Each read consumes at least one length byte, so this bounds the loop.
    for _ in 0..=data.len() {
        match src.next_reading(Duration::from_millis(10)) {
            Ok(Some(SensorReading::RangedPresence { distance_m, .. })) => {
                assert!(distance_m.is_finite() && distance_m >= 0.0);
            }
            Ok(Some(other)) => panic!("serial source produced {other:?}"),
            Ok(None) => {}
            Err(fault) => panic!("byte stream raised {fault}"),
        }
    }
});
