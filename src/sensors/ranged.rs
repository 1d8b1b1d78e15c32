//! Serial ranging radar (RD-03D style).
//!
//! Two layers:
//! - [`SerialReadings`] turns a raw byte stream into distance readings.
//!   Framing errors are only counted; read errors become health faults.
//! - [`RangedPresence`] reduces distance readings to presence edges with
//!   hysteresis: detection needs `min_consecutive` in-range frames back to
//!   back, and presence is only cleared once `target_timeout` passes
//!   without a qualifying frame.  Missed or malformed frames never clear
//!   presence by themselves.

use embassy_time::{Duration, Instant};
use heapless::Deque;
use log::{debug, warn};

use super::frame::{Decoded, FrameDecoder};
use super::{FrameSource, ReadingSource, SensorReading};
use crate::config::RangedConfig;
use crate::error::SensorFault;
use crate::events::LogicalEvent;

/// Malformed frames in a row (no valid frame between) before a warning is
/// logged.  The run is never raised as a fault.
pub const MALFORMED_RUN_LIMIT: u32 = 64;

/// Read failures in a row before the port is given up for the session.
pub const READ_FAILURE_LIMIT: u32 = 5;

/// Decoded readings buffered between two `next_reading` calls.
const READING_BUF: usize = 16;

// ═══════════════════════════════════════════════════════════════
//  Reduction
// ═══════════════════════════════════════════════════════════════

#[derive(Debug)]
pub struct RangedPresence {
    max_range_m: f32,
    timeout: Duration,
    min_consecutive: u8,
    consecutive: u8,
    last_valid: Option<Instant>,
    asserted: bool,
}

impl RangedPresence {
    pub fn new(cfg: &RangedConfig) -> Self {
        Self {
            max_range_m: cfg.max_range_m,
            timeout: cfg.target_timeout(),
            min_consecutive: cfg.min_consecutive_frames.max(1),
            consecutive: 0,
            last_valid: None,
            asserted: false,
        }
    }

    /// Feed one reading taken at `at`.  `distance_m == 0` means no target.
    pub fn on_reading(&mut self, distance_m: f32, at: Instant) -> Option<LogicalEvent> {
        let in_range = distance_m > 0.0 && distance_m <= self.max_range_m;
        if !in_range {
            self.consecutive = 0;
            return None;
        }
        self.consecutive = self.consecutive.saturating_add(1);
        if self.consecutive < self.min_consecutive {
            return None;
        }

        // Out-of-order stamps never move the window backwards.
        if self.last_valid.is_none_or(|prev| at > prev) {
            self.last_valid = Some(at);
        }
        if self.asserted {
            return None;
        }
        self.asserted = true;
        debug!("ranged: target at {:.2} m", distance_m);
        Some(LogicalEvent::PresenceDetected)
    }

    /// Clear presence if the hold window has run out.  The returned
    /// instant is the exact moment presence lapsed.
    pub fn poll(&mut self, now: Instant) -> Option<(LogicalEvent, Instant)> {
        let due = self.next_deadline()?;
        if now < due {
            return None;
        }
        self.asserted = false;
        self.consecutive = 0;
        Some((LogicalEvent::PresenceCleared, due))
    }

    /// When presence will lapse without another qualifying frame.
    pub fn next_deadline(&self) -> Option<Instant> {
        if !self.asserted {
            return None;
        }
        self.last_valid.map(|t| t + self.timeout)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn is_asserted(&self) -> bool {
        self.asserted
    }

    pub fn reset(&mut self) {
        self.asserted = false;
        self.consecutive = 0;
        self.last_valid = None;
    }
}

// ═══════════════════════════════════════════════════════════════
//  Serial reading source
// ═══════════════════════════════════════════════════════════════

/// Byte stream → readings, with framing and port health tracking.
pub struct SerialReadings<F> {
    port: F,
    decoder: FrameDecoder,
    readings: Deque<SensorReading, READING_BUF>,
    malformed_run: u32,
    read_failures: u32,
}

impl<F: FrameSource> SerialReadings<F> {
    pub fn new(port: F) -> Self {
        Self {
            port,
            decoder: FrameDecoder::new(),
            readings: Deque::new(),
            malformed_run: 0,
            read_failures: 0,
        }
    }

    fn ingest(&mut self, data: &[u8]) {
        for &b in data {
            match self.decoder.push(b) {
                Some(Decoded::Frame(frame)) => {
                    if self.malformed_run >= MALFORMED_RUN_LIMIT {
                        debug!("ranged: valid frame after {} malformed", self.malformed_run);
                    }
                    self.malformed_run = 0;
                    let distance_m = frame.nearest_distance_m().unwrap_or(0.0);
                    let reading = SensorReading::RangedPresence {
                        distance_m,
                        age: Duration::from_ticks(0),
                    };
                    if self.readings.is_full() {
                        // Only the freshest frames matter.
                        self.readings.pop_front();
                    }
                    let _ = self.readings.push_back(reading);
                }
                Some(Decoded::Malformed) => {
                    self.malformed_run += 1;
                    if self.malformed_run == MALFORMED_RUN_LIMIT {
                        warn!("ranged: {} malformed frames in a row", self.malformed_run);
                    }
                }
                None => {}
            }
        }
    }
}

impl<F: FrameSource> ReadingSource for SerialReadings<F> {
    fn next_reading(&mut self, timeout: Duration) -> Result<Option<SensorReading>, SensorFault> {
        if let Some(r) = self.readings.pop_front() {
            return Ok(Some(r));
        }

        let mut buf = [0u8; 64];
        let n = match self.port.read(&mut buf, timeout) {
            Ok(n) => {
                self.read_failures = 0;
                n
            }
            Err(fault) => {
                self.read_failures += 1;
                self.decoder.reset();
                if self.read_failures >= READ_FAILURE_LIMIT {
                    return Err(SensorFault::ChannelLost);
                }
                return Err(fault);
            }
        };

        self.ingest(&buf[..n]);
        Ok(self.readings.pop_front())
    }

    fn malformed_frames(&self) -> u32 {
        self.decoder.malformed_count()
    }
}
