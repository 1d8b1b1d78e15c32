//! Digital presence pin (RCWL-0516 style).
//!
//! The module drives its OUT pin HIGH while it sees motion.  Edges arrive
//! from a GPIO interrupt callback through an [`EdgeChannel`]; the
//! reduction to presence events is a plain edge rule with no extra
//! filtering.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_time::{Duration, Instant};

use super::{ReadingSource, SensorReading};
use crate::error::SensorFault;
use crate::events::{LogicalEvent, receive_until, send_latest};

/// Pending edge samples between the interrupt callback and the sensor thread.
const EDGE_CHANNEL_CAP: usize = 16;

// ── Reduction ─────────────────────────────────────────────────

/// Rising edge → `PresenceDetected` unless already detected.
/// Falling edge → `PresenceCleared`.
#[derive(Debug, Default)]
pub struct BinaryPresence {
    detected: bool,
}

impl BinaryPresence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_level(&mut self, level: bool) -> Option<LogicalEvent> {
        if level {
            if self.detected {
                return None;
            }
            self.detected = true;
            Some(LogicalEvent::PresenceDetected)
        } else {
            self.detected = false;
            Some(LogicalEvent::PresenceCleared)
        }
    }

    pub fn is_detected(&self) -> bool {
        self.detected
    }

    pub fn reset(&mut self) {
        self.detected = false;
    }
}

// ── Edge transport ────────────────────────────────────────────

/// Lock-free hand-off from an edge callback to the sensor thread.
///
/// `notify` never blocks.  When a burst overruns the capacity the oldest
/// samples are evicted, so the level the pin settles at is always the last
/// one delivered.
pub struct EdgeChannel {
    channel: Channel<CriticalSectionRawMutex, Result<bool, SensorFault>, EDGE_CHANNEL_CAP>,
}

impl Default for EdgeChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl EdgeChannel {
    pub const fn new() -> Self {
        Self {
            channel: Channel::new(),
        }
    }

    /// Report the pin level after an edge.
    pub fn notify(&self, level: bool) {
        if !send_latest(&self.channel, Ok(level)) {
            log::debug!("edge channel full, oldest sample evicted");
        }
    }

    /// Report that the pin can no longer be read.
    pub fn fail(&self, fault: SensorFault) {
        if !send_latest(&self.channel, Err(fault)) {
            log::warn!("edge channel full while reporting {}", fault);
        }
    }
}

impl ReadingSource for &EdgeChannel {
    fn next_reading(&mut self, timeout: Duration) -> Result<Option<SensorReading>, SensorFault> {
        match receive_until(&self.channel, Some(Instant::now() + timeout)) {
            Some(Ok(level)) => Ok(Some(SensorReading::BinaryPresence { level })),
            Some(Err(fault)) => Err(fault),
            None => Ok(None),
        }
    }
}
