//! Runtime counters and status snapshots.
//!
//! Counters are atomics so producer threads (the sensor reader) and the
//! consumer can bump them without sharing anything else.  A
//! [`StatusSnapshot`] is assembled on demand by the service and emitted
//! periodically as [`AppEvent::Status`](crate::app::events::AppEvent::Status).

use core::sync::atomic::{AtomicU32, Ordering};

use serde::Serialize;

use crate::fsm::PlayerState;

#[derive(Debug, Default)]
pub struct Diagnostics {
    faults: AtomicU32,
    suppressed_presence: AtomicU32,
    malformed_frames: AtomicU32,
    full_cycles: AtomicU32,
}

impl Diagnostics {
    pub const fn new() -> Self {
        Self {
            faults: AtomicU32::new(0),
            suppressed_presence: AtomicU32::new(0),
            malformed_frames: AtomicU32::new(0),
            full_cycles: AtomicU32::new(0),
        }
    }

    pub fn record_fault(&self) {
        self.faults.fetch_add(1, Ordering::Relaxed);
    }

    /// A presence event was discarded by the radar gate.
    pub fn record_suppressed(&self) {
        self.suppressed_presence.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_full_cycle(&self) {
        self.full_cycles.fetch_add(1, Ordering::Relaxed);
    }

    /// Published by the sensor thread; the source keeps the running total.
    pub fn set_malformed_frames(&self, total: u32) {
        self.malformed_frames.store(total, Ordering::Relaxed);
    }

    pub fn faults(&self) -> u32 {
        self.faults.load(Ordering::Relaxed)
    }

    pub fn suppressed_presence(&self) -> u32 {
        self.suppressed_presence.load(Ordering::Relaxed)
    }

    pub fn malformed_frames(&self) -> u32 {
        self.malformed_frames.load(Ordering::Relaxed)
    }

    pub fn full_cycles(&self) -> u32 {
        self.full_cycles.load(Ordering::Relaxed)
    }
}

/// Point-in-time controller status.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    #[serde(serialize_with = "state_name")]
    pub state: PlayerState,
    pub radar_armed: bool,
    pub presence: bool,
    pub inactivity_remaining_ms: Option<u64>,
    pub cooldown_remaining_ms: Option<u64>,
    pub uptime_secs: u64,
    pub transitions: u32,
    pub restarts: u32,
    pub faults: u32,
    pub suppressed_presence: u32,
    pub dropped_events: u32,
    pub malformed_frames: u32,
    pub full_cycles: u32,
}

fn state_name<S: serde::Serializer>(state: &PlayerState, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(state.name())
}
