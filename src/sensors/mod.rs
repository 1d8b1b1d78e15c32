//! Sensor adapter: one presence abstraction over two sensor models.
//!
//! ```text
//!  ReadingSource ──SensorReading──▶ PresenceModel ──LogicalEvent──▶ queue
//!  (edge channel | serial frames)   (binary | ranged)
//! ```
//!
//! The model is picked once from configuration at startup.  The state
//! machine never sees a [`SensorReading`]; it only sees the reduced
//! `PresenceDetected` / `PresenceCleared` pair plus health events.

pub mod binary;
pub mod frame;
pub mod ranged;

use core::sync::atomic::{AtomicBool, Ordering};

use embassy_time::{Duration, Instant, block_for};
use heapless::Deque;
use log::{error, info, warn};

use crate::app::ports::Clock;
use crate::config::SensorConfig;
use crate::error::SensorFault;
use crate::diagnostics::Diagnostics;
use crate::events::{EventQueue, LogicalEvent, StampedEvent};
use binary::BinaryPresence;
use ranged::RangedPresence;

/// Raw observation from the active sensor model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SensorReading {
    /// Digital pin level sampled on an edge.
    BinaryPresence { level: bool },
    /// Nearest target distance (0 = no target) and how long ago the frame
    /// was received.
    RangedPresence { distance_m: f32, age: Duration },
}

/// Blocking producer of sensor readings.
pub trait ReadingSource {
    /// Wait up to `timeout` for the next reading.  `Ok(None)` on timeout.
    fn next_reading(&mut self, timeout: Duration) -> Result<Option<SensorReading>, SensorFault>;

    /// Malformed frames seen so far (serial models only).
    fn malformed_frames(&self) -> u32 {
        0
    }
}

impl<S: ReadingSource + ?Sized> ReadingSource for Box<S> {
    fn next_reading(&mut self, timeout: Duration) -> Result<Option<SensorReading>, SensorFault> {
        (**self).next_reading(timeout)
    }

    fn malformed_frames(&self) -> u32 {
        (**self).malformed_frames()
    }
}

/// Raw serial port.  Implemented by the UART adapter and by test doubles.
pub trait FrameSource {
    /// Read whatever bytes are available, waiting at most `timeout`.
    /// `Ok(0)` on timeout.
    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, SensorFault>;
}

// ═══════════════════════════════════════════════════════════════
//  Model-specific reduction
// ═══════════════════════════════════════════════════════════════

pub enum PresenceModel {
    Binary(BinaryPresence),
    Ranged(RangedPresence),
}

impl PresenceModel {
    pub fn from_config(cfg: &SensorConfig) -> Self {
        match cfg {
            SensorConfig::Binary => Self::Binary(BinaryPresence::new()),
            SensorConfig::Ranged(r) => Self::Ranged(RangedPresence::new(r)),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Binary(_) => "binary",
            Self::Ranged(_) => "ranged",
        }
    }

    /// Reduce one reading observed at `now`.
    pub fn reduce(&mut self, reading: SensorReading, now: Instant) -> Option<LogicalEvent> {
        match (self, reading) {
            (Self::Binary(m), SensorReading::BinaryPresence { level }) => m.on_level(level),
            (Self::Ranged(m), SensorReading::RangedPresence { distance_m, age }) => {
                // Exclusive: a reading exactly `timeout` old has already
                // lapsed, the same instant `RangedPresence::poll` clears at.
                if age >= m.timeout() {
                    return None;
                }
                let at = now.checked_sub(age).unwrap_or(now);
                m.on_reading(distance_m, at)
            }
            (model, reading) => {
                warn!("{} sensor got foreign reading {:?}", model.name(), reading);
                None
            }
        }
    }

    /// Time-driven transitions (ranged presence lapsing).
    pub fn poll(&mut self, now: Instant) -> Option<(LogicalEvent, Instant)> {
        match self {
            Self::Binary(_) => None,
            Self::Ranged(m) => m.poll(now),
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        match self {
            Self::Binary(_) => None,
            Self::Ranged(m) => m.next_deadline(),
        }
    }

    pub fn reset(&mut self) {
        match self {
            Self::Binary(m) => m.reset(),
            Self::Ranged(m) => m.reset(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Adapter
// ═══════════════════════════════════════════════════════════════

/// Pause between retries after a recoverable read failure.
const RETRY_BACKOFF: Duration = Duration::from_millis(200);

/// Owns the sensor channel and produces presence / health events.
///
/// Runs on its own thread; nothing else touches the source.
pub struct SensorAdapter<S, C> {
    source: S,
    clock: C,
    model: PresenceModel,
    pending: Deque<StampedEvent, 4>,
    degraded: bool,
    lost: bool,
}

impl<S: ReadingSource, C: Clock> SensorAdapter<S, C> {
    pub fn new(source: S, clock: C, model: PresenceModel) -> Self {
        info!("sensor adapter: {} model", model.name());
        Self {
            source,
            clock,
            model,
            pending: Deque::new(),
            degraded: false,
            lost: false,
        }
    }

    /// Block until the next presence-relevant event, or return `None` once
    /// `until` passes with nothing to report.  Returns immediately when an
    /// event is already pending.
    pub fn poll_or_block(&mut self, until: Instant) -> Option<StampedEvent> {
        loop {
            if let Some(ev) = self.pending.pop_front() {
                return Some(ev);
            }

            let now = self.clock.now();
            if let Some((event, at)) = self.model.poll(now) {
                return Some(StampedEvent::new(event, at));
            }
            if now >= until {
                return None;
            }

            if self.lost {
                block_for(until - now);
                return None;
            }

            let wake = self.model.next_deadline().map_or(until, |d| d.min(until));
            let timeout = wake.saturating_duration_since(now);
            match self.source.next_reading(timeout) {
                Ok(Some(reading)) => self.on_reading(reading),
                Ok(None) => {}
                Err(fault) => self.on_fault(fault),
            }
        }
    }

    /// Malformed frames counted by the source.
    pub fn malformed_frames(&self) -> u32 {
        self.source.malformed_frames()
    }

    pub fn is_lost(&self) -> bool {
        self.lost
    }

    fn on_reading(&mut self, reading: SensorReading) {
        let now = self.clock.now();
        if self.degraded {
            info!("sensor recovered");
            self.degraded = false;
            self.enqueue(LogicalEvent::SensorRecovered, now);
        }
        if let Some(event) = self.model.reduce(reading, now) {
            self.enqueue(event, now);
        }
    }

    fn on_fault(&mut self, fault: SensorFault) {
        let now = self.clock.now();
        self.model.reset();
        if fault.is_permanent() {
            error!("sensor channel lost ({}); radar disabled for this session", fault);
            self.lost = true;
            self.enqueue(LogicalEvent::SensorFault(fault), now);
            return;
        }
        if !self.degraded {
            warn!("sensor degraded: {}", fault);
            self.degraded = true;
            self.enqueue(LogicalEvent::SensorFault(fault), now);
        }
        block_for(RETRY_BACKOFF);
    }

    fn enqueue(&mut self, event: LogicalEvent, at: Instant) {
        if self.pending.push_back(StampedEvent::new(event, at)).is_err() {
            warn!("sensor adapter backlog full, dropped {:?}", event);
        }
    }
}

/// Longest a single `poll_or_block` call waits before the stop flag is
/// rechecked.
const SENSOR_WAKE: Duration = Duration::from_millis(250);

/// Sensor thread body: forward every presence / health event to the queue
/// until `stop` is set.
pub fn run_sensor_loop<S: ReadingSource, C: Clock>(
    mut adapter: SensorAdapter<S, C>,
    queue: &EventQueue,
    diagnostics: &Diagnostics,
    stop: &AtomicBool,
) {
    while !stop.load(Ordering::Acquire) {
        let until = adapter.clock.now() + SENSOR_WAKE;
        if let Some(ev) = adapter.poll_or_block(until) {
            queue.push_stamped(ev);
        }
        diagnostics.set_malformed_frames(adapter.malformed_frames());
    }
    info!("sensor thread stopped ({} malformed frames)", adapter.malformed_frames());
}
