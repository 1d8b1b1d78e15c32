//! Logical event stream.
//!
//! Events are produced by:
//! - GPIO edge callbacks, after the debouncer (buttons, radar switch)
//! - The sensor thread (presence edges, sensor faults)
//! - The text console in simulation mode
//! - The consumer itself (timer expiry, end-of-track polling)
//!
//! Events are consumed by the runtime loop, which hands them to the
//! [`PlayerService`](crate::app::service::PlayerService) strictly one at a
//! time in arrival order.
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ Debouncer   │────▶│              │     │              │
//! │ Sensor      │────▶│  EventQueue  │────▶│   Runtime    │
//! │ Console     │────▶│  (bounded)   │     │  (consumer)  │
//! └─────────────┘     └──────────────┘     └──────┬───────┘
//!                                                 │ timers, engine poll
//!                                                 └──▶ same dispatch path
//! ```
//!
//! Producers never block: when the queue is full the event is dropped and
//! counted.  A backlog of motion events is not safety-critical.

use core::sync::atomic::{AtomicU32, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, TrySendError};
use embassy_time::{Instant, with_deadline};
use futures_lite::future::block_on;

use crate::error::SensorFault;

/// Maximum number of pending events.
pub const EVENT_QUEUE_CAP: usize = 64;

/// Normalised controller input.  The state machine only ever sees these,
/// never a sensor-specific payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalEvent {
    // ── User input ────────────────────────────────────────
    /// Debounced press of the play / pause button.
    ButtonPlayPause,
    /// Debounced press of the stop button.
    ButtonStop,
    /// Debounced press of the full-cycle button.
    ButtonFullCycle,
    /// Radar enable switch settled at the given position.
    SwitchRadarEnabled(bool),

    // ── Presence ──────────────────────────────────────────
    /// Something entered the detection envelope.
    PresenceDetected,
    /// The detection envelope is empty again.
    PresenceCleared,

    // ── Timers ────────────────────────────────────────────
    /// Inactivity countdown ran out.
    InactivityTimeout,
    /// Post-action radar suppression is over.
    CooldownExpired,

    // ── Engine ────────────────────────────────────────────
    /// The engine reported end-of-track while playing.
    PlaybackFinished,

    // ── Sensor health ─────────────────────────────────────
    /// The sensor channel degraded.
    SensorFault(SensorFault),
    /// The sensor channel delivered good data again after a fault.
    SensorRecovered,
}

impl LogicalEvent {
    /// Presence edges are the only events subject to radar gating.
    pub const fn is_presence(self) -> bool {
        matches!(self, Self::PresenceDetected | Self::PresenceCleared)
    }
}

/// An event tagged with its monotonic arrival time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StampedEvent {
    pub event: LogicalEvent,
    pub at: Instant,
}

impl StampedEvent {
    pub const fn new(event: LogicalEvent, at: Instant) -> Self {
        Self { event, at }
    }
}

// ── Bounded MPSC queue ────────────────────────────────────────

/// Ordered event queue shared by every producer and the single consumer.
///
/// `const`-constructible so `main` can keep it in a `static` that
/// interrupt callbacks reach without reference counting.
pub struct EventQueue {
    channel: Channel<CriticalSectionRawMutex, StampedEvent, EVENT_QUEUE_CAP>,
    dropped: AtomicU32,
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl EventQueue {
    pub const fn new() -> Self {
        Self {
            channel: Channel::new(),
            dropped: AtomicU32::new(0),
        }
    }

    /// Push an event stamped with `at`.
    /// Never blocks.  Returns `false` if the queue is full (event dropped).
    pub fn push(&self, event: LogicalEvent, at: Instant) -> bool {
        self.push_stamped(StampedEvent::new(event, at))
    }

    pub fn push_stamped(&self, event: StampedEvent) -> bool {
        if self.channel.try_send(event).is_ok() {
            return true;
        }
        let n = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
        log::warn!("event queue full, dropped {:?} (total dropped: {})", event.event, n);
        false
    }

    /// Pop the next event without waiting.
    pub fn try_pop(&self) -> Option<StampedEvent> {
        self.channel.try_receive().ok()
    }

    /// Block until an event arrives or `deadline` passes.
    /// With no deadline, waits indefinitely.
    pub fn recv_until(&self, deadline: Option<Instant>) -> Option<StampedEvent> {
        receive_until(&self.channel, deadline)
    }

    /// Number of pending events.
    pub fn len(&self) -> usize {
        self.channel.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channel.is_empty()
    }

    /// Total events dropped because the queue was full.
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Blocking receive with an optional deadline on any embassy channel.
///
/// Used by the consumer loop and by producer-side helper threads (the
/// debouncer) that also need to wake on a timeout.
pub fn receive_until<T, const N: usize>(
    channel: &Channel<CriticalSectionRawMutex, T, N>,
    deadline: Option<Instant>,
) -> Option<T> {
    if let Ok(item) = channel.try_receive() {
        return Some(item);
    }
    match deadline {
        Some(at) if at <= Instant::now() => None,
        Some(at) => block_on(with_deadline(at, channel.receive())).ok(),
        None => Some(block_on(channel.receive())),
    }
}

/// Non-blocking send that always keeps the newest item: when `channel` is
/// full the oldest queued item is evicted to make room.
///
/// For edge samples, where only the level after a burst matters.  Returns
/// `false` when something was evicted (or, with a racing producer, when
/// `item` itself could not be placed).
pub fn send_latest<T, const N: usize>(channel: &Channel<CriticalSectionRawMutex, T, N>, item: T) -> bool {
    match channel.try_send(item) {
        Ok(()) => true,
        Err(TrySendError::Full(item)) => {
            let _ = channel.try_receive();
            let _ = channel.try_send(item);
            false
        }
    }
}
