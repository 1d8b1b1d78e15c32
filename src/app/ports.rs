//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ PlayerService (domain)
//! ```
//!
//! Driven adapters (audio engine, indicator LEDs, pipeline launcher, event
//! sinks, config file) implement these traits.  The
//! [`PlayerService`](super::service::PlayerService) consumes them via
//! generics, so the domain core never touches hardware or processes
//! directly.

use std::path::Path;

use embassy_time::Instant;

use crate::config::PlayerConfig;
use crate::error::{ConfigFault, EngineFault};
use crate::feedback::Indicators;
use crate::timers::TimerKind;

// ───────────────────────────────────────────────────────────────
// Playback engine (driven adapter: domain → audio backend)
// ───────────────────────────────────────────────────────────────

/// The audio backend.  Owned and called only by the consumer.
pub trait PlaybackEngine {
    /// Start `asset` from the beginning, replacing anything playing.
    fn start(&mut self, asset: &Path) -> Result<(), EngineFault>;

    fn pause(&mut self) -> Result<(), EngineFault>;

    fn resume(&mut self) -> Result<(), EngineFault>;

    /// Stop playback.  Stopping an idle engine succeeds.
    fn stop(&mut self) -> Result<(), EngineFault>;

    /// The started track reached its end on its own.
    fn is_finished(&mut self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Indicator port (driven adapter: domain → LEDs)
// ───────────────────────────────────────────────────────────────

/// Publishes the desired indicator outputs.  Must not block on the LEDs.
pub trait IndicatorPort {
    fn show(&mut self, indicators: &Indicators);
}

// ───────────────────────────────────────────────────────────────
// Pipeline port (driven adapter: domain → external orchestrator)
// ───────────────────────────────────────────────────────────────

/// Launches the external news → music generation cycle.
pub trait PipelinePort {
    /// Fire the full cycle.  Returns `false` when the request was not
    /// accepted (e.g. a cycle is already running).
    fn trigger_full_cycle(&mut self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: config file → domain)
// ───────────────────────────────────────────────────────────────

/// Loads configuration once at startup.
///
/// Implementations MUST validate before returning.  Invalid values are
/// rejected with [`ConfigFault::Invalid`], never clamped.
pub trait ConfigPort {
    fn load(&self) -> Result<PlayerConfig, ConfigFault>;
}

// ───────────────────────────────────────────────────────────────
// Clock
// ───────────────────────────────────────────────────────────────

/// Monotonic time source.  Injected so tests can drive time by hand.
pub trait Clock {
    fn now(&self) -> Instant;
}

// ───────────────────────────────────────────────────────────────
// Timer delegate (decouples the timer manager from dispatch)
// ───────────────────────────────────────────────────────────────

/// Callback the [`TimerManager`](crate::timers::TimerManager) invokes for
/// each expiry.  The manager itself knows nothing about events or the
/// state machine.
pub trait TimerDelegate {
    /// `at` is the exact deadline of the expired instance.
    fn on_timer_fired(&mut self, kind: TimerKind, at: Instant);
}

// ───────────────────────────────────────────────────────────────
// Port bundle
// ───────────────────────────────────────────────────────────────

/// Every driven port the service touches while handling an event.
pub struct Ports<E, I, P, S> {
    pub engine: E,
    pub indicators: I,
    pub pipeline: P,
    pub sink: S,
}
