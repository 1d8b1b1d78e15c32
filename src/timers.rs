//! Deadline-based timer manager.
//!
//! Two one-shot countdowns drive the automatic parts of the player: the
//! inactivity timer (auto-stop) and the cooldown timer (radar suppression
//! after a deliberate pause / stop).  The manager owns no thread; the
//! runtime asks it for [`next_deadline`](TimerManager::next_deadline),
//! waits on the event queue until then, and calls
//! [`poll`](TimerManager::poll).  Expiries are handed to a
//! [`TimerDelegate`], which routes them into the normal dispatch path.
//!
//! ```text
//!   fsm effect ──arm/reset/cancel──▶ TimerManager
//!                                        │ poll(now)
//!                                        ▼
//!                                   TimerDelegate ──▶ PlayerService::handle
//! ```
//!
//! Each slot holds at most one armed instance.  Arming an armed slot
//! replaces it, so a stale instance can never fire.  A slot is cleared
//! before its delegate call, so each arm cycle fires at most once.

use embassy_time::{Duration, Instant};
use log::debug;

use crate::app::ports::TimerDelegate;
use crate::events::LogicalEvent;

// ═══════════════════════════════════════════════════════════════
//  Timer identity
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Auto-stop after a period without presence.
    Inactivity,
    /// Radar suppression after a manual pause / stop.
    Cooldown,
}

impl TimerKind {
    pub const COUNT: usize = 2;
    pub const ALL: [Self; Self::COUNT] = [Self::Inactivity, Self::Cooldown];

    const fn index(self) -> usize {
        match self {
            Self::Inactivity => 0,
            Self::Cooldown => 1,
        }
    }

    /// The event this timer emits when it runs out.
    pub const fn expiry_event(self) -> LogicalEvent {
        match self {
            Self::Inactivity => LogicalEvent::InactivityTimeout,
            Self::Cooldown => LogicalEvent::CooldownExpired,
        }
    }
}

/// One armed countdown.  `generation` is unique per arm call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerHandle {
    pub kind: TimerKind,
    pub generation: u32,
    pub duration: Duration,
    pub deadline: Instant,
}

// ═══════════════════════════════════════════════════════════════
//  Manager
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Default)]
pub struct TimerManager {
    slots: [Option<TimerHandle>; TimerKind::COUNT],
    generation: u32,
}

impl TimerManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm `kind` to fire `duration` after `now`, replacing any armed
    /// instance of the same kind.
    pub fn arm(&mut self, kind: TimerKind, duration: Duration, now: Instant) -> TimerHandle {
        self.generation = self.generation.wrapping_add(1);
        let handle = TimerHandle {
            kind,
            generation: self.generation,
            duration,
            deadline: now + duration,
        };
        if let Some(old) = self.slots[kind.index()].replace(handle) {
            debug!("timer {:?}: replaced gen {} with gen {}", kind, old.generation, handle.generation);
        } else {
            debug!("timer {:?}: armed gen {} for {} ms", kind, handle.generation, duration.as_millis());
        }
        handle
    }

    /// Cancel + arm as one step.  Used to renew a countdown to its full
    /// duration.
    pub fn reset(&mut self, kind: TimerKind, duration: Duration, now: Instant) -> TimerHandle {
        self.arm(kind, duration, now)
    }

    /// Disarm `kind`.  Returns the cancelled instance, if any.
    pub fn cancel(&mut self, kind: TimerKind) -> Option<TimerHandle> {
        let old = self.slots[kind.index()].take();
        if let Some(h) = old {
            debug!("timer {:?}: cancelled gen {}", kind, h.generation);
        }
        old
    }

    /// Disarm everything (shutdown).
    pub fn cancel_all(&mut self) {
        for kind in TimerKind::ALL {
            self.cancel(kind);
        }
    }

    pub fn is_active(&self, kind: TimerKind) -> bool {
        self.slots[kind.index()].is_some()
    }

    pub fn handle(&self, kind: TimerKind) -> Option<TimerHandle> {
        self.slots[kind.index()]
    }

    /// Time left on `kind` as seen at `now`.  Zero once due but not yet
    /// polled; `None` when disarmed.
    pub fn remaining(&self, kind: TimerKind, now: Instant) -> Option<Duration> {
        self.slots[kind.index()].map(|h| h.deadline.saturating_duration_since(now))
    }

    /// Earliest deadline across all armed timers.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.slots.iter().flatten().map(|h| h.deadline).min()
    }

    /// Fire every timer whose deadline is `<= now`, earliest first.
    /// Returns the number fired.
    ///
    /// The delegate may re-arm timers from inside the callback; a timer
    /// re-armed there is not considered again in the same call unless its
    /// new deadline is also due.
    pub fn poll(&mut self, now: Instant, delegate: &mut dyn TimerDelegate) -> usize {
        let mut fired = 0;
        while let Some(handle) = self.take_due(now) {
            fired += 1;
            delegate.on_timer_fired(handle.kind, handle.deadline);
        }
        fired
    }

    fn take_due(&mut self, now: Instant) -> Option<TimerHandle> {
        let slot = self
            .slots
            .iter_mut()
            .filter(|s| s.is_some_and(|h| h.deadline <= now))
            .min_by_key(|s| s.map(|h| h.deadline))?;
        slot.take()
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
