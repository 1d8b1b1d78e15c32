//! Shared mutable context threaded through every FSM handler.
//!
//! `PlayerContext` is the blackboard the state handlers read from and
//! write to: radar gating flags maintained by the handlers and the
//! service, and an ordered list of side effects the handlers request.
//! Handlers never touch the engine or the timers themselves; the
//! [`PlayerService`](crate::app::service::PlayerService) drains
//! [`effects`](PlayerContext::effects) after each dispatch and applies
//! them in order.

use heapless::Deque;

use crate::timers::TimerKind;

/// Upper bound on effects produced by a single dispatch (transition
/// handler + exit + enter).
pub const MAX_EFFECTS: usize = 8;

// ---------------------------------------------------------------------------
// Effects (written by state handlers; applied by the service)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineCommand {
    /// Start the current asset from the beginning.
    Start,
    Pause,
    Resume,
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    Engine(EngineCommand),
    /// Arm a timer (replaces an armed instance).
    ArmTimer(TimerKind),
    /// Renew a timer to its full duration.
    ResetTimer(TimerKind),
    CancelTimer(TimerKind),
    /// Hand the full-cycle request to the external orchestrator.
    ForwardFullCycle,
}

// ---------------------------------------------------------------------------
// PlayerContext
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct PlayerContext {
    // -- Radar gating --
    /// Debounced radar enable switch position.
    pub switch_on: bool,
    /// Sensor channel is currently degraded (recoverable fault).
    pub sensor_degraded: bool,
    /// Sensor channel is gone for the rest of the session.
    pub sensor_lost: bool,
    /// Latest presence level reported by the sensor, even when suppressed.
    pub presence: bool,
    /// Mirrors the cooldown timer.  Refreshed by the service before each
    /// dispatch.
    pub cooldown_active: bool,

    // -- Policy --
    /// Loop the track on end-of-track even without presence.
    pub loop_playback: bool,

    // -- Outputs --
    /// Side effects requested by the handlers, in order.
    pub effects: Deque<Effect, MAX_EFFECTS>,
    /// Looped restarts issued since startup.
    pub restarts: u32,
}

impl PlayerContext {
    pub fn new(switch_on: bool, loop_playback: bool) -> Self {
        Self {
            switch_on,
            sensor_degraded: false,
            sensor_lost: false,
            presence: false,
            cooldown_active: false,
            loop_playback,
            effects: Deque::new(),
            restarts: 0,
        }
    }

    /// Radar is armed: switch on and the sensor channel usable.
    pub fn radar_armed(&self) -> bool {
        self.switch_on && !self.sensor_degraded && !self.sensor_lost
    }

    /// Presence events may reach the transition table.
    pub fn radar_accepts(&self) -> bool {
        self.radar_armed() && !self.cooldown_active
    }

    /// Queue a side effect.  Overflow is a table bug; it is logged and the
    /// effect dropped rather than panicking mid-dispatch.
    pub fn push(&mut self, effect: Effect) {
        if self.effects.push_back(effect).is_err() {
            log::error!("effect queue overflow, dropped {:?}", effect);
        }
    }

    pub fn engine(&mut self, cmd: EngineCommand) {
        self.push(Effect::Engine(cmd));
    }

    pub fn take_effect(&mut self) -> Option<Effect> {
        self.effects.pop_front()
    }

    pub fn clear_effects(&mut self) {
        self.effects.clear();
    }
}
