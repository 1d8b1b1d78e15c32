//! Function-pointer finite state machine for the player.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  StateTable                                                  │
//! │  ┌─────────┬───────────┬──────────┬────────────────────────┐ │
//! │  │ State   │ on_enter  │ on_exit  │ on_event               │ │
//! │  ├─────────┼───────────┼──────────┼────────────────────────┤ │
//! │  │ Stopped │ fn(ctx)   │ -        │ fn(ctx, ev)->Option<>  │ │
//! │  │ Playing │ -         │ -        │ fn(ctx, ev)->Option<>  │ │
//! │  │ Paused  │ fn(ctx)   │ -        │ fn(ctx, ev)->Option<>  │ │
//! │  └─────────┴───────────┴──────────┴────────────────────────┘ │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each logical event is dispatched to `on_event` of the **current**
//! state.  If it returns `Some(next)` and `next` differs from the current
//! state, the engine runs `on_exit` for the current state, then
//! `on_enter` for the next, and updates the current pointer.  Handlers
//! only queue effects on the [`PlayerContext`]; applying them is the
//! caller's job.

pub mod context;
pub mod states;

use core::fmt;

use context::PlayerContext;
use log::info;

use crate::events::LogicalEvent;

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Enumeration of all player states.
/// Must stay in sync with the state table built in [`states::build_state_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PlayerState {
    Stopped = 0,
    Playing = 1,
    Paused = 2,
}

impl PlayerState {
    /// Total number of states, used to size the table array.
    pub const COUNT: usize = 3;

    /// Convert an index back to `PlayerState`.  Out-of-range falls back to
    /// `Stopped` (release) after a debug assertion.
    pub fn from_index(idx: usize) -> Self {
        match idx {
            0 => Self::Stopped,
            1 => Self::Playing,
            2 => Self::Paused,
            _ => {
                debug_assert!(false, "invalid state index: {idx}");
                Self::Stopped
            }
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Stopped => "Stopped",
            Self::Playing => "Playing",
            Self::Paused => "Paused",
        }
    }
}

impl fmt::Display for PlayerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// Signature for `on_enter` and `on_exit` actions.
pub type StateActionFn = fn(&mut PlayerContext);

/// Signature for the per-event handler.
/// Returns `Some(next)` to trigger a transition, or `None` to stay.
pub type StateEventFn = fn(&mut PlayerContext, LogicalEvent) -> Option<PlayerState>;

// ---------------------------------------------------------------------------
// State descriptor (one row in the table)
// ---------------------------------------------------------------------------

/// Static descriptor for a single state.
pub struct StateDescriptor {
    pub id: PlayerState,
    pub name: &'static str,
    pub on_enter: Option<StateActionFn>,
    pub on_exit: Option<StateActionFn>,
    pub on_event: StateEventFn,
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

/// A completed state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: PlayerState,
    pub to: PlayerState,
}

pub struct Fsm {
    /// Fixed-size table indexed by `PlayerState as usize`.
    table: [StateDescriptor; PlayerState::COUNT],
    /// Index of the currently active state.
    current: usize,
    /// Transitions taken since construction.
    transitions: u32,
}

impl Fsm {
    pub fn new(table: [StateDescriptor; PlayerState::COUNT], initial: PlayerState) -> Self {
        Self {
            table,
            current: initial as usize,
            transitions: 0,
        }
    }

    /// Run the initial `on_enter` for the starting state.
    pub fn start(&mut self, ctx: &mut PlayerContext) {
        info!("FSM starting in state: {}", self.table[self.current].name);
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }

    /// Hand one event to the current state.
    pub fn dispatch(&mut self, event: LogicalEvent, ctx: &mut PlayerContext) -> Option<Transition> {
        let next = (self.table[self.current].on_event)(ctx, event)?;
        self.force_transition(next, ctx)
    }

    /// Jump to `next` regardless of the current state's handler (used for
    /// the engine-fault fallback to `Stopped`).  No-op if already there.
    pub fn force_transition(&mut self, next: PlayerState, ctx: &mut PlayerContext) -> Option<Transition> {
        if next as usize == self.current {
            return None;
        }
        Some(self.transition(next, ctx))
    }

    pub fn current_state(&self) -> PlayerState {
        PlayerState::from_index(self.current)
    }

    pub fn transition_count(&self) -> u32 {
        self.transitions
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn transition(&mut self, next: PlayerState, ctx: &mut PlayerContext) -> Transition {
        let from = self.current_state();
        let next_idx = next as usize;

        info!(
            "FSM transition: {} -> {}",
            self.table[self.current].name, self.table[next_idx].name
        );

        if let Some(exit) = self.table[self.current].on_exit {
            exit(ctx);
        }

        self.current = next_idx;
        self.transitions = self.transitions.wrapping_add(1);

        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }

        Transition { from, to: next }
    }
}
