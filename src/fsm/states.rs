//! Concrete state handler functions and table builder.
//!
//! Each state is three plain `fn` pointers.  Transition-specific side
//! effects (engine commands, cooldown) are queued by `on_event`; effects
//! that hold for every entry into a state live in `on_enter`.
//!
//! ```text
//!                 [PlayPause | presence*]
//!   STOPPED ─────────────────────────────▶ PLAYING
//!     ▲  ▲                                  │   ▲
//!     │  └──[Stop | inactivity | finished]──┘   │
//!     │                               [PlayPause]│[PlayPause | presence*]
//!     │                                      ▼   │
//!     └────────────[Stop]──────────────── PAUSED ┘
//!
//!   presence* = radar armed and cooldown inactive
//! ```

use log::{debug, info};

use super::context::{Effect, EngineCommand, PlayerContext};
use super::{PlayerState, StateDescriptor};
use crate::events::LogicalEvent;
use crate::timers::TimerKind;

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static state table.  Called once at startup.
pub fn build_state_table() -> [StateDescriptor; PlayerState::COUNT] {
    [
        // Index 0: Stopped
        StateDescriptor {
            id: PlayerState::Stopped,
            name: "Stopped",
            on_enter: Some(stopped_enter),
            on_exit: None,
            on_event: stopped_event,
        },
        // Index 1: Playing
        StateDescriptor {
            id: PlayerState::Playing,
            name: "Playing",
            on_enter: None,
            on_exit: None,
            on_event: playing_event,
        },
        // Index 2: Paused
        StateDescriptor {
            id: PlayerState::Paused,
            name: "Paused",
            on_enter: Some(paused_enter),
            on_exit: None,
            on_event: paused_event,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  Rows shared by every state
// ═══════════════════════════════════════════════════════════════════════════

fn any_state_event(ctx: &mut PlayerContext, event: LogicalEvent) -> Option<PlayerState> {
    match event {
        LogicalEvent::SwitchRadarEnabled(on) => {
            ctx.switch_on = on;
            if !on {
                ctx.push(Effect::CancelTimer(TimerKind::Inactivity));
            }
            info!("radar switch {}", if on { "ON" } else { "OFF" });
        }
        LogicalEvent::CooldownExpired => {
            ctx.cooldown_active = false;
            info!("cooldown over, radar events accepted again");
        }
        LogicalEvent::ButtonFullCycle => ctx.push(Effect::ForwardFullCycle),
        LogicalEvent::SensorFault(fault) => {
            if fault.is_permanent() {
                ctx.sensor_lost = true;
            } else {
                ctx.sensor_degraded = true;
            }
            ctx.presence = false;
        }
        LogicalEvent::SensorRecovered => ctx.sensor_degraded = false,
        other => debug!("ignored {:?}", other),
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  STOPPED
// ═══════════════════════════════════════════════════════════════════════════

fn stopped_enter(ctx: &mut PlayerContext) {
    ctx.push(Effect::CancelTimer(TimerKind::Inactivity));
}

fn stopped_event(ctx: &mut PlayerContext, event: LogicalEvent) -> Option<PlayerState> {
    match event {
        LogicalEvent::PresenceDetected if ctx.radar_accepts() => {
            info!("STOPPED: presence, starting playback");
            ctx.engine(EngineCommand::Start);
            ctx.push(Effect::ArmTimer(TimerKind::Inactivity));
            Some(PlayerState::Playing)
        }
        LogicalEvent::ButtonPlayPause => {
            ctx.engine(EngineCommand::Start);
            Some(PlayerState::Playing)
        }
        other => any_state_event(ctx, other),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  PLAYING
// ═══════════════════════════════════════════════════════════════════════════

fn playing_event(ctx: &mut PlayerContext, event: LogicalEvent) -> Option<PlayerState> {
    match event {
        LogicalEvent::ButtonPlayPause => {
            ctx.engine(EngineCommand::Pause);
            ctx.push(Effect::ArmTimer(TimerKind::Cooldown));
            Some(PlayerState::Paused)
        }
        LogicalEvent::ButtonStop => {
            ctx.engine(EngineCommand::Stop);
            ctx.push(Effect::ArmTimer(TimerKind::Cooldown));
            Some(PlayerState::Stopped)
        }
        LogicalEvent::PresenceDetected if ctx.radar_accepts() => {
            ctx.push(Effect::ResetTimer(TimerKind::Inactivity));
            None
        }
        LogicalEvent::InactivityTimeout => {
            info!("PLAYING: no presence for the inactivity period, stopping");
            ctx.engine(EngineCommand::Stop);
            Some(PlayerState::Stopped)
        }
        LogicalEvent::PlaybackFinished => {
            if (ctx.radar_armed() && ctx.presence) || ctx.loop_playback {
                ctx.restarts = ctx.restarts.wrapping_add(1);
                debug!("PLAYING: track ended, looping (restart #{})", ctx.restarts);
                ctx.engine(EngineCommand::Start);
                None
            } else {
                info!("PLAYING: track ended, nobody around");
                ctx.engine(EngineCommand::Stop);
                Some(PlayerState::Stopped)
            }
        }
        // Absence alone never stops playback; the inactivity timer does.
        LogicalEvent::PresenceCleared => None,
        other => any_state_event(ctx, other),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  PAUSED
// ═══════════════════════════════════════════════════════════════════════════

fn paused_enter(ctx: &mut PlayerContext) {
    ctx.push(Effect::CancelTimer(TimerKind::Inactivity));
}

fn paused_event(ctx: &mut PlayerContext, event: LogicalEvent) -> Option<PlayerState> {
    match event {
        LogicalEvent::ButtonPlayPause => {
            ctx.engine(EngineCommand::Resume);
            if ctx.radar_armed() {
                ctx.push(Effect::ArmTimer(TimerKind::Inactivity));
            }
            Some(PlayerState::Playing)
        }
        LogicalEvent::ButtonStop => {
            ctx.engine(EngineCommand::Stop);
            Some(PlayerState::Stopped)
        }
        LogicalEvent::PresenceDetected if ctx.radar_accepts() => {
            info!("PAUSED: presence, resuming");
            ctx.engine(EngineCommand::Resume);
            ctx.push(Effect::ArmTimer(TimerKind::Inactivity));
            Some(PlayerState::Playing)
        }
        other => any_state_event(ctx, other),
    }
}
