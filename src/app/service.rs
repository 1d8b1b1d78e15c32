//! Player service, the hexagonal core.
//!
//! [`PlayerService`] owns the FSM, the shared context, and the timer
//! manager.  It exposes a hardware-agnostic API: every event goes through
//! [`handle`](PlayerService::handle), and all I/O flows through the
//! [`Ports`] bundle injected at the call site, so the whole controller is
//! testable with mock adapters.
//!
//! ```text
//!  StampedEvent ──▶ ┌──────────────────────────┐ ──▶ PlaybackEngine
//!                   │      PlayerService        │ ──▶ IndicatorPort
//!  TimerManager ──▶ │ gate · FSM · effects      │ ──▶ PipelinePort
//!                   └──────────────────────────┘ ──▶ EventSink
//! ```
//!
//! Per event:
//! 1. fire every timer due at or before the event's timestamp
//! 2. record the presence level, then drop presence events the radar gate
//!    refuses (switch off, sensor unusable, cooldown running)
//! 3. dispatch to the FSM and report the transition
//! 4. apply the queued effects in order, stamped with the event time
//! 5. republish the indicators if they changed

use std::path::PathBuf;
use std::sync::Arc;

use embassy_time::{Duration, Instant};
use heapless::Vec;
use log::{debug, error, info, warn};

use crate::config::PlayerConfig;
use crate::diagnostics::{Diagnostics, StatusSnapshot};
use crate::error::EngineFault;
use crate::events::{LogicalEvent, StampedEvent};
use crate::feedback::{FeedbackController, Indicators};
use crate::fsm::context::{Effect, EngineCommand, PlayerContext};
use crate::fsm::states::build_state_table;
use crate::fsm::{Fsm, PlayerState, Transition};
use crate::timers::{TimerKind, TimerManager};

use super::events::AppEvent;
use super::ports::{EventSink, IndicatorPort, PipelinePort, PlaybackEngine, Ports, TimerDelegate};

// ───────────────────────────────────────────────────────────────
// Timer expiry collector
// ───────────────────────────────────────────────────────────────

/// Collects expiries during [`TimerManager::poll`] so they can be
/// dispatched after the manager's borrow ends.
#[derive(Default)]
struct Expired(Vec<(TimerKind, Instant), { TimerKind::COUNT }>);

impl TimerDelegate for Expired {
    fn on_timer_fired(&mut self, kind: TimerKind, at: Instant) {
        let _ = self.0.push((kind, at));
    }
}

// ───────────────────────────────────────────────────────────────
// PlayerService
// ───────────────────────────────────────────────────────────────

pub struct PlayerService {
    fsm: Fsm,
    ctx: PlayerContext,
    timers: TimerManager,
    feedback: FeedbackController,
    asset: PathBuf,
    inactivity: Duration,
    cooldown: Duration,
    last_indicators: Option<Indicators>,
    diagnostics: Arc<Diagnostics>,
    started_at: Option<Instant>,
}

impl PlayerService {
    /// Construct the service.  `switch_on` is the debounced radar switch
    /// level sampled at startup.
    ///
    /// Does **not** start the FSM; call [`start`](Self::start) next.
    pub fn new(cfg: &PlayerConfig, switch_on: bool, diagnostics: Arc<Diagnostics>) -> Self {
        Self {
            fsm: Fsm::new(build_state_table(), PlayerState::Stopped),
            ctx: PlayerContext::new(switch_on, cfg.loop_playback),
            timers: TimerManager::new(),
            feedback: FeedbackController::from_config(cfg),
            asset: cfg.asset_path.clone(),
            inactivity: cfg.inactivity(),
            cooldown: cfg.cooldown(),
            last_indicators: None,
            diagnostics,
            started_at: None,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    pub fn start<E, I, P, S>(&mut self, now: Instant, ports: &mut Ports<E, I, P, S>)
    where
        E: PlaybackEngine,
        I: IndicatorPort,
        P: PipelinePort,
        S: EventSink,
    {
        self.started_at = Some(now);
        self.fsm.start(&mut self.ctx);
        self.apply_effects(now, ports);
        ports.sink.emit(&AppEvent::Started(self.fsm.current_state()));
        self.refresh_indicators(ports);
        info!(
            "PlayerService started in {} (radar switch {})",
            self.fsm.current_state(),
            if self.ctx.switch_on { "on" } else { "off" }
        );
    }

    /// Cancel every timer, stop the engine, darken the indicators.  Safe to
    /// call from any state.
    pub fn shutdown<E, I, P, S>(&mut self, ports: &mut Ports<E, I, P, S>)
    where
        E: PlaybackEngine,
        I: IndicatorPort,
        P: PipelinePort,
        S: EventSink,
    {
        info!("PlayerService shutting down from {}", self.fsm.current_state());
        self.timers.cancel_all();
        self.ctx.clear_effects();
        if let Err(e) = ports.engine.stop() {
            warn!("engine stop during shutdown failed: {}", e);
        }
        ports.indicators.show(&Indicators::OFF);
        self.last_indicators = Some(Indicators::OFF);
        ports.sink.emit(&AppEvent::Shutdown);
    }

    // ── Event handling ────────────────────────────────────────

    /// Process one logical event.  Timers due at or before `ev.at` fire
    /// first, so expiries keep their place in the ordering.
    pub fn handle<E, I, P, S>(&mut self, ev: StampedEvent, ports: &mut Ports<E, I, P, S>)
    where
        E: PlaybackEngine,
        I: IndicatorPort,
        P: PipelinePort,
        S: EventSink,
    {
        self.fire_timers(ev.at, ports);
        self.process(ev, ports);
    }

    /// Fire every timer due at `now`.  Returns the number fired.
    pub fn fire_timers<E, I, P, S>(&mut self, now: Instant, ports: &mut Ports<E, I, P, S>) -> usize
    where
        E: PlaybackEngine,
        I: IndicatorPort,
        P: PipelinePort,
        S: EventSink,
    {
        let mut total = 0;
        loop {
            let mut expired = Expired::default();
            if self.timers.poll(now, &mut expired) == 0 {
                return total;
            }
            for (kind, at) in expired.0 {
                total += 1;
                debug!("{:?} timer expired", kind);
                self.process(StampedEvent::new(kind.expiry_event(), at), ports);
            }
        }
    }

    /// Ask the engine whether the track ended while `Playing`, and feed a
    /// `PlaybackFinished` through the table if so.
    pub fn poll_engine<E, I, P, S>(&mut self, now: Instant, ports: &mut Ports<E, I, P, S>) -> bool
    where
        E: PlaybackEngine,
        I: IndicatorPort,
        P: PipelinePort,
        S: EventSink,
    {
        if self.fsm.current_state() != PlayerState::Playing || !ports.engine.is_finished() {
            return false;
        }
        self.handle(StampedEvent::new(LogicalEvent::PlaybackFinished, now), ports);
        true
    }

    fn process<E, I, P, S>(&mut self, ev: StampedEvent, ports: &mut Ports<E, I, P, S>)
    where
        E: PlaybackEngine,
        I: IndicatorPort,
        P: PipelinePort,
        S: EventSink,
    {
        let StampedEvent { event, at } = ev;

        if event.is_presence() {
            self.ctx.presence = event == LogicalEvent::PresenceDetected;
        }
        self.ctx.cooldown_active = self.timers.is_active(TimerKind::Cooldown);

        if event.is_presence() && !self.ctx.radar_accepts() {
            self.diagnostics.record_suppressed();
            debug!(
                "{:?} suppressed (switch={} degraded={} lost={} cooldown={})",
                event,
                self.ctx.switch_on,
                self.ctx.sensor_degraded,
                self.ctx.sensor_lost,
                self.ctx.cooldown_active
            );
            self.refresh_indicators(ports);
            return;
        }

        match event {
            LogicalEvent::SensorFault(fault) => {
                warn!("sensor fault: {}", fault);
                self.diagnostics.record_fault();
                ports.sink.emit(&AppEvent::Fault(fault.into()));
            }
            LogicalEvent::SensorRecovered => ports.sink.emit(&AppEvent::SensorRecovered),
            _ => {}
        }

        if let Some(t) = self.fsm.dispatch(event, &mut self.ctx) {
            Self::report(t, ports);
        }
        self.apply_effects(at, ports);
        self.refresh_indicators(ports);
    }

    // ── Effects ───────────────────────────────────────────────

    fn apply_effects<E, I, P, S>(&mut self, at: Instant, ports: &mut Ports<E, I, P, S>)
    where
        E: PlaybackEngine,
        I: IndicatorPort,
        P: PipelinePort,
        S: EventSink,
    {
        while let Some(effect) = self.ctx.take_effect() {
            match effect {
                Effect::Engine(cmd) => {
                    if let Err(fault) = self.run_engine(cmd, &mut ports.engine) {
                        self.on_engine_fault(cmd, fault, ports);
                    }
                }
                Effect::ArmTimer(kind) => {
                    self.timers.arm(kind, self.duration(kind), at);
                }
                Effect::ResetTimer(kind) => {
                    self.timers.reset(kind, self.duration(kind), at);
                }
                Effect::CancelTimer(kind) => {
                    self.timers.cancel(kind);
                }
                Effect::ForwardFullCycle => {
                    let accepted = ports.pipeline.trigger_full_cycle();
                    if accepted {
                        self.diagnostics.record_full_cycle();
                    }
                    ports.sink.emit(&AppEvent::FullCycleRequested { accepted });
                }
            }
        }
    }

    fn run_engine<E: PlaybackEngine>(&self, cmd: EngineCommand, engine: &mut E) -> Result<(), EngineFault> {
        debug!("engine <- {:?}", cmd);
        match cmd {
            EngineCommand::Start => engine.start(&self.asset),
            EngineCommand::Pause => engine.pause(),
            EngineCommand::Resume => engine.resume(),
            EngineCommand::Stop => engine.stop(),
        }
    }

    /// Report the fault and fall back to `Stopped`.  Effects still queued
    /// for the abandoned transition are dropped; `Stopped`'s own entry
    /// effects replace them.
    fn on_engine_fault<E, I, P, S>(&mut self, cmd: EngineCommand, fault: EngineFault, ports: &mut Ports<E, I, P, S>)
    where
        E: PlaybackEngine,
        I: IndicatorPort,
        P: PipelinePort,
        S: EventSink,
    {
        error!("engine {:?} failed: {}", cmd, fault);
        self.diagnostics.record_fault();
        ports.sink.emit(&AppEvent::Fault(fault.into()));

        if self.fsm.current_state() == PlayerState::Stopped {
            return;
        }
        self.ctx.clear_effects();
        if cmd != EngineCommand::Stop {
            if let Err(e) = ports.engine.stop() {
                warn!("engine stop after fault failed: {}", e);
            }
        }
        if let Some(t) = self.fsm.force_transition(PlayerState::Stopped, &mut self.ctx) {
            Self::report(t, ports);
        }
    }

    fn report<E, I, P, S>(t: Transition, ports: &mut Ports<E, I, P, S>)
    where
        S: EventSink,
    {
        ports.sink.emit(&AppEvent::StateChanged { from: t.from, to: t.to });
    }

    fn refresh_indicators<E, I, P, S>(&mut self, ports: &mut Ports<E, I, P, S>)
    where
        I: IndicatorPort,
    {
        let ind = self
            .feedback
            .compute(self.fsm.current_state(), self.ctx.radar_armed(), self.ctx.presence);
        if self.last_indicators != Some(ind) {
            ports.indicators.show(&ind);
            self.last_indicators = Some(ind);
        }
    }

    fn duration(&self, kind: TimerKind) -> Duration {
        match kind {
            TimerKind::Inactivity => self.inactivity,
            TimerKind::Cooldown => self.cooldown,
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> PlayerState {
        self.fsm.current_state()
    }

    pub fn context(&self) -> &PlayerContext {
        &self.ctx
    }

    pub fn timers(&self) -> &TimerManager {
        &self.timers
    }

    /// Earliest armed timer deadline, for the runtime's wait.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn status(&self, now: Instant, dropped_events: u32) -> StatusSnapshot {
        let remaining_ms = |kind: TimerKind| self.timers.remaining(kind, now).map(|d| d.as_millis());
        StatusSnapshot {
            state: self.fsm.current_state(),
            radar_armed: self.ctx.radar_armed(),
            presence: self.ctx.presence,
            inactivity_remaining_ms: remaining_ms(TimerKind::Inactivity),
            cooldown_remaining_ms: remaining_ms(TimerKind::Cooldown),
            uptime_secs: self
                .started_at
                .map_or(0, |t| now.saturating_duration_since(t).as_secs()),
            transitions: self.fsm.transition_count(),
            restarts: self.ctx.restarts,
            faults: self.diagnostics.faults(),
            suppressed_presence: self.diagnostics.suppressed_presence(),
            dropped_events,
            malformed_frames: self.diagnostics.malformed_frames(),
            full_cycles: self.diagnostics.full_cycles(),
        }
    }
}
