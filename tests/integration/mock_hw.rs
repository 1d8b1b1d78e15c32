//! Mock adapters for integration tests.
//!
//! Records every port call so tests can assert on the full command
//! history without an audio device, LEDs, or the orchestrator.

use std::cell::Cell;
use std::path::Path;
use std::rc::Rc;
use std::sync::Arc;

use embassy_time::{Duration, Instant};
use themeplayer::app::events::AppEvent;
use themeplayer::app::ports::{Clock, EventSink, IndicatorPort, PipelinePort, PlaybackEngine, Ports};
use themeplayer::app::service::PlayerService;
use themeplayer::config::PlayerConfig;
use themeplayer::diagnostics::Diagnostics;
use themeplayer::error::EngineFault;
use themeplayer::events::{LogicalEvent, StampedEvent};
use themeplayer::feedback::Indicators;
use themeplayer::fsm::PlayerState;

// ── Engine call record ────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineCall {
    Start,
    Pause,
    Resume,
    Stop,
}

// ── MockEngine ────────────────────────────────────────────────

#[derive(Default)]
pub struct MockEngine {
    pub calls: Vec<EngineCall>,
    pub fail_start: bool,
    pub fail_pause: bool,
    /// Reported once by the next `is_finished`.
    pub finished: bool,
}

#[allow(dead_code)]
impl MockEngine {
    pub fn count(&self, call: EngineCall) -> usize {
        self.calls.iter().filter(|c| **c == call).count()
    }
}

impl PlaybackEngine for MockEngine {
    fn start(&mut self, _asset: &Path) -> Result<(), EngineFault> {
        self.calls.push(EngineCall::Start);
        if self.fail_start {
            return Err(EngineFault::AssetMissing);
        }
        Ok(())
    }

    fn pause(&mut self) -> Result<(), EngineFault> {
        self.calls.push(EngineCall::Pause);
        if self.fail_pause {
            return Err(EngineFault::CommandFailed);
        }
        Ok(())
    }

    fn resume(&mut self) -> Result<(), EngineFault> {
        self.calls.push(EngineCall::Resume);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), EngineFault> {
        self.calls.push(EngineCall::Stop);
        Ok(())
    }

    fn is_finished(&mut self) -> bool {
        std::mem::take(&mut self.finished)
    }
}

// ── Indicators / pipeline / sink ──────────────────────────────

#[derive(Default)]
pub struct MockIndicators {
    pub shown: Vec<Indicators>,
}

#[allow(dead_code)]
impl MockIndicators {
    pub fn last(&self) -> Option<Indicators> {
        self.shown.last().copied()
    }
}

impl IndicatorPort for MockIndicators {
    fn show(&mut self, indicators: &Indicators) {
        self.shown.push(*indicators);
    }
}

pub struct MockPipeline {
    pub triggers: u32,
    pub accept: bool,
}

impl Default for MockPipeline {
    fn default() -> Self {
        Self {
            triggers: 0,
            accept: true,
        }
    }
}

impl PipelinePort for MockPipeline {
    fn trigger_full_cycle(&mut self) -> bool {
        self.triggers += 1;
        self.accept
    }
}

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn transitions(&self) -> Vec<(PlayerState, PlayerState)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                AppEvent::StateChanged { from, to } => Some((*from, *to)),
                _ => None,
            })
            .collect()
    }

    pub fn faults(&self) -> usize {
        self.events.iter().filter(|e| matches!(e, AppEvent::Fault(_))).count()
    }

    pub fn statuses(&self) -> usize {
        self.events.iter().filter(|e| matches!(e, AppEvent::Status(_))).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

pub type MockPorts = Ports<MockEngine, MockIndicators, MockPipeline, RecordingSink>;

pub fn mock_ports() -> MockPorts {
    Ports {
        engine: MockEngine::default(),
        indicators: MockIndicators::default(),
        pipeline: MockPipeline::default(),
        sink: RecordingSink::default(),
    }
}

// ── Hand-driven clock ─────────────────────────────────────────

#[derive(Clone, Default)]
pub struct ManualClock(Rc<Cell<u64>>);

#[allow(dead_code)]
impl ManualClock {
    pub fn set_ms(&self, ms: u64) {
        self.0.set(ms);
    }

    pub fn advance(&self, d: Duration) {
        self.0.set(self.0.get() + d.as_millis());
    }

    pub fn ms(&self) -> u64 {
        self.0.get()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        Instant::from_millis(self.0.get())
    }
}

// ── Service harness ───────────────────────────────────────────

pub struct Harness {
    pub svc: PlayerService,
    pub ports: MockPorts,
}

#[allow(dead_code)]
impl Harness {
    pub fn new() -> Self {
        Self::with(PlayerConfig::default(), true)
    }

    pub fn with(cfg: PlayerConfig, switch_on: bool) -> Self {
        let mut svc = PlayerService::new(&cfg, switch_on, Arc::new(Diagnostics::new()));
        let mut ports = mock_ports();
        svc.start(Instant::from_millis(0), &mut ports);
        Self { svc, ports }
    }

    pub fn send(&mut self, event: LogicalEvent, secs: u64) {
        self.send_ms(event, secs * 1000);
    }

    pub fn send_ms(&mut self, event: LogicalEvent, ms: u64) {
        self.svc
            .handle(StampedEvent::new(event, Instant::from_millis(ms)), &mut self.ports);
    }

    pub fn advance_to(&mut self, secs: u64) -> usize {
        self.svc.fire_timers(Instant::from_secs(secs), &mut self.ports)
    }

    pub fn state(&self) -> PlayerState {
        self.svc.state()
    }

    pub fn engine(&self) -> &[EngineCall] {
        &self.ports.engine.calls
    }
}
