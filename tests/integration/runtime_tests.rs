//! Runtime loop: queue draining, engine polling cadence, status reports
//! and shutdown cleanup, all on a hand-driven clock.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use embassy_time::Instant;
use themeplayer::app::events::AppEvent;
use themeplayer::app::runtime::PlayerRuntime;
use themeplayer::app::service::PlayerService;
use themeplayer::config::PlayerConfig;
use themeplayer::diagnostics::{Diagnostics, StatusSnapshot};
use themeplayer::events::{EVENT_QUEUE_CAP, EventQueue, LogicalEvent};
use themeplayer::feedback::Indicators;
use themeplayer::fsm::PlayerState;

use crate::mock_hw::{
    EngineCall, ManualClock, MockEngine, MockIndicators, MockPipeline, RecordingSink, mock_ports,
};

type Runtime<'q> = PlayerRuntime<'q, MockEngine, MockIndicators, MockPipeline, RecordingSink, ManualClock>;

fn runtime<'a>(queue: &'a EventQueue, clock: &'a ManualClock) -> Runtime<'a> {
    let cfg = PlayerConfig::default();
    let service = PlayerService::new(&cfg, true, Arc::new(Diagnostics::new()));
    let mut rt = PlayerRuntime::new(&cfg, service, mock_ports(), queue, clock.clone());
    rt.start();
    rt
}

fn last_status(rt: &Runtime<'_>) -> Option<StatusSnapshot> {
    rt.ports().sink.events.iter().rev().find_map(|e| match e {
        AppEvent::Status(s) => Some(s.clone()),
        _ => None,
    })
}

#[test]
fn drain_handles_queued_events_in_order() {
    let queue = EventQueue::new();
    let clock = ManualClock::default();
    let mut rt = runtime(&queue, &clock);

    queue.push(LogicalEvent::ButtonPlayPause, Instant::from_millis(0));
    queue.push(LogicalEvent::ButtonPlayPause, Instant::from_millis(10));
    queue.push(LogicalEvent::ButtonStop, Instant::from_millis(20));

    assert_eq!(rt.drain(), 3);
    assert_eq!(rt.service().state(), PlayerState::Stopped);
    assert_eq!(
        rt.ports().engine.calls,
        [EngineCall::Start, EngineCall::Pause, EngineCall::Stop]
    );
    assert!(queue.is_empty());
}

#[test]
fn wake_deadline_tracks_earliest_work() {
    let queue = EventQueue::new();
    let clock = ManualClock::default();
    let mut rt = runtime(&queue, &clock);

    // Nothing armed: the engine poll period bounds the wait.
    assert_eq!(rt.wake_deadline(), Instant::from_millis(250));

    queue.push(LogicalEvent::PresenceDetected, Instant::from_millis(0));
    rt.drain();
    clock.set_ms(1000);
    rt.step(None);
    assert_eq!(rt.wake_deadline(), Instant::from_millis(1250));
}

#[test]
fn timers_fire_without_any_event() {
    let queue = EventQueue::new();
    let clock = ManualClock::default();
    let mut rt = runtime(&queue, &clock);

    queue.push(LogicalEvent::PresenceDetected, Instant::from_millis(0));
    rt.drain();
    assert_eq!(rt.service().state(), PlayerState::Playing);

    clock.set_ms(299_999);
    rt.step(None);
    assert_eq!(rt.service().state(), PlayerState::Playing);

    clock.set_ms(300_000);
    rt.step(None);
    assert_eq!(rt.service().state(), PlayerState::Stopped);
}

#[test]
fn engine_polled_on_its_own_cadence() {
    let queue = EventQueue::new();
    let clock = ManualClock::default();
    let mut rt = runtime(&queue, &clock);

    queue.push(LogicalEvent::ButtonPlayPause, Instant::from_millis(0));
    rt.drain();
    rt.ports_mut().engine.finished = true;

    clock.set_ms(100);
    rt.step(None);
    assert!(rt.ports().engine.finished, "polled before the period elapsed");

    clock.set_ms(250);
    rt.step(None);
    assert!(!rt.ports().engine.finished);
    // Looping is on by default: the track starts over.
    assert_eq!(rt.ports().engine.count(EngineCall::Start), 2);
    assert_eq!(rt.service().state(), PlayerState::Playing);
}

#[test]
fn status_is_reported_every_interval() {
    let queue = EventQueue::new();
    let clock = ManualClock::default();
    let mut rt = runtime(&queue, &clock);

    queue.push(LogicalEvent::PresenceDetected, Instant::from_millis(0));
    rt.drain();

    clock.set_ms(59_000);
    rt.step(None);
    assert_eq!(rt.ports().sink.statuses(), 0);

    clock.set_ms(60_000);
    rt.step(None);
    assert_eq!(rt.ports().sink.statuses(), 1);

    let snap = last_status(&rt).unwrap();
    assert_eq!(snap.state, PlayerState::Playing);
    assert!(snap.radar_armed);
    assert!(snap.presence);
    assert_eq!(snap.inactivity_remaining_ms, Some(240_000));
    assert_eq!(snap.cooldown_remaining_ms, None);
    assert_eq!(snap.uptime_secs, 60);
    assert_eq!(snap.transitions, 1);

    clock.set_ms(90_000);
    rt.step(None);
    assert_eq!(rt.ports().sink.statuses(), 1);
    clock.set_ms(120_000);
    rt.step(None);
    assert_eq!(rt.ports().sink.statuses(), 2);
}

#[test]
fn status_counts_suppressed_and_dropped_events() {
    let queue = EventQueue::new();
    let clock = ManualClock::default();
    let mut rt = runtime(&queue, &clock);

    queue.push(LogicalEvent::SwitchRadarEnabled(false), Instant::from_millis(0));
    for i in 1..EVENT_QUEUE_CAP as u64 + 3 {
        queue.push(LogicalEvent::PresenceDetected, Instant::from_millis(i));
    }
    assert_eq!(queue.dropped(), 3);
    rt.drain();

    clock.set_ms(60_000);
    rt.step(None);
    let snap = last_status(&rt).unwrap();
    assert_eq!(snap.state, PlayerState::Stopped);
    assert!(!snap.radar_armed);
    assert_eq!(snap.suppressed_presence, EVENT_QUEUE_CAP as u32 - 1);
    assert_eq!(snap.dropped_events, 3);
}

#[test]
fn run_with_stop_requested_still_cleans_up() {
    let queue = EventQueue::new();
    let clock = ManualClock::default();
    let cfg = PlayerConfig::default();
    let service = PlayerService::new(&cfg, true, Arc::new(Diagnostics::new()));
    let mut rt = PlayerRuntime::new(&cfg, service, mock_ports(), &queue, clock);

    rt.run(&AtomicBool::new(true));

    let events = &rt.ports().sink.events;
    assert_eq!(events.first(), Some(&AppEvent::Started(PlayerState::Stopped)));
    assert_eq!(events.last(), Some(&AppEvent::Shutdown));
    assert_eq!(rt.ports().engine.calls, [EngineCall::Stop]);
    assert_eq!(rt.ports().indicators.last(), Some(Indicators::OFF));
}

#[test]
fn shutdown_from_playing_cancels_timers() {
    let queue = EventQueue::new();
    let clock = ManualClock::default();
    let mut rt = runtime(&queue, &clock);

    queue.push(LogicalEvent::PresenceDetected, Instant::from_millis(0));
    queue.push(LogicalEvent::ButtonPlayPause, Instant::from_millis(5));
    rt.drain();
    assert_eq!(rt.service().state(), PlayerState::Paused);
    assert!(rt.service().next_deadline().is_some());

    rt.shutdown();
    assert_eq!(rt.service().next_deadline(), None);
    assert_eq!(rt.ports().engine.calls.last(), Some(&EngineCall::Stop));
}
