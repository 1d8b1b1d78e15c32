//! End-to-end controller behaviour: service + FSM + timers against mock
//! adapters, driven with explicit timestamps.

use embassy_time::{Duration, Instant};
use themeplayer::app::events::AppEvent;
use themeplayer::config::PlayerConfig;
use themeplayer::drivers::debounce::InputDebouncer;
use themeplayer::error::{EngineFault, SensorFault};
use themeplayer::events::LogicalEvent::{
    self, ButtonFullCycle, ButtonPlayPause, ButtonStop, PresenceCleared, PresenceDetected, SensorRecovered,
    SwitchRadarEnabled,
};
use themeplayer::feedback::IndicatorState;
use themeplayer::fsm::PlayerState;
use themeplayer::pins::InputLine;
use themeplayer::sensors::binary::BinaryPresence;
use themeplayer::timers::TimerKind;

use crate::mock_hw::{EngineCall, Harness};

// ── Scenario A: binary radar, presence then silence ───────────

#[test]
fn binary_presence_starts_once_and_inactivity_stops() {
    let mut h = Harness::new();
    let mut radar = BinaryPresence::new();

    // Pin rises at t=0.
    let ev = radar.on_level(true).expect("first rise detects");
    h.send(ev, 0);
    assert_eq!(h.state(), PlayerState::Playing);
    assert_eq!(h.engine(), [EngineCall::Start]);

    // A bounce re-rise at t=299 s while already detected produces nothing.
    assert_eq!(radar.on_level(true), None);
    assert_eq!(h.advance_to(299), 0);
    assert_eq!(h.state(), PlayerState::Playing);

    // t=300 s with no renewal: auto-stop.
    assert_eq!(h.advance_to(300), 1);
    assert_eq!(h.state(), PlayerState::Stopped);
    assert_eq!(h.engine(), [EngineCall::Start, EngineCall::Stop]);
}

// ── Scenario C: manual stop while presence persists ───────────

#[test]
fn manual_stop_suppresses_presence_for_cooldown() {
    let mut h = Harness::new();
    h.send(PresenceDetected, 0);
    h.send(ButtonStop, 100);

    assert_eq!(h.state(), PlayerState::Stopped);
    assert_eq!(
        h.svc.timers().remaining(TimerKind::Cooldown, Instant::from_secs(100)),
        Some(Duration::from_secs(60))
    );

    h.send(PresenceDetected, 110);
    assert_eq!(h.state(), PlayerState::Stopped);
    assert_eq!(h.engine(), [EngineCall::Start, EngineCall::Stop]);

    h.send(PresenceDetected, 161);
    assert_eq!(h.state(), PlayerState::Playing);
    assert_eq!(h.engine(), [EngineCall::Start, EngineCall::Stop, EngineCall::Start]);
}

// ── Idempotence of a bounced press ────────────────────────────

fn press_through_debouncer(raw_lows: &[u64]) -> PlayerState {
    let mut h = Harness::new();
    let mut deb = InputDebouncer::idle(Duration::from_millis(50));
    for &ms in raw_lows {
        for ev in deb.poll_settled(Instant::from_millis(ms)) {
            h.send_ms(ev.event, ev.at.as_millis());
        }
        assert_eq!(deb.observe_raw(InputLine::PlayPause, false, Instant::from_millis(ms)), None);
    }
    for ev in deb.poll_settled(Instant::from_millis(1000)) {
        h.send_ms(ev.event, ev.at.as_millis());
    }
    h.state()
}

#[test]
fn duplicate_press_is_collapsed_by_debouncer() {
    assert_eq!(press_through_debouncer(&[100]), PlayerState::Playing);
    assert_eq!(press_through_debouncer(&[100, 105]), PlayerState::Playing);
}

// ── Round trip returns owned state ────────────────────────────

#[test]
fn presence_then_timeout_round_trip_restores_state() {
    let mut h = Harness::new();
    let armed_before = h.svc.context().radar_armed();
    let switch_before = h.svc.context().switch_on;

    h.send(PresenceDetected, 0);
    assert_eq!(h.state(), PlayerState::Playing);
    h.advance_to(300);

    assert_eq!(h.state(), PlayerState::Stopped);
    for kind in TimerKind::ALL {
        assert!(!h.svc.timers().is_active(kind), "{:?} left armed", kind);
    }
    assert_eq!(h.svc.next_deadline(), None);
    assert_eq!(h.svc.context().radar_armed(), armed_before);
    assert_eq!(h.svc.context().switch_on, switch_before);
}

// ── Pause / resume ────────────────────────────────────────────

#[test]
fn pause_arms_cooldown_and_cancels_inactivity() {
    let mut h = Harness::new();
    h.send(PresenceDetected, 0);
    h.send(ButtonPlayPause, 10);

    assert_eq!(h.state(), PlayerState::Paused);
    assert!(h.svc.timers().is_active(TimerKind::Cooldown));
    assert!(!h.svc.timers().is_active(TimerKind::Inactivity));
    assert_eq!(h.engine(), [EngineCall::Start, EngineCall::Pause]);

    // Breathing player LED while paused.
    let last = h.ports.indicators.last().unwrap();
    assert!(matches!(last.player, IndicatorState::Breathing { .. }));
}

#[test]
fn resume_rearms_inactivity_only_when_radar_armed() {
    let mut h = Harness::new();
    h.send(ButtonPlayPause, 0);
    h.send(ButtonPlayPause, 1);
    h.send(ButtonPlayPause, 2);
    assert_eq!(h.state(), PlayerState::Playing);
    assert!(h.svc.timers().is_active(TimerKind::Inactivity));

    let mut h = Harness::with(PlayerConfig::default(), false);
    h.send(ButtonPlayPause, 0);
    h.send(ButtonPlayPause, 1);
    h.send(ButtonPlayPause, 2);
    assert_eq!(h.state(), PlayerState::Playing);
    assert!(!h.svc.timers().is_active(TimerKind::Inactivity));
    assert_eq!(
        h.engine(),
        [EngineCall::Start, EngineCall::Pause, EngineCall::Resume]
    );
}

#[test]
fn paused_presence_waits_for_cooldown_then_resumes() {
    let mut h = Harness::new();
    h.send(PresenceDetected, 0);
    h.send(ButtonPlayPause, 10);

    h.send(PresenceDetected, 30);
    assert_eq!(h.state(), PlayerState::Paused);

    h.send(PresenceDetected, 71);
    assert_eq!(h.state(), PlayerState::Playing);
    assert_eq!(h.engine().last(), Some(&EngineCall::Resume));
    assert!(h.svc.timers().is_active(TimerKind::Inactivity));
}

#[test]
fn stop_from_paused_does_not_rearm_cooldown() {
    let mut h = Harness::new();
    h.send(ButtonPlayPause, 0);
    h.send(ButtonPlayPause, 1);
    let cooldown = h.svc.timers().handle(TimerKind::Cooldown).unwrap();
    h.send(ButtonStop, 2);
    assert_eq!(h.state(), PlayerState::Stopped);
    assert_eq!(h.svc.timers().handle(TimerKind::Cooldown), Some(cooldown));
}

// ── Radar switch ──────────────────────────────────────────────

#[test]
fn switch_off_cancels_inactivity_and_ignores_radar() {
    let mut h = Harness::new();
    h.send(PresenceDetected, 0);
    h.send(SwitchRadarEnabled(false), 5);

    assert_eq!(h.state(), PlayerState::Playing);
    assert!(!h.svc.timers().is_active(TimerKind::Inactivity));
    assert_eq!(h.ports.indicators.last().unwrap().radar, IndicatorState::Off);

    h.advance_to(1000);
    assert_eq!(h.state(), PlayerState::Playing);

    h.send(PresenceDetected, 1001);
    assert!(!h.svc.timers().is_active(TimerKind::Inactivity));

    h.send(SwitchRadarEnabled(true), 1002);
    h.send(PresenceDetected, 1003);
    assert!(h.svc.timers().is_active(TimerKind::Inactivity));
}

#[test]
fn presence_renews_inactivity_to_full_duration() {
    let mut h = Harness::new();
    h.send(PresenceDetected, 0);
    for t in [50, 120, 290, 500] {
        h.send(PresenceCleared, t - 1);
        h.send(PresenceDetected, t);
        assert_eq!(
            h.svc.timers().remaining(TimerKind::Inactivity, Instant::from_secs(t)),
            Some(Duration::from_secs(300))
        );
    }
    assert_eq!(h.state(), PlayerState::Playing);
    assert_eq!(h.ports.engine.count(EngineCall::Start), 1);
}

// ── Sensor health ─────────────────────────────────────────────

#[test]
fn degraded_sensor_disarms_until_recovered() {
    let mut h = Harness::new();
    h.send(LogicalEvent::SensorFault(SensorFault::SerialRead), 0);
    h.send(PresenceDetected, 1);
    assert_eq!(h.state(), PlayerState::Stopped);

    h.send(SensorRecovered, 2);
    h.send(PresenceDetected, 3);
    assert_eq!(h.state(), PlayerState::Playing);
    assert!(h.ports.sink.events.contains(&AppEvent::SensorRecovered));
}

#[test]
fn lost_sensor_stays_disarmed() {
    let mut h = Harness::new();
    h.send(LogicalEvent::SensorFault(SensorFault::ChannelLost), 0);
    h.send(SensorRecovered, 1);
    h.send(PresenceDetected, 2);
    assert_eq!(h.state(), PlayerState::Stopped);
    assert_eq!(h.ports.indicators.last().unwrap().radar, IndicatorState::Off);
    // Buttons still work.
    h.send(ButtonPlayPause, 3);
    assert_eq!(h.state(), PlayerState::Playing);
}

// ── Engine faults ─────────────────────────────────────────────

#[test]
fn start_failure_reports_and_stays_stopped() {
    let mut h = Harness::new();
    h.ports.engine.fail_start = true;
    h.send(ButtonPlayPause, 0);

    assert_eq!(h.state(), PlayerState::Stopped);
    assert_eq!(h.ports.sink.faults(), 1);
    assert!(h
        .ports
        .sink
        .events
        .contains(&AppEvent::Fault(EngineFault::AssetMissing.into())));
    assert_eq!(
        h.ports.sink.transitions(),
        [
            (PlayerState::Stopped, PlayerState::Playing),
            (PlayerState::Playing, PlayerState::Stopped)
        ]
    );
    assert_eq!(h.svc.next_deadline(), None);
}

#[test]
fn pause_failure_falls_back_to_stopped() {
    let mut h = Harness::new();
    h.ports.engine.fail_pause = true;
    h.send(ButtonPlayPause, 0);
    h.send(ButtonPlayPause, 1);

    assert_eq!(h.state(), PlayerState::Stopped);
    assert_eq!(h.ports.sink.faults(), 1);
    assert_eq!(h.engine().last(), Some(&EngineCall::Stop));
    // The cooldown queued with the pause was abandoned.
    assert!(!h.svc.timers().is_active(TimerKind::Cooldown));
}

// ── End of track ──────────────────────────────────────────────

#[test]
fn loop_playback_restarts_without_presence() {
    let mut h = Harness::new();
    h.send(ButtonPlayPause, 0);
    h.ports.engine.finished = true;
    assert!(h.svc.poll_engine(Instant::from_secs(30), &mut h.ports));
    assert_eq!(h.state(), PlayerState::Playing);
    assert_eq!(h.ports.engine.count(EngineCall::Start), 2);
    assert_eq!(h.svc.context().restarts, 1);
}

#[test]
fn finished_track_without_loop_or_presence_stops() {
    let cfg = PlayerConfig {
        loop_playback: false,
        ..PlayerConfig::default()
    };
    let mut h = Harness::with(cfg, true);
    h.send(ButtonPlayPause, 0);
    h.ports.engine.finished = true;
    assert!(h.svc.poll_engine(Instant::from_secs(30), &mut h.ports));
    assert_eq!(h.state(), PlayerState::Stopped);
}

#[test]
fn engine_is_not_polled_outside_playing() {
    let mut h = Harness::new();
    h.ports.engine.finished = true;
    assert!(!h.svc.poll_engine(Instant::from_secs(1), &mut h.ports));
    assert!(h.ports.engine.finished, "flag must not be consumed");
}

// ── Full cycle + indicators ───────────────────────────────────

#[test]
fn full_cycle_forwarded_in_every_state() {
    let mut h = Harness::new();
    h.send(ButtonFullCycle, 0);
    h.send(ButtonPlayPause, 1);
    h.send(ButtonFullCycle, 2);
    h.send(ButtonPlayPause, 3);
    h.send(ButtonFullCycle, 4);
    assert_eq!(h.ports.pipeline.triggers, 3);
    assert_eq!(h.state(), PlayerState::Paused);
}

#[test]
fn refused_full_cycle_is_reported() {
    let mut h = Harness::new();
    h.ports.pipeline.accept = false;
    h.send(ButtonFullCycle, 0);
    assert!(h
        .ports
        .sink
        .events
        .contains(&AppEvent::FullCycleRequested { accepted: false }));
}

#[test]
fn indicators_never_exceed_ceiling() {
    let cfg = PlayerConfig {
        max_brightness_percent: 35,
        ..PlayerConfig::default()
    };
    let mut h = Harness::with(cfg, true);
    let script = [
        PresenceDetected,
        ButtonPlayPause,
        ButtonPlayPause,
        PresenceCleared,
        ButtonStop,
        ButtonPlayPause,
    ];
    for (i, ev) in script.into_iter().enumerate() {
        h.send(ev, i as u64);
    }
    assert!(!h.ports.indicators.shown.is_empty());
    for ind in &h.ports.indicators.shown {
        assert!(ind.player.peak() <= 35);
        assert!(ind.radar.peak() <= 35);
    }
}

#[test]
fn indicators_published_only_on_change() {
    let mut h = Harness::new();
    let before = h.ports.indicators.shown.len();
    h.send(ButtonFullCycle, 0);
    h.send(ButtonFullCycle, 1);
    assert_eq!(h.ports.indicators.shown.len(), before);
}
