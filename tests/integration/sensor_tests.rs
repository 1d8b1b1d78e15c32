//! Sensor adapter → controller, for both presence models.

use std::sync::atomic::{AtomicBool, Ordering};

use embassy_time::{Duration, Instant};
use themeplayer::adapters::time::SystemClock;
use themeplayer::app::ports::Clock;
use themeplayer::config::{RangedConfig, SensorConfig};
use themeplayer::diagnostics::Diagnostics;
use themeplayer::error::SensorFault;
use themeplayer::events::{EventQueue, LogicalEvent, StampedEvent};
use themeplayer::fsm::PlayerState;
use themeplayer::sensors::binary::EdgeChannel;
use themeplayer::sensors::frame::{FRAME_LEN, RadarFrame};
use themeplayer::sensors::ranged::{MALFORMED_RUN_LIMIT, SerialReadings};
use themeplayer::sensors::{FrameSource, PresenceModel, SensorAdapter, run_sensor_loop};

use crate::mock_hw::{EngineCall, Harness, ManualClock};

// ── Scripted UART ─────────────────────────────────────────────

/// Byte chunks that "arrive" at fixed instants.  A read jumps the shared
/// clock to the next arrival, or by the whole timeout when nothing is due.
struct ScriptedPort {
    clock: ManualClock,
    chunks: Vec<(u64, Vec<u8>)>,
}

impl FrameSource for ScriptedPort {
    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, SensorFault> {
        let now = self.clock.ms();
        let wake = now + timeout.as_millis();
        match self.chunks.first() {
            Some((at, _)) if *at <= wake => {
                let (at, bytes) = self.chunks.remove(0);
                self.clock.set_ms(at.max(now));
                buf[..bytes.len()].copy_from_slice(&bytes);
                Ok(bytes.len())
            }
            _ => {
                self.clock.set_ms(wake);
                Ok(0)
            }
        }
    }
}

fn ranged_adapter(chunks: Vec<(u64, Vec<u8>)>) -> SensorAdapter<SerialReadings<ScriptedPort>, ManualClock> {
    let clock = ManualClock::default();
    let port = ScriptedPort {
        clock: clock.clone(),
        chunks,
    };
    let model = PresenceModel::from_config(&SensorConfig::Ranged(RangedConfig::default()));
    SensorAdapter::new(SerialReadings::new(port), clock, model)
}

fn collect<S, C>(adapter: &mut SensorAdapter<S, C>, until: Instant) -> Vec<StampedEvent>
where
    S: themeplayer::sensors::ReadingSource,
    C: Clock,
{
    let mut out = Vec::new();
    while let Some(ev) = adapter.poll_or_block(until) {
        out.push(ev);
    }
    out
}

// ── Scenario B: ranged radar, steady target then gone ─────────

#[test]
fn ranged_target_holds_presence_then_clears_after_timeout() {
    // Target at 2.0 m every 300 ms from t=0 to t=2700.
    let frame = RadarFrame::single(0, 2000).encode().to_vec();
    let chunks = (0..10).map(|i| (i * 300, frame.clone())).collect();
    let mut adapter = ranged_adapter(chunks);

    let events = collect(&mut adapter, Instant::from_secs(10));
    let seen: Vec<_> = events.iter().map(|e| (e.event, e.at.as_millis())).collect();
    assert_eq!(
        seen,
        [
            (LogicalEvent::PresenceDetected, 0),
            (LogicalEvent::PresenceCleared, 3700)
        ]
    );

    // Clearing alone does not stop playback; the inactivity timer does.
    let mut h = Harness::new();
    for ev in events {
        h.svc.handle(ev, &mut h.ports);
    }
    assert_eq!(h.state(), PlayerState::Playing);
    assert_eq!(h.advance_to(299), 0);
    assert_eq!(h.advance_to(300), 1);
    assert_eq!(h.state(), PlayerState::Stopped);
    assert_eq!(h.engine(), [EngineCall::Start, EngineCall::Stop]);
}

#[test]
fn far_target_never_detects() {
    let frame = RadarFrame::single(0, 4000).encode().to_vec();
    let chunks = (0..5).map(|i| (i * 300, frame.clone())).collect();
    let mut adapter = ranged_adapter(chunks);
    assert!(collect(&mut adapter, Instant::from_secs(5)).is_empty());
}

#[test]
fn frames_split_across_reads_still_decode() {
    let frame = RadarFrame::single(300, 800).encode();
    let (head, tail) = frame.split_at(11);
    let chunks = vec![(0, vec![0x00, 0x42]), (5, head.to_vec()), (10, tail.to_vec())];
    let mut adapter = ranged_adapter(chunks);

    let first = adapter.poll_or_block(Instant::from_secs(5)).unwrap();
    assert_eq!(first.event, LogicalEvent::PresenceDetected);
    assert_eq!(first.at, Instant::from_millis(10));
}

#[test]
fn malformed_run_keeps_presence_until_target_timeout() {
    // One target at 2.0 m, then 70 frames of line noise 10 ms apart.
    let mut chunks = vec![(0, RadarFrame::single(0, 2000).encode().to_vec())];
    chunks.extend((1..=70).map(|i| (i * 10, vec![0x11u8; FRAME_LEN])));
    let mut adapter = ranged_adapter(chunks);

    let early = collect(&mut adapter, Instant::from_millis(999));
    assert_eq!(
        early.iter().map(|e| e.event).collect::<Vec<_>>(),
        [LogicalEvent::PresenceDetected]
    );
    assert!(adapter.malformed_frames() >= MALFORMED_RUN_LIMIT);

    let mut h = Harness::new();
    for ev in early {
        h.svc.handle(ev, &mut h.ports);
    }
    assert_eq!(h.state(), PlayerState::Playing);
    assert!(h.svc.context().presence);
    assert!(h.svc.context().radar_armed());
    assert_eq!(h.ports.sink.faults(), 0);

    // Only the target timeout clears presence.
    let late = collect(&mut adapter, Instant::from_secs(5));
    let seen: Vec<_> = late.iter().map(|e| (e.event, e.at.as_millis())).collect();
    assert_eq!(seen, [(LogicalEvent::PresenceCleared, 1000)]);
}

// ── Binary radar over the edge channel ────────────────────────

#[test]
fn binary_edges_reach_the_controller() {
    let edges = EdgeChannel::new();
    edges.notify(true);
    edges.notify(true);
    edges.notify(false);

    let mut adapter = SensorAdapter::new(&edges, SystemClock, PresenceModel::from_config(&SensorConfig::Binary));
    let until = SystemClock.now() + Duration::from_millis(50);
    let kinds: Vec<_> = collect(&mut adapter, until).into_iter().map(|e| e.event).collect();
    assert_eq!(kinds, [LogicalEvent::PresenceDetected, LogicalEvent::PresenceCleared]);
}

#[test]
fn unusable_pin_is_permanent() {
    let edges = EdgeChannel::new();
    edges.fail(SensorFault::GpioUnavailable);
    edges.notify(true);

    let mut adapter = SensorAdapter::new(&edges, SystemClock, PresenceModel::from_config(&SensorConfig::Binary));
    let until = SystemClock.now() + Duration::from_millis(30);
    let first = adapter.poll_or_block(until).unwrap();
    assert_eq!(first.event, LogicalEvent::SensorFault(SensorFault::GpioUnavailable));
    assert!(adapter.is_lost());
    // Later edges are never read.
    assert_eq!(adapter.poll_or_block(until), None);

    let mut h = Harness::new();
    h.svc.handle(first, &mut h.ports);
    h.send(LogicalEvent::PresenceDetected, 1);
    assert_eq!(h.state(), PlayerState::Stopped);
    assert_eq!(h.ports.sink.faults(), 1);
}

#[test]
fn sensor_thread_forwards_until_stopped() {
    let edges = EdgeChannel::new();
    let queue = EventQueue::new();
    let diagnostics = Diagnostics::new();
    let stop = AtomicBool::new(false);

    std::thread::scope(|s| {
        let adapter = SensorAdapter::new(&edges, SystemClock, PresenceModel::from_config(&SensorConfig::Binary));
        s.spawn(|| run_sensor_loop(adapter, &queue, &diagnostics, &stop));

        edges.notify(true);
        let ev = queue.recv_until(Some(Instant::now() + Duration::from_secs(2)));
        stop.store(true, Ordering::Release);
        assert_eq!(ev.map(|e| e.event), Some(LogicalEvent::PresenceDetected));
    });
    assert_eq!(diagnostics.malformed_frames(), 0);
}

// ── Test clock ────────────────────────────────────────────────

#[test]
fn manual_clock_is_shared_between_clones() {
    let a = ManualClock::default();
    let b = a.clone();
    a.advance(Duration::from_millis(1500));
    assert_eq!(b.now(), Instant::from_millis(1500));
}

