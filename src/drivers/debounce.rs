//! Edge-driven debouncer for the three buttons and the radar enable switch.
//!
//! ## Hardware
//!
//! All four lines are wired to GND through the switch with the internal
//! pull-up enabled, so LOW means pressed (buttons) or ON (radar switch).
//! Both-edge interrupts deliver raw `(line, level, timestamp)` samples into
//! [`InputDebouncer::observe_raw`]; nothing polls the pins at a fixed rate.
//!
//! ## Algorithm
//!
//! | Raw input                              | Effect                               |
//! |----------------------------------------|--------------------------------------|
//! | Edge to a level != settled level       | Start hold window at edge time       |
//! | Any edge while the window is running   | Restart window at the new edge time  |
//! | Window elapses, level != settled level | Settle; emit the line's logical event |
//! | Window elapses, level == settled level | Glitch absorbed; nothing emitted     |
//!
//! Buttons emit their press event on the settled HIGH → LOW transition only.
//! The radar switch emits `SwitchRadarEnabled(on)` on every settled change.

use core::sync::atomic::{AtomicBool, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_time::{Duration, Instant};
use heapless::Vec;
use log::debug;

use crate::events::{EventQueue, LogicalEvent, StampedEvent, receive_until, send_latest};
use crate::pins::InputLine;

/// Raw samples buffered between the edge callbacks and the debouncer.
const RAW_EDGE_CAP: usize = 32;

/// Longest the debouncer thread sleeps before rechecking the stop flag.
const IDLE_WAKE: Duration = Duration::from_millis(100);

/// Debounce state for a single input line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineState {
    /// Level is settled; no edge seen since.
    Stable { level: bool },
    /// An edge arrived; waiting for `window` of quiet.
    Holding { settled: bool, candidate: bool, since: Instant },
}

impl LineState {
    fn settled(self) -> bool {
        match self {
            Self::Stable { level } | Self::Holding { settled: level, .. } => level,
        }
    }
}

pub struct InputDebouncer {
    window: Duration,
    lines: [LineState; InputLine::COUNT],
}

impl InputDebouncer {
    /// `initial` holds the raw level of each line sampled at startup, indexed
    /// by [`InputLine::index`].  Startup levels never produce events.
    pub fn new(window: Duration, initial: [bool; InputLine::COUNT]) -> Self {
        Self {
            window,
            lines: initial.map(|level| LineState::Stable { level }),
        }
    }

    /// All lines idle HIGH (buttons released, radar switch OFF).
    pub fn idle(window: Duration) -> Self {
        Self::new(window, [true; InputLine::COUNT])
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Settled level of `line` (true = HIGH).
    pub fn level(&self, line: InputLine) -> bool {
        self.lines[line.index()].settled()
    }

    /// Radar switch settled in the ON position.
    pub fn radar_switch_on(&self) -> bool {
        !self.level(InputLine::RadarEnable)
    }

    /// Feed one raw edge sample.
    ///
    /// First settles `line` if its window elapsed before `at` (a late edge
    /// must not extend a window that already closed), then records the new
    /// sample.  Returns the event of `line` if it settled by `at`.  Other
    /// lines are only settled by [`poll_settled`](Self::poll_settled).
    pub fn observe_raw(&mut self, line: InputLine, level: bool, at: Instant) -> Option<LogicalEvent> {
        let settled = self.settle(line, at);
        let state = &mut self.lines[line.index()];
        *state = match *state {
            LineState::Stable { level: current } if current == level => *state,
            LineState::Stable { level: current } => LineState::Holding {
                settled: current,
                candidate: level,
                since: at,
            },
            LineState::Holding { settled, .. } => LineState::Holding {
                settled,
                candidate: level,
                since: at,
            },
        };
        settled
    }

    /// Settle every line whose window has elapsed at `now`.
    /// Events are stamped with the instant the line actually settled.
    pub fn poll_settled(&mut self, now: Instant) -> Vec<StampedEvent, { InputLine::COUNT }> {
        let mut out = Vec::new();
        for line in InputLine::ALL {
            let due = self.deadline_of(line);
            if let Some(event) = self.settle(line, now) {
                // One slot per line, cannot overflow.
                let _ = out.push(StampedEvent::new(event, due.unwrap_or(now)));
            }
        }
        out
    }

    /// Earliest instant at which a pending line will settle.
    pub fn next_deadline(&self) -> Option<Instant> {
        InputLine::ALL.iter().filter_map(|l| self.deadline_of(*l)).min()
    }

    fn deadline_of(&self, line: InputLine) -> Option<Instant> {
        match self.lines[line.index()] {
            LineState::Holding { since, .. } => Some(since + self.window),
            LineState::Stable { .. } => None,
        }
    }

    fn settle(&mut self, line: InputLine, now: Instant) -> Option<LogicalEvent> {
        let state = &mut self.lines[line.index()];
        let LineState::Holding { settled, candidate, since } = *state else {
            return None;
        };
        if now < since + self.window {
            return None;
        }
        *state = LineState::Stable { level: candidate };
        if candidate == settled {
            log::debug!("{:?}: glitch absorbed", line);
            return None;
        }
        Self::logical_event(line, candidate)
    }

    fn logical_event(line: InputLine, level: bool) -> Option<LogicalEvent> {
        let pressed = !level;
        match line {
            InputLine::PlayPause if pressed => Some(LogicalEvent::ButtonPlayPause),
            InputLine::Stop if pressed => Some(LogicalEvent::ButtonStop),
            InputLine::FullCycle if pressed => Some(LogicalEvent::ButtonFullCycle),
            InputLine::RadarEnable => Some(LogicalEvent::SwitchRadarEnabled(pressed)),
            _ => None,
        }
    }
}

// ── Edge callback → debouncer thread ──────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawSample {
    pub line: InputLine,
    pub level: bool,
    pub at: Instant,
}

/// Non-blocking hand-off from GPIO edge callbacks.
pub struct RawEdges {
    channel: Channel<CriticalSectionRawMutex, RawSample, RAW_EDGE_CAP>,
}

impl Default for RawEdges {
    fn default() -> Self {
        Self::new()
    }
}

impl RawEdges {
    pub const fn new() -> Self {
        Self {
            channel: Channel::new(),
        }
    }

    /// Called from the edge callback.  When full, the oldest sample is
    /// evicted so the newest level of a burst always reaches the debouncer.
    pub fn notify(&self, line: InputLine, level: bool, at: Instant) {
        if !send_latest(&self.channel, RawSample { line, level, at }) {
            debug!("raw edge buffer full, evicted oldest for {:?}", line);
        }
    }
}

/// Wait for one raw sample (or `deadline`) and forward whatever settled.
/// Returns the number of events pushed.
pub fn debounce_step(edges: &RawEdges, debouncer: &mut InputDebouncer, queue: &EventQueue, deadline: Instant) -> usize {
    let sample = receive_until(&edges.channel, Some(deadline));
    let now = sample.map_or(deadline, |s| s.at);

    let mut pushed = 0;
    for ev in debouncer.poll_settled(now) {
        queue.push_stamped(ev);
        pushed += 1;
    }
    if let Some(s) = sample {
        if let Some(event) = debouncer.observe_raw(s.line, s.level, s.at) {
            queue.push(event, s.at);
            pushed += 1;
        }
    }
    pushed
}

/// Debouncer thread body.  Runs until `stop` is set.
pub fn run_debounce_loop(edges: &RawEdges, mut debouncer: InputDebouncer, queue: &EventQueue, stop: &AtomicBool) {
    while !stop.load(Ordering::Acquire) {
        let idle = Instant::now() + IDLE_WAKE;
        let deadline = debouncer.next_deadline().map_or(idle, |d| d.min(idle));
        debounce_step(edges, &mut debouncer, queue, deadline);
    }
}
