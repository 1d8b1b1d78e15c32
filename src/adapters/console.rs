//! Text command console for running without buttons or a radar.
//!
//! | Key | Effect                                 |
//! |-----|----------------------------------------|
//! | `p` | play / pause button                    |
//! | `s` | stop button                            |
//! | `f` | full-cycle button                      |
//! | `r` | flip the radar enable switch           |
//! | `m` | motion sensor output high              |
//! | `c` | motion sensor output low               |
//! | `q` | quit                                   |
//!
//! Buttons go straight into the event queue as already-debounced
//! presses.  Motion goes through the [`EdgeChannel`] so the sensor
//! adapter reduces it exactly like the real pin.

use core::sync::atomic::{AtomicBool, Ordering};
use std::io::BufRead;

use log::{info, warn};

use crate::app::ports::Clock;
use crate::events::{EventQueue, LogicalEvent};
use crate::sensors::binary::EdgeChannel;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleCommand {
    PlayPause,
    Stop,
    FullCycle,
    ToggleRadar,
    Motion(bool),
    Quit,
}

impl ConsoleCommand {
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim().to_ascii_lowercase().as_str() {
            "p" => Some(Self::PlayPause),
            "s" => Some(Self::Stop),
            "f" => Some(Self::FullCycle),
            "r" => Some(Self::ToggleRadar),
            "m" => Some(Self::Motion(true)),
            "c" => Some(Self::Motion(false)),
            "q" => Some(Self::Quit),
            _ => None,
        }
    }
}

/// Read commands until EOF, `q`, or `stop` is set.  `q` and EOF set `stop`.
pub fn run_console<R: BufRead, C: Clock>(
    input: R,
    queue: &EventQueue,
    edges: &EdgeChannel,
    clock: C,
    mut radar_on: bool,
    stop: &AtomicBool,
) {
    info!("console: p=play/pause s=stop f=full cycle r=radar switch m/c=motion on/off q=quit");
    for line in input.lines() {
        if stop.load(Ordering::Acquire) {
            return;
        }
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                warn!("console read failed: {}", e);
                break;
            }
        };
        let Some(cmd) = ConsoleCommand::parse(&line) else {
            if !line.trim().is_empty() {
                warn!("unknown command {:?}", line.trim());
            }
            continue;
        };
        let now = clock.now();
        match cmd {
            ConsoleCommand::PlayPause => {
                queue.push(LogicalEvent::ButtonPlayPause, now);
            }
            ConsoleCommand::Stop => {
                queue.push(LogicalEvent::ButtonStop, now);
            }
            ConsoleCommand::FullCycle => {
                queue.push(LogicalEvent::ButtonFullCycle, now);
            }
            ConsoleCommand::ToggleRadar => {
                radar_on = !radar_on;
                queue.push(LogicalEvent::SwitchRadarEnabled(radar_on), now);
            }
            ConsoleCommand::Motion(level) => edges.notify(level),
            ConsoleCommand::Quit => break,
        }
    }
    stop.store(true, Ordering::Release);
}
