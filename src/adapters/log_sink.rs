//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events
//! through the `log` facade (env_logger to stderr / journald in
//! production).  A network or dashboard adapter would implement the same
//! trait.

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] as a one-line tagged record.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Status(s) => {
                info!(
                    "STATUS | state={} | radar={} presence={} | inactivity={} cooldown={} | \
                     up={}s transitions={} restarts={} | faults={} suppressed={} dropped={} \
                     malformed={} cycles={}",
                    s.state,
                    if s.radar_armed { "ARMED" } else { "off" },
                    if s.presence { "yes" } else { "no" },
                    fmt_remaining(s.inactivity_remaining_ms),
                    fmt_remaining(s.cooldown_remaining_ms),
                    s.uptime_secs,
                    s.transitions,
                    s.restarts,
                    s.faults,
                    s.suppressed_presence,
                    s.dropped_events,
                    s.malformed_frames,
                    s.full_cycles,
                );
            }
            AppEvent::StateChanged { from, to } => {
                info!("STATE | {} -> {}", from, to);
            }
            AppEvent::Fault(e) => {
                warn!("FAULT | {}", e);
            }
            AppEvent::SensorRecovered => {
                info!("FAULT | sensor recovered");
            }
            AppEvent::FullCycleRequested { accepted } => {
                info!("CYCLE | full cycle {}", if *accepted { "launched" } else { "refused" });
            }
            AppEvent::Started(state) => {
                info!("START | initial_state={}", state);
            }
            AppEvent::Shutdown => {
                info!("STOP  | controller shut down");
            }
        }
    }
}

fn fmt_remaining(ms: Option<u64>) -> String {
    match ms {
        Some(ms) => format!("{:.1}s", ms as f64 / 1000.0),
        None => "-".into(),
    }
}
