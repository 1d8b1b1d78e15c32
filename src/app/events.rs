//! Outbound application events.
//!
//! The [`PlayerService`](super::service::PlayerService) emits these through
//! the [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them; the shipped one logs them.

use crate::diagnostics::StatusSnapshot;
use crate::error::Error;
use crate::fsm::PlayerState;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The service has started (carries initial state).
    Started(PlayerState),

    /// The FSM transitioned between states.
    StateChanged { from: PlayerState, to: PlayerState },

    /// A sensor or engine fault.  Never fatal.
    Fault(Error),

    /// The sensor channel delivered data again after a recoverable fault.
    SensorRecovered,

    /// The full-cycle button was forwarded to the orchestrator.
    FullCycleRequested { accepted: bool },

    /// Periodic status snapshot.
    Status(StatusSnapshot),

    /// Cleanup finished; nothing follows.
    Shutdown,
}
