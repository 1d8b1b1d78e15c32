//! Application layer: hexagonal architecture core.
//!
//! ```text
//!        ┌────────────────────────────────────────────────┐
//!        │              Application Core                  │
//!        │                                                │
//!        │  ┌──────────────┐  ┌────────┐  ┌────────────┐  │
//!        │  │PlayerService │──│  FSM   │──│   Timers   │  │
//!        │  └──────┬───────┘  └────────┘  └────────────┘  │
//!        │         │                                      │
//!        │  Port traits (driven side)                     │
//!        │  PlaybackEngine · IndicatorPort · PipelinePort │
//!        │  EventSink · ConfigPort · Clock                │
//!        └─────────┼──────────────────────────────────────┘
//!                  │
//!      ┌───────────┼───────────────┐
//!      ▼           ▼               ▼
//!  CommandEngine  IndicatorSignal  LogEventSink
//!  (aplay)        (render thread)  (env_logger)
//! ```
//!
//! [`runtime::PlayerRuntime`] is the single consumer that feeds the
//! service from the event queue.

pub mod events;
pub mod ports;
pub mod runtime;
pub mod service;
