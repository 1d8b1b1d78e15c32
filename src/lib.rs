//! World Theme playback controller library.
//!
//! Exposes the pure-logic modules for integration testing and for the
//! binary.  Raspberry Pi peripheral code sits behind the `rpi` feature;
//! everything else builds and tests on any host.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod diagnostics;
pub mod drivers;
pub mod error;
pub mod events;
pub mod feedback;
pub mod fsm;
pub mod pins;
pub mod sensors;
pub mod timers;
