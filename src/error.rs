//! Unified error types for the playback controller.
//!
//! A single `Error` enum that every subsystem can convert into, keeping the
//! runtime's fault reporting uniform.  Sensor and engine faults are `Copy`
//! so they can travel inside [`LogicalEvent`](crate::events::LogicalEvent)
//! and [`AppEvent`](crate::app::events::AppEvent) without allocation.
//! Configuration faults only happen at startup and carry owned detail.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level controller error
// ---------------------------------------------------------------------------

/// Every fallible operation in the controller funnels into this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Motion sensor channel degraded or lost.  Never fatal.
    Sensor(SensorFault),
    /// Playback backend could not carry out a command.  Never fatal.
    Engine(EngineFault),
    /// Configuration is invalid or missing.  Fatal at startup.
    Config(ConfigFault),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Engine(e) => write!(f, "engine: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Sensor faults
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorFault {
    /// A read on the serial port failed.  Radar is treated as disabled
    /// until the next successful read.
    SerialRead,
    /// The sensor channel is gone for good (port vanished, repeated read
    /// failures).  Radar stays disarmed for the rest of the session.
    ChannelLost,
    /// The digital input could not be configured or read.
    GpioUnavailable,
}

impl SensorFault {
    /// Whether this fault permanently disarms the radar.
    pub const fn is_permanent(self) -> bool {
        matches!(self, Self::ChannelLost | Self::GpioUnavailable)
    }
}

impl fmt::Display for SensorFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SerialRead => write!(f, "serial read failed"),
            Self::ChannelLost => write!(f, "sensor channel lost"),
            Self::GpioUnavailable => write!(f, "sensor GPIO unavailable"),
        }
    }
}

impl std::error::Error for SensorFault {}

impl From<SensorFault> for Error {
    fn from(e: SensorFault) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Engine faults
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineFault {
    /// The asset reference does not resolve to a playable file.
    AssetMissing,
    /// The playback process could not be spawned.
    SpawnFailed,
    /// A transport command (pause / resume / stop) was rejected.
    CommandFailed,
}

impl fmt::Display for EngineFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AssetMissing => write!(f, "audio asset missing"),
            Self::SpawnFailed => write!(f, "playback process failed to start"),
            Self::CommandFailed => write!(f, "playback command failed"),
        }
    }
}

impl std::error::Error for EngineFault {}

impl From<EngineFault> for Error {
    fn from(e: EngineFault) -> Self {
        Self::Engine(e)
    }
}

// ---------------------------------------------------------------------------
// Configuration faults
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigFault {
    /// The configuration file does not exist or cannot be read.
    Missing(String),
    /// The file is not valid JSON or does not match the schema.
    Parse(String),
    /// A field failed range validation.  Describes which field and why.
    Invalid(&'static str),
}

impl fmt::Display for ConfigFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing(path) => write!(f, "cannot read {path}"),
            Self::Parse(msg) => write!(f, "parse error: {msg}"),
            Self::Invalid(msg) => write!(f, "invalid value: {msg}"),
        }
    }
}

impl std::error::Error for ConfigFault {}

impl From<ConfigFault> for Error {
    fn from(e: ConfigFault) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Controller-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
