//! Controller configuration parameters.
//!
//! All tunable parameters for the playback controller.  Loaded once at
//! startup from the settings file (see
//! [`JsonFileConfig`](crate::adapters::config_file::JsonFileConfig)); there
//! is no hot reload.  Every field has a default so partial files work.

use std::path::PathBuf;

use embassy_time::Duration;
use serde::{Deserialize, Serialize};

use crate::error::ConfigFault;
use crate::pins;

/// Core controller configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlayerConfig {
    // --- Inputs ---
    /// Button / switch debounce window in milliseconds.
    pub debounce_ms: u32,

    // --- Indicators ---
    /// Brightness ceiling for both indicators (0-100 %).
    pub max_brightness_percent: u8,
    /// Breathing cycles per second for the paused indicator.
    pub breathing_frequency_hz: f32,

    // --- Timers ---
    /// Auto-stop after this long without presence (seconds).
    pub inactivity_secs: u32,
    /// Radar suppression after a manual pause / stop (seconds).
    pub cooldown_secs: u32,

    // --- Sensor ---
    /// Which motion sensor is fitted.  Fixed for the process lifetime.
    pub sensor: SensorConfig,
    /// GPIO assignments.
    pub pins: PinMap,

    // --- Playback ---
    /// The current audio asset, as published by the generation pipeline.
    pub asset_path: PathBuf,
    /// Player process argv.  `{asset}` is replaced with the asset path.
    pub engine_command: Vec<String>,
    /// Keep looping the track while playing even without presence.
    pub loop_playback: bool,
    /// How often the engine is polled for end-of-track (milliseconds).
    pub engine_poll_ms: u32,

    // --- Pipeline ---
    /// Orchestrator argv run when the full-cycle button is pressed.
    pub full_cycle_command: Vec<String>,

    // --- Telemetry ---
    /// Status report interval (seconds).
    pub status_interval_secs: u32,
}

/// Motion sensor model selector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "camelCase")]
pub enum SensorConfig {
    /// Digital presence pin (RCWL-0516).
    Binary,
    /// Serial ranging radar (RD-03D).
    Ranged(RangedConfig),
}

/// Parameters for the ranged (serial) radar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RangedConfig {
    /// Targets further than this are ignored (walls, furniture).
    pub max_range_m: f32,
    /// Presence is cleared this long after the last qualifying frame.
    pub target_timeout_ms: u32,
    /// In-range frames needed back to back before one counts.
    pub min_consecutive_frames: u8,
    /// UART device.
    pub serial_path: String,
    /// UART baud rate.
    pub baud_rate: u32,
}

impl Default for RangedConfig {
    fn default() -> Self {
        Self {
            max_range_m: 2.5,
            target_timeout_ms: 1000,
            min_consecutive_frames: 1,
            serial_path: "/dev/serial0".into(),
            baud_rate: 256_000,
        }
    }
}

/// BCM pin numbers for every input and output line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PinMap {
    pub play_pause_btn: u8,
    pub stop_btn: u8,
    pub full_cycle_btn: u8,
    pub radar_enable: u8,
    pub radar_signal: u8,
    pub player_led: u8,
    pub radar_led: u8,
}

impl Default for PinMap {
    fn default() -> Self {
        Self {
            play_pause_btn: pins::PLAY_PAUSE_BTN_GPIO,
            stop_btn: pins::STOP_BTN_GPIO,
            full_cycle_btn: pins::FULL_CYCLE_BTN_GPIO,
            radar_enable: pins::RADAR_ENABLE_GPIO,
            radar_signal: pins::RADAR_SIGNAL_GPIO,
            player_led: pins::PLAYER_LED_GPIO,
            radar_led: pins::RADAR_LED_GPIO,
        }
    }
}

impl PinMap {
    fn all(&self) -> [u8; 7] {
        [
            self.play_pause_btn,
            self.stop_btn,
            self.full_cycle_btn,
            self.radar_enable,
            self.radar_signal,
            self.player_led,
            self.radar_led,
        ]
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            // Inputs
            debounce_ms: 50,

            // Indicators
            max_brightness_percent: 60,
            breathing_frequency_hz: 0.5,

            // Timers
            inactivity_secs: 300, // 5 min
            cooldown_secs: 60,

            // Sensor
            sensor: SensorConfig::Binary,
            pins: PinMap::default(),

            // Playback
            asset_path: PathBuf::from("music_generated/current.wav"),
            engine_command: vec!["aplay".into(), "-q".into(), "{asset}".into()],
            loop_playback: true,
            engine_poll_ms: 250,

            // Pipeline
            full_cycle_command: ["uv", "run", "python", "main.py", "--fetch", "true", "--play", "false"]
                .iter()
                .map(|s| (*s).to_string())
                .collect(),

            // Telemetry
            status_interval_secs: 60,
        }
    }
}

impl PlayerConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(u64::from(self.debounce_ms))
    }

    pub fn inactivity(&self) -> Duration {
        Duration::from_secs(u64::from(self.inactivity_secs))
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(u64::from(self.cooldown_secs))
    }

    pub fn engine_poll(&self) -> Duration {
        Duration::from_millis(u64::from(self.engine_poll_ms))
    }

    pub fn status_interval(&self) -> Duration {
        Duration::from_secs(u64::from(self.status_interval_secs))
    }

    /// Range-check every field.  Invalid values are rejected, not clamped.
    pub fn validate(&self) -> Result<(), ConfigFault> {
        if self.debounce_ms == 0 || self.debounce_ms > 1000 {
            return Err(ConfigFault::Invalid("debounceMs must be within 1..=1000"));
        }
        if self.max_brightness_percent == 0 || self.max_brightness_percent > 100 {
            return Err(ConfigFault::Invalid("maxBrightnessPercent must be within 1..=100"));
        }
        if !(0.05..=10.0).contains(&self.breathing_frequency_hz) {
            return Err(ConfigFault::Invalid("breathingFrequencyHz must be within 0.05..=10"));
        }
        if self.inactivity_secs == 0 {
            return Err(ConfigFault::Invalid("inactivitySecs must be > 0"));
        }
        if self.cooldown_secs == 0 {
            return Err(ConfigFault::Invalid("cooldownSecs must be > 0"));
        }
        if self.engine_command.is_empty() {
            return Err(ConfigFault::Invalid("engineCommand must not be empty"));
        }
        if self.engine_poll_ms == 0 {
            return Err(ConfigFault::Invalid("enginePollMs must be > 0"));
        }
        if self.status_interval_secs == 0 {
            return Err(ConfigFault::Invalid("statusIntervalSecs must be > 0"));
        }

        let pins = self.pins.all();
        for (i, pin) in pins.iter().enumerate() {
            if *pin > 27 {
                return Err(ConfigFault::Invalid("pins must be BCM 0..=27"));
            }
            if pins[i + 1..].contains(pin) {
                return Err(ConfigFault::Invalid("pins must be distinct"));
            }
        }

        if let SensorConfig::Ranged(r) = &self.sensor {
            if !(r.max_range_m > 0.0 && r.max_range_m <= 8.0) {
                return Err(ConfigFault::Invalid("sensor.maxRangeM must be within (0, 8]"));
            }
            if r.target_timeout_ms == 0 {
                return Err(ConfigFault::Invalid("sensor.targetTimeoutMs must be > 0"));
            }
            if r.min_consecutive_frames == 0 {
                return Err(ConfigFault::Invalid("sensor.minConsecutiveFrames must be >= 1"));
            }
            if r.serial_path.is_empty() || r.baud_rate == 0 {
                return Err(ConfigFault::Invalid("sensor serial port settings incomplete"));
            }
        }
        Ok(())
    }
}

impl RangedConfig {
    pub fn target_timeout(&self) -> Duration {
        Duration::from_millis(u64::from(self.target_timeout_ms))
    }
}
