//! Feedback controller: player state → indicator outputs.
//!
//! Pure mapping, recomputed after every handled event and never stored
//! as state of its own.
//!
//! | Indicator | Condition                     | Output                       |
//! |-----------|-------------------------------|------------------------------|
//! | player    | `Stopped`                     | Off                          |
//! | player    | `Playing`                     | Solid at ceiling             |
//! | player    | `Paused`                      | Breathing up to ceiling      |
//! | radar     | radar armed and presence      | Solid at ceiling             |
//! | radar     | otherwise                     | Off                          |
//!
//! Every brightness leaving this module is clamped to the configured
//! ceiling, whatever was requested.

use crate::config::PlayerConfig;
use crate::fsm::PlayerState;

/// Output of one indicator channel.  Brightness is a percentage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IndicatorState {
    Off,
    Solid { brightness: u8 },
    Breathing { frequency_hz: f32, max_brightness: u8 },
}

impl IndicatorState {
    /// Highest level this state can ever drive.
    pub fn peak(&self) -> u8 {
        match *self {
            Self::Off => 0,
            Self::Solid { brightness } => brightness,
            Self::Breathing { max_brightness, .. } => max_brightness,
        }
    }
}

/// Both indicator channels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Indicators {
    pub player: IndicatorState,
    pub radar: IndicatorState,
}

impl Indicators {
    pub const OFF: Self = Self {
        player: IndicatorState::Off,
        radar: IndicatorState::Off,
    };
}

#[derive(Debug, Clone, Copy)]
pub struct FeedbackController {
    ceiling: u8,
    breathing_hz: f32,
}

impl FeedbackController {
    pub fn new(max_brightness_percent: u8, breathing_hz: f32) -> Self {
        Self {
            ceiling: max_brightness_percent.min(100),
            breathing_hz,
        }
    }

    pub fn from_config(cfg: &PlayerConfig) -> Self {
        Self::new(cfg.max_brightness_percent, cfg.breathing_frequency_hz)
    }

    pub fn ceiling(&self) -> u8 {
        self.ceiling
    }

    /// Clamp a requested level to the ceiling.
    pub fn clamp(&self, requested: u8) -> u8 {
        requested.min(self.ceiling)
    }

    pub fn compute(&self, state: PlayerState, radar_armed: bool, presence: bool) -> Indicators {
        let player = match state {
            PlayerState::Stopped => IndicatorState::Off,
            PlayerState::Playing => IndicatorState::Solid {
                brightness: self.clamp(100),
            },
            PlayerState::Paused => IndicatorState::Breathing {
                frequency_hz: self.breathing_hz,
                max_brightness: self.clamp(100),
            },
        };
        let radar = if radar_armed && presence {
            IndicatorState::Solid {
                brightness: self.clamp(100),
            }
        } else {
            IndicatorState::Off
        };
        Indicators { player, radar }
    }
}
