//! GPIO pin assignments for the player HAT (BCM numbering).
//!
//! These are the defaults baked into [`PinMap`](crate::config::PinMap);
//! a deployment can override any of them from the settings file.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Buttons (active-low momentary switches, internal pull-up)
// ---------------------------------------------------------------------------

/// Play / pause toggle.
pub const PLAY_PAUSE_BTN_GPIO: u8 = 22;
/// Stop.
pub const STOP_BTN_GPIO: u8 = 10;
/// Run the full news → music generation cycle.
pub const FULL_CYCLE_BTN_GPIO: u8 = 9;

// ---------------------------------------------------------------------------
// Radar
// ---------------------------------------------------------------------------

/// Radar enable toggle switch.  Connects to GND when ON, so LOW = enabled.
pub const RADAR_ENABLE_GPIO: u8 = 23;
/// RCWL-0516 OUT pin.  HIGH while motion is detected.
pub const RADAR_SIGNAL_GPIO: u8 = 17;

// ---------------------------------------------------------------------------
// Indicator LEDs (software PWM)
// ---------------------------------------------------------------------------

/// Player state LED.
pub const PLAYER_LED_GPIO: u8 = 27;
/// Radar armed / presence LED.
pub const RADAR_LED_GPIO: u8 = 18;

/// Software PWM carrier frequency for the indicator LEDs.
pub const LED_PWM_FREQ_HZ: f64 = 100.0;

// ---------------------------------------------------------------------------
// Logical input identity
// ---------------------------------------------------------------------------

/// Debounced logical inputs.  The debouncer keeps one window per line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum InputLine {
    PlayPause = 0,
    Stop = 1,
    FullCycle = 2,
    RadarEnable = 3,
}

impl InputLine {
    /// Number of debounced lines, used to size per-line state arrays.
    pub const COUNT: usize = 4;

    pub const ALL: [Self; Self::COUNT] = [
        Self::PlayPause,
        Self::Stop,
        Self::FullCycle,
        Self::RadarEnable,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }
}
