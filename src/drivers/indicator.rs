//! Indicator LED renderer.
//!
//! Turns an [`IndicatorState`] into a time-varying duty cycle on any
//! embedded-hal PWM channel.  The render thread calls `tick()` at a fixed
//! frame rate; the consumer only ever publishes new [`Indicators`] through
//! an [`IndicatorSignal`] and never waits on the LEDs.
//!
//! ## Patterns
//!
//! | State     | Output                                           |
//! |-----------|--------------------------------------------------|
//! | Off       | 0 %                                              |
//! | Solid     | Constant level                                   |
//! | Breathing | Triangle ramp 0 → max → 0, in 5 % steps          |
//!
//! ## Dual-target design
//!
//! On the Pi: rppal software PWM behind [`SetDutyCycle`].
//! On host/test: [`SimPwm`] tracks the duty in memory only.

use core::convert::Infallible;
use core::sync::atomic::{AtomicBool, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, block_for};
use embedded_hal::pwm::{Error as _, ErrorType, SetDutyCycle};
use log::{debug, warn};

use crate::app::ports::IndicatorPort;
use crate::feedback::{IndicatorState, Indicators};

/// Breathing brightness changes in steps of this many percent.
const BREATH_STEP_PERCENT: u8 = 5;

/// Render frame period.
pub const FRAME: Duration = Duration::from_millis(20);

// ── Single channel ────────────────────────────────────────────

pub struct IndicatorDriver<P> {
    pwm: P,
    state: IndicatorState,
    phase_ms: u32,
    ceiling: u8,
    level: u8,
    write_failed: bool,
}

impl<P: SetDutyCycle> IndicatorDriver<P> {
    pub fn new(pwm: P, ceiling: u8) -> Self {
        Self {
            pwm,
            state: IndicatorState::Off,
            phase_ms: 0,
            ceiling: ceiling.min(100),
            level: 0,
            write_failed: false,
        }
    }

    /// Switch pattern.  The phase restarts only when the pattern changes.
    pub fn set(&mut self, state: IndicatorState) {
        if state != self.state {
            self.state = state;
            self.phase_ms = 0;
        }
    }

    pub fn state(&self) -> IndicatorState {
        self.state
    }

    /// Last level written, in percent.
    pub fn level(&self) -> u8 {
        self.level
    }

    /// Advance by `delta_ms` and drive the output.  Returns the level.
    pub fn tick(&mut self, delta_ms: u32) -> u8 {
        self.phase_ms = self.phase_ms.wrapping_add(delta_ms);
        let level = match self.state {
            IndicatorState::Off => 0,
            IndicatorState::Solid { brightness } => brightness,
            IndicatorState::Breathing {
                frequency_hz,
                max_brightness,
            } => {
                let period_ms = (1000.0 / frequency_hz.max(0.01)) as u32;
                breath_level(self.phase_ms, period_ms.max(2), max_brightness)
            }
        }
        .min(self.ceiling);
        self.write(level);
        level
    }

    pub fn off(&mut self) {
        self.state = IndicatorState::Off;
        self.write(0);
    }

    fn write(&mut self, level: u8) {
        self.level = level;
        match self.pwm.set_duty_cycle_percent(level) {
            Ok(()) => self.write_failed = false,
            Err(e) if !self.write_failed => {
                warn!("indicator write failed: {:?}", e.kind());
                self.write_failed = true;
            }
            Err(_) => {}
        }
    }
}

/// Triangular ramp 0 → `max` → 0 over `period_ms`, quantised to
/// [`BREATH_STEP_PERCENT`].
fn breath_level(phase_ms: u32, period_ms: u32, max: u8) -> u8 {
    let pos = u64::from(phase_ms % period_ms);
    let half = u64::from(period_ms / 2).max(1);
    let ramp = if pos < half { pos } else { u64::from(period_ms) - pos };
    let raw = ((ramp.min(half) * u64::from(max)) / half) as u8;
    raw - raw % BREATH_STEP_PERCENT
}

// ── Both channels ─────────────────────────────────────────────

pub struct IndicatorPanel<A, B> {
    pub player: IndicatorDriver<A>,
    pub radar: IndicatorDriver<B>,
}

impl<A: SetDutyCycle, B: SetDutyCycle> IndicatorPanel<A, B> {
    pub fn new(player: A, radar: B, ceiling: u8) -> Self {
        Self {
            player: IndicatorDriver::new(player, ceiling),
            radar: IndicatorDriver::new(radar, ceiling),
        }
    }

    pub fn apply(&mut self, ind: Indicators) {
        self.player.set(ind.player);
        self.radar.set(ind.radar);
    }

    pub fn tick(&mut self, delta_ms: u32) {
        self.player.tick(delta_ms);
        self.radar.tick(delta_ms);
    }

    pub fn off(&mut self) {
        self.player.off();
        self.radar.off();
    }
}

// ── Consumer → render thread hand-off ─────────────────────────

/// Latest-value mailbox between the consumer and the render thread.
/// Publishing never blocks; a newer value overwrites an unread one.
pub struct IndicatorSignal {
    signal: Signal<CriticalSectionRawMutex, Indicators>,
}

impl Default for IndicatorSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl IndicatorSignal {
    pub const fn new() -> Self {
        Self {
            signal: Signal::new(),
        }
    }

    pub fn publish(&self, ind: Indicators) {
        self.signal.signal(ind);
    }

    pub fn take(&self) -> Option<Indicators> {
        self.signal.try_take()
    }
}

impl IndicatorPort for &IndicatorSignal {
    fn show(&mut self, indicators: &Indicators) {
        self.publish(*indicators);
    }
}

/// Render loop body for the indicator thread.  Runs until `stop` is set,
/// then turns both channels off.
pub fn run_render_loop<A: SetDutyCycle, B: SetDutyCycle>(
    signal: &IndicatorSignal,
    panel: &mut IndicatorPanel<A, B>,
    stop: &AtomicBool,
) {
    let frame_ms = FRAME.as_millis() as u32;
    while !stop.load(Ordering::Acquire) {
        if let Some(ind) = signal.take() {
            debug!("indicators: {:?}", ind);
            panel.apply(ind);
        }
        panel.tick(frame_ms);
        block_for(FRAME);
    }
    panel.off();
}

// ── Host PWM ──────────────────────────────────────────────────

/// In-memory PWM channel for hosts without LEDs.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimPwm {
    duty: u16,
}

impl SimPwm {
    pub const MAX_DUTY: u16 = 1000;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn duty(&self) -> u16 {
        self.duty
    }
}

impl ErrorType for SimPwm {
    type Error = Infallible;
}

impl SetDutyCycle for SimPwm {
    fn max_duty_cycle(&self) -> u16 {
        Self::MAX_DUTY
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
        self.duty = duty;
        Ok(())
    }
}
