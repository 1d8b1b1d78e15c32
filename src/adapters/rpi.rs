//! Raspberry Pi peripherals via rppal.
//!
//! | Peripheral          | rppal            | Feeds / implements                 |
//! |---------------------|------------------|------------------------------------|
//! | Buttons + switch    | `InputPin` + IRQ | [`RawEdges`] → debouncer thread    |
//! | RCWL-0516 OUT       | `InputPin` + IRQ | [`EdgeChannel`] → sensor thread    |
//! | RD-03D serial       | `Uart`           | [`FrameSource`]                    |
//! | Indicator LEDs      | soft PWM         | [`SetDutyCycle`]                   |
//!
//! Every handle is owned by the value returned here; dropping it releases
//! the pin (interrupts are cleared, PWM stops, the port closes).

use core::fmt;

use embassy_time::{Duration, Instant};
use embedded_hal::pwm::{ErrorKind, ErrorType, SetDutyCycle};
use log::info;
use rppal::gpio::{Event, Gpio, InputPin, OutputPin, Trigger};
use rppal::uart::{Parity, Uart};

use crate::config::{PinMap, RangedConfig};
use crate::drivers::debounce::RawEdges;
use crate::error::SensorFault;
use crate::pins::{InputLine, LED_PWM_FREQ_HZ};
use crate::sensors::FrameSource;
use crate::sensors::binary::EdgeChannel;

/// Longest read timeout the UART driver accepts.
const UART_MAX_TIMEOUT_MS: u64 = 25_500;
/// The UART driver waits in 100 ms steps.
const UART_MIN_TIMEOUT_MS: u64 = 100;

pub struct PiBoard {
    gpio: Gpio,
}

impl PiBoard {
    pub fn open() -> Result<Self, rppal::gpio::Error> {
        Ok(Self { gpio: Gpio::new()? })
    }

    /// Configure the four debounced lines (pull-up, both edges) and return
    /// them with their levels sampled before the interrupts were armed.
    pub fn inputs(
        &self,
        pins: &PinMap,
        edges: &'static RawEdges,
    ) -> Result<(Vec<InputPin>, [bool; InputLine::COUNT]), rppal::gpio::Error> {
        let mut held = Vec::with_capacity(InputLine::COUNT);
        let mut initial = [true; InputLine::COUNT];
        for line in InputLine::ALL {
            let bcm = match line {
                InputLine::PlayPause => pins.play_pause_btn,
                InputLine::Stop => pins.stop_btn,
                InputLine::FullCycle => pins.full_cycle_btn,
                InputLine::RadarEnable => pins.radar_enable,
            };
            let mut pin = self.gpio.get(bcm)?.into_input_pullup();
            initial[line.index()] = pin.is_high();
            pin.set_async_interrupt(Trigger::Both, None, move |ev: Event| {
                edges.notify(line, matches!(ev.trigger, Trigger::RisingEdge), Instant::now());
            })?;
            held.push(pin);
        }
        info!("inputs armed: {:?}", initial);
        Ok((held, initial))
    }

    /// Configure the RCWL-0516 output pin.  The current level is reported
    /// first so a target already present at startup is seen.
    pub fn radar_pin(&self, bcm: u8, edges: &'static EdgeChannel) -> Result<InputPin, rppal::gpio::Error> {
        let mut pin = self.gpio.get(bcm)?.into_input_pulldown();
        edges.notify(pin.is_high());
        pin.set_async_interrupt(Trigger::Both, None, move |ev: Event| {
            edges.notify(matches!(ev.trigger, Trigger::RisingEdge));
        })?;
        Ok(pin)
    }

    pub fn leds(&self, pins: &PinMap) -> Result<(PiPwm, PiPwm), rppal::gpio::Error> {
        Ok((
            PiPwm::new(self.gpio.get(pins.player_led)?.into_output_low()),
            PiPwm::new(self.gpio.get(pins.radar_led)?.into_output_low()),
        ))
    }
}

// ── Soft PWM channel ──────────────────────────────────────────

#[derive(Debug)]
pub struct PwmError(rppal::gpio::Error);

impl fmt::Display for PwmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "soft PWM: {}", self.0)
    }
}

impl embedded_hal::pwm::Error for PwmError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

pub struct PiPwm {
    pin: OutputPin,
}

impl PiPwm {
    /// Duty resolution exposed to embedded-hal (tenths of a percent).
    const MAX_DUTY: u16 = 1000;

    pub fn new(pin: OutputPin) -> Self {
        Self { pin }
    }
}

impl ErrorType for PiPwm {
    type Error = PwmError;
}

impl SetDutyCycle for PiPwm {
    fn max_duty_cycle(&self) -> u16 {
        Self::MAX_DUTY
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
        if duty == 0 {
            self.pin.clear_pwm().map_err(PwmError)?;
            self.pin.set_low();
            return Ok(());
        }
        let ratio = f64::from(duty.min(Self::MAX_DUTY)) / f64::from(Self::MAX_DUTY);
        self.pin.set_pwm_frequency(LED_PWM_FREQ_HZ, ratio).map_err(PwmError)
    }
}

// ── RD-03D serial port ────────────────────────────────────────

pub struct PiUart {
    uart: Uart,
}

impl PiUart {
    pub fn open(cfg: &RangedConfig) -> Result<Self, rppal::uart::Error> {
        let uart = Uart::with_path(&cfg.serial_path, cfg.baud_rate, Parity::None, 8, 1)?;
        info!("radar UART {} @ {} baud", cfg.serial_path, cfg.baud_rate);
        Ok(Self { uart })
    }
}

impl FrameSource for PiUart {
    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, SensorFault> {
        let ms = timeout.as_millis().clamp(UART_MIN_TIMEOUT_MS, UART_MAX_TIMEOUT_MS);
        self.uart
            .set_read_mode(0, std::time::Duration::from_millis(ms))
            .map_err(|_| SensorFault::SerialRead)?;
        self.uart.read(buf).map_err(|e| {
            log::debug!("UART read: {}", e);
            SensorFault::SerialRead
        })
    }
}
