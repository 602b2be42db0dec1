//! Nucleo-F401RE wiring and the embassy-backed echo timer.
//!
//! Pin map (Arduino header names in brackets):
//! - PB8 / PB9: I2C1 SCL / SDA to the PCA9685 board [D15 / D14]
//! - PA10: ultrasonic trigger [D2]
//! - PB3: ultrasonic echo [D3]
//! - PB5 / PB4 / PB10: left / center / right IR sensors [D4 / D5 / D6]
//! - PA5: user LED, PC13: user button

use embassy_stm32::gpio::{Input, Level};
use embassy_time::{Duration, Instant, Timer};

use crate::sensors::{PulseIn, PulseLevel};

/// I2C bus clock for the expander.
pub const I2C_FREQUENCY_KHZ: u32 = 100;

const POLL_INTERVAL_US: u64 = 1;

/// Echo input timed against the embassy clock.
///
/// Resolution is one time-driver tick (about 30 µs at 32.768 kHz), a
/// little over half a centimeter of range.
pub struct EchoPin<'d> {
    pin: Input<'d>,
}

impl<'d> EchoPin<'d> {
    pub fn new(pin: Input<'d>) -> Self {
        Self { pin }
    }
}

impl PulseIn for EchoPin<'_> {
    type Error = core::convert::Infallible;

    async fn pulse_in(&mut self, level: PulseLevel, timeout_us: u32) -> Result<u32, Self::Error> {
        let target = match level {
            PulseLevel::High => Level::High,
            PulseLevel::Low => Level::Low,
        };
        let timeout = Duration::from_micros(timeout_us as u64);
        let start = Instant::now();

        // wait for the leading edge
        while self.pin.get_level() != target {
            if start.elapsed() > timeout {
                return Ok(0);
            }
            Timer::after(Duration::from_micros(POLL_INTERVAL_US)).await;
        }

        let edge = Instant::now();
        while self.pin.get_level() == target {
            if start.elapsed() > timeout {
                return Ok(0);
            }
            Timer::after(Duration::from_micros(POLL_INTERVAL_US)).await;
        }

        Ok(edge.elapsed().as_micros().min(u32::MAX as u64) as u32)
    }
}
