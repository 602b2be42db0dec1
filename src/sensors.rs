//! Distance sensors.
//!
//! - HC-SR04 style ultrasonic ranger: trigger on a digital output, echo
//!   width measured through [`PulseIn`]. 58 µs of echo per centimeter,
//!   148 µs per inch.
//! - Digital infrared proximity / line sensors: the module pulls its output
//!   low when it sees something.

use embedded_hal::digital::v2::{InputPin, OutputPin};
use embedded_hal_async::delay::DelayNs;

use crate::config::UltrasonicConfig;

/// Echo microseconds per centimeter of distance (round trip).
pub const US_PER_CM: u32 = 58;
/// Echo microseconds per inch of distance (round trip).
pub const US_PER_INCH: u32 = 148;

const TRIGGER_SETTLE_US: u32 = 2;
const TRIGGER_PULSE_US: u32 = 10;

/// Polarity of a measured pulse.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PulseLevel {
    High,
    Low,
}

/// Pulse-width measurement on an input line.
///
/// Waits for the line to reach `level`, then returns how long it stayed
/// there in microseconds, or 0 if either edge did not arrive within
/// `timeout_us`.
#[allow(async_fn_in_trait)]
pub trait PulseIn {
    type Error;

    async fn pulse_in(&mut self, level: PulseLevel, timeout_us: u32) -> Result<u32, Self::Error>;
}

/// Unit of an ultrasonic reading.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DistanceUnit {
    /// Raw echo width.
    Microseconds,
    Centimeters,
    Inches,
}

impl DistanceUnit {
    /// Convert a raw echo width, rounding down.
    pub const fn from_echo_us(self, echo_us: u32) -> u32 {
        match self {
            DistanceUnit::Microseconds => echo_us,
            DistanceUnit::Centimeters => echo_us / US_PER_CM,
            DistanceUnit::Inches => echo_us / US_PER_INCH,
        }
    }
}

/// Sensor read failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PinError;

/// Ultrasonic ranger.
pub struct Ultrasonic<TRIG, ECHO, D> {
    trig: TRIG,
    echo: ECHO,
    delay: D,
    config: UltrasonicConfig,
}

impl<TRIG, ECHO, D> Ultrasonic<TRIG, ECHO, D>
where
    TRIG: OutputPin,
    ECHO: PulseIn,
    D: DelayNs,
{
    pub fn new(trig: TRIG, echo: ECHO, delay: D, config: UltrasonicConfig) -> Self {
        Self {
            trig,
            echo,
            delay,
            config,
        }
    }

    /// Longest echo waited for, from the configured maximum range.
    pub fn timeout_us(&self) -> u32 {
        self.config.max_range_cm.saturating_mul(US_PER_CM)
    }

    /// Fire one ping and return the reading in `unit`.
    ///
    /// A missing echo reads as 0.
    pub async fn measure(&mut self, unit: DistanceUnit) -> Result<u32, PinError> {
        self.trig.set_low().map_err(|_| PinError)?;
        self.delay.delay_us(TRIGGER_SETTLE_US).await;
        self.trig.set_high().map_err(|_| PinError)?;
        self.delay.delay_us(TRIGGER_PULSE_US).await;
        self.trig.set_low().map_err(|_| PinError)?;

        let timeout = self.timeout_us();
        let echo_us = self
            .echo
            .pulse_in(PulseLevel::High, timeout)
            .await
            .map_err(|_| PinError)?;
        let reading = unit.from_echo_us(echo_us);
        debug!("echo {=u32} us -> {=u32} {}", echo_us, reading, unit);
        Ok(reading)
    }

    /// Distance in whole centimeters.
    pub async fn distance_cm(&mut self) -> Result<u32, PinError> {
        self.measure(DistanceUnit::Centimeters).await
    }
}

/// Digital infrared sensor, active low.
pub struct InfraredSensor<P> {
    pin: P,
}

impl<P: InputPin> InfraredSensor<P> {
    pub fn new(pin: P) -> Self {
        Self { pin }
    }

    /// `true` when the sensor pulls the line low.
    pub fn detects(&self) -> Result<bool, PinError> {
        self.pin.is_low().map_err(|_| PinError)
    }

    /// Raw line level, `true` = high.
    pub fn level(&self) -> Result<bool, PinError> {
        self.pin.is_high().map_err(|_| PinError)
    }

    /// Drive `out` high while the sensor detects, low otherwise.
    pub fn mirror_to<O: OutputPin>(&self, out: &mut O) -> Result<(), PinError> {
        if self.detects()? {
            out.set_high().map_err(|_| PinError)
        } else {
            out.set_low().map_err(|_| PinError)
        }
    }
}

/// Proximity threshold on an analog range reading (0-30 scale).
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RangeThreshold {
    pub threshold: f32,
}

impl RangeThreshold {
    const ADC_FULL_SCALE: f32 = 1023.0;
    const RANGE_FULL_SCALE: f32 = 30.0;

    pub const fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    /// `true` when `reading` is strictly closer than the threshold.
    pub fn finds_something_in_range(&self, reading: f32) -> bool {
        let scale = Self::ADC_FULL_SCALE / Self::RANGE_FULL_SCALE;
        reading * scale < self.threshold * scale
    }
}

impl Default for RangeThreshold {
    fn default() -> Self {
        Self::new(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{BrokenInput, Event, FakeInput, Timeline};
    use embassy_futures::block_on;

    fn sonar(timeline: &Timeline) -> Ultrasonic<crate::mock::FakeOutput, crate::mock::FakeEcho, crate::mock::FakeDelay> {
        Ultrasonic::new(
            timeline.output(1),
            timeline.echo(),
            timeline.delay(),
            UltrasonicConfig::default(),
        )
    }

    #[test]
    fn trigger_pulse_then_bounded_echo_wait() {
        let timeline = Timeline::new();
        timeline.push_echoes(&[1160]);
        let mut sonar = sonar(&timeline);

        assert_eq!(block_on(sonar.distance_cm()), Ok(20));
        assert_eq!(
            timeline.events(),
            vec![
                Event::Pin { id: 1, high: false },
                Event::DelayUs(2),
                Event::Pin { id: 1, high: true },
                Event::DelayUs(10),
                Event::Pin { id: 1, high: false },
                Event::PulseIn { level: PulseLevel::High, timeout_us: 500 * 58 },
            ]
        );
    }

    #[test]
    fn units_round_down() {
        let timeline = Timeline::new();
        let mut sonar = sonar(&timeline);

        for echo in [0u32, 57, 58, 147, 148, 1000, 29_000] {
            timeline.push_echoes(&[echo, echo, echo]);
            assert_eq!(block_on(sonar.measure(DistanceUnit::Microseconds)), Ok(echo));
            assert_eq!(block_on(sonar.measure(DistanceUnit::Centimeters)), Ok(echo / 58));
            assert_eq!(block_on(sonar.measure(DistanceUnit::Inches)), Ok(echo / 148));
        }
    }

    #[test]
    fn missing_echo_reads_zero() {
        let timeline = Timeline::new();
        let mut sonar = sonar(&timeline);
        assert_eq!(block_on(sonar.distance_cm()), Ok(0));
    }

    #[test]
    fn timeout_follows_max_range() {
        let timeline = Timeline::new();
        let sonar = Ultrasonic::new(
            timeline.output(1),
            timeline.echo(),
            timeline.delay(),
            UltrasonicConfig { max_range_cm: 100 },
        );
        assert_eq!(sonar.timeout_us(), 5800);
    }

    #[test]
    fn infrared_is_active_low() {
        let seen = InfraredSensor::new(FakeInput(false));
        assert_eq!(seen.detects(), Ok(true));
        assert_eq!(seen.level(), Ok(false));

        let clear = InfraredSensor::new(FakeInput(true));
        assert_eq!(clear.detects(), Ok(false));
        assert_eq!(clear.level(), Ok(true));

        assert_eq!(InfraredSensor::new(BrokenInput).detects(), Err(PinError));
    }

    #[test]
    fn infrared_mirror() {
        let timeline = Timeline::new();
        let mut out = timeline.output(7);

        InfraredSensor::new(FakeInput(false)).mirror_to(&mut out).unwrap();
        InfraredSensor::new(FakeInput(true)).mirror_to(&mut out).unwrap();
        assert_eq!(
            timeline.events(),
            vec![Event::Pin { id: 7, high: true }, Event::Pin { id: 7, high: false }]
        );
    }

    #[test]
    fn range_threshold_is_strict() {
        let range = RangeThreshold::new(10.0);
        assert!(range.finds_something_in_range(9.5));
        assert!(!range.finds_something_in_range(10.0));
        assert!(!range.finds_something_in_range(25.0));
        assert!(RangeThreshold::default().finds_something_in_range(0.0));
    }
}
