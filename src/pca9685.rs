//! PCA9685 16-channel PWM expander driver.
//!
//! Owns the one-time device setup (mode register, output frequency) and the
//! raw per-channel duty-cycle write. The expander always sits at the fixed
//! address [`ADDRESS`] and runs at [`OPERATING_FREQUENCY_HZ`].
//!
//! Register map used here:
//! - `MODE1` (0x00): sleep / restart / auto-increment bits
//! - `PRESCALE` (0xFE): output frequency divider, writable only while asleep
//! - `LED0_ON_L` (0x06): first of four registers per channel
//!   (`ON_L`, `ON_H`, `OFF_L`, `OFF_H`), channel `n` starts at `0x06 + 4n`

use embedded_hal::blocking::i2c::{Write, WriteRead};
use embedded_hal_async::delay::DelayNs;

use crate::error::{Error, InvalidId};

/// Fixed I2C address of the expander.
pub const ADDRESS: u8 = 0x40;

/// Output frequency used for every actuator (servo convention).
pub const OPERATING_FREQUENCY_HZ: u16 = 50;

/// Largest 12-bit count inside one PWM period.
pub const MAX_COUNT: u16 = 4095;

/// Internal oscillator, treated as exact.
const OSCILLATOR_HZ: u32 = 25_000_000;

/// Ticks per PWM period.
const PERIOD_TICKS: u32 = 4096;

/// Oscillator start-up time after leaving sleep.
const OSCILLATOR_SETTLE_US: u32 = 5_000;

/// Hardware limits of the prescale register.
const PRESCALE_MIN: u32 = 3;
const PRESCALE_MAX: u32 = 255;

mod reg {
    pub const MODE1: u8 = 0x00;
    pub const PRESCALE: u8 = 0xFE;
    pub const LED0_ON_L: u8 = 0x06;
}

mod mode1 {
    /// Value written on initialization.
    pub const RESET: u8 = 0x00;
    /// Everything except the RESTART bit.
    pub const KEEP_MASK: u8 = 0x7F;
    pub const SLEEP: u8 = 0x10;
    /// RESTART | AI (auto-increment) | ALLCALL.
    pub const RESTART_AI: u8 = 0xA1;
}

/// One PWM output line of the expander, `0..=15`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Channel(u8);

impl Channel {
    /// Number of channels on the expander.
    pub const COUNT: u8 = 16;

    /// Caller guarantees `index < 16`; used by the fixed lookup tables.
    pub(crate) const fn new_unchecked(index: u8) -> Self {
        Channel(index)
    }

    pub const fn index(self) -> u8 {
        self.0
    }

    /// First of the four duty-cycle registers of this channel.
    const fn base_register(self) -> u8 {
        reg::LED0_ON_L + 4 * self.0
    }
}

impl TryFrom<u8> for Channel {
    type Error = InvalidId;

    fn try_from(index: u8) -> Result<Self, Self::Error> {
        if index < Self::COUNT {
            Ok(Channel(index))
        } else {
            Err(InvalidId::Channel(index))
        }
    }
}

/// On/off tick pair inside one 4096-tick period.
///
/// The output goes high at `on` and low at `off`. `(0, n)` is a pulse of
/// `n` ticks from the start of the period.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DutyCycle {
    pub on: u16,
    pub off: u16,
}

impl DutyCycle {
    /// Output held low.
    pub const OFF: DutyCycle = DutyCycle { on: 0, off: 0 };

    pub const fn new(on: u16, off: u16) -> Self {
        Self { on, off }
    }

    /// High pulse of `width` ticks starting at the beginning of the period.
    pub const fn pulse(width: u16) -> Self {
        Self { on: 0, off: width }
    }

    pub const fn is_off(&self) -> bool {
        self.on == 0 && self.off == 0
    }
}

/// Whether the expander has completed its one-time setup.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PeripheralState {
    initialized: bool,
}

impl PeripheralState {
    pub const fn is_initialized(&self) -> bool {
        self.initialized
    }
}

/// Prescale register value for `freq_hz`:
/// `round(25 MHz / 4096 / freq) - 1`, clamped to the register's legal range.
pub fn prescale_for(freq_hz: u16) -> u8 {
    let divisor = PERIOD_TICKS * u32::from(freq_hz.max(1));
    let rounded = (OSCILLATOR_HZ + divisor / 2) / divisor;
    rounded.saturating_sub(1).clamp(PRESCALE_MIN, PRESCALE_MAX) as u8
}

/// PCA9685 driver over a blocking I2C bus.
pub struct Pca9685<I2C> {
    i2c: I2C,
    state: PeripheralState,
}

impl<I2C, E> Pca9685<I2C>
where
    I2C: Write<Error = E> + WriteRead<Error = E>,
{
    /// Wrap the bus. The device is left untouched until [`initialize`].
    ///
    /// [`initialize`]: Pca9685::initialize
    pub fn new(i2c: I2C) -> Self {
        Self {
            i2c,
            state: PeripheralState::default(),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.state.is_initialized()
    }

    /// Reset the mode register and switch to the operating frequency.
    ///
    /// Does not check the current state; callers test
    /// [`is_initialized`](Pca9685::is_initialized) first.
    pub async fn initialize<D: DelayNs>(&mut self, delay: &mut D) -> Result<(), Error<E>> {
        self.write_register(reg::MODE1, mode1::RESET)?;
        self.set_frequency(delay, OPERATING_FREQUENCY_HZ).await?;
        self.state.initialized = true;
        info!("pca9685 initialized at {=u16} Hz", OPERATING_FREQUENCY_HZ);
        Ok(())
    }

    /// Program the output frequency.
    ///
    /// The prescaler only latches while the oscillator sleeps, so the mode
    /// register is put to sleep, the prescale written, the old mode
    /// restored and, after the oscillator settles, restarted with
    /// auto-increment on.
    pub async fn set_frequency<D: DelayNs>(
        &mut self,
        delay: &mut D,
        freq_hz: u16,
    ) -> Result<(), Error<E>> {
        let prescale = prescale_for(freq_hz);
        debug!("pca9685 prescale {=u8} for {=u16} Hz", prescale, freq_hz);

        let old_mode = self.read_register(reg::MODE1)?;
        let sleep_mode = (old_mode & mode1::KEEP_MASK) | mode1::SLEEP;
        self.write_register(reg::MODE1, sleep_mode)?;
        self.write_register(reg::PRESCALE, prescale)?;
        self.write_register(reg::MODE1, old_mode)?;
        delay.delay_us(OSCILLATOR_SETTLE_US).await;
        self.write_register(reg::MODE1, old_mode | mode1::RESTART_AI)?;
        Ok(())
    }

    /// Write the on/off counts of one channel.
    pub fn set_channel(&mut self, channel: Channel, duty: DutyCycle) -> Result<(), Error<E>> {
        trace!(
            "pwm ch{=u8} on={=u16} off={=u16}",
            channel.index(),
            duty.on,
            duty.off
        );
        let [on_l, on_h] = duty.on.to_le_bytes();
        let [off_l, off_h] = duty.off.to_le_bytes();
        self.i2c
            .write(
                ADDRESS,
                &[channel.base_register(), on_l, on_h, off_l, off_h],
            )
            .map_err(Error::I2c)
    }

    /// Raw-index variant of [`set_channel`](Pca9685::set_channel).
    ///
    /// A channel outside `0..=15` is skipped without touching the bus.
    pub fn set_pwm(&mut self, channel: u8, on: u16, off: u16) -> Result<(), Error<E>> {
        match Channel::try_from(channel) {
            Ok(channel) => self.set_channel(channel, DutyCycle::new(on, off)),
            Err(_) => {
                warn!("pwm write to channel {=u8} skipped", channel);
                Ok(())
            }
        }
    }

    fn write_register(&mut self, register: u8, value: u8) -> Result<(), Error<E>> {
        self.i2c.write(ADDRESS, &[register, value]).map_err(Error::I2c)
    }

    fn read_register(&mut self, register: u8) -> Result<u8, Error<E>> {
        let mut value = [0u8; 1];
        self.i2c
            .write_read(ADDRESS, &[register], &mut value)
            .map_err(Error::I2c)?;
        Ok(value[0])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{Event, Timeline};
    use embassy_futures::block_on;

    #[test]
    fn prescale_for_servo_frequency() {
        // 25e6 / 4096 / 50 = 122.07
        assert_eq!(prescale_for(50), 121);
        // 25e6 / 4096 / 100 = 61.04
        assert_eq!(prescale_for(100), 60);
        // 25e6 / 4096 / 1000 = 6.10
        assert_eq!(prescale_for(1000), 5);
    }

    #[test]
    fn prescale_is_clamped_to_register_range() {
        assert_eq!(prescale_for(1), 255);
        assert_eq!(prescale_for(0), 255);
        assert_eq!(prescale_for(u16::MAX), 3);
    }

    #[test]
    fn initialize_sleeps_programs_prescale_and_restarts() {
        let timeline = Timeline::new();
        timeline.set_mode1(0x00);
        let mut pwm = Pca9685::new(timeline.i2c());
        let mut delay = timeline.delay();

        assert!(!pwm.is_initialized());
        block_on(pwm.initialize(&mut delay)).unwrap();
        assert!(pwm.is_initialized());

        assert_eq!(
            timeline.events(),
            vec![
                Event::Register { reg: 0x00, value: 0x00 },
                Event::Read { reg: 0x00 },
                Event::Register { reg: 0x00, value: 0x10 },
                Event::Register { reg: 0xFE, value: 121 },
                Event::Register { reg: 0x00, value: 0x00 },
                Event::DelayUs(5_000),
                Event::Register { reg: 0x00, value: 0xA1 },
            ]
        );
    }

    #[test]
    fn set_frequency_preserves_other_mode_bits() {
        let timeline = Timeline::new();
        timeline.set_mode1(0x81);
        let mut pwm = Pca9685::new(timeline.i2c());
        let mut delay = timeline.delay();

        block_on(pwm.set_frequency(&mut delay, 50)).unwrap();

        let registers = timeline.register_writes();
        // restart bit dropped while sleeping, restored afterwards
        assert_eq!(registers[0], (0x00, 0x11));
        assert_eq!(registers[2], (0x00, 0x81));
        assert_eq!(registers[3], (0x00, 0x81 | 0xA1));
    }

    #[test]
    fn set_channel_writes_four_bytes_at_channel_base() {
        let timeline = Timeline::new();
        let mut pwm = Pca9685::new(timeline.i2c());

        let channel = Channel::try_from(3).unwrap();
        pwm.set_channel(channel, DutyCycle::new(0x0123, 0x0FED)).unwrap();

        assert_eq!(
            timeline.raw_writes(),
            vec![vec![0x06 + 12, 0x23, 0x01, 0xED, 0x0F]]
        );
    }

    #[test]
    fn out_of_range_channel_is_skipped() {
        let timeline = Timeline::new();
        let mut pwm = Pca9685::new(timeline.i2c());

        assert_eq!(pwm.set_pwm(16, 0, 100), Ok(()));
        assert_eq!(pwm.set_pwm(255, 0, 100), Ok(()));
        assert!(timeline.events().is_empty());

        pwm.set_pwm(15, 0, 100).unwrap();
        assert_eq!(
            timeline.events(),
            vec![Event::Pwm { channel: 15, on: 0, off: 100 }]
        );
    }

    #[test]
    fn channel_constructor_rejects_out_of_range() {
        assert_eq!(Channel::try_from(15).map(Channel::index), Ok(15));
        assert_eq!(Channel::try_from(16), Err(InvalidId::Channel(16)));
    }

    #[test]
    fn bus_fault_is_surfaced() {
        let timeline = Timeline::new();
        timeline.fail_bus();
        let mut pwm = Pca9685::new(timeline.i2c());

        assert_eq!(pwm.set_pwm(0, 0, 10), Err(Error::I2c(crate::mock::BusFault)));
    }
}
