//! Actuator encoders.
//!
//! Pure mappings from motor, servo and stepper commands to the channel
//! writes the expander needs. Nothing here touches the bus.

use crate::error::InvalidId;
use crate::pca9685::{Channel, DutyCycle, MAX_COUNT};

/// Rotation sense of a motor or stepper.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Clockwise, positive duty.
    Cw,
    /// Counter-clockwise, negative duty.
    Ccw,
}

impl Direction {
    pub const fn to_sign(self) -> i32 {
        match self {
            Direction::Cw => 1,
            Direction::Ccw => -1,
        }
    }

}

/// DC motor slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Motor {
    M1 = 1,
    M2 = 2,
    M3 = 3,
    M4 = 4,
}

impl Motor {
    pub const ALL: [Motor; 4] = [Motor::M1, Motor::M2, Motor::M3, Motor::M4];

    /// `(pp, pn)`: the channel driven for positive and for negative duty.
    ///
    /// M1 sits on channels 7/6, M4 on 1/0.
    pub const fn channels(self) -> (Channel, Channel) {
        let base = (4 - self as u8) * 2;
        (Channel::new_unchecked(base + 1), Channel::new_unchecked(base))
    }
}

impl TryFrom<u8> for Motor {
    type Error = InvalidId;

    fn try_from(index: u8) -> Result<Self, Self::Error> {
        match index {
            1 => Ok(Motor::M1),
            2 => Ok(Motor::M2),
            3 => Ok(Motor::M3),
            4 => Ok(Motor::M4),
            other => Err(InvalidId::Motor(other)),
        }
    }
}

/// Servo slot; slot `n` drives channel `n + 7`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Servo {
    S1 = 1,
    S2 = 2,
    S3 = 3,
    S4 = 4,
    S5 = 5,
    S6 = 6,
    S7 = 7,
    S8 = 8,
}

impl Servo {
    pub const fn channel(self) -> Channel {
        Channel::new_unchecked(self as u8 + 7)
    }
}

impl TryFrom<u8> for Servo {
    type Error = InvalidId;

    fn try_from(index: u8) -> Result<Self, Self::Error> {
        Ok(match index {
            1 => Servo::S1,
            2 => Servo::S2,
            3 => Servo::S3,
            4 => Servo::S4,
            5 => Servo::S5,
            6 => Servo::S6,
            7 => Servo::S7,
            8 => Servo::S8,
            other => return Err(InvalidId::Servo(other)),
        })
    }
}

/// Pair of motor slots driving one stepper's four coils.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StepperGroup {
    /// Coils on channels 4..=7.
    M1M2,
    /// Coils on channels 0..=3.
    M3M4,
}

impl StepperGroup {
    const fn base_channel(self) -> u8 {
        match self {
            StepperGroup::M1M2 => 4,
            StepperGroup::M3M4 => 0,
        }
    }

    /// DC motor slots sharing this group's channels.
    pub const fn motors(self) -> [Motor; 2] {
        match self {
            StepperGroup::M1M2 => [Motor::M1, Motor::M2],
            StepperGroup::M3M4 => [Motor::M3, Motor::M4],
        }
    }
}

/// Supported stepper models.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StepperFamily {
    /// 28BYJ-48 geared unipolar stepper.
    Byj28,
    /// 42BYGH bipolar stepper.
    Byg42,
}

impl StepperFamily {
    /// Empirical hold time for one full revolution.
    pub const fn ms_per_turn(self) -> u32 {
        match self {
            StepperFamily::Byj28 => 1000,
            StepperFamily::Byg42 => 500,
        }
    }

    /// Hold time needed to cover `degrees`.
    ///
    /// Open loop: position is inferred from elapsed time only.
    pub const fn hold_ms(self, degrees: u32) -> u32 {
        degrees.saturating_mul(self.ms_per_turn()) / 360
    }
}

/// Hold time for one revolution when both groups run together. The dual
/// primitive uses this rate for every family.
pub const DUAL_MS_PER_TURN: u32 = 500;

/// Hold time for `degrees` in a dual rotation.
pub const fn dual_hold_ms(degrees: u32) -> u32 {
    degrees.saturating_mul(DUAL_MS_PER_TURN) / 360
}

// Coil patterns. Each stepper family phases its four coils with fixed
// quarter-period offsets.
const BYJ_A: DutyCycle = DutyCycle::new(2047, 4095);
const BYJ_B: DutyCycle = DutyCycle::new(1, 2047);
const BYJ_C: DutyCycle = DutyCycle::new(1023, 3071);
const BYJ_D: DutyCycle = DutyCycle::new(3071, 1023);

const BYG_A: DutyCycle = DutyCycle::new(3071, 1023);
const BYG_B: DutyCycle = DutyCycle::new(1023, 3071);
const BYG_C: DutyCycle = DutyCycle::new(4095, 2047);
const BYG_D: DutyCycle = DutyCycle::new(2047, 4095);

/// (channel offset inside the group, pattern), in write order.
type PhaseTable = [(u8, DutyCycle); 4];

const BYJ_CW: PhaseTable = [(0, BYJ_A), (2, BYJ_B), (1, BYJ_C), (3, BYJ_D)];
const BYJ_CCW: PhaseTable = [(3, BYJ_A), (1, BYJ_B), (2, BYJ_C), (0, BYJ_D)];
const BYG_CW: PhaseTable = [(3, BYG_A), (2, BYG_B), (1, BYG_C), (0, BYG_D)];
const BYG_CCW: PhaseTable = [(3, BYG_C), (2, BYG_D), (1, BYG_A), (0, BYG_B)];

/// Servo pulse width at 0°.
const SERVO_MIN_PULSE_US: u32 = 600;
/// Pulse width span over the 180° range.
const SERVO_SPAN_US: u32 = 1800;
/// One period at 50 Hz.
const SERVO_PERIOD_US: u32 = 20_000;
const PERIOD_TICKS: u32 = 4096;

/// Duty cycle for a servo at `angle` degrees.
///
/// 0.6 ms at 0° to 2.4 ms at 180°, rounded to the nearest tick. Angles
/// above 180 are not clamped and produce proportionally longer pulses.
pub fn servo_duty(angle: u16) -> DutyCycle {
    let pulse_us = u32::from(angle) * SERVO_SPAN_US / 180 + SERVO_MIN_PULSE_US;
    let ticks = (pulse_us * PERIOD_TICKS + SERVO_PERIOD_US / 2) / SERVO_PERIOD_US;
    DutyCycle::pulse(ticks.min(u32::from(u16::MAX)) as u16)
}

/// Signed 12-bit duty for a DC motor: `speed * 16`, signed by direction.
pub fn motor_signed_duty(direction: Direction, speed: u8) -> i32 {
    let max = i32::from(MAX_COUNT);
    (i32::from(speed) * 16 * direction.to_sign()).clamp(-max, max)
}

/// The two channel writes driving `motor`, `pp` first.
///
/// Exactly one of them carries the magnitude; the other is zeroed.
pub fn motor_writes(motor: Motor, direction: Direction, speed: u8) -> [(Channel, DutyCycle); 2] {
    let (pp, pn) = motor.channels();
    let duty = motor_signed_duty(direction, speed);
    let magnitude = DutyCycle::pulse(duty.unsigned_abs() as u16);
    if duty >= 0 {
        [(pp, magnitude), (pn, DutyCycle::OFF)]
    } else {
        [(pp, DutyCycle::OFF), (pn, magnitude)]
    }
}

/// Coil writes putting `group` into the holding state of `family` for
/// `direction`.
pub fn stepper_writes(
    family: StepperFamily,
    group: StepperGroup,
    direction: Direction,
) -> [(Channel, DutyCycle); 4] {
    let table = match (family, direction) {
        (StepperFamily::Byj28, Direction::Cw) => BYJ_CW,
        (StepperFamily::Byj28, Direction::Ccw) => BYJ_CCW,
        (StepperFamily::Byg42, Direction::Cw) => BYG_CW,
        (StepperFamily::Byg42, Direction::Ccw) => BYG_CCW,
    };
    let base = group.base_channel();
    table.map(|(offset, duty)| (Channel::new_unchecked(base + offset), duty))
}
