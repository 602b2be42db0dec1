//! Motor control module.
//!
//! This module provides a high-level interface for the four DC drive motors
//! hanging off the PCA9685 expander. Each motor uses two channels in an
//! H-bridge arrangement: one carries the duty for forward rotation, the
//! other for reverse.
//!
//! Chassis layout (as wired on the robot):
//! - M1: right rear
//! - M2: left rear
//! - M3: right front
//! - M4: left front
//!
//! Stepper and servo operations live in `stepper.rs` and `servo.rs` and
//! extend [`MotorController`] since they share the same expander.

use embedded_hal::blocking::i2c::{Write, WriteRead};
use embedded_hal_async::delay::DelayNs;

use crate::encode::{self, Direction, Motor};
use crate::error::Error;
use crate::pca9685::{Channel, DutyCycle, Pca9685};

/// Straight-line travel direction of the chassis.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TravelDirection {
    Forward,
    Backward,
}

impl TravelDirection {
    const fn motor_direction(self) -> Direction {
        match self {
            TravelDirection::Forward => Direction::Cw,
            TravelDirection::Backward => Direction::Ccw,
        }
    }
}

/// In-place rotation of the chassis.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Rotation {
    Left,
    Right,
}

impl Rotation {
    /// Per-motor direction, indexed M1..M4.
    const fn pattern(self) -> [Direction; 4] {
        match self {
            Rotation::Left => [Direction::Cw, Direction::Ccw, Direction::Cw, Direction::Ccw],
            Rotation::Right => [Direction::Ccw, Direction::Cw, Direction::Ccw, Direction::Cw],
        }
    }
}

/// Bounds applied by [`MotorController::move_straight`].
const MIN_MOVE_SPEED: u8 = 1;
const MAX_MOVE_SPEED: u8 = 255;

/// Actuator controller for the PCA9685 board.
///
/// Owns the expander driver and the cooperative delay. The expander is
/// initialized lazily on the first write; every timed operation suspends
/// through the delay and runs to completion.
pub struct MotorController<I2C, D> {
    pwm: Pca9685<I2C>,
    delay: D,
}

impl<I2C, D, E> MotorController<I2C, D>
where
    I2C: Write<Error = E> + WriteRead<Error = E>,
    D: DelayNs,
{
    /// Create a new motor controller. Nothing is written until the first
    /// command.
    pub fn new(i2c: I2C, delay: D) -> Self {
        Self {
            pwm: Pca9685::new(i2c),
            delay,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.pwm.is_initialized()
    }

    /// Run the expander setup if it has not happened yet.
    pub async fn ensure_initialized(&mut self) -> Result<(), Error<E>> {
        if !self.pwm.is_initialized() {
            self.pwm.initialize(&mut self.delay).await?;
        }
        Ok(())
    }

    /// Write a batch of channels back to back, initializing first if needed.
    pub(crate) async fn apply(&mut self, writes: &[(Channel, DutyCycle)]) -> Result<(), Error<E>> {
        self.ensure_initialized().await?;
        for &(channel, duty) in writes {
            self.pwm.set_channel(channel, duty)?;
        }
        Ok(())
    }

    /// Suspend for `ms` milliseconds; motors keep their current state.
    pub async fn pause_ms(&mut self, ms: u32) {
        self.delay.delay_ms(ms).await;
    }

    /// Set motor speed and direction.
    ///
    /// # Arguments
    /// * `motor` - Which motor to control
    /// * `direction` - Direction of rotation
    /// * `speed` - Speed 0-255, mapped to a 12-bit duty
    ///
    /// Returns immediately; the motor keeps running until stopped.
    pub async fn run_motor(
        &mut self,
        motor: Motor,
        direction: Direction,
        speed: u8,
    ) -> Result<(), Error<E>> {
        let writes = encode::motor_writes(motor, direction, speed);
        self.apply(&writes).await
    }

    /// Raw-slot variant of [`run_motor`](Self::run_motor). Slots outside
    /// 1-4 are ignored.
    pub async fn run_motor_index(
        &mut self,
        index: u8,
        direction: Direction,
        speed: u8,
    ) -> Result<(), Error<E>> {
        match Motor::try_from(index) {
            Ok(motor) => self.run_motor(motor, direction, speed).await,
            Err(_) => {
                warn!("run on motor slot {=u8} ignored", index);
                Ok(())
            }
        }
    }

    /// Zero both channels of one motor.
    pub async fn stop_motor(&mut self, motor: Motor) -> Result<(), Error<E>> {
        let (pp, pn) = motor.channels();
        self.apply(&[(pn, DutyCycle::OFF), (pp, DutyCycle::OFF)]).await
    }

    /// Raw-slot variant of [`stop_motor`](Self::stop_motor).
    pub async fn stop_motor_index(&mut self, index: u8) -> Result<(), Error<E>> {
        match Motor::try_from(index) {
            Ok(motor) => self.stop_motor(motor).await,
            Err(_) => {
                warn!("stop on motor slot {=u8} ignored", index);
                Ok(())
            }
        }
    }

    /// Stop all motors immediately.
    pub async fn stop_all(&mut self) -> Result<(), Error<E>> {
        for motor in Motor::ALL {
            self.stop_motor(motor).await?;
        }
        Ok(())
    }

    /// Run all four motors with the same direction and speed.
    pub async fn start_all(&mut self, direction: Direction, speed: u8) -> Result<(), Error<E>> {
        for motor in Motor::ALL {
            self.run_motor(motor, direction, speed).await?;
        }
        Ok(())
    }

    /// Drive forward at given speed.
    pub async fn forward(&mut self, speed: u8) -> Result<(), Error<E>> {
        self.start_all(Direction::Cw, speed).await
    }

    /// Drive backward at given speed.
    pub async fn backward(&mut self, speed: u8) -> Result<(), Error<E>> {
        self.start_all(Direction::Ccw, speed).await
    }

    /// Turn left (pivot on the spot).
    pub async fn turn_left(&mut self, speed: u8) -> Result<(), Error<E>> {
        self.pivot(Rotation::Left, speed).await
    }

    /// Turn right (pivot on the spot).
    pub async fn turn_right(&mut self, speed: u8) -> Result<(), Error<E>> {
        self.pivot(Rotation::Right, speed).await
    }

    async fn pivot(&mut self, rotation: Rotation, speed: u8) -> Result<(), Error<E>> {
        for (motor, direction) in Motor::ALL.into_iter().zip(rotation.pattern()) {
            self.run_motor(motor, direction, speed).await?;
        }
        Ok(())
    }

    /// Stop everything, then start pivoting left. Does not hold.
    pub async fn rotate_left(&mut self, speed: u8) -> Result<(), Error<E>> {
        self.stop_all().await?;
        self.turn_left(speed).await
    }

    /// Stop everything, then start pivoting right. Does not hold.
    pub async fn rotate_right(&mut self, speed: u8) -> Result<(), Error<E>> {
        self.stop_all().await?;
        self.turn_right(speed).await
    }

    /// Pivot for `secs` seconds. The motors are left running afterwards.
    pub async fn turn(&mut self, speed: u8, secs: u32, rotation: Rotation) -> Result<(), Error<E>> {
        debug!("turn {} for {=u32} s", rotation, secs);
        self.pivot(rotation, speed).await?;
        self.pause_ms(secs.saturating_mul(1000)).await;
        Ok(())
    }

    /// Reverse at half speed for `secs` seconds. The motors are left
    /// running afterwards.
    pub async fn back_up(&mut self, speed: u8, secs: u32) -> Result<(), Error<E>> {
        debug!("back up for {=u32} s", secs);
        self.backward(speed / 2).await?;
        self.pause_ms(secs.saturating_mul(1000)).await;
        Ok(())
    }

    /// Straight-line move for `duration_ms`, then stop.
    ///
    /// Speed is clamped to 1-255. Distance is only approximated by
    /// speed × time; there is no feedback.
    pub async fn move_straight(
        &mut self,
        speed: u8,
        direction: TravelDirection,
        duration_ms: u32,
    ) -> Result<(), Error<E>> {
        self.stop_all().await?;
        let speed = speed.clamp(MIN_MOVE_SPEED, MAX_MOVE_SPEED);
        self.start_all(direction.motor_direction(), speed).await?;
        self.pause_ms(duration_ms).await;
        self.stop_all().await
    }
}
