//! Error type shared by the driver, motion and sensor layers.

/// Errors surfaced by the robot library.
///
/// `E` is the error type of the I2C transport.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// The I2C transport reported a fault.
    I2c(E),
    /// A digital pin could not be read or driven.
    Pin,
    /// PWM channel outside `0..=15`.
    InvalidChannel(u8),
    /// DC motor slot outside `1..=4`.
    InvalidMotor(u8),
    /// Servo slot outside `1..=8`.
    InvalidServo(u8),
}

impl<E> From<InvalidId> for Error<E> {
    fn from(id: InvalidId) -> Self {
        match id {
            InvalidId::Channel(c) => Error::InvalidChannel(c),
            InvalidId::Motor(m) => Error::InvalidMotor(m),
            InvalidId::Servo(s) => Error::InvalidServo(s),
        }
    }
}

/// Rejected raw identifier, returned by the checked `TryFrom<u8>`
/// constructors of [`Channel`](crate::Channel), [`Motor`](crate::Motor) and
/// [`Servo`](crate::Servo).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InvalidId {
    Channel(u8),
    Motor(u8),
    Servo(u8),
}

impl<E> From<crate::sensors::PinError> for Error<E> {
    fn from(_: crate::sensors::PinError) -> Self {
        Error::Pin
    }
}
