//! Control library for a four-wheel robot built around a PCA9685 16-channel
//! PWM expander.
//!
//! The expander drives four DC motors (or two unipolar/bipolar steppers in
//! their place) on channels 0-7 and eight hobby servos on channels 8-15. An
//! ultrasonic ranger and digital infrared sensors feed the navigation
//! behaviors in [`navigation`].
//!
//! Everything is generic over the `embedded-hal` traits so the library
//! runs unchanged on the board and in host tests.
#![cfg_attr(not(test), no_std)]

// must come first so the logging macros are visible everywhere
mod fmt;

pub mod config;
pub mod encode;
pub mod error;
pub mod motors;
pub mod navigation;
pub mod pca9685;
pub mod sensors;

mod servo;
mod stepper;

#[cfg(feature = "firmware")]
pub mod board;

#[cfg(test)]
mod mock;

pub use encode::{Direction, Motor, Servo, StepperFamily, StepperGroup};
pub use error::{Error, InvalidId};
pub use motors::{MotorController, Rotation, TravelDirection};
pub use pca9685::{Channel, DutyCycle, Pca9685};
