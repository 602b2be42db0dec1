//! Servo slots S1-S8 on channels 8-15.

use embedded_hal::blocking::i2c::{Write, WriteRead};
use embedded_hal_async::delay::DelayNs;

use crate::encode::{self, Servo};
use crate::error::Error;
use crate::motors::MotorController;

impl<I2C, D, E> MotorController<I2C, D>
where
    I2C: Write<Error = E> + WriteRead<Error = E>,
    D: DelayNs,
{
    /// Move a servo to `angle` degrees (0-180, not clamped).
    pub async fn set_servo(&mut self, servo: Servo, angle: u16) -> Result<(), Error<E>> {
        self.apply(&[(servo.channel(), encode::servo_duty(angle))]).await
    }

    /// Raw-slot variant of [`set_servo`](Self::set_servo). Slots outside
    /// 1-8 are ignored.
    pub async fn set_servo_index(&mut self, index: u8, angle: u16) -> Result<(), Error<E>> {
        match Servo::try_from(index) {
            Ok(servo) => self.set_servo(servo, angle).await,
            Err(_) => {
                warn!("servo slot {=u8} ignored", index);
                Ok(())
            }
        }
    }

    /// Step a servo one degree at a time from `from` toward `to`, pausing
    /// `step_ms` after each position.
    ///
    /// `to` itself is not written; the servo ends one degree short of it.
    /// Returns the angle where the sweep stopped (`to`).
    pub async fn sweep_servo(
        &mut self,
        servo: Servo,
        from: u16,
        to: u16,
        step_ms: u32,
    ) -> Result<u16, Error<E>> {
        let mut angle = from;
        while angle != to {
            self.set_servo(servo, angle).await?;
            if step_ms > 0 {
                self.pause_ms(step_ms).await;
            }
            angle = if angle < to { angle + 1 } else { angle - 1 };
        }
        Ok(angle)
    }
}
