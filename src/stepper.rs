//! Stepper operations on the drive channels.
//!
//! A stepper group borrows the channels of two DC motor slots. Writing its
//! phase table leaves the coils energized; the shaft turns for as long as
//! that state is held and stops when both motors of the group are zeroed.
//! Position is open loop, derived from the family's fixed ms-per-turn, so
//! drift across repeated moves is expected.

use embedded_hal::blocking::i2c::{Write, WriteRead};
use embedded_hal_async::delay::DelayNs;

use crate::encode::{self, Direction, StepperFamily, StepperGroup};
use crate::error::Error;
use crate::motors::MotorController;

impl<I2C, D, E> MotorController<I2C, D>
where
    I2C: Write<Error = E> + WriteRead<Error = E>,
    D: DelayNs,
{
    /// Put `group` into the holding state for `direction` without timing.
    pub async fn energize_stepper(
        &mut self,
        group: StepperGroup,
        family: StepperFamily,
        direction: Direction,
    ) -> Result<(), Error<E>> {
        let writes = encode::stepper_writes(family, group, direction);
        self.apply(&writes).await
    }

    /// Zero both motor slots of `group`.
    pub async fn stop_stepper(&mut self, group: StepperGroup) -> Result<(), Error<E>> {
        for motor in group.motors() {
            self.stop_motor(motor).await?;
        }
        Ok(())
    }

    /// Rotate one stepper by `degrees`, then release it.
    ///
    /// Zero degrees returns immediately without any write.
    pub async fn rotate_stepper_by_degrees(
        &mut self,
        group: StepperGroup,
        family: StepperFamily,
        direction: Direction,
        degrees: u32,
    ) -> Result<(), Error<E>> {
        if degrees == 0 {
            return Ok(());
        }
        let hold_ms = family.hold_ms(degrees);
        debug!(
            "stepper {} {} {=u32} deg, hold {=u32} ms",
            group, direction, degrees, hold_ms
        );
        self.energize_stepper(group, family, direction).await?;
        self.pause_ms(hold_ms).await;
        self.stop_stepper(group).await
    }

    /// Rotate one stepper by whole turns.
    pub async fn rotate_stepper_by_turns(
        &mut self,
        group: StepperGroup,
        family: StepperFamily,
        direction: Direction,
        turns: u32,
    ) -> Result<(), Error<E>> {
        if turns == 0 {
            return Ok(());
        }
        self.rotate_stepper_by_degrees(group, family, direction, turns.saturating_mul(360))
            .await
    }

    /// Rotate both steppers at once, each by its own angle.
    ///
    /// Holds run at [`DUAL_MS_PER_TURN`](encode::DUAL_MS_PER_TURN) for
    /// either family; `family` only picks the phase table.
    ///
    /// Both groups are energized together; the one needing less time is
    /// released first (M1/M2 on a tie), the other after the remaining
    /// difference. Total suspension equals the longer hold. A group asked
    /// for zero degrees stays energized, and if both are zero the call
    /// leaves both groups holding and returns at once.
    pub async fn rotate_dual_steppers_by_degrees(
        &mut self,
        family: StepperFamily,
        direction1: Direction,
        degrees1: u32,
        direction2: Direction,
        degrees2: u32,
    ) -> Result<(), Error<E>> {
        let first = (StepperGroup::M1M2, degrees1, encode::dual_hold_ms(degrees1));
        let second = (StepperGroup::M3M4, degrees2, encode::dual_hold_ms(degrees2));
        debug!(
            "dual stepper {=u32} deg / {=u32} deg, hold {=u32} / {=u32} ms",
            degrees1, degrees2, first.2, second.2
        );

        self.energize_stepper(StepperGroup::M1M2, family, direction1).await?;
        self.energize_stepper(StepperGroup::M3M4, family, direction2).await?;

        if degrees1 == 0 && degrees2 == 0 {
            return Ok(());
        }

        let (short, long) = if second.2 < first.2 {
            (second, first)
        } else {
            (first, second)
        };

        let mut elapsed = 0;
        if short.1 > 0 {
            self.pause_ms(short.2).await;
            elapsed = short.2;
            self.stop_stepper(short.0).await?;
        }
        let remaining = long.2 - elapsed;
        if remaining > 0 {
            self.pause_ms(remaining).await;
        }
        self.stop_stepper(long.0).await
    }

    /// Dual rotation by whole turns. Both zero is a no-op.
    pub async fn rotate_dual_steppers_by_turns(
        &mut self,
        family: StepperFamily,
        direction1: Direction,
        turns1: u32,
        direction2: Direction,
        turns2: u32,
    ) -> Result<(), Error<E>> {
        if turns1 == 0 && turns2 == 0 {
            return Ok(());
        }
        self.rotate_dual_steppers_by_degrees(
            family,
            direction1,
            turns1.saturating_mul(360),
            direction2,
            turns2.saturating_mul(360),
        )
        .await
    }
}
