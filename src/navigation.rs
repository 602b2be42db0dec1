//! Autonomous behaviors built on the motion primitives and sensors.
//!
//! Each call runs exactly one iteration and returns where it ended up; the
//! caller loops. Nothing is remembered between calls except the state of
//! the expander itself.

use embedded_hal::blocking::i2c::{Write, WriteRead};
use embedded_hal::digital::v2::{InputPin, OutputPin};
use embedded_hal_async::delay::DelayNs;

use crate::config::{LineFollowConfig, LookAroundPolicy, WallAvoidanceConfig};
use crate::encode::Servo;
use crate::error::Error;
use crate::motors::{MotorController, Rotation};
use crate::sensors::{InfraredSensor, PulseIn, Ultrasonic};

/// Servo angle facing straight ahead.
const CENTER: u16 = 90;
const SERVO_MAX: u16 = 180;

/// Wall-avoidance states.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NavState {
    Scanning,
    Forward,
    /// Path blocked; comparing left and right clearance.
    LookAround,
    Turning(Rotation),
    BackingUp,
}

/// Clamp a sweep width to 2..=180 and round odd values up.
pub fn normalize_sweep(angle: u16) -> u16 {
    let angle = angle.clamp(2, SERVO_MAX);
    if angle % 2 != 0 { angle + 1 } else { angle }
}

/// Pick the escape maneuver from the look-around readings.
pub fn choose_escape(left_cm: u32, right_cm: u32, policy: LookAroundPolicy) -> NavState {
    if left_cm > right_cm {
        NavState::Turning(Rotation::Left)
    } else if right_cm > left_cm {
        match policy {
            LookAroundPolicy::ReplicateLeftBias => NavState::Turning(Rotation::Left),
            LookAroundPolicy::TowardGreaterReading => NavState::Turning(Rotation::Right),
        }
    } else {
        NavState::BackingUp
    }
}

/// One iteration of wall avoidance.
///
/// Sweeps the sensor servo across the forward arc and pings once. With a
/// clear path the robot drives forward and the call returns at once.
/// Otherwise it stops, looks left and right, and turns or backs up for
/// `turn_secs`; the motors are left running when it returns.
pub async fn avoid_walls<I2C, D, E, TRIG, ECHO, SD>(
    motors: &mut MotorController<I2C, D>,
    sonar: &mut Ultrasonic<TRIG, ECHO, SD>,
    servo: Servo,
    config: &WallAvoidanceConfig,
) -> Result<NavState, Error<E>>
where
    I2C: Write<Error = E> + WriteRead<Error = E>,
    D: DelayNs,
    TRIG: OutputPin,
    ECHO: PulseIn,
    SD: DelayNs,
{
    let scan = normalize_sweep(config.scan_angle);
    debug!("nav {}: {=u16} deg arc", NavState::Scanning, scan);
    motors
        .sweep_servo(servo, CENTER - scan / 2, CENTER + scan / 2, config.sweep_step_ms)
        .await?;

    let front_cm = sonar.distance_cm().await?;
    if front_cm > config.threshold_cm {
        debug!("nav {}: {=u32} cm clear", NavState::Forward, front_cm);
        motors.forward(config.speed).await?;
        return Ok(NavState::Forward);
    }

    info!("obstacle at {=u32} cm", front_cm);
    motors.stop_all().await?;

    let range = normalize_sweep(config.look_around_range);
    let left_cm = look_toward(motors, sonar, servo, CENTER.saturating_sub(range), config).await?;
    let right_cm = look_toward(motors, sonar, servo, (CENTER + range).min(SERVO_MAX), config).await?;
    debug!(
        "nav {}: left {=u32} cm, right {=u32} cm",
        NavState::LookAround,
        left_cm,
        right_cm
    );

    let next = choose_escape(left_cm, right_cm, config.policy);
    match next {
        NavState::Turning(rotation) => {
            motors.turn(config.speed, config.turn_secs, rotation).await?;
        }
        _ => {
            motors.back_up(config.speed, config.turn_secs).await?;
        }
    }
    Ok(next)
}

/// Swing the servo from center to `edge`, ping, and swing back.
async fn look_toward<I2C, D, E, TRIG, ECHO, SD>(
    motors: &mut MotorController<I2C, D>,
    sonar: &mut Ultrasonic<TRIG, ECHO, SD>,
    servo: Servo,
    edge: u16,
    config: &WallAvoidanceConfig,
) -> Result<u32, Error<E>>
where
    I2C: Write<Error = E> + WriteRead<Error = E>,
    D: DelayNs,
    TRIG: OutputPin,
    ECHO: PulseIn,
    SD: DelayNs,
{
    let step = config.sweep_step_ms;
    motors.sweep_servo(servo, CENTER, edge, step).await?;
    let reading = sonar.distance_cm().await?;
    motors.sweep_servo(servo, edge, CENTER, step).await?;
    Ok(reading)
}

/// Motion chosen by a line follower.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LineAction {
    Forward,
    TurnLeft,
    TurnRight,
    Stop,
    /// No command issued.
    Hold,
}

/// Two-sensor decision. `true` means the sensor sees the line.
pub fn decide_two(left: bool, right: bool) -> LineAction {
    match (left, right) {
        (true, true) => LineAction::Forward,
        (false, true) => LineAction::TurnLeft,
        (true, false) => LineAction::TurnRight,
        (false, false) => LineAction::Stop,
    }
}

/// Three-sensor decision.
///
/// Center-only is not handled and issues nothing.
pub fn decide_three(left: bool, center: bool, right: bool) -> LineAction {
    match (left, center, right) {
        (true, false, true) => LineAction::Forward,
        (false, false, false) => LineAction::Stop,
        (true, true, true) => LineAction::Stop,
        (false, false, true) => LineAction::TurnLeft,
        (true, false, false) => LineAction::TurnRight,
        (false, true, true) => LineAction::TurnLeft,
        (true, true, false) => LineAction::TurnRight,
        (false, true, false) => LineAction::Hold,
    }
}

/// Issue `action` and hold it. Returns whether anything moved.
async fn drive<I2C, D, E>(
    motors: &mut MotorController<I2C, D>,
    action: LineAction,
    config: &LineFollowConfig,
) -> Result<bool, Error<E>>
where
    I2C: Write<Error = E> + WriteRead<Error = E>,
    D: DelayNs,
{
    match action {
        LineAction::Forward => motors.forward(config.speed).await?,
        LineAction::TurnLeft => motors.turn_left(config.speed).await?,
        LineAction::TurnRight => motors.turn_right(config.speed).await?,
        LineAction::Stop => {
            motors.stop_all().await?;
            return Ok(false);
        }
        LineAction::Hold => return Ok(false),
    }
    motors.pause_ms(config.hold_ms).await;
    Ok(true)
}

/// One iteration of two-sensor line following. Every move is held for
/// `hold_ms` and then stopped.
pub async fn follow_line_two<I2C, D, E, L, R>(
    motors: &mut MotorController<I2C, D>,
    left: &InfraredSensor<L>,
    right: &InfraredSensor<R>,
    config: &LineFollowConfig,
) -> Result<LineAction, Error<E>>
where
    I2C: Write<Error = E> + WriteRead<Error = E>,
    D: DelayNs,
    L: InputPin,
    R: InputPin,
{
    let right_seen = right.detects()?;
    let left_seen = left.detects()?;
    let action = decide_two(left_seen, right_seen);
    debug!("line2 {=bool} {=bool} -> {}", left_seen, right_seen, action);

    if drive(motors, action, config).await? {
        motors.stop_all().await?;
    }
    Ok(action)
}

/// One iteration of three-sensor line following. Moves are held for
/// `hold_ms` and left running.
pub async fn follow_line_three<I2C, D, E, L, C, R>(
    motors: &mut MotorController<I2C, D>,
    left: &InfraredSensor<L>,
    center: &InfraredSensor<C>,
    right: &InfraredSensor<R>,
    config: &LineFollowConfig,
) -> Result<LineAction, Error<E>>
where
    I2C: Write<Error = E> + WriteRead<Error = E>,
    D: DelayNs,
    L: InputPin,
    C: InputPin,
    R: InputPin,
{
    let left_seen = left.detects()?;
    let center_seen = center.detects()?;
    let right_seen = right.detects()?;
    let action = decide_three(left_seen, center_seen, right_seen);
    debug!(
        "line3 {=bool} {=bool} {=bool} -> {}",
        left_seen,
        center_seen,
        right_seen,
        action
    );

    drive(motors, action, config).await?;
    Ok(action)
}
