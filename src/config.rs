//! Tunables for the sensors and navigation behaviors.
//!
//! Every struct has a `Default` matching the robot as built; firmware
//! overrides single fields where the chassis differs.

/// Ultrasonic ranger limits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UltrasonicConfig {
    /// Readings beyond this distance time out and read as 0.
    pub max_range_cm: u32,
}

impl Default for UltrasonicConfig {
    fn default() -> Self {
        Self { max_range_cm: 500 }
    }
}

/// How the wall-avoidance look-around picks a turn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LookAroundPolicy {
    /// Turn left whenever one side reads farther than the other,
    /// whichever side it is. Matches the behavior of the robot's stock
    /// firmware.
    #[default]
    ReplicateLeftBias,
    /// Turn toward the side with the strictly greater reading.
    TowardGreaterReading,
}

/// Parameters of one wall-avoidance iteration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WallAvoidanceConfig {
    /// Width of the forward scan in degrees, normalized to an even value
    /// in 2..=180.
    pub scan_angle: u16,
    /// Motor speed 0-255.
    pub speed: u8,
    /// Readings at or below this distance count as obstructed.
    pub threshold_cm: u32,
    /// Duration of a turn or back-up.
    pub turn_secs: u32,
    /// Swing to each side when looking around, normalized like
    /// `scan_angle`.
    pub look_around_range: u16,
    /// Pause after each servo step.
    pub sweep_step_ms: u32,
    pub policy: LookAroundPolicy,
}

impl Default for WallAvoidanceConfig {
    fn default() -> Self {
        Self {
            scan_angle: 60,
            speed: 128,
            threshold_cm: 20,
            turn_secs: 1,
            look_around_range: 60,
            sweep_step_ms: 5,
            policy: LookAroundPolicy::default(),
        }
    }
}

/// Parameters of one line-following iteration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LineFollowConfig {
    pub speed: u8,
    /// How long each motion command is held.
    pub hold_ms: u32,
}

impl Default for LineFollowConfig {
    fn default() -> Self {
        Self {
            speed: 100,
            hold_ms: 50,
        }
    }
}
