use std::time::Duration;

use auto_impl::auto_impl;

use super::PlanarVector;
use crate::error::Error;

/// Remaining distance to the current goal as reported by the base, angle in
/// radians.
#[derive(Clone, Debug, Default, Copy, PartialEq)]
pub struct GoalDelta {
    pub delta_x: f64,
    pub delta_y: f64,
    pub delta_theta: f64,
    pub distance: f64,
}

/// Velocity held by the base for `duration`, angle in radians.
#[derive(Clone, Debug, Default, Copy, PartialEq)]
pub struct TimedSpeed {
    pub x_vel: f64,
    pub y_vel: f64,
    pub rot_vel: f64,
    pub duration: Duration,
}

#[auto_impl(Box, Arc)]
pub trait Mobility: Send + Sync {
    /// Velocity command, applied by the base for a short remotely configured
    /// duration.
    fn send_direction(&self, direction: &PlanarVector) -> Result<(), Error>;
    /// Velocity command held for a given duration. The base enters `Speed`
    /// mode on its own.
    fn send_set_speed(&self, speed: &TimedSpeed) -> Result<(), Error>;
    fn send_goto(&self, goal: &PlanarVector) -> Result<(), Error>;
    fn distance_to_goal(&self) -> Result<GoalDelta, Error>;
}
