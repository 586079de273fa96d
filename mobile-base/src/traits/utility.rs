use auto_impl::auto_impl;

use crate::error::Error;

/// Planar vector as it travels on the wire: meters and radians.
#[derive(Clone, Debug, Default, Copy, PartialEq)]
pub struct PlanarVector {
    pub x: f64,
    pub y: f64,
    pub theta: f64,
}

impl PlanarVector {
    pub fn new(x: f64, y: f64, theta: f64) -> Self {
        Self { x, y, theta }
    }
}

/// Presence and mode queries of the remote base.
///
/// Modes travel as the protocol's integer index, index `0` being the
/// protocol's "none" value.
#[auto_impl(Box, Arc)]
pub trait Utility: Send + Sync {
    fn model_version(&self) -> Result<String, Error>;
    /// Battery voltage in volts, unrounded.
    fn battery_level(&self) -> Result<f64, Error>;
    /// Odometry in the frame set at startup or at the last reset.
    fn odometry(&self) -> Result<PlanarVector, Error>;
    fn reset_odometry(&self) -> Result<(), Error>;
    fn drive_mode_index(&self) -> Result<i32, Error>;
    fn set_drive_mode_index(&self, index: i32) -> Result<(), Error>;
    fn control_mode_index(&self) -> Result<i32, Error>;
    fn set_control_mode_index(&self, index: i32) -> Result<(), Error>;
}
