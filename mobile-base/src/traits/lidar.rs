use auto_impl::auto_impl;

use crate::error::Error;

/// Lidar safety settings. The remote service takes all three at once.
#[derive(Clone, Debug, Copy, PartialEq)]
pub struct SafetyConfig {
    /// Obstacles closer than this slow the base down (m).
    pub slowdown_distance: f64,
    /// Obstacles closer than this stop the base (m).
    pub critical_distance: f64,
    pub enabled: bool,
}

#[auto_impl(Box, Arc)]
pub trait Lidar: Send + Sync {
    fn safety(&self) -> Result<SafetyConfig, Error>;
    fn set_safety(&self, config: &SafetyConfig) -> Result<(), Error>;
    fn obstacle_detection_status_index(&self) -> Result<i32, Error>;
    /// Compressed map image.
    fn map(&self) -> Result<Vec<u8>, Error>;
}
