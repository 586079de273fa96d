use parking_lot::Mutex;

use crate::{
    error::Error,
    safety::{ObstacleDetectionStatus, DEFAULT_CRITICAL_DISTANCE, DEFAULT_SLOWDOWN_DISTANCE},
    traits::{Lidar, SafetyConfig},
};

/// Dummy Lidar for debug or tests.
#[derive(Debug)]
pub struct DummyLidar {
    pub safety: Mutex<SafetyConfig>,
    pub set_safety_requests: Mutex<Vec<SafetyConfig>>,
    pub obstacle_detection_status_index: Mutex<i32>,
    pub map: Mutex<Vec<u8>>,
}

impl DummyLidar {
    pub fn new() -> Self {
        Self {
            safety: Mutex::new(SafetyConfig {
                slowdown_distance: DEFAULT_SLOWDOWN_DISTANCE,
                critical_distance: DEFAULT_CRITICAL_DISTANCE,
                enabled: true,
            }),
            set_safety_requests: Mutex::new(vec![]),
            obstacle_detection_status_index: Mutex::new(ObstacleDetectionStatus::NoObject.index()),
            map: Mutex::new(vec![]),
        }
    }

    pub fn set_obstacle_detection_status(&self, status: ObstacleDetectionStatus) {
        *self.obstacle_detection_status_index.lock() = status.index();
    }
}

impl Default for DummyLidar {
    fn default() -> Self {
        Self::new()
    }
}

impl Lidar for DummyLidar {
    fn safety(&self) -> Result<SafetyConfig, Error> {
        Ok(*self.safety.lock())
    }

    fn set_safety(&self, config: &SafetyConfig) -> Result<(), Error> {
        self.set_safety_requests.lock().push(*config);
        *self.safety.lock() = *config;
        Ok(())
    }

    fn obstacle_detection_status_index(&self) -> Result<i32, Error> {
        Ok(*self.obstacle_detection_status_index.lock())
    }

    fn map(&self) -> Result<Vec<u8>, Error> {
        Ok(self.map.lock().clone())
    }
}
