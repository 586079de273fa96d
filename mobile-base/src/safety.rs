use std::{fmt, sync::Arc};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    cache::RemoteCache,
    error::{Error, Result},
    traits::{Lidar, SafetyConfig},
    units::round_length,
};

pub const DEFAULT_SLOWDOWN_DISTANCE: f64 = 0.7;
pub const DEFAULT_CRITICAL_DISTANCE: f64 = 0.55;

/// Classification of the nearest obstacle against the slowdown and critical
/// radii.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObstacleDetectionStatus {
    NoObject,
    ObjectDetectedSlowdown,
    ObjectDetectedStop,
    DetectionError,
}

impl ObstacleDetectionStatus {
    pub fn index(self) -> i32 {
        match self {
            ObstacleDetectionStatus::NoObject => 0,
            ObstacleDetectionStatus::ObjectDetectedSlowdown => 1,
            ObstacleDetectionStatus::ObjectDetectedStop => 2,
            ObstacleDetectionStatus::DetectionError => 3,
        }
    }

    pub fn from_index(index: i32) -> Option<Self> {
        match index {
            0 => Some(ObstacleDetectionStatus::NoObject),
            1 => Some(ObstacleDetectionStatus::ObjectDetectedSlowdown),
            2 => Some(ObstacleDetectionStatus::ObjectDetectedStop),
            3 => Some(ObstacleDetectionStatus::DetectionError),
            _ => None,
        }
    }
}

impl fmt::Display for ObstacleDetectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ObstacleDetectionStatus::NoObject => "no_object_detected",
            ObstacleDetectionStatus::ObjectDetectedSlowdown => "object_detected_slowdown",
            ObstacleDetectionStatus::ObjectDetectedStop => "object_detected_stop",
            ObstacleDetectionStatus::DetectionError => "detection_error",
        })
    }
}

/// Cached lidar safety settings of the base.
///
/// Every setter sends the full `{slowdown, critical, enabled}` triple, built
/// from the cached values plus the changed one, and then refreshes the cache
/// from the base. The obstacle detection status is never cached.
pub struct SafetySnapshot {
    lidar: Arc<dyn Lidar>,
    config: RemoteCache<SafetyConfig>,
}

impl SafetySnapshot {
    /// Creates the snapshot and reads the current settings.
    pub fn new(lidar: Arc<dyn Lidar>) -> Result<Self> {
        let snapshot = Self {
            lidar,
            config: RemoteCache::new(),
        };
        snapshot.refresh()?;
        Ok(snapshot)
    }

    pub fn refresh(&self) -> Result<SafetyConfig> {
        self.config.refresh(|| {
            let config = self.lidar.safety()?;
            let config = SafetyConfig {
                slowdown_distance: round_length(config.slowdown_distance),
                critical_distance: round_length(config.critical_distance),
                enabled: config.enabled,
            };
            debug!(?config, "refreshed safety config");
            Ok(config)
        })
    }

    /// Cached settings, read from the base only if the cache is empty.
    pub fn config(&self) -> Result<SafetyConfig> {
        self.config.get_or_refresh(|| self.refresh())
    }

    pub fn slowdown_distance(&self) -> Result<f64> {
        Ok(self.config()?.slowdown_distance)
    }

    pub fn critical_distance(&self) -> Result<f64> {
        Ok(self.config()?.critical_distance)
    }

    pub fn safety_enabled(&self) -> Result<bool> {
        Ok(self.config()?.enabled)
    }

    pub fn set_slowdown_distance(&self, distance: f64) -> Result<()> {
        self.update(|config| config.slowdown_distance = distance)
    }

    pub fn set_critical_distance(&self, distance: f64) -> Result<()> {
        self.update(|config| config.critical_distance = distance)
    }

    pub fn set_safety_enabled(&self, enabled: bool) -> Result<()> {
        self.update(|config| config.enabled = enabled)
    }

    /// Restores the default radii. The stop radius nests inside the slowdown
    /// radius.
    pub fn reset_to_defaults(&self) -> Result<()> {
        self.update(|config| {
            config.slowdown_distance = DEFAULT_SLOWDOWN_DISTANCE;
            config.critical_distance = DEFAULT_CRITICAL_DISTANCE;
        })
    }

    /// Queried from the base on every call.
    pub fn obstacle_detection_status(&self) -> Result<ObstacleDetectionStatus> {
        let index = self.lidar.obstacle_detection_status_index()?;
        ObstacleDetectionStatus::from_index(index).ok_or_else(|| {
            Error::undecodable(
                "GetObstacleDetectionStatus",
                "obstacle detection status",
                index,
            )
        })
    }

    /// Compressed map image, passed through undecoded.
    pub fn map(&self) -> Result<Vec<u8>> {
        self.lidar.map()
    }

    fn update(&self, change: impl FnOnce(&mut SafetyConfig)) -> Result<()> {
        let mut config = self.config()?;
        change(&mut config);
        if config.critical_distance >= config.slowdown_distance {
            warn!(
                critical_distance = config.critical_distance,
                slowdown_distance = config.slowdown_distance,
                "critical distance is not inside the slowdown distance"
            );
        }
        debug!(?config, "setting safety config");
        self.lidar.set_safety(&config)?;
        self.refresh()?;
        Ok(())
    }
}

impl fmt::Debug for SafetySnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SafetySnapshot")
            .field("config", &self.config.get())
            .finish_non_exhaustive()
    }
}
