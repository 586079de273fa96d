use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Command limits and goal supervision timing.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct MobileBaseConfig {
    /// Limit of |x_vel| and |y_vel| in velocity commands (m/s).
    #[serde(default = "default_max_xy_vel")]
    pub max_xy_vel: f64,
    /// Limit of |rot_vel| in velocity commands (deg/s).
    #[serde(default = "default_max_rot_vel")]
    pub max_rot_vel: f64,
    /// Limit of |x| and |y| in goals (m).
    #[serde(default = "default_max_xy_goto")]
    pub max_xy_goto: f64,
    /// Speed used to derive the default goal timeout (m/s).
    #[serde(default = "default_assumed_max_speed")]
    pub assumed_max_speed: f64,
    #[serde(default = "default_goto_poll_interval_sec")]
    pub goto_poll_interval_sec: f64,
}

impl MobileBaseConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("max_xy_vel", self.max_xy_vel),
            ("max_rot_vel", self.max_rot_vel),
            ("max_xy_goto", self.max_xy_goto),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::InvalidConfig(format!(
                    "{name} must be a finite non-negative number, got {value}"
                )));
            }
        }
        for (name, value) in [
            ("assumed_max_speed", self.assumed_max_speed),
            ("goto_poll_interval_sec", self.goto_poll_interval_sec),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(Error::InvalidConfig(format!(
                    "{name} must be a finite positive number, got {value}"
                )));
            }
        }
        for (name, secs) in [
            ("default goto timeout", self.default_goto_timeout_sec()),
            ("goto_poll_interval_sec", self.goto_poll_interval_sec),
        ] {
            Duration::try_from_secs_f64(secs).map_err(|e| {
                Error::InvalidConfig(format!("{name} of {secs} s is not a valid duration ({e})"))
            })?;
        }
        Ok(())
    }

    /// Time for a round trip across the goal range at the assumed speed.
    ///
    /// Saturates at [`Duration::MAX`] if the config was not validated.
    pub fn default_goto_timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.default_goto_timeout_sec()).unwrap_or(Duration::MAX)
    }

    pub fn goto_poll_interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.goto_poll_interval_sec).unwrap_or(Duration::MAX)
    }

    fn default_goto_timeout_sec(&self) -> f64 {
        2.0 * self.max_xy_goto / self.assumed_max_speed
    }
}

impl Default for MobileBaseConfig {
    fn default() -> Self {
        Self {
            max_xy_vel: default_max_xy_vel(),
            max_rot_vel: default_max_rot_vel(),
            max_xy_goto: default_max_xy_goto(),
            assumed_max_speed: default_assumed_max_speed(),
            goto_poll_interval_sec: default_goto_poll_interval_sec(),
        }
    }
}

fn default_max_xy_vel() -> f64 {
    0.61
}

fn default_max_rot_vel() -> f64 {
    114.0
}

fn default_max_xy_goto() -> f64 {
    1.0
}

fn default_assumed_max_speed() -> f64 {
    0.5
}

fn default_goto_poll_interval_sec() -> f64 {
    0.1
}

#[cfg(test)]
mod tests {
    use assert_approx_eq::assert_approx_eq;

    use super::*;

    #[test]
    fn test_default() {
        let config = MobileBaseConfig::default();
        config.validate().unwrap();
        assert_approx_eq!(config.default_goto_timeout().as_secs_f64(), 4.0);
        assert_eq!(config.goto_poll_interval(), Duration::from_millis(100));
    }

    #[test]
    fn test_deserialize_partial() {
        let config: MobileBaseConfig = toml::from_str("max_xy_goto = 2.5").unwrap();
        assert_approx_eq!(config.max_xy_goto, 2.5);
        assert_approx_eq!(config.max_xy_vel, 0.61);
        assert_approx_eq!(config.default_goto_timeout().as_secs_f64(), 10.0);

        assert!(toml::from_str::<MobileBaseConfig>("max_speed = 1.0").is_err());
    }

    #[test]
    fn test_validate() {
        let config = MobileBaseConfig {
            assumed_max_speed: 0.0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
        let config = MobileBaseConfig {
            max_xy_vel: f64::NAN,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_duration_overflow() {
        let config = MobileBaseConfig {
            max_xy_goto: 1e300,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
        assert_eq!(config.default_goto_timeout(), Duration::MAX);

        let config = MobileBaseConfig {
            goto_poll_interval_sec: 1e300,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
        assert_eq!(config.goto_poll_interval(), Duration::MAX);

        // Large but representable.
        let config = MobileBaseConfig {
            max_xy_goto: 1e6,
            ..Default::default()
        };
        config.validate().unwrap();
        assert_eq!(config.default_goto_timeout(), Duration::from_secs(4_000_000));
    }
}
