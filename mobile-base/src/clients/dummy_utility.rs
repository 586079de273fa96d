use parking_lot::Mutex;

use crate::{
    error::Error,
    modes::{ControlMode, DriveMode},
    traits::{PlanarVector, Utility},
};

/// Dummy Utility for debug or tests.
#[derive(Debug)]
pub struct DummyUtility {
    pub model_version: String,
    pub battery_level: Mutex<f64>,
    pub odometry: Mutex<PlanarVector>,
    pub drive_mode_index: Mutex<i32>,
    pub control_mode_index: Mutex<i32>,
    /// Every index received by `set_drive_mode_index`, in order.
    pub drive_mode_requests: Mutex<Vec<i32>>,
}

impl DummyUtility {
    pub fn new() -> Self {
        Self {
            model_version: "dummy-1.0".to_owned(),
            battery_level: Mutex::new(24.93),
            odometry: Mutex::new(PlanarVector::default()),
            drive_mode_index: Mutex::new(DriveMode::Brake.index()),
            control_mode_index: Mutex::new(ControlMode::Pid.index()),
            drive_mode_requests: Mutex::new(vec![]),
        }
    }

    /// Changes the mode as the base would on its own, without recording a
    /// request.
    pub fn set_drive_mode(&self, mode: DriveMode) {
        *self.drive_mode_index.lock() = mode.index();
    }

    pub fn drive_mode(&self) -> Option<DriveMode> {
        DriveMode::from_index(*self.drive_mode_index.lock())
    }
}

impl Default for DummyUtility {
    fn default() -> Self {
        Self::new()
    }
}

impl Utility for DummyUtility {
    fn model_version(&self) -> Result<String, Error> {
        Ok(self.model_version.clone())
    }

    fn battery_level(&self) -> Result<f64, Error> {
        Ok(*self.battery_level.lock())
    }

    fn odometry(&self) -> Result<PlanarVector, Error> {
        Ok(*self.odometry.lock())
    }

    fn reset_odometry(&self) -> Result<(), Error> {
        *self.odometry.lock() = PlanarVector::default();
        Ok(())
    }

    fn drive_mode_index(&self) -> Result<i32, Error> {
        Ok(*self.drive_mode_index.lock())
    }

    fn set_drive_mode_index(&self, index: i32) -> Result<(), Error> {
        self.drive_mode_requests.lock().push(index);
        *self.drive_mode_index.lock() = index;
        Ok(())
    }

    fn control_mode_index(&self) -> Result<i32, Error> {
        Ok(*self.control_mode_index.lock())
    }

    fn set_control_mode_index(&self, index: i32) -> Result<(), Error> {
        *self.control_mode_index.lock() = index;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use assert_approx_eq::assert_approx_eq;

    use super::*;

    #[test]
    fn test_defaults() {
        let utility = DummyUtility::new();
        assert_eq!(utility.drive_mode(), Some(DriveMode::Brake));
        assert_eq!(utility.control_mode_index().unwrap(), 2);
        assert!(utility.drive_mode_requests.lock().is_empty());
    }

    #[test]
    fn test_reset_odometry() {
        let utility = DummyUtility::new();
        *utility.odometry.lock() = PlanarVector::new(1.0, -2.0, 0.5);
        assert_approx_eq!(utility.odometry().unwrap().y, -2.0);
        utility.reset_odometry().unwrap();
        assert_eq!(utility.odometry().unwrap(), PlanarVector::default());
    }
}
