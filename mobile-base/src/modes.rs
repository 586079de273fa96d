use std::{fmt, str::FromStr, sync::Arc};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    cache::RemoteCache,
    error::{Error, Result},
    traits::Utility,
};

/// Motor-control regime of the base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DriveMode {
    CmdVel,
    Brake,
    FreeWheel,
    Speed,
    #[serde(rename = "goto")]
    GoTo,
    EmergencyStop,
}

impl DriveMode {
    pub const ALL: [DriveMode; 6] = [
        DriveMode::CmdVel,
        DriveMode::Brake,
        DriveMode::FreeWheel,
        DriveMode::Speed,
        DriveMode::GoTo,
        DriveMode::EmergencyStop,
    ];

    /// Protocol index. `0` is reserved for the protocol's "none" value.
    pub fn index(self) -> i32 {
        match self {
            DriveMode::CmdVel => 1,
            DriveMode::Brake => 2,
            DriveMode::FreeWheel => 3,
            DriveMode::Speed => 4,
            DriveMode::GoTo => 5,
            DriveMode::EmergencyStop => 6,
        }
    }

    pub fn from_index(index: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|mode| mode.index() == index)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DriveMode::CmdVel => "cmd_vel",
            DriveMode::Brake => "brake",
            DriveMode::FreeWheel => "free_wheel",
            DriveMode::Speed => "speed",
            DriveMode::GoTo => "goto",
            DriveMode::EmergencyStop => "emergency_stop",
        }
    }

    /// `Speed` and `GoTo` are only entered as a side effect of a velocity or
    /// goal command.
    pub fn is_user_selectable(self) -> bool {
        !matches!(self, DriveMode::Speed | DriveMode::GoTo)
    }
}

impl fmt::Display for DriveMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DriveMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::InvalidMode {
                message: format!(
                    "unknown drive mode {s:?}, expected one of {:?}",
                    Self::ALL.map(DriveMode::as_str)
                ),
            })
    }
}

/// Low-level actuator control law.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ControlMode {
    OpenLoop,
    Pid,
}

impl ControlMode {
    pub const ALL: [ControlMode; 2] = [ControlMode::OpenLoop, ControlMode::Pid];

    pub fn index(self) -> i32 {
        match self {
            ControlMode::OpenLoop => 1,
            ControlMode::Pid => 2,
        }
    }

    pub fn from_index(index: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|mode| mode.index() == index)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ControlMode::OpenLoop => "open_loop",
            ControlMode::Pid => "pid",
        }
    }
}

impl fmt::Display for ControlMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ControlMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::InvalidMode {
                message: format!(
                    "unknown control mode {s:?}, expected one of {:?}",
                    Self::ALL.map(ControlMode::as_str)
                ),
            })
    }
}

/// Drive and control mode of the base, mirrored locally.
///
/// The getters always query the base and are the resync point of the cache.
/// Setters update the cache optimistically once the remote call succeeded.
pub struct ModeStateMachine {
    utility: Arc<dyn Utility>,
    drive_mode: RemoteCache<DriveMode>,
    control_mode: RemoteCache<ControlMode>,
}

impl ModeStateMachine {
    pub fn new(utility: Arc<dyn Utility>) -> Self {
        Self {
            utility,
            drive_mode: RemoteCache::new(),
            control_mode: RemoteCache::new(),
        }
    }

    pub fn drive_mode(&self) -> Result<DriveMode> {
        self.drive_mode.refresh(|| {
            let index = self.utility.drive_mode_index()?;
            let mode = DriveMode::from_index(index)
                .ok_or_else(|| Error::undecodable("GetDriveMode", "drive mode", index))?;
            debug!(%mode, "refreshed drive mode");
            Ok(mode)
        })
    }

    pub fn control_mode(&self) -> Result<ControlMode> {
        self.control_mode.refresh(|| {
            let index = self.utility.control_mode_index()?;
            let mode = ControlMode::from_index(index)
                .ok_or_else(|| Error::undecodable("GetControlMode", "control mode", index))?;
            debug!(%mode, "refreshed control mode");
            Ok(mode)
        })
    }

    /// Last known drive mode, without a remote call. May be stale.
    pub fn cached_drive_mode(&self) -> Option<DriveMode> {
        self.drive_mode.get()
    }

    /// Last known control mode, without a remote call. May be stale.
    pub fn cached_control_mode(&self) -> Option<ControlMode> {
        self.control_mode.get()
    }

    /// Fails with [`Error::InvalidMode`] for `Speed` and `GoTo`.
    pub fn set_drive_mode(&self, mode: DriveMode) -> Result<()> {
        if !mode.is_user_selectable() {
            return Err(Error::InvalidMode {
                message: format!(
                    "drive mode {mode} is entered by a command and cannot be set directly"
                ),
            });
        }
        self.enter_drive_mode(mode)
    }

    pub fn set_control_mode(&self, mode: ControlMode) -> Result<()> {
        debug!(%mode, "setting control mode");
        self.utility.set_control_mode_index(mode.index())?;
        self.control_mode.assume(mode);
        Ok(())
    }

    /// Brake: motors resist motion and the base is ready.
    pub fn turn_on(&self) -> Result<()> {
        self.enter_drive_mode(DriveMode::Brake)
    }

    /// Free wheel: motors are disengaged.
    pub fn turn_off(&self) -> Result<()> {
        self.enter_drive_mode(DriveMode::FreeWheel)
    }

    pub fn is_on(&self) -> Result<bool> {
        Ok(self.drive_mode()? != DriveMode::FreeWheel)
    }

    pub fn is_off(&self) -> Result<bool> {
        Ok(self.drive_mode()? == DriveMode::FreeWheel)
    }

    pub(crate) fn enter_drive_mode(&self, mode: DriveMode) -> Result<()> {
        debug!(%mode, "setting drive mode");
        self.utility.set_drive_mode_index(mode.index())?;
        self.drive_mode.assume(mode);
        Ok(())
    }

    /// Switches to `mode` unless the cache says the base is already in it.
    pub(crate) fn ensure_drive_mode(&self, mode: DriveMode) -> Result<()> {
        if self.drive_mode.get() == Some(mode) {
            return Ok(());
        }
        self.enter_drive_mode(mode)
    }

    /// Records a mode the base switched to on its own, such as `GoTo` after a
    /// goal was sent.
    pub(crate) fn assume_drive_mode(&self, mode: DriveMode) {
        self.drive_mode.assume(mode);
    }
}

impl fmt::Debug for ModeStateMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModeStateMachine")
            .field("drive_mode", &self.drive_mode.get())
            .field("control_mode", &self.control_mode.get())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DummyUtility;

    #[test]
    fn test_drive_mode_index() {
        for mode in DriveMode::ALL {
            assert_eq!(DriveMode::from_index(mode.index()), Some(mode));
        }
        assert_eq!(DriveMode::from_index(0), None);
        assert_eq!(DriveMode::from_index(7), None);
        assert_eq!(ControlMode::from_index(0), None);
        assert_eq!(ControlMode::from_index(2), Some(ControlMode::Pid));
    }

    #[test]
    fn test_parse_mode() {
        assert_eq!("cmd_vel".parse::<DriveMode>().unwrap(), DriveMode::CmdVel);
        assert_eq!("GOTO".parse::<DriveMode>().unwrap(), DriveMode::GoTo);
        assert_eq!(
            "open_loop".parse::<ControlMode>().unwrap(),
            ControlMode::OpenLoop
        );
        assert!(matches!(
            "none_zuuu_mode".parse::<DriveMode>(),
            Err(Error::InvalidMode { .. })
        ));
        assert!(matches!(
            "velocity".parse::<ControlMode>(),
            Err(Error::InvalidMode { .. })
        ));
    }

    #[test]
    fn test_serde_names_match_display() {
        for mode in DriveMode::ALL {
            let s = toml::to_string(&std::collections::BTreeMap::from([("m", mode)])).unwrap();
            assert_eq!(s.trim(), format!("m = \"{mode}\""));
        }
    }

    #[test]
    fn test_getters_refresh_cache() {
        let utility = Arc::new(DummyUtility::new());
        let modes = ModeStateMachine::new(utility.clone());
        assert_eq!(modes.cached_drive_mode(), None);

        utility.set_drive_mode(DriveMode::FreeWheel);
        assert_eq!(modes.drive_mode().unwrap(), DriveMode::FreeWheel);
        assert_eq!(modes.cached_drive_mode(), Some(DriveMode::FreeWheel));
        assert!(modes.is_off().unwrap());

        // Changed behind our back: the cache is stale until the next read.
        utility.set_drive_mode(DriveMode::Brake);
        assert_eq!(modes.cached_drive_mode(), Some(DriveMode::FreeWheel));
        assert!(modes.is_on().unwrap());
        assert_eq!(modes.cached_drive_mode(), Some(DriveMode::Brake));
    }

    #[test]
    fn test_undecodable_index() {
        let utility = Arc::new(DummyUtility::new());
        let modes = ModeStateMachine::new(utility.clone());
        *utility.drive_mode_index.lock() = 0;
        assert!(matches!(
            modes.drive_mode(),
            Err(Error::RemoteCall {
                method: "GetDriveMode",
                ..
            })
        ));
        assert_eq!(modes.cached_drive_mode(), None);
    }

    #[test]
    fn test_set_drive_mode() {
        let utility = Arc::new(DummyUtility::new());
        let modes = ModeStateMachine::new(utility.clone());

        modes.turn_off().unwrap();
        assert_eq!(utility.drive_mode(), Some(DriveMode::FreeWheel));
        assert_eq!(modes.cached_drive_mode(), Some(DriveMode::FreeWheel));
        modes.turn_on().unwrap();
        assert_eq!(utility.drive_mode(), Some(DriveMode::Brake));

        modes.set_drive_mode(DriveMode::EmergencyStop).unwrap();
        assert_eq!(utility.drive_mode(), Some(DriveMode::EmergencyStop));
    }

    #[test]
    fn test_composite_modes_are_rejected() {
        let utility = Arc::new(DummyUtility::new());
        let modes = ModeStateMachine::new(utility.clone());
        let before = utility.drive_mode_requests.lock().len();
        for mode in [DriveMode::Speed, DriveMode::GoTo] {
            assert!(matches!(
                modes.set_drive_mode(mode),
                Err(Error::InvalidMode { .. })
            ));
        }
        assert_eq!(utility.drive_mode_requests.lock().len(), before);
    }

    #[test]
    fn test_set_control_mode() {
        let utility = Arc::new(DummyUtility::new());
        let modes = ModeStateMachine::new(utility.clone());
        modes.set_control_mode(ControlMode::OpenLoop).unwrap();
        assert_eq!(modes.cached_control_mode(), Some(ControlMode::OpenLoop));
        assert_eq!(*utility.control_mode_index.lock(), 1);
        assert_eq!(modes.control_mode().unwrap(), ControlMode::OpenLoop);
    }

    #[test]
    fn test_ensure_drive_mode_skips_when_cached() {
        let utility = Arc::new(DummyUtility::new());
        let modes = ModeStateMachine::new(utility.clone());
        modes.ensure_drive_mode(DriveMode::CmdVel).unwrap();
        modes.ensure_drive_mode(DriveMode::CmdVel).unwrap();
        assert_eq!(*utility.drive_mode_requests.lock(), vec![1]);
    }
}
