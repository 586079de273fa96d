use std::{fmt, sync::Arc, time::Duration};

use tracing::{debug, info, warn};

use crate::{
    config::MobileBaseConfig,
    error::{Error, Result},
    goal::{DistanceToGoal, GoalOutcome, GoalPose, GoalSession, Odometry, Tolerance},
    modes::{ControlMode, DriveMode, ModeStateMachine},
    pursuit::GoalPursuit,
    safety::SafetySnapshot,
    session::{block_on_worker, SessionSlot},
    traits::{Lidar, Mobility, PlanarVector, TimedSpeed, Utility},
    units::{deg_to_rad, round_to, validate_magnitude, VOLTAGE_DECIMALS},
};

/// Client of one remote mobile base.
///
/// At most one goal session runs at a time. Velocity and mode commands
/// issued while a goal is in flight are not serialized against it.
pub struct MobileBase {
    utility: Arc<dyn Utility>,
    mobility: Arc<dyn Mobility>,
    modes: ModeStateMachine,
    safety: SafetySnapshot,
    config: MobileBaseConfig,
    session: SessionSlot,
}

impl MobileBase {
    /// Connects the three services and reads the current modes and safety
    /// settings.
    pub fn new(
        utility: Arc<dyn Utility>,
        mobility: Arc<dyn Mobility>,
        lidar: Arc<dyn Lidar>,
        config: MobileBaseConfig,
    ) -> Result<Self> {
        config.validate()?;
        let modes = ModeStateMachine::new(utility.clone());
        let drive_mode = modes.drive_mode()?;
        let control_mode = modes.control_mode()?;
        let safety = SafetySnapshot::new(lidar)?;
        info!(%drive_mode, %control_mode, "mobile base ready");
        Ok(Self {
            utility,
            mobility,
            modes,
            safety,
            config,
            session: SessionSlot::default(),
        })
    }

    pub fn config(&self) -> &MobileBaseConfig {
        &self.config
    }

    pub fn modes(&self) -> &ModeStateMachine {
        &self.modes
    }

    pub fn safety(&self) -> &SafetySnapshot {
        &self.safety
    }

    pub fn model_version(&self) -> Result<String> {
        self.utility.model_version()
    }

    /// Volts, rounded to one decimal.
    pub fn battery_voltage(&self) -> Result<f64> {
        Ok(round_to(self.utility.battery_level()?, VOLTAGE_DECIMALS))
    }

    pub fn odometry(&self) -> Result<Odometry> {
        Ok(self.utility.odometry()?.into())
    }

    pub fn reset_odometry(&self) -> Result<()> {
        debug!("resetting odometry");
        self.utility.reset_odometry()
    }

    /// Compressed map image as sent by the base.
    pub fn lidar_map(&self) -> Result<Vec<u8>> {
        self.safety.map()
    }

    pub fn drive_mode(&self) -> Result<DriveMode> {
        self.modes.drive_mode()
    }

    pub fn set_drive_mode(&self, mode: DriveMode) -> Result<()> {
        self.modes.set_drive_mode(mode)
    }

    pub fn control_mode(&self) -> Result<ControlMode> {
        self.modes.control_mode()
    }

    pub fn set_control_mode(&self, mode: ControlMode) -> Result<()> {
        self.modes.set_control_mode(mode)
    }

    pub fn turn_on(&self) -> Result<()> {
        self.modes.turn_on()
    }

    pub fn turn_off(&self) -> Result<()> {
        self.modes.turn_off()
    }

    pub fn is_on(&self) -> Result<bool> {
        self.modes.is_on()
    }

    pub fn is_off(&self) -> Result<bool> {
        self.modes.is_off()
    }

    /// Sends one velocity command: m/s for `x_vel` and `y_vel`, deg/s for
    /// `rot_vel`.
    ///
    /// Switches the base to `CmdVel` first if it is not already there. The
    /// base applies the command for a short remotely configured duration, so
    /// continuous motion needs repeated calls.
    pub fn set_speed(&self, x_vel: f64, y_vel: f64, rot_vel: f64) -> Result<()> {
        validate_magnitude(x_vel, self.config.max_xy_vel, "x_vel")?;
        validate_magnitude(y_vel, self.config.max_xy_vel, "y_vel")?;
        validate_magnitude(rot_vel, self.config.max_rot_vel, "rot_vel")?;
        self.modes.ensure_drive_mode(DriveMode::CmdVel)?;
        debug!(x_vel, y_vel, rot_vel, "sending direction");
        self.mobility
            .send_direction(&PlanarVector::new(x_vel, y_vel, deg_to_rad(rot_vel)))
    }

    /// Sends a velocity command the base holds for `duration`, with the
    /// units and limits of [`MobileBase::set_speed`].
    ///
    /// The base switches itself to `Speed`, which is recorded in the cache.
    /// A zero `duration` is the same as [`MobileBase::set_speed`].
    pub fn set_speed_for(
        &self,
        x_vel: f64,
        y_vel: f64,
        rot_vel: f64,
        duration: Duration,
    ) -> Result<()> {
        if duration.is_zero() {
            return self.set_speed(x_vel, y_vel, rot_vel);
        }
        validate_magnitude(x_vel, self.config.max_xy_vel, "x_vel")?;
        validate_magnitude(y_vel, self.config.max_xy_vel, "y_vel")?;
        validate_magnitude(rot_vel, self.config.max_rot_vel, "rot_vel")?;
        debug!(x_vel, y_vel, rot_vel, ?duration, "sending timed speed");
        self.mobility.send_set_speed(&TimedSpeed {
            x_vel,
            y_vel,
            rot_vel: deg_to_rad(rot_vel),
            duration,
        })?;
        self.modes.assume_drive_mode(DriveMode::Speed);
        Ok(())
    }

    /// Drives to `goal` and blocks until the session ends.
    ///
    /// `timeout` defaults to [`MobileBaseConfig::default_goto_timeout`] and
    /// `tolerance` to [`Tolerance::default`]. The supervision loop runs on a
    /// dedicated thread; errors raised there are returned unchanged.
    pub fn goto(
        &self,
        goal: GoalPose,
        timeout: Option<Duration>,
        tolerance: Option<Tolerance>,
    ) -> Result<GoalOutcome> {
        let session = self.prepare_session(goal, timeout, tolerance)?;
        let guard = self.session.begin()?;
        self.ensure_on()?;
        let pursuit = self.pursuit();
        let cancel = guard.token().clone();
        block_on_worker(async move { pursuit.run(&session, &cancel).await })
    }

    /// Same as [`MobileBase::goto`], driven by the caller's runtime.
    ///
    /// Remote clients require that runtime to be multi-threaded.
    pub async fn goto_async(
        &self,
        goal: GoalPose,
        timeout: Option<Duration>,
        tolerance: Option<Tolerance>,
    ) -> Result<GoalOutcome> {
        let session = self.prepare_session(goal, timeout, tolerance)?;
        let guard = self.session.begin()?;
        self.ensure_on()?;
        self.pursuit().run(&session, guard.token()).await
    }

    pub fn distance_to_goal(&self) -> Result<DistanceToGoal> {
        Ok(self.mobility.distance_to_goal()?.into())
    }

    /// Switches the base to `EmergencyStop` and cancels the goal session in
    /// flight, if any. The session is canceled even if the mode change
    /// failed.
    ///
    /// A goal that is being sent is sent first and then overridden; a goal
    /// not yet sent is never sent.
    pub fn emergency_shutdown(&self) -> Result<()> {
        warn!("emergency shutdown");
        let (result, canceled) = self
            .session
            .preempt(|| self.modes.enter_drive_mode(DriveMode::EmergencyStop));
        if canceled {
            info!("canceled the goal session in flight");
        }
        result
    }

    /// Stops supervising the goal in flight. The base keeps its goal.
    ///
    /// Returns `false` if no goal session was running.
    pub fn cancel_goal(&self) -> bool {
        self.session.cancel()
    }

    pub fn is_goal_active(&self) -> bool {
        self.session.is_active()
    }

    fn prepare_session(
        &self,
        goal: GoalPose,
        timeout: Option<Duration>,
        tolerance: Option<Tolerance>,
    ) -> Result<GoalSession> {
        validate_magnitude(goal.x, self.config.max_xy_goto, "x")?;
        validate_magnitude(goal.y, self.config.max_xy_goto, "y")?;
        if !goal.theta.is_finite() {
            return Err(Error::NotFinite {
                name: "theta".to_owned(),
                value: goal.theta,
            });
        }
        let tolerance = tolerance.unwrap_or_default();
        tolerance.validate()?;
        Ok(GoalSession {
            goal,
            tolerance,
            timeout: timeout.unwrap_or_else(|| self.config.default_goto_timeout()),
        })
    }

    fn ensure_on(&self) -> Result<()> {
        if self.modes.is_off()? {
            return Err(Error::BaseOff);
        }
        Ok(())
    }

    fn pursuit(&self) -> GoalPursuit<'_> {
        GoalPursuit {
            mobility: &*self.mobility,
            modes: &self.modes,
            safety: &self.safety,
            slot: &self.session,
            poll_interval: self.config.goto_poll_interval(),
        }
    }
}

impl fmt::Display for MobileBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn or_unknown<T: fmt::Display>(value: Option<T>) -> String {
            value.map_or_else(|| "unknown".to_owned(), |v| v.to_string())
        }
        write!(
            f,
            "MobileBase(drive_mode={}, control_mode={})",
            or_unknown(self.modes.cached_drive_mode()),
            or_unknown(self.modes.cached_control_mode()),
        )
    }
}

impl fmt::Debug for MobileBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MobileBase")
            .field("modes", &self.modes)
            .field("safety", &self.safety)
            .field("config", &self.config)
            .field("goal_active", &self.session.is_active())
            .finish_non_exhaustive()
    }
}
