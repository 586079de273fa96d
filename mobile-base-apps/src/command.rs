use std::{path::PathBuf, time::Duration};

use clap::Subcommand;
use mobile_base::{ControlMode, DriveMode, GoalPose, MobileBase, Tolerance};
use tracing::info;

use crate::Error;

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum MobileBaseCommand {
    /// Print model, battery, odometry, modes and safety settings.
    Status,
    /// Reset the odometry origin to the current pose.
    ResetOdometry,
    /// Send one velocity command (m/s, m/s, deg/s).
    #[command(allow_negative_numbers = true)]
    SetSpeed {
        x_vel: f64,
        y_vel: f64,
        rot_vel: f64,
        /// Have the base hold the velocity for this long (Speed mode).
        #[arg(long)]
        duration_sec: Option<f64>,
    },
    /// Drive to a pose relative to the odometry origin (m, m, deg) and wait.
    #[command(allow_negative_numbers = true)]
    Goto {
        x: f64,
        y: f64,
        theta: f64,
        /// Defaults to a timeout derived from the configured speed.
        #[arg(long)]
        timeout_sec: Option<f64>,
        #[arg(long)]
        delta_x: Option<f64>,
        #[arg(long)]
        delta_y: Option<f64>,
        /// Angular tolerance in degrees.
        #[arg(long)]
        delta_theta: Option<f64>,
        #[arg(long)]
        distance: Option<f64>,
    },
    /// Brake the wheels.
    TurnOn,
    /// Release the wheels (free wheel).
    TurnOff,
    /// Stop the base and cancel any goal.
    EmergencyShutdown,
    /// Print the drive mode, or set it if given.
    DriveMode { mode: Option<DriveMode> },
    /// Print the control mode, or set it if given.
    ControlMode { mode: Option<ControlMode> },
    /// Print the lidar safety settings, or change them.
    Safety {
        #[arg(long)]
        slowdown_distance: Option<f64>,
        #[arg(long)]
        critical_distance: Option<f64>,
        #[arg(long)]
        enabled: Option<bool>,
        /// Restore the default distances before applying other changes.
        #[arg(long)]
        reset: bool,
    },
    /// Print the obstacle detection status.
    ObstacleStatus,
    /// Save the lidar map image.
    Map { output: PathBuf },
}

#[derive(Debug, Default)]
pub struct MobileBaseCommandExecutor {}

impl MobileBaseCommandExecutor {
    /// Runs `command` to completion. Blocks on `goto`.
    pub fn execute(&self, base: &MobileBase, command: &MobileBaseCommand) -> Result<(), Error> {
        match command {
            MobileBaseCommand::Status => {
                println!("model_version: {}", base.model_version()?);
                println!("battery_voltage: {} V", base.battery_voltage()?);
                let odometry = base.odometry()?;
                println!(
                    "odometry: x={} m, y={} m, theta={} deg",
                    odometry.x, odometry.y, odometry.theta
                );
                println!("drive_mode: {}", base.drive_mode()?);
                println!("control_mode: {}", base.control_mode()?);
                print_safety(base)?;
                println!(
                    "obstacle_detection_status: {}",
                    base.safety().obstacle_detection_status()?
                );
            }
            MobileBaseCommand::ResetOdometry => base.reset_odometry()?,
            MobileBaseCommand::SetSpeed {
                x_vel,
                y_vel,
                rot_vel,
                duration_sec: None,
            } => base.set_speed(*x_vel, *y_vel, *rot_vel)?,
            MobileBaseCommand::SetSpeed {
                x_vel,
                y_vel,
                rot_vel,
                duration_sec: Some(sec),
            } => {
                let duration = Duration::try_from_secs_f64(*sec)
                    .map_err(|e| Error::InvalidArgument(format!("duration_sec={sec} ({e})")))?;
                base.set_speed_for(*x_vel, *y_vel, *rot_vel, duration)?;
            }
            MobileBaseCommand::Goto {
                x,
                y,
                theta,
                timeout_sec,
                delta_x,
                delta_y,
                delta_theta,
                distance,
            } => {
                let timeout = timeout_sec
                    .map(|sec| {
                        Duration::try_from_secs_f64(sec).map_err(|e| {
                            Error::InvalidArgument(format!("timeout_sec={sec} ({e})"))
                        })
                    })
                    .transpose()?;
                let mut tolerance = Tolerance::default();
                if delta_x.is_some() {
                    tolerance.delta_x = *delta_x;
                }
                if delta_y.is_some() {
                    tolerance.delta_y = *delta_y;
                }
                if delta_theta.is_some() {
                    tolerance.delta_theta = *delta_theta;
                }
                if distance.is_some() {
                    tolerance.distance = *distance;
                }
                let outcome = base.goto(GoalPose::new(*x, *y, *theta), timeout, Some(tolerance))?;
                info!(%outcome, "goal session ended");
                println!("{outcome}");
            }
            MobileBaseCommand::TurnOn => base.turn_on()?,
            MobileBaseCommand::TurnOff => base.turn_off()?,
            MobileBaseCommand::EmergencyShutdown => base.emergency_shutdown()?,
            MobileBaseCommand::DriveMode { mode } => match mode {
                Some(mode) => base.set_drive_mode(*mode)?,
                None => println!("{}", base.drive_mode()?),
            },
            MobileBaseCommand::ControlMode { mode } => match mode {
                Some(mode) => base.set_control_mode(*mode)?,
                None => println!("{}", base.control_mode()?),
            },
            MobileBaseCommand::Safety {
                slowdown_distance,
                critical_distance,
                enabled,
                reset,
            } => {
                let safety = base.safety();
                if *reset {
                    safety.reset_to_defaults()?;
                }
                if let Some(distance) = slowdown_distance {
                    safety.set_slowdown_distance(*distance)?;
                }
                if let Some(distance) = critical_distance {
                    safety.set_critical_distance(*distance)?;
                }
                if let Some(enabled) = enabled {
                    safety.set_safety_enabled(*enabled)?;
                }
                print_safety(base)?;
            }
            MobileBaseCommand::ObstacleStatus => {
                println!("{}", base.safety().obstacle_detection_status()?);
            }
            MobileBaseCommand::Map { output } => {
                let map = base.lidar_map()?;
                std::fs::write(output, &map)
                    .map_err(|e| Error::WriteFailure(output.clone(), e))?;
                info!(bytes = map.len(), ?output, "saved lidar map");
            }
        }
        Ok(())
    }
}

fn print_safety(base: &MobileBase) -> Result<(), Error> {
    let config = base.safety().config()?;
    println!(
        "safety: enabled={}, slowdown_distance={} m, critical_distance={} m",
        config.enabled, config.slowdown_distance, config.critical_distance
    );
    Ok(())
}
