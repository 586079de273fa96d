#![doc = include_str!("../README.md")]

#[allow(dead_code, unreachable_pub, missing_debug_implementations, clippy::all)]
mod pb {
    include!("generated/mobile_base.rs");
}

use std::{future::Future, net::SocketAddr, sync::Arc, time::Duration};

use mobile_base::{
    Error, GoalDelta, MobileBase, MobileBaseConfig, PlanarVector, SafetyConfig, TimedSpeed,
};
use paste::paste;
use pb::{lidar_server, mobility_server, utility_server};
use tracing::debug;

macro_rules! remote_types {
    ($trait_name:ident {
        client: $client_name:ident,
        server: $server_name:ident $(,)?
    }) => {
        #[derive(Debug, Clone)]
        pub struct $client_name {
            client: paste!(pb::[<$trait_name:snake _client>]::[<$trait_name Client>]<tonic::transport::Channel>),
        }

        impl $client_name {
            /// Attempt to create a new sender by connecting to a given endpoint.
            pub async fn connect<D>(dst: D) -> Result<Self, Error>
            where
                D: TryInto<tonic::transport::Endpoint>,
                D::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
            {
                paste! {
                    let client = pb::[<$trait_name:snake _client>]::[<$trait_name Client>]::connect(dst)
                        .await
                        .map_err(connection_error)?;
                    Ok(Self { client })
                }
            }

            /// Create a new sender.
            pub fn new(channel: tonic::transport::Channel) -> Self {
                paste! {
                    Self {
                        client: pb::[<$trait_name:snake _client>]::[<$trait_name Client>]::new(channel),
                    }
                }
            }
        }

        #[derive(Debug)]
        pub struct $server_name<T> {
            inner: T,
        }

        impl<T> $server_name<T>
        where
            T: mobile_base::$trait_name + 'static,
        {
            /// Create a new receiver.
            pub fn new(inner: T) -> Self {
                Self { inner }
            }

            /// Convert this receiver into a tower service.
            pub fn into_service(self) -> paste!(pb::[<$trait_name:snake _server>]::[<$trait_name Server>]<Self>) {
                paste! {
                    pb::[<$trait_name:snake _server>]::[<$trait_name Server>]::new(self)
                }
            }

            pub async fn serve(self, addr: SocketAddr) -> Result<(), Error> {
                tonic::transport::Server::builder()
                    .add_service(self.into_service())
                    .serve(addr)
                    .await
                    .map_err(connection_error)?;
                Ok(())
            }
        }
    };
}

fn block_in_place<T>(f: impl Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(f))
}

fn connection_error(e: impl std::fmt::Display) -> Error {
    Error::Connection {
        message: e.to_string(),
    }
}

fn remote_error(method: &'static str) -> impl FnOnce(tonic::Status) -> Error {
    move |status| Error::RemoteCall {
        method,
        message: status.message().to_owned(),
    }
}

fn status_from(e: Error) -> tonic::Status {
    tonic::Status::unknown(e.to_string())
}

/// A wrapper field the peer left unset.
#[derive(Debug)]
struct MissingField(&'static str);

impl MissingField {
    fn into_error(self, method: &'static str) -> Error {
        Error::RemoteCall {
            method,
            message: format!("missing field `{}` in reply", self.0),
        }
    }

    fn into_status(self) -> tonic::Status {
        tonic::Status::invalid_argument(format!("missing field `{}`", self.0))
    }
}

fn required<T>(value: Option<T>, name: &'static str) -> Result<T, MissingField> {
    value.ok_or(MissingField(name))
}

/// Connects the three services of one base over a shared channel and
/// performs the initial mode and safety refresh.
///
/// Must be called from a multi-threaded tokio runtime.
pub async fn connect_mobile_base<D>(dst: D, config: MobileBaseConfig) -> Result<MobileBase, Error>
where
    D: TryInto<tonic::transport::Endpoint>,
    D::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let channel = tonic::transport::Endpoint::new(dst)
        .map_err(connection_error)?
        .connect()
        .await
        .map_err(connection_error)?;
    debug!("connected to the mobile base");
    MobileBase::new(
        Arc::new(RemoteUtilitySender::new(channel.clone())),
        Arc::new(RemoteMobilitySender::new(channel.clone())),
        Arc::new(RemoteLidarSender::new(channel)),
        config,
    )
}

/// Serves the three services of one base on `addr`.
pub async fn serve_mobile_base<U, M, L>(
    utility: U,
    mobility: M,
    lidar: L,
    addr: SocketAddr,
) -> Result<(), Error>
where
    U: mobile_base::Utility + 'static,
    M: mobile_base::Mobility + 'static,
    L: mobile_base::Lidar + 'static,
{
    tonic::transport::Server::builder()
        .add_service(RemoteUtilityReceiver::new(utility).into_service())
        .add_service(RemoteMobilityReceiver::new(mobility).into_service())
        .add_service(RemoteLidarReceiver::new(lidar).into_service())
        .serve(addr)
        .await
        .map_err(connection_error)?;
    Ok(())
}

// =============================================================================
// mobile_base::Utility

remote_types!(Utility {
    client: RemoteUtilitySender,
    server: RemoteUtilityReceiver,
});

impl mobile_base::Utility for RemoteUtilitySender {
    fn model_version(&self) -> Result<String, Error> {
        let mut client = self.client.clone();
        Ok(block_in_place(client.get_model_version(()))
            .map_err(remote_error("GetModelVersion"))?
            .into_inner())
    }

    fn battery_level(&self) -> Result<f64, Error> {
        let mut client = self.client.clone();
        Ok(block_in_place(client.get_battery_level(()))
            .map_err(remote_error("GetBatteryLevel"))?
            .into_inner()
            .into())
    }

    fn odometry(&self) -> Result<PlanarVector, Error> {
        let mut client = self.client.clone();
        let response = block_in_place(client.get_odometry(()))
            .map_err(remote_error("GetOdometry"))?
            .into_inner();
        planar_vector(response).map_err(|e| e.into_error("GetOdometry"))
    }

    fn reset_odometry(&self) -> Result<(), Error> {
        let mut client = self.client.clone();
        block_in_place(client.reset_odometry(())).map_err(remote_error("ResetOdometry"))?;
        Ok(())
    }

    fn drive_mode_index(&self) -> Result<i32, Error> {
        let mut client = self.client.clone();
        Ok(block_in_place(client.get_drive_mode(()))
            .map_err(remote_error("GetDriveMode"))?
            .into_inner()
            .mode)
    }

    fn set_drive_mode_index(&self, index: i32) -> Result<(), Error> {
        let mut client = self.client.clone();
        block_in_place(client.set_drive_mode(pb::DriveModeCommand { mode: index }))
            .map_err(remote_error("SetDriveMode"))?;
        Ok(())
    }

    fn control_mode_index(&self) -> Result<i32, Error> {
        let mut client = self.client.clone();
        Ok(block_in_place(client.get_control_mode(()))
            .map_err(remote_error("GetControlMode"))?
            .into_inner()
            .mode)
    }

    fn set_control_mode_index(&self, index: i32) -> Result<(), Error> {
        let mut client = self.client.clone();
        block_in_place(client.set_control_mode(pb::ControlModeCommand { mode: index }))
            .map_err(remote_error("SetControlMode"))?;
        Ok(())
    }
}

#[tonic::async_trait]
impl<C> utility_server::Utility for RemoteUtilityReceiver<C>
where
    C: mobile_base::Utility + 'static,
{
    async fn get_model_version(
        &self,
        _: tonic::Request<()>,
    ) -> Result<tonic::Response<String>, tonic::Status> {
        Ok(tonic::Response::new(
            mobile_base::Utility::model_version(&self.inner).map_err(status_from)?,
        ))
    }

    async fn get_battery_level(
        &self,
        _: tonic::Request<()>,
    ) -> Result<tonic::Response<f32>, tonic::Status> {
        let level = mobile_base::Utility::battery_level(&self.inner).map_err(status_from)?;
        Ok(tonic::Response::new(level as f32))
    }

    async fn get_odometry(
        &self,
        _: tonic::Request<()>,
    ) -> Result<tonic::Response<pb::PlanarVector>, tonic::Status> {
        let odometry = mobile_base::Utility::odometry(&self.inner).map_err(status_from)?;
        Ok(tonic::Response::new(odometry.into()))
    }

    async fn reset_odometry(
        &self,
        _: tonic::Request<()>,
    ) -> Result<tonic::Response<()>, tonic::Status> {
        mobile_base::Utility::reset_odometry(&self.inner).map_err(status_from)?;
        Ok(tonic::Response::new(()))
    }

    async fn get_drive_mode(
        &self,
        _: tonic::Request<()>,
    ) -> Result<tonic::Response<pb::DriveModeCommand>, tonic::Status> {
        let mode = mobile_base::Utility::drive_mode_index(&self.inner).map_err(status_from)?;
        Ok(tonic::Response::new(pb::DriveModeCommand { mode }))
    }

    async fn set_drive_mode(
        &self,
        request: tonic::Request<pb::DriveModeCommand>,
    ) -> Result<tonic::Response<()>, tonic::Status> {
        let request = request.into_inner();
        mobile_base::Utility::set_drive_mode_index(&self.inner, request.mode)
            .map_err(status_from)?;
        Ok(tonic::Response::new(()))
    }

    async fn get_control_mode(
        &self,
        _: tonic::Request<()>,
    ) -> Result<tonic::Response<pb::ControlModeCommand>, tonic::Status> {
        let mode = mobile_base::Utility::control_mode_index(&self.inner).map_err(status_from)?;
        Ok(tonic::Response::new(pb::ControlModeCommand { mode }))
    }

    async fn set_control_mode(
        &self,
        request: tonic::Request<pb::ControlModeCommand>,
    ) -> Result<tonic::Response<()>, tonic::Status> {
        let request = request.into_inner();
        mobile_base::Utility::set_control_mode_index(&self.inner, request.mode)
            .map_err(status_from)?;
        Ok(tonic::Response::new(()))
    }
}

// =============================================================================
// mobile_base::Mobility

remote_types!(Mobility {
    client: RemoteMobilitySender,
    server: RemoteMobilityReceiver,
});

impl mobile_base::Mobility for RemoteMobilitySender {
    fn send_direction(&self, direction: &PlanarVector) -> Result<(), Error> {
        let mut client = self.client.clone();
        block_in_place(client.send_direction(pb::PlanarVector::from(*direction)))
            .map_err(remote_error("SendDirection"))?;
        Ok(())
    }

    fn send_set_speed(&self, speed: &TimedSpeed) -> Result<(), Error> {
        let mut client = self.client.clone();
        block_in_place(client.send_set_speed(pb::SpeedCommand::from(*speed)))
            .map_err(remote_error("SendSetSpeed"))?;
        Ok(())
    }

    fn send_goto(&self, goal: &PlanarVector) -> Result<(), Error> {
        let mut client = self.client.clone();
        block_in_place(client.send_go_to(pb::PlanarVector::from(*goal)))
            .map_err(remote_error("SendGoTo"))?;
        Ok(())
    }

    fn distance_to_goal(&self) -> Result<GoalDelta, Error> {
        let mut client = self.client.clone();
        let response = block_in_place(client.get_distance_to_goal(()))
            .map_err(remote_error("GetDistanceToGoal"))?
            .into_inner();
        goal_delta(response).map_err(|e| e.into_error("GetDistanceToGoal"))
    }
}

#[tonic::async_trait]
impl<C> mobility_server::Mobility for RemoteMobilityReceiver<C>
where
    C: mobile_base::Mobility + 'static,
{
    async fn send_direction(
        &self,
        request: tonic::Request<pb::PlanarVector>,
    ) -> Result<tonic::Response<()>, tonic::Status> {
        let direction = planar_vector(request.into_inner()).map_err(MissingField::into_status)?;
        mobile_base::Mobility::send_direction(&self.inner, &direction).map_err(status_from)?;
        Ok(tonic::Response::new(()))
    }

    async fn send_set_speed(
        &self,
        request: tonic::Request<pb::SpeedCommand>,
    ) -> Result<tonic::Response<()>, tonic::Status> {
        let speed = timed_speed(request.into_inner())?;
        mobile_base::Mobility::send_set_speed(&self.inner, &speed).map_err(status_from)?;
        Ok(tonic::Response::new(()))
    }

    async fn send_go_to(
        &self,
        request: tonic::Request<pb::PlanarVector>,
    ) -> Result<tonic::Response<()>, tonic::Status> {
        let goal = planar_vector(request.into_inner()).map_err(MissingField::into_status)?;
        mobile_base::Mobility::send_goto(&self.inner, &goal).map_err(status_from)?;
        Ok(tonic::Response::new(()))
    }

    async fn get_distance_to_goal(
        &self,
        _: tonic::Request<()>,
    ) -> Result<tonic::Response<pb::DistanceToGoal>, tonic::Status> {
        let distance = mobile_base::Mobility::distance_to_goal(&self.inner).map_err(status_from)?;
        Ok(tonic::Response::new(distance.into()))
    }
}

// =============================================================================
// mobile_base::Lidar

remote_types!(Lidar {
    client: RemoteLidarSender,
    server: RemoteLidarReceiver,
});

impl mobile_base::Lidar for RemoteLidarSender {
    fn safety(&self) -> Result<SafetyConfig, Error> {
        let mut client = self.client.clone();
        let response = block_in_place(client.get_safety(()))
            .map_err(remote_error("GetSafety"))?
            .into_inner();
        safety_config(response).map_err(|e| e.into_error("GetSafety"))
    }

    fn set_safety(&self, config: &SafetyConfig) -> Result<(), Error> {
        let mut client = self.client.clone();
        block_in_place(client.set_safety(pb::SafetyConfig::from(*config)))
            .map_err(remote_error("SetSafety"))?;
        Ok(())
    }

    fn obstacle_detection_status_index(&self) -> Result<i32, Error> {
        let mut client = self.client.clone();
        Ok(block_in_place(client.get_obstacle_detection_status(()))
            .map_err(remote_error("GetObstacleDetectionStatus"))?
            .into_inner()
            .status)
    }

    fn map(&self) -> Result<Vec<u8>, Error> {
        let mut client = self.client.clone();
        Ok(block_in_place(client.get_map(()))
            .map_err(remote_error("GetMap"))?
            .into_inner()
            .data)
    }
}

#[tonic::async_trait]
impl<C> lidar_server::Lidar for RemoteLidarReceiver<C>
where
    C: mobile_base::Lidar + 'static,
{
    async fn get_safety(
        &self,
        _: tonic::Request<()>,
    ) -> Result<tonic::Response<pb::SafetyConfig>, tonic::Status> {
        let config = mobile_base::Lidar::safety(&self.inner).map_err(status_from)?;
        Ok(tonic::Response::new(config.into()))
    }

    async fn set_safety(
        &self,
        request: tonic::Request<pb::SafetyConfig>,
    ) -> Result<tonic::Response<()>, tonic::Status> {
        let config = safety_config(request.into_inner()).map_err(MissingField::into_status)?;
        mobile_base::Lidar::set_safety(&self.inner, &config).map_err(status_from)?;
        Ok(tonic::Response::new(()))
    }

    async fn get_obstacle_detection_status(
        &self,
        _: tonic::Request<()>,
    ) -> Result<tonic::Response<pb::ObstacleDetection>, tonic::Status> {
        let status = mobile_base::Lidar::obstacle_detection_status_index(&self.inner)
            .map_err(status_from)?;
        Ok(tonic::Response::new(pb::ObstacleDetection { status }))
    }

    async fn get_map(
        &self,
        _: tonic::Request<()>,
    ) -> Result<tonic::Response<pb::LidarMap>, tonic::Status> {
        let data = mobile_base::Lidar::map(&self.inner).map_err(status_from)?;
        Ok(tonic::Response::new(pb::LidarMap { data }))
    }
}

// =============================================================================
// Messages

impl From<PlanarVector> for pb::PlanarVector {
    fn from(val: PlanarVector) -> Self {
        Self {
            x: Some(val.x as f32),
            y: Some(val.y as f32),
            theta: Some(val.theta as f32),
        }
    }
}

fn planar_vector(val: pb::PlanarVector) -> Result<PlanarVector, MissingField> {
    Ok(PlanarVector {
        x: required(val.x, "x")?.into(),
        y: required(val.y, "y")?.into(),
        theta: required(val.theta, "theta")?.into(),
    })
}

impl From<TimedSpeed> for pb::SpeedCommand {
    fn from(val: TimedSpeed) -> Self {
        Self {
            duration: Some(val.duration.as_secs_f32()),
            x_vel: Some(val.x_vel as f32),
            y_vel: Some(val.y_vel as f32),
            rot_vel: Some(val.rot_vel as f32),
        }
    }
}

fn timed_speed(val: pb::SpeedCommand) -> Result<TimedSpeed, tonic::Status> {
    let secs = required(val.duration, "duration").map_err(MissingField::into_status)?;
    let duration = Duration::try_from_secs_f32(secs).map_err(|e| {
        tonic::Status::invalid_argument(format!("invalid duration {secs}: {e}"))
    })?;
    let field = |value, name| required(value, name).map_err(MissingField::into_status);
    Ok(TimedSpeed {
        x_vel: field(val.x_vel, "x_vel")?.into(),
        y_vel: field(val.y_vel, "y_vel")?.into(),
        rot_vel: field(val.rot_vel, "rot_vel")?.into(),
        duration,
    })
}

impl From<GoalDelta> for pb::DistanceToGoal {
    fn from(val: GoalDelta) -> Self {
        Self {
            delta_x: Some(val.delta_x as f32),
            delta_y: Some(val.delta_y as f32),
            delta_theta: Some(val.delta_theta as f32),
            distance: Some(val.distance as f32),
        }
    }
}

fn goal_delta(val: pb::DistanceToGoal) -> Result<GoalDelta, MissingField> {
    Ok(GoalDelta {
        delta_x: required(val.delta_x, "delta_x")?.into(),
        delta_y: required(val.delta_y, "delta_y")?.into(),
        delta_theta: required(val.delta_theta, "delta_theta")?.into(),
        distance: required(val.distance, "distance")?.into(),
    })
}

impl From<SafetyConfig> for pb::SafetyConfig {
    fn from(val: SafetyConfig) -> Self {
        Self {
            slowdown_distance: Some(val.slowdown_distance as f32),
            critical_distance: Some(val.critical_distance as f32),
            enabled: Some(val.enabled),
        }
    }
}

fn safety_config(val: pb::SafetyConfig) -> Result<SafetyConfig, MissingField> {
    Ok(SafetyConfig {
        slowdown_distance: required(val.slowdown_distance, "slowdown_distance")?.into(),
        critical_distance: required(val.critical_distance, "critical_distance")?.into(),
        enabled: required(val.enabled, "enabled")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field() {
        let err = planar_vector(pb::PlanarVector {
            x: Some(1.0),
            y: None,
            theta: Some(0.0),
        })
        .unwrap_err()
        .into_error("GetOdometry");
        match err {
            Error::RemoteCall { method, message } => {
                assert_eq!(method, "GetOdometry");
                assert!(message.contains("`y`"), "{message}");
            }
            e => panic!("unexpected error {e:?}"),
        }
    }

    #[test]
    fn test_timed_speed_rejects_bad_duration() {
        let command = pb::SpeedCommand {
            duration: Some(1.5),
            x_vel: Some(0.2),
            y_vel: Some(0.0),
            rot_vel: Some(-0.5),
        };
        let speed = timed_speed(command).unwrap();
        assert_eq!(speed.duration, Duration::from_millis(1500));
        assert!((speed.rot_vel + 0.5).abs() < 1e-6);

        for duration in [Some(-1.0), Some(f32::NAN), None] {
            let status = timed_speed(pb::SpeedCommand {
                duration,
                ..command
            })
            .unwrap_err();
            assert_eq!(status.code(), tonic::Code::InvalidArgument);
        }
        let status = timed_speed(pb::SpeedCommand {
            x_vel: None,
            ..command
        })
        .unwrap_err();
        assert!(status.message().contains("`x_vel`"), "{}", status.message());
    }

    #[test]
    fn test_drive_mode_indices_match_proto() {
        for mode in mobile_base::DriveMode::ALL {
            let pb_mode = pb::DriveMode::try_from(mode.index()).unwrap();
            assert!(pb_mode
                .as_str_name()
                .ends_with(&mode.as_str().to_uppercase()));
        }
        for mode in mobile_base::ControlMode::ALL {
            let pb_mode = pb::ControlMode::try_from(mode.index()).unwrap();
            assert!(pb_mode
                .as_str_name()
                .ends_with(&mode.as_str().to_uppercase()));
        }
        for index in 0..4 {
            let status = mobile_base::ObstacleDetectionStatus::from_index(index).unwrap();
            let pb_status = pb::ObstacleDetectionStatus::try_from(index).unwrap();
            assert!(pb_status
                .as_str_name()
                .ends_with(&status.to_string().to_uppercase()));
        }
    }
}
