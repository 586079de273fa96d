use std::{sync::Arc, time::Duration};

use assert_approx_eq::assert_approx_eq;

use mobile_base::{
    ControlMode, DriveMode, DummyLidar, DummyMobility, DummyUtility, Error, MobileBase,
    MobileBaseConfig, PlanarVector,
};

fn new_base() -> (Arc<DummyUtility>, Arc<DummyMobility>, Arc<DummyLidar>, MobileBase) {
    let utility = Arc::new(DummyUtility::new());
    let mobility = Arc::new(DummyMobility::new());
    let lidar = Arc::new(DummyLidar::new());
    let base = MobileBase::new(
        utility.clone(),
        mobility.clone(),
        lidar.clone(),
        MobileBaseConfig::default(),
    )
    .unwrap();
    (utility, mobility, lidar, base)
}

#[test]
fn test_set_speed_switches_to_cmd_vel() {
    let (utility, mobility, _, base) = new_base();
    assert_eq!(base.modes().cached_drive_mode(), Some(DriveMode::Brake));
    base.set_speed(0.2, -0.1, 90.0).unwrap();
    assert_eq!(base.modes().cached_drive_mode(), Some(DriveMode::CmdVel));
    assert_eq!(utility.drive_mode(), Some(DriveMode::CmdVel));

    let directions = mobility.directions.lock();
    assert_eq!(directions.len(), 1);
    assert_approx_eq!(directions[0].x, 0.2);
    assert_approx_eq!(directions[0].y, -0.1);
    assert_approx_eq!(directions[0].theta, std::f64::consts::FRAC_PI_2);
}

#[test]
fn test_set_speed_for_duration() {
    let (utility, mobility, _, base) = new_base();
    base.set_speed_for(0.3, 0.0, -45.0, Duration::from_millis(1500))
        .unwrap();
    assert_eq!(base.modes().cached_drive_mode(), Some(DriveMode::Speed));
    // The base switches to `Speed` by itself.
    assert!(utility.drive_mode_requests.lock().is_empty());
    assert!(mobility.directions.lock().is_empty());
    {
        let speeds = mobility.timed_speeds.lock();
        assert_eq!(speeds.len(), 1);
        assert_approx_eq!(speeds[0].x_vel, 0.3);
        assert_approx_eq!(speeds[0].rot_vel, -std::f64::consts::FRAC_PI_4);
        assert_eq!(speeds[0].duration, Duration::from_millis(1500));
    }

    match base.set_speed_for(0.0, 0.0, 200.0, Duration::from_secs(1)) {
        Err(Error::OutOfRange { name, .. }) => assert_eq!(name, "rot_vel"),
        r => panic!("unexpected result {r:?}"),
    }
    assert_eq!(mobility.timed_speeds.lock().len(), 1);

    // Without a duration this is a plain velocity command.
    base.set_speed_for(0.1, 0.0, 0.0, Duration::ZERO).unwrap();
    assert_eq!(mobility.timed_speeds.lock().len(), 1);
    assert_eq!(mobility.directions.lock().len(), 1);
    assert_eq!(base.modes().cached_drive_mode(), Some(DriveMode::CmdVel));
}

#[test]
fn test_set_speed_repeated() {
    let (utility, mobility, _, base) = new_base();
    for _ in 0..3 {
        base.set_speed(0.1, 0.0, 0.0).unwrap();
    }
    assert_eq!(*utility.drive_mode_requests.lock(), vec![1]);
    assert_eq!(mobility.directions.lock().len(), 3);
}

#[test]
fn test_set_speed_limits() {
    let (utility, mobility, _, base) = new_base();
    base.set_speed(0.61, -0.61, -114.0).unwrap();
    assert_eq!(mobility.directions.lock().len(), 1);
    utility.drive_mode_requests.lock().clear();
    mobility.directions.lock().clear();

    for (x, y, rot) in [
        (0.611, 0.0, 0.0),
        (0.0, -0.62, 0.0),
        (0.0, 0.0, 114.01),
        (f64::NAN, 0.0, 0.0),
    ] {
        assert!(matches!(
            base.set_speed(x, y, rot),
            Err(Error::OutOfRange { .. })
        ));
    }
    assert!(mobility.directions.lock().is_empty());
    assert!(utility.drive_mode_requests.lock().is_empty());
}

#[test]
fn test_out_of_range_names_field() {
    let (_, _, _, base) = new_base();
    match base.set_speed(0.0, 0.0, 200.0).unwrap_err() {
        Error::OutOfRange { name, limit, .. } => {
            assert_eq!(name, "rot_vel");
            assert_approx_eq!(limit, 114.0);
        }
        e => panic!("unexpected error {e:?}"),
    }
}

#[test]
fn test_modes() {
    let (utility, _, _, base) = new_base();
    assert!(base.is_on().unwrap());
    base.turn_off().unwrap();
    assert!(base.is_off().unwrap());
    assert!(matches!(
        base.set_drive_mode(DriveMode::GoTo),
        Err(Error::InvalidMode { .. })
    ));
    assert!(matches!(
        base.set_drive_mode(DriveMode::Speed),
        Err(Error::InvalidMode { .. })
    ));
    assert_eq!(utility.drive_mode(), Some(DriveMode::FreeWheel));

    assert_eq!(base.control_mode().unwrap(), ControlMode::Pid);
    base.set_control_mode(ControlMode::OpenLoop).unwrap();
    assert_eq!(base.control_mode().unwrap(), ControlMode::OpenLoop);
}

#[test]
fn test_display() {
    let (_, _, _, base) = new_base();
    assert_eq!(
        base.to_string(),
        "MobileBase(drive_mode=brake, control_mode=pid)"
    );
    base.set_speed(0.0, 0.0, 0.0).unwrap();
    assert_eq!(
        base.to_string(),
        "MobileBase(drive_mode=cmd_vel, control_mode=pid)"
    );
}

#[test]
fn test_read_accessors() {
    let (utility, _, lidar, base) = new_base();
    *utility.battery_level.lock() = 24.96;
    assert_approx_eq!(base.battery_voltage().unwrap(), 25.0);
    assert_eq!(base.model_version().unwrap(), "dummy-1.0");

    *utility.odometry.lock() = PlanarVector::new(0.123_456, -1.0, -std::f64::consts::FRAC_PI_4);
    let odometry = base.odometry().unwrap();
    assert_approx_eq!(odometry.x, 0.123);
    assert_approx_eq!(odometry.y, -1.0);
    assert_approx_eq!(odometry.theta, -45.0);
    base.reset_odometry().unwrap();
    assert_approx_eq!(base.odometry().unwrap().x, 0.0);

    *lidar.map.lock() = vec![0x89, b'P', b'N', b'G'];
    assert_eq!(base.lidar_map().unwrap(), vec![0x89, b'P', b'N', b'G']);
}

#[test]
fn test_safety_read_modify_write() {
    let (_, _, lidar, base) = new_base();
    let safety = base.safety();
    safety.set_critical_distance(0.3).unwrap();
    safety.set_slowdown_distance(0.9).unwrap();
    assert_approx_eq!(safety.critical_distance().unwrap(), 0.3);
    assert_approx_eq!(safety.slowdown_distance().unwrap(), 0.9);
    assert!(safety.safety_enabled().unwrap());
    for request in lidar.set_safety_requests.lock().iter() {
        assert!(request.enabled);
    }
}

#[test]
fn test_invalid_config() {
    for config in [
        MobileBaseConfig {
            goto_poll_interval_sec: 0.0,
            ..Default::default()
        },
        // Finite, but the derived goal timeout does not fit in a duration.
        MobileBaseConfig {
            max_xy_goto: 1e300,
            ..Default::default()
        },
        MobileBaseConfig {
            goto_poll_interval_sec: 1e300,
            ..Default::default()
        },
    ] {
        let result = MobileBase::new(
            Arc::new(DummyUtility::new()),
            Arc::new(DummyMobility::new()),
            Arc::new(DummyLidar::new()),
            config,
        );
        assert!(
            matches!(result, Err(Error::InvalidConfig(_))),
            "{config:?} was accepted"
        );
    }
}

#[test]
fn test_new_fails_on_undecodable_mode() {
    let utility = Arc::new(DummyUtility::new());
    *utility.drive_mode_index.lock() = 0;
    let result = MobileBase::new(
        utility,
        Arc::new(DummyMobility::new()),
        Arc::new(DummyLidar::new()),
        MobileBaseConfig::default(),
    );
    assert!(matches!(result, Err(Error::RemoteCall { .. })));
}
