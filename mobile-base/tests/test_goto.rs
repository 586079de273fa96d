use std::{
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

use assert_approx_eq::assert_approx_eq;

use mobile_base::{
    DriveMode, DummyLidar, DummyMobility, DummyUtility, Error, GoalDelta, GoalOutcome, GoalPose,
    MobileBase, MobileBaseConfig, ObstacleDetectionStatus, PlanarVector, Tolerance, Utility,
};

struct Harness {
    utility: Arc<DummyUtility>,
    mobility: Arc<DummyMobility>,
    lidar: Arc<DummyLidar>,
    base: MobileBase,
}

fn harness(config: MobileBaseConfig) -> Harness {
    let utility = Arc::new(DummyUtility::new());
    let mobility = Arc::new(DummyMobility::new());
    let lidar = Arc::new(DummyLidar::new());
    let base = MobileBase::new(utility.clone(), mobility.clone(), lidar.clone(), config).unwrap();
    Harness {
        utility,
        mobility,
        lidar,
        base,
    }
}

fn fast() -> MobileBaseConfig {
    MobileBaseConfig {
        goto_poll_interval_sec: 0.01,
        ..Default::default()
    }
}

fn never_arrives() -> GoalDelta {
    GoalDelta {
        delta_x: 1.0,
        delta_y: 0.0,
        delta_theta: 0.0,
        distance: 1.0,
    }
}

fn wait_until(condition: impl Fn() -> bool) {
    let start = Instant::now();
    while !condition() {
        assert!(start.elapsed() < Duration::from_secs(5), "timed out");
        thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn test_timeout() {
    let h = harness(MobileBaseConfig::default());
    h.mobility.set_distance(never_arrives());
    let start = Instant::now();
    let outcome = h
        .base
        .goto(
            GoalPose::new(1.0, 0.0, 0.0),
            Some(Duration::from_secs_f64(0.05)),
            None,
        )
        .unwrap();
    let elapsed = start.elapsed().as_secs_f64();
    assert_eq!(outcome, GoalOutcome::TimedOut);
    assert!(elapsed >= 0.05, "{elapsed}");
    assert!(elapsed < 0.5, "{elapsed}");
    assert!((1..=2).contains(&h.mobility.distance_polls()));
    assert!(!h.base.is_goal_active());
}

#[test]
fn test_obstacle_stopped() {
    let h = harness(fast());
    h.mobility.set_distance(never_arrives());
    h.lidar
        .set_obstacle_detection_status(ObstacleDetectionStatus::ObjectDetectedStop);
    let outcome = h
        .base
        .goto(
            GoalPose::new(1.0, 0.0, 0.0),
            Some(Duration::from_millis(50)),
            None,
        )
        .unwrap();
    assert_eq!(outcome, GoalOutcome::ObstacleStopped);
}

#[test]
fn test_arrival_boundary() {
    let h = harness(fast());
    h.mobility.set_distance(GoalDelta {
        delta_x: 0.1,
        delta_y: -0.1,
        delta_theta: 15_f64.to_radians(),
        distance: 0.1,
    });
    let outcome = h
        .base
        .goto(GoalPose::new(0.5, 0.5, 45.0), None, None)
        .unwrap();
    assert_eq!(outcome, GoalOutcome::Arrived);
    assert_eq!(h.base.drive_mode().unwrap(), DriveMode::Brake);
}

#[test]
fn test_just_over_tolerance() {
    let h = harness(fast());
    h.mobility.set_distance(GoalDelta {
        delta_x: 0.1,
        delta_y: 0.1,
        delta_theta: 0.0,
        distance: 0.101,
    });
    let outcome = h
        .base
        .goto(
            GoalPose::new(0.5, 0.5, 0.0),
            Some(Duration::from_millis(50)),
            None,
        )
        .unwrap();
    assert_eq!(outcome, GoalOutcome::TimedOut);

    // Same distance, looser tolerance.
    let outcome = h
        .base
        .goto(
            GoalPose::new(0.5, 0.5, 0.0),
            Some(Duration::from_millis(50)),
            Some(Tolerance {
                distance: Some(0.2),
                ..Default::default()
            }),
        )
        .unwrap();
    assert_eq!(outcome, GoalOutcome::Arrived);
}

#[test]
fn test_goal_out_of_range() {
    let h = harness(fast());
    for goal in [GoalPose::new(1.5, 0.0, 0.0), GoalPose::new(0.0, -1.01, 0.0)] {
        assert!(matches!(
            h.base.goto(goal, None, None),
            Err(Error::OutOfRange { .. })
        ));
    }
    assert!(h.mobility.goals.lock().is_empty());
    assert!(!h.base.is_goal_active());
}

#[test]
fn test_goal_theta_not_finite() {
    let h = harness(fast());
    for theta in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
        match h.base.goto(GoalPose::new(0.5, 0.0, theta), None, None) {
            Err(Error::NotFinite { name, .. }) => assert_eq!(name, "theta"),
            r => panic!("unexpected result {r:?}"),
        }
    }
    assert!(h.mobility.goals.lock().is_empty());
    assert!(!h.base.is_goal_active());
}

#[test]
fn test_invalid_tolerance() {
    let h = harness(fast());
    let tolerance = Tolerance {
        delta_x: Some(-0.1),
        ..Default::default()
    };
    assert!(matches!(
        h.base
            .goto(GoalPose::new(0.5, 0.0, 0.0), None, Some(tolerance)),
        Err(Error::InvalidTolerance { .. })
    ));
    assert!(h.mobility.goals.lock().is_empty());
}

#[test]
fn test_base_off() {
    let h = harness(fast());
    h.base.turn_off().unwrap();
    assert!(matches!(
        h.base.goto(GoalPose::new(0.5, 0.0, 0.0), None, None),
        Err(Error::BaseOff)
    ));
    assert!(h.mobility.goals.lock().is_empty());
    // The slot was released.
    h.base.turn_on().unwrap();
    h.base
        .goto(GoalPose::new(0.5, 0.0, 0.0), None, None)
        .unwrap();
    assert_eq!(h.mobility.goals.lock().len(), 1);
}

#[test]
fn test_base_switched_off_remotely() {
    let h = harness(fast());
    // The cache still says Brake, the check must read the base.
    h.utility.set_drive_mode(DriveMode::FreeWheel);
    assert!(matches!(
        h.base.goto(GoalPose::new(0.5, 0.0, 0.0), None, None),
        Err(Error::BaseOff)
    ));
}

#[test]
fn test_worker_error_is_returned() {
    let h = harness(fast());
    h.mobility.fail_distance("connection reset");
    let err = h
        .base
        .goto(GoalPose::new(0.5, 0.0, 0.0), None, None)
        .unwrap_err();
    match err {
        Error::RemoteCall { method, message } => {
            assert_eq!(method, "GetDistanceToGoal");
            assert_eq!(message, "connection reset");
        }
        e => panic!("unexpected error {e:?}"),
    }
    assert!(!h.base.is_goal_active());
}

#[test]
fn test_session_in_progress() {
    let h = harness(fast());
    h.mobility.set_distance(never_arrives());
    thread::scope(|s| {
        let first = s.spawn(|| {
            h.base.goto(
                GoalPose::new(1.0, 0.0, 0.0),
                Some(Duration::from_secs(10)),
                None,
            )
        });
        wait_until(|| h.base.is_goal_active());
        assert!(matches!(
            h.base.goto(GoalPose::new(0.2, 0.0, 0.0), None, None),
            Err(Error::SessionInProgress)
        ));
        assert!(h.base.cancel_goal());
        assert_eq!(first.join().unwrap().unwrap(), GoalOutcome::Canceled);
    });
    assert!(!h.base.is_goal_active());
    assert!(!h.base.cancel_goal());
    assert_eq!(h.mobility.goals.lock().len(), 1);
}

#[test]
fn test_emergency_shutdown_cancels_goal() {
    let h = harness(fast());
    h.mobility.set_distance(never_arrives());
    thread::scope(|s| {
        let first = s.spawn(|| {
            h.base.goto(
                GoalPose::new(1.0, 0.0, 0.0),
                Some(Duration::from_secs(10)),
                None,
            )
        });
        wait_until(|| h.mobility.distance_polls() > 0);
        let start = Instant::now();
        h.base.emergency_shutdown().unwrap();
        assert_eq!(first.join().unwrap().unwrap(), GoalOutcome::Canceled);
        assert!(start.elapsed() < Duration::from_secs(1));
    });
    assert_eq!(h.utility.drive_mode(), Some(DriveMode::EmergencyStop));
    assert_eq!(
        h.base.modes().cached_drive_mode(),
        Some(DriveMode::EmergencyStop)
    );
}

/// Utility whose drive mode reads take a while, as over a slow link.
#[derive(Debug)]
struct SlowUtility {
    inner: Arc<DummyUtility>,
    delay: Duration,
}

impl Utility for SlowUtility {
    fn model_version(&self) -> Result<String, Error> {
        self.inner.model_version()
    }

    fn battery_level(&self) -> Result<f64, Error> {
        self.inner.battery_level()
    }

    fn odometry(&self) -> Result<PlanarVector, Error> {
        self.inner.odometry()
    }

    fn reset_odometry(&self) -> Result<(), Error> {
        self.inner.reset_odometry()
    }

    fn drive_mode_index(&self) -> Result<i32, Error> {
        thread::sleep(self.delay);
        self.inner.drive_mode_index()
    }

    fn set_drive_mode_index(&self, index: i32) -> Result<(), Error> {
        self.inner.set_drive_mode_index(index)
    }

    fn control_mode_index(&self) -> Result<i32, Error> {
        self.inner.control_mode_index()
    }

    fn set_control_mode_index(&self, index: i32) -> Result<(), Error> {
        self.inner.set_control_mode_index(index)
    }
}

#[test]
fn test_emergency_shutdown_before_goal_is_sent() {
    let utility = Arc::new(DummyUtility::new());
    let mobility = Arc::new(DummyMobility::new());
    mobility.set_distance(never_arrives());
    let base = MobileBase::new(
        Arc::new(SlowUtility {
            inner: utility.clone(),
            delay: Duration::from_millis(200),
        }),
        mobility.clone(),
        Arc::new(DummyLidar::new()),
        fast(),
    )
    .unwrap();
    thread::scope(|s| {
        let goal = s.spawn(|| {
            base.goto(
                GoalPose::new(1.0, 0.0, 0.0),
                Some(Duration::from_secs(10)),
                None,
            )
        });
        // The goal call is now reading the drive mode before sending.
        wait_until(|| base.is_goal_active());
        base.emergency_shutdown().unwrap();
        assert_eq!(goal.join().unwrap().unwrap(), GoalOutcome::Canceled);
    });
    assert!(mobility.goals.lock().is_empty());
    assert_eq!(mobility.distance_polls(), 0);
    assert_eq!(utility.drive_mode(), Some(DriveMode::EmergencyStop));
    assert_eq!(
        base.modes().cached_drive_mode(),
        Some(DriveMode::EmergencyStop)
    );
}

#[test]
fn test_emergency_shutdown_without_goal() {
    let h = harness(fast());
    h.base.emergency_shutdown().unwrap();
    assert_eq!(h.base.drive_mode().unwrap(), DriveMode::EmergencyStop);
    assert!(h.base.is_on().unwrap());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_goto_async() {
    let h = harness(fast());
    h.mobility.push_distance(never_arrives());
    let outcome = h
        .base
        .goto_async(GoalPose::new(-0.4, 0.3, -90.0), None, None)
        .await
        .unwrap();
    assert_eq!(outcome, GoalOutcome::Arrived);
    let goal = h.mobility.last_goal().unwrap();
    assert_approx_eq!(goal.x, -0.4);
    assert_approx_eq!(goal.theta, -std::f64::consts::FRAC_PI_2);
    assert_eq!(h.mobility.distance_polls(), 2);
}

#[test]
fn test_default_timeout() {
    let config = MobileBaseConfig {
        max_xy_goto: 0.01,
        assumed_max_speed: 0.5,
        goto_poll_interval_sec: 0.01,
        ..Default::default()
    };
    let h = harness(config);
    h.mobility.set_distance(never_arrives());
    // 2 * 0.01 / 0.5 = 0.04 s
    let outcome = h
        .base
        .goto(GoalPose::new(0.01, 0.0, 0.0), None, None)
        .unwrap();
    assert_eq!(outcome, GoalOutcome::TimedOut);
}
