use std::{fmt, time::Duration};

use nalgebra::{Isometry2, Vector2};
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    traits::{GoalDelta, PlanarVector},
    units::{deg_to_rad, rad_to_deg, round_length},
};

/// Target pose in the odometry frame: meters and degrees.
#[derive(Clone, Debug, Default, Copy, PartialEq, Serialize, Deserialize)]
pub struct GoalPose {
    pub x: f64,
    pub y: f64,
    pub theta: f64,
}

impl GoalPose {
    pub fn new(x: f64, y: f64, theta: f64) -> Self {
        Self { x, y, theta }
    }

    pub(crate) fn to_wire(self) -> PlanarVector {
        PlanarVector::new(self.x, self.y, deg_to_rad(self.theta))
    }
}

impl From<Isometry2<f64>> for GoalPose {
    fn from(pose: Isometry2<f64>) -> Self {
        Self::new(
            pose.translation.x,
            pose.translation.y,
            rad_to_deg(pose.rotation.angle()),
        )
    }
}

/// Arrival thresholds. `delta_theta` is in degrees, the others in meters.
///
/// A field set to `None` is not checked.
#[derive(Clone, Debug, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tolerance {
    pub delta_x: Option<f64>,
    pub delta_y: Option<f64>,
    pub delta_theta: Option<f64>,
    pub distance: Option<f64>,
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            delta_x: Some(0.1),
            delta_y: Some(0.1),
            delta_theta: Some(15.0),
            distance: Some(0.1),
        }
    }
}

impl Tolerance {
    /// Tolerance that checks nothing: the first poll counts as arrived.
    pub fn none() -> Self {
        Self {
            delta_x: None,
            delta_y: None,
            delta_theta: None,
            distance: None,
        }
    }

    fn fields(&self) -> [(&'static str, Option<f64>); 4] {
        [
            ("delta_x", self.delta_x),
            ("delta_y", self.delta_y),
            ("delta_theta", self.delta_theta),
            ("distance", self.distance),
        ]
    }

    /// Fails with [`Error::InvalidTolerance`] on a negative or NaN field.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in self.fields() {
            if let Some(value) = value {
                if value.is_nan() || value < 0.0 {
                    return Err(Error::InvalidTolerance {
                        name: name.to_owned(),
                        value,
                    });
                }
            }
        }
        Ok(())
    }

    /// Name of the first field, in `delta_x`, `delta_y`, `delta_theta`,
    /// `distance` order, whose delta exceeds the tolerance.
    pub fn first_unmet(&self, distance: &DistanceToGoal) -> Option<&'static str> {
        self.fields()
            .into_iter()
            .zip(distance.values())
            .find_map(|((name, tolerance), delta)| match tolerance {
                Some(tolerance) if delta.abs() > tolerance => Some(name),
                _ => None,
            })
    }

    /// Comparisons are inclusive: a delta equal to its tolerance is reached.
    pub fn is_reached(&self, distance: &DistanceToGoal) -> bool {
        self.first_unmet(distance).is_none()
    }
}

/// Remaining distance to the goal, rounded, angle in degrees.
#[derive(Clone, Debug, Default, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistanceToGoal {
    pub delta_x: f64,
    pub delta_y: f64,
    pub delta_theta: f64,
    pub distance: f64,
}

impl DistanceToGoal {
    fn values(&self) -> [f64; 4] {
        [self.delta_x, self.delta_y, self.delta_theta, self.distance]
    }
}

impl From<GoalDelta> for DistanceToGoal {
    fn from(delta: GoalDelta) -> Self {
        Self {
            delta_x: round_length(delta.delta_x),
            delta_y: round_length(delta.delta_y),
            delta_theta: round_length(rad_to_deg(delta.delta_theta)),
            distance: round_length(delta.distance),
        }
    }
}

/// How a goal session ended.
#[derive(Clone, Debug, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalOutcome {
    Arrived,
    TimedOut,
    /// The remote safety layer stopped the base in front of an obstacle.
    ObstacleStopped,
    /// The session was canceled by `cancel_goal` or `emergency_shutdown`.
    ///
    /// An arrival observed before the cancel still ends as `Arrived`.
    Canceled,
}

impl GoalOutcome {
    pub fn is_arrived(self) -> bool {
        self == GoalOutcome::Arrived
    }
}

impl fmt::Display for GoalOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            GoalOutcome::Arrived => "arrived",
            GoalOutcome::TimedOut => "timed out",
            GoalOutcome::ObstacleStopped => "stopped by an obstacle",
            GoalOutcome::Canceled => "canceled",
        })
    }
}

/// Odometry rounded for display: meters and degrees.
#[derive(Clone, Debug, Default, Copy, PartialEq, Serialize, Deserialize)]
pub struct Odometry {
    pub x: f64,
    pub y: f64,
    pub theta: f64,
}

impl Odometry {
    pub fn to_isometry(&self) -> Isometry2<f64> {
        Isometry2::new(Vector2::new(self.x, self.y), deg_to_rad(self.theta))
    }
}

impl From<PlanarVector> for Odometry {
    fn from(odometry: PlanarVector) -> Self {
        Self {
            x: round_length(odometry.x),
            y: round_length(odometry.y),
            theta: round_length(rad_to_deg(odometry.theta)),
        }
    }
}

/// One in-flight `goto` call.
#[derive(Clone, Debug, Copy, PartialEq)]
pub struct GoalSession {
    pub goal: GoalPose,
    pub tolerance: Tolerance,
    pub timeout: Duration,
}

#[cfg(test)]
mod tests {
    use assert_approx_eq::assert_approx_eq;

    use super::*;

    fn distance(delta_x: f64, delta_y: f64, delta_theta: f64, distance: f64) -> DistanceToGoal {
        DistanceToGoal {
            delta_x,
            delta_y,
            delta_theta,
            distance,
        }
    }

    #[test]
    fn test_boundary_is_inclusive() {
        let tolerance = Tolerance::default();
        assert!(tolerance.is_reached(&distance(0.1, 0.1, 15.0, 0.1)));
        assert!(tolerance.is_reached(&distance(-0.1, -0.1, -15.0, 0.1)));
        assert!(tolerance.is_reached(&distance(0.0, 0.0, 0.0, 0.0)));
    }

    #[test]
    fn test_single_field_over() {
        let tolerance = Tolerance::default();
        let eps = 1e-9;
        assert_eq!(
            tolerance.first_unmet(&distance(0.1 + eps, 0.1, 15.0, 0.1)),
            Some("delta_x")
        );
        assert_eq!(
            tolerance.first_unmet(&distance(0.1, -0.1 - eps, 15.0, 0.1)),
            Some("delta_y")
        );
        assert_eq!(
            tolerance.first_unmet(&distance(0.1, 0.1, 15.0 + eps, 0.1)),
            Some("delta_theta")
        );
        assert_eq!(
            tolerance.first_unmet(&distance(0.1, 0.1, 15.0, 0.1 + eps)),
            Some("distance")
        );
        // Order: the first failing field is reported.
        assert_eq!(
            tolerance.first_unmet(&distance(1.0, 1.0, 90.0, 1.0)),
            Some("delta_x")
        );
    }

    #[test]
    fn test_unchecked_fields() {
        let tolerance = Tolerance {
            distance: Some(0.2),
            ..Tolerance::none()
        };
        assert!(tolerance.is_reached(&distance(5.0, 5.0, 180.0, 0.2)));
        assert!(!tolerance.is_reached(&distance(0.0, 0.0, 0.0, 0.21)));
        assert!(Tolerance::none().is_reached(&distance(9.0, 9.0, 9.0, 9.0)));
    }

    #[test]
    fn test_validate() {
        Tolerance::default().validate().unwrap();
        Tolerance::none().validate().unwrap();
        let err = Tolerance {
            delta_theta: Some(-1.0),
            ..Default::default()
        }
        .validate()
        .unwrap_err();
        assert!(matches!(err, Error::InvalidTolerance { name, .. } if name == "delta_theta"));
    }

    #[test]
    fn test_distance_from_delta() {
        let d = DistanceToGoal::from(GoalDelta {
            delta_x: 0.123_456,
            delta_y: -0.000_4,
            delta_theta: std::f64::consts::FRAC_PI_4,
            distance: 0.123_9,
        });
        assert_approx_eq!(d.delta_x, 0.123);
        assert_approx_eq!(d.delta_y, 0.0);
        assert_approx_eq!(d.delta_theta, 45.0);
        assert_approx_eq!(d.distance, 0.124);
    }

    #[test]
    fn test_goal_pose_conversions() {
        let goal = GoalPose::from(Isometry2::new(Vector2::new(0.5, -0.2), 0.5));
        assert_approx_eq!(goal.theta, 28.647_889_756_541_16);
        let wire = goal.to_wire();
        assert_approx_eq!(wire.theta, 0.5);
        assert_approx_eq!(wire.y, -0.2);

        let odometry = Odometry::from(PlanarVector::new(1.000_04, 2.0, std::f64::consts::PI));
        assert_approx_eq!(odometry.x, 1.0);
        assert_approx_eq!(odometry.theta, 180.0);
        assert_approx_eq!(odometry.to_isometry().rotation.angle().abs(), std::f64::consts::PI);
    }
}
