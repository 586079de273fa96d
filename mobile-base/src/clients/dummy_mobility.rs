use std::{
    collections::VecDeque,
    sync::atomic::{AtomicUsize, Ordering},
};

use parking_lot::Mutex;

use crate::{
    error::Error,
    traits::{GoalDelta, Mobility, PlanarVector, TimedSpeed},
};

/// Dummy Mobility for debug or tests.
///
/// `distance_to_goal` pops `scripted_distances` first and falls back to
/// `distance` once the script is exhausted.
#[derive(Debug, Default)]
pub struct DummyMobility {
    pub directions: Mutex<Vec<PlanarVector>>,
    pub timed_speeds: Mutex<Vec<TimedSpeed>>,
    pub goals: Mutex<Vec<PlanarVector>>,
    pub distance: Mutex<GoalDelta>,
    pub scripted_distances: Mutex<VecDeque<GoalDelta>>,
    /// When set, `distance_to_goal` fails with this message.
    pub distance_error: Mutex<Option<String>>,
    distance_polls: AtomicUsize,
}

impl DummyMobility {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_distance(&self, distance: GoalDelta) {
        *self.distance.lock() = distance;
    }

    pub fn push_distance(&self, distance: GoalDelta) {
        self.scripted_distances.lock().push_back(distance);
    }

    pub fn fail_distance(&self, message: impl Into<String>) {
        *self.distance_error.lock() = Some(message.into());
    }

    /// Number of `distance_to_goal` calls so far.
    pub fn distance_polls(&self) -> usize {
        self.distance_polls.load(Ordering::SeqCst)
    }

    pub fn last_goal(&self) -> Option<PlanarVector> {
        self.goals.lock().last().copied()
    }
}

impl Mobility for DummyMobility {
    fn send_direction(&self, direction: &PlanarVector) -> Result<(), Error> {
        self.directions.lock().push(*direction);
        Ok(())
    }

    fn send_set_speed(&self, speed: &TimedSpeed) -> Result<(), Error> {
        self.timed_speeds.lock().push(*speed);
        Ok(())
    }

    fn send_goto(&self, goal: &PlanarVector) -> Result<(), Error> {
        self.goals.lock().push(*goal);
        Ok(())
    }

    fn distance_to_goal(&self) -> Result<GoalDelta, Error> {
        self.distance_polls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = self.distance_error.lock().clone() {
            return Err(Error::RemoteCall {
                method: "GetDistanceToGoal",
                message,
            });
        }
        if let Some(distance) = self.scripted_distances.lock().pop_front() {
            return Ok(distance);
        }
        Ok(*self.distance.lock())
    }
}
