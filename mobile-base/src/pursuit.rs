use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::{
    error::Result,
    goal::{DistanceToGoal, GoalOutcome, GoalSession},
    modes::{DriveMode, ModeStateMachine},
    safety::{ObstacleDetectionStatus, SafetySnapshot},
    session::{CancelToken, SessionSlot},
    traits::Mobility,
};

/// Closed-loop supervision of one goal.
///
/// Sends the goal once, then polls the remaining distance until the
/// tolerance is met, the timeout expires, or the session is canceled. The
/// remote goal is never canceled here: stopping the base is left to the
/// remote safety layer.
pub(crate) struct GoalPursuit<'a> {
    pub(crate) mobility: &'a dyn Mobility,
    pub(crate) modes: &'a ModeStateMachine,
    pub(crate) safety: &'a SafetySnapshot,
    pub(crate) slot: &'a SessionSlot,
    pub(crate) poll_interval: Duration,
}

impl GoalPursuit<'_> {
    pub(crate) async fn run(
        &self,
        session: &GoalSession,
        cancel: &CancelToken,
    ) -> Result<GoalOutcome> {
        let sent = self.slot.dispatch(cancel, || {
            self.mobility.send_goto(&session.goal.to_wire())?;
            self.modes.assume_drive_mode(DriveMode::GoTo);
            Ok(())
        })?;
        if sent.is_none() {
            warn!("goal session canceled before the goal was sent");
            return Ok(GoalOutcome::Canceled);
        }
        info!(
            x = session.goal.x,
            y = session.goal.y,
            theta = session.goal.theta,
            timeout_sec = session.timeout.as_secs_f64(),
            "goal sent"
        );

        let start = Instant::now();
        while start.elapsed() < session.timeout {
            let distance = DistanceToGoal::from(self.mobility.distance_to_goal()?);
            let unmet = session.tolerance.first_unmet(&distance);
            debug!(?distance, ?unmet, "distance to goal");

            let canceled = tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => false,
                _ = cancel.canceled() => true,
            };

            // An arrival already observed wins over a cancel during the delay.
            if unmet.is_none() {
                info!(elapsed_sec = start.elapsed().as_secs_f64(), "arrived at goal");
                return Ok(GoalOutcome::Arrived);
            }
            if canceled {
                warn!("goal session canceled");
                return Ok(GoalOutcome::Canceled);
            }
        }

        // Classified from the status at the time the loop gave up.
        if self.safety.obstacle_detection_status()? == ObstacleDetectionStatus::ObjectDetectedStop {
            warn!("goal not reached: the base was stopped by an obstacle");
            Ok(GoalOutcome::ObstacleStopped)
        } else {
            info!("goal not reached before the timeout");
            Ok(GoalOutcome::TimedOut)
        }
    }
}
