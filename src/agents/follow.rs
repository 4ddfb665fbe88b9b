use super::{NavAgent, Position, Tracked};
use crate::background::{BackgroundTask, Scheduler};
use crate::core::{BaseState, ExitError, PayloadedState};
use crate::engine::TransitionError;
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;
use tracing::trace;

/// Tuning for [`FollowState`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FollowPreferences {
    /// Distance the target must move before the agent is re-targeted.
    pub position_threshold: f32,
    /// Seconds between polls of the target position.
    pub update_interval: f32,
}

impl Default for FollowPreferences {
    fn default() -> Self {
        Self {
            position_threshold: 0.1,
            update_interval: 0.1,
        }
    }
}

impl FollowPreferences {
    /// Polling period. Negative or non-finite intervals map to zero, which the
    /// scheduler rejects.
    pub fn interval(&self) -> Duration {
        Duration::try_from_secs_f32(self.update_interval).unwrap_or(Duration::ZERO)
    }
}

/// Chases a moving target.
///
/// Entry heads for the target's current position and starts polling it on the
/// scheduler. The agent is re-targeted only when the target has drifted more
/// than `position_threshold` from the last destination. Exit stops the agent
/// and the polling.
pub struct FollowState<A> {
    agent: Rc<A>,
    scheduler: Scheduler,
    preferences: FollowPreferences,
    polling: BackgroundTask,
}

impl<A: NavAgent + 'static> FollowState<A> {
    pub fn new(agent: Rc<A>, scheduler: Scheduler, preferences: FollowPreferences) -> Self {
        Self {
            agent,
            scheduler,
            preferences,
            polling: BackgroundTask::new(),
        }
    }

    pub fn preferences(&self) -> &FollowPreferences {
        &self.preferences
    }

    /// Whether the target is currently being polled.
    pub fn is_tracking(&self) -> bool {
        self.polling.is_running()
    }
}

impl<A: NavAgent + 'static> BaseState for FollowState<A> {
    fn exit(&self) -> Result<(), ExitError> {
        if self.agent.is_active() {
            self.agent.set_stopped(true);
        }
        self.polling.cancel();
        Ok(())
    }
}

impl<A: NavAgent + 'static> PayloadedState for FollowState<A> {
    type Payload = Rc<dyn Tracked>;

    fn enter_with(&self, target: Rc<dyn Tracked>) -> Result<(), TransitionError> {
        let destination = target.position();
        let last_destination = Rc::new(Cell::new(destination));

        // A rejected interval must leave the agent untouched.
        let agent = Rc::clone(&self.agent);
        let last = Rc::clone(&last_destination);
        let threshold = self.preferences.position_threshold;
        self.polling.restart(|| {
            self.scheduler.every(self.preferences.interval(), move || {
                let position: Position = target.position();
                if position.distance(last.get()) > threshold {
                    trace!(x = position.x, y = position.y, z = position.z, "follow target moved");
                    agent.set_destination(position);
                    last.set(position);
                }
            })
        })?;

        self.agent.set_stopped(false);
        self.agent.set_destination(destination);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::testing::{Command, MockAgent, MovingTarget};
    use crate::background::ScheduleError;

    fn setup() -> (Rc<MockAgent>, Rc<MovingTarget>, Scheduler, FollowState<MockAgent>) {
        let agent = Rc::new(MockAgent::default());
        let target = Rc::new(MovingTarget::default());
        let scheduler = Scheduler::new();
        let state = FollowState::new(
            Rc::clone(&agent),
            scheduler.clone(),
            FollowPreferences::default(),
        );
        (agent, target, scheduler, state)
    }

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    #[test]
    fn preferences_default_from_empty_json() {
        let preferences: FollowPreferences = serde_json::from_str("{}").unwrap();
        assert_eq!(preferences, FollowPreferences::default());
        assert_eq!(preferences.interval(), Duration::from_secs_f32(0.1));
    }

    #[test]
    fn negative_interval_maps_to_zero() {
        let preferences = FollowPreferences {
            update_interval: -1.0,
            ..FollowPreferences::default()
        };
        assert_eq!(preferences.interval(), Duration::ZERO);
    }

    #[test]
    fn enter_heads_for_target_and_starts_polling() {
        let (agent, target, scheduler, state) = setup();
        target.at.set(Position::new(1.0, 0.0, 1.0));

        state.enter_with(target.clone()).unwrap();

        assert_eq!(
            agent.take(),
            vec![
                Command::Stopped(false),
                Command::Destination(Position::new(1.0, 0.0, 1.0))
            ]
        );
        assert!(state.is_tracking());
        assert_eq!(scheduler.pending(), 1);
    }

    #[test]
    fn small_target_moves_are_ignored() {
        let (agent, target, scheduler, state) = setup();
        state.enter_with(target.clone()).unwrap();
        agent.take();

        target.at.set(Position::new(0.05, 0.0, 0.0));
        scheduler.advance(ms(300)).unwrap();

        assert!(agent.take().is_empty());
    }

    #[test]
    fn target_drift_retargets_agent() {
        let (agent, target, scheduler, state) = setup();
        state.enter_with(target.clone()).unwrap();
        agent.take();

        target.at.set(Position::new(2.0, 0.0, 0.0));
        scheduler.advance(ms(300)).unwrap();

        // Only the first poll after the move re-targets.
        assert_eq!(
            agent.take(),
            vec![Command::Destination(Position::new(2.0, 0.0, 0.0))]
        );
    }

    #[test]
    fn exit_stops_agent_and_polling() {
        let (agent, target, scheduler, state) = setup();
        state.enter_with(target.clone()).unwrap();
        agent.take();

        state.exit().unwrap();
        target.at.set(Position::new(5.0, 0.0, 0.0));
        scheduler.advance(ms(500)).unwrap();

        assert_eq!(agent.take(), vec![Command::Stopped(true)]);
        assert!(!state.is_tracking());
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn reentry_replaces_previous_polling() {
        let (_agent, target, scheduler, state) = setup();
        let other = Rc::new(MovingTarget::default());

        state.enter_with(target.clone()).unwrap();
        state.enter_with(other).unwrap();

        assert_eq!(scheduler.pending(), 1);
    }

    #[test]
    fn zero_interval_fails_entry() {
        let agent = Rc::new(MockAgent::default());
        let scheduler = Scheduler::new();
        let state = FollowState::new(
            Rc::clone(&agent),
            scheduler.clone(),
            FollowPreferences {
                update_interval: 0.0,
                ..FollowPreferences::default()
            },
        );

        let err = state
            .enter_with(Rc::new(MovingTarget::default()))
            .unwrap_err();

        assert!(matches!(
            err,
            TransitionError::Schedule(ScheduleError::ZeroInterval)
        ));
        assert_eq!(scheduler.pending(), 0);
        assert!(agent.take().is_empty());
    }
}
