use super::NavAgent;
use crate::core::{BaseState, State};
use crate::engine::TransitionError;
use std::rc::Rc;

/// Halts the agent in place.
pub struct IdleState<A> {
    agent: Rc<A>,
}

impl<A: NavAgent + 'static> IdleState<A> {
    pub fn new(agent: Rc<A>) -> Self {
        Self { agent }
    }
}

impl<A: NavAgent + 'static> BaseState for IdleState<A> {}

impl<A: NavAgent + 'static> State for IdleState<A> {
    fn enter(&self) -> Result<(), TransitionError> {
        if self.agent.is_active() {
            self.agent.set_stopped(true);
        }
        Ok(())
    }
}
