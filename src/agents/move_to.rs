use super::{NavAgent, Position};
use crate::core::{BaseState, ExitError, PayloadedState};
use crate::engine::TransitionError;
use std::rc::Rc;

/// Walks the agent to the destination given on entry.
pub struct MoveState<A> {
    agent: Rc<A>,
}

impl<A: NavAgent + 'static> MoveState<A> {
    pub fn new(agent: Rc<A>) -> Self {
        Self { agent }
    }
}

impl<A: NavAgent + 'static> BaseState for MoveState<A> {
    fn exit(&self) -> Result<(), ExitError> {
        if self.agent.is_active() {
            self.agent.set_stopped(true);
        }
        Ok(())
    }
}

impl<A: NavAgent + 'static> PayloadedState for MoveState<A> {
    type Payload = Position;

    fn enter_with(&self, destination: Position) -> Result<(), TransitionError> {
        self.agent.set_stopped(false);
        self.agent.set_destination(destination);
        Ok(())
    }
}
