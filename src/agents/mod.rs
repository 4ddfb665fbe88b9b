//! Navigation states shared by every agent-driven universe.
//!
//! Players, zombies, soldiers and collectors all idle, walk to a point, and
//! chase a moving target the same way. These states only talk to the
//! navigation layer through [`NavAgent`] and read targets through [`Tracked`];
//! both are implemented by the host game.

mod follow;
mod idle;
mod move_to;

pub use follow::{FollowPreferences, FollowState};
pub use idle::IdleState;
pub use move_to::MoveState;

use serde::{Deserialize, Serialize};

/// A point in world space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Position {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn distance(&self, other: Position) -> f32 {
        let (dx, dy, dz) = (self.x - other.x, self.y - other.y, self.z - other.z);
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

/// Navigation agent moving an entity across the level.
pub trait NavAgent {
    fn set_destination(&self, destination: Position);

    fn set_stopped(&self, stopped: bool);

    /// Whether the agent still exists and is enabled. Agents of dead entities
    /// are disabled and must not be commanded.
    fn is_active(&self) -> bool {
        true
    }
}

/// Anything whose position can be followed.
pub trait Tracked {
    fn position(&self) -> Position;
}

#[cfg(test)]
pub(crate) mod testing {
    use super::{NavAgent, Position, Tracked};
    use std::cell::{Cell, RefCell};

    #[derive(Clone, Debug, PartialEq)]
    pub(crate) enum Command {
        Destination(Position),
        Stopped(bool),
    }

    pub(crate) struct MockAgent {
        pub(crate) commands: RefCell<Vec<Command>>,
        pub(crate) active: Cell<bool>,
    }

    impl Default for MockAgent {
        fn default() -> Self {
            Self {
                commands: RefCell::default(),
                active: Cell::new(true),
            }
        }
    }

    impl MockAgent {
        pub(crate) fn take(&self) -> Vec<Command> {
            self.commands.take()
        }
    }

    impl NavAgent for MockAgent {
        fn set_destination(&self, destination: Position) {
            self.commands
                .borrow_mut()
                .push(Command::Destination(destination));
        }

        fn set_stopped(&self, stopped: bool) {
            self.commands.borrow_mut().push(Command::Stopped(stopped));
        }

        fn is_active(&self) -> bool {
            self.active.get()
        }
    }

    #[derive(Default)]
    pub(crate) struct MovingTarget {
        pub(crate) at: Cell<Position>,
    }

    impl Tracked for MovingTarget {
        fn position(&self) -> Position {
            self.at.get()
        }
    }
}
