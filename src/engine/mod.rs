//! The state machine engine.
//!
//! A [`StateMachine`] holds the cursor of one state universe and executes
//! transitions against the universe's [`StateRegistry`](crate::registry::StateRegistry):
//! exit the current state, resolve the target, move the cursor, enter the
//! target. Everything runs on the caller's thread, to completion, with no
//! queuing; nested requests from inside hooks are plain nested calls.

mod config;
mod error;
mod machine;

pub use config::{ConfigError, MachineConfig};
pub use error::TransitionError;
pub use machine::{MachineHandle, StateMachine};
