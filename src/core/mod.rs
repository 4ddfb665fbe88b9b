//! Core vocabulary shared by every state universe.
//!
//! This module contains:
//! - State identities via the `StateId` trait
//! - The state contract: `BaseState`, `State`, `PayloadedState`
//! - Bounded transition history for diagnostics

mod contract;
mod history;
mod state;

pub use contract::{BaseState, EntryPath, EntryShape, ExitError, PayloadType, PayloadedState, State};
pub use history::{StateHistory, StateTransition};
pub use state::StateId;
