//! Statewright: registry-backed state machines for game controllers
//!
//! Every controller in a game (the game flow, a level, each zombie, the player)
//! owns a finite-state machine over its own *universe* of states. A universe is
//! a closed enum of identities; each identity is bound, once, to a lazy
//! resolver that constructs the state instance on first use and caches it.
//!
//! # Core Concepts
//!
//! - **States**: Enter/exit lifecycle via [`State`], [`PayloadedState`] and [`BaseState`]
//! - **Registry**: Immutable identity-to-instance table built per universe
//! - **Engine**: Exit, resolve, cursor update, enter; nested requests complete synchronously
//! - **Background**: Cancellable periodic work owned by a state, driven by a cooperative [`Scheduler`]
//!
//! # Example
//!
//! ```rust
//! use statewright::core::{BaseState, State};
//! use statewright::engine::{StateMachine, TransitionError};
//! use statewright::registry::RegistryBuilder;
//! use statewright::state_ids;
//!
//! state_ids! {
//!     pub enum GameState {
//!         Bootstrap,
//!         LoadData,
//!         GameLoop,
//!     }
//!     universe: "game"
//! }
//!
//! struct Step;
//!
//! impl BaseState for Step {}
//!
//! impl State for Step {
//!     fn enter(&self) -> Result<(), TransitionError> {
//!         Ok(())
//!     }
//! }
//!
//! let registry = RegistryBuilder::new()
//!     .state(GameState::Bootstrap, || Step)
//!     .state(GameState::LoadData, || Step)
//!     .state(GameState::GameLoop, || Step)
//!     .build()
//!     .unwrap();
//! let machine = StateMachine::from_registry(registry);
//!
//! machine.enter(GameState::Bootstrap).unwrap();
//! machine.enter(GameState::GameLoop).unwrap();
//!
//! assert_eq!(
//!     machine.history().get_path(),
//!     vec![GameState::Bootstrap, GameState::GameLoop]
//! );
//! ```

pub mod agents;
pub mod background;
pub mod core;
pub mod engine;
pub mod registry;

// Re-export commonly used types
pub use background::{BackgroundTask, Scheduler, TaskHandle};
pub use self::core::{BaseState, ExitError, PayloadedState, State, StateHistory, StateId, StateTransition};
pub use engine::{MachineConfig, MachineHandle, StateMachine, TransitionError};
pub use registry::{BuildError, RegistryBuilder, StateRegistry};
