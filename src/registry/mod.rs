//! Per-universe state registries.
//!
//! A registry maps every identity of one universe to a lazy resolver. It is
//! built once, when the owning context is wired, and never changes afterward.
//! Instances are constructed on first use and cached for the lifetime of the
//! registry; exiting a state only deactivates it.

pub mod builder;
pub(crate) mod erased;
pub mod error;
pub mod macros;

pub use builder::RegistryBuilder;
pub use error::{BuildError, ConfigIssue};

use crate::core::{EntryShape, StateId};
use crate::engine::TransitionError;
use erased::ErasedState;
use std::cell::OnceCell;
use std::collections::HashMap;
use std::fmt;
use std::panic::Location;
use std::rc::Rc;

type Factory = Box<dyn Fn() -> Rc<dyn ErasedState>>;

/// Resolver bound to one identity.
pub(crate) struct Binding {
    shape: EntryShape,
    factory: Factory,
    instance: OnceCell<Rc<dyn ErasedState>>,
}

impl Binding {
    fn new(shape: EntryShape, factory: Factory) -> Self {
        Self {
            shape,
            factory,
            instance: OnceCell::new(),
        }
    }

    pub(crate) fn shape(&self) -> EntryShape {
        self.shape
    }

    /// The cached instance, constructing it on first call.
    pub(crate) fn resolve(&self) -> Rc<dyn ErasedState> {
        Rc::clone(self.instance.get_or_init(|| (self.factory)()))
    }

    fn is_constructed(&self) -> bool {
        self.instance.get().is_some()
    }
}

/// Immutable table of the states of one universe.
pub struct StateRegistry<I: StateId> {
    bindings: HashMap<I, Binding>,
}

impl<I: StateId> StateRegistry<I> {
    pub fn builder() -> RegistryBuilder<I> {
        RegistryBuilder::new()
    }

    fn from_bindings(bindings: HashMap<I, Binding>) -> Self {
        Self { bindings }
    }

    pub(crate) fn binding(&self, state: I) -> Option<&Binding> {
        self.bindings.get(&state)
    }

    /// Resolve the instance bound to `state`, constructing it on first use.
    ///
    /// An identity that was never registered is a wiring defect and fails
    /// with [`TransitionError::NotRegistered`].
    #[track_caller]
    pub fn resolve(&self, state: I) -> Result<StateInstance, TransitionError> {
        let caller = Location::caller();
        self.binding(state)
            .map(|binding| StateInstance(binding.resolve()))
            .ok_or(TransitionError::NotRegistered {
                universe: I::UNIVERSE,
                state: state.name(),
                caller,
            })
    }

    pub fn contains(&self, state: I) -> bool {
        self.bindings.contains_key(&state)
    }

    /// Entry shapes declared for `state`.
    pub fn shape(&self, state: I) -> Option<EntryShape> {
        self.binding(state).map(Binding::shape)
    }

    /// Whether the instance for `state` has been constructed yet.
    pub fn is_constructed(&self, state: I) -> bool {
        self.binding(state).is_some_and(Binding::is_constructed)
    }

    pub fn states(&self) -> impl Iterator<Item = I> + '_ {
        self.bindings.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl<I: StateId> fmt::Debug for StateRegistry<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateRegistry")
            .field("universe", &I::UNIVERSE)
            .field("states", &self.bindings.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Handle to a resolved state instance.
#[derive(Clone)]
pub struct StateInstance(Rc<dyn ErasedState>);

impl StateInstance {
    /// Whether both handles point at the same cached instance.
    pub fn ptr_eq(&self, other: &StateInstance) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for StateInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateInstance")
            .field("ptr", &Rc::as_ptr(&self.0).cast::<()>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{BaseState, State};
    use std::cell::Cell;

    crate::state_ids! {
        enum GameState {
            Bootstrap,
            LoadData,
            GameLoop,
        }
        universe: "game"
    }

    struct Counted;

    impl BaseState for Counted {}

    impl State for Counted {
        fn enter(&self) -> Result<(), TransitionError> {
            Ok(())
        }
    }

    #[test]
    fn resolve_constructs_lazily_and_caches() {
        let constructed = Rc::new(Cell::new(0));
        let counter = Rc::clone(&constructed);
        let registry = RegistryBuilder::new()
            .state(GameState::Bootstrap, move || {
                counter.set(counter.get() + 1);
                Counted
            })
            .state(GameState::LoadData, || Counted)
            .build()
            .unwrap();

        assert_eq!(constructed.get(), 0);
        assert!(!registry.is_constructed(GameState::Bootstrap));

        let first = registry.resolve(GameState::Bootstrap).unwrap();
        let second = registry.resolve(GameState::Bootstrap).unwrap();

        assert_eq!(constructed.get(), 1);
        assert!(first.ptr_eq(&second));
        assert!(registry.is_constructed(GameState::Bootstrap));
        assert!(!registry.is_constructed(GameState::LoadData));
    }

    #[test]
    fn resolve_unregistered_state_fails() {
        let registry = RegistryBuilder::new()
            .state(GameState::Bootstrap, || Counted)
            .build()
            .unwrap();

        let err = registry.resolve(GameState::GameLoop).unwrap_err();
        match err {
            TransitionError::NotRegistered {
                universe,
                state,
                caller,
            } => {
                assert_eq!(universe, "game");
                assert_eq!(state, "GameLoop");
                assert!(caller.file().ends_with("mod.rs"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn registry_reports_membership() {
        let registry = StateRegistry::builder()
            .state(GameState::Bootstrap, || Counted)
            .state(GameState::GameLoop, || Counted)
            .build()
            .unwrap();

        assert_eq!(registry.len(), 2);
        assert!(registry.contains(GameState::GameLoop));
        assert!(!registry.contains(GameState::LoadData));
        assert!(registry.shape(GameState::LoadData).is_none());

        let mut states: Vec<_> = registry.states().map(|s| s.name()).collect();
        states.sort_unstable();
        assert_eq!(states, vec!["Bootstrap", "GameLoop"]);
    }
}
