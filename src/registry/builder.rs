//! Builder for state registries.

use crate::core::{EntryShape, PayloadedState, State, StateId};
use crate::registry::erased::{Bare, Dual, ErasedState, Payloaded};
use crate::registry::error::{BuildError, ConfigIssue};
use crate::registry::{Binding, StateRegistry};
use std::collections::HashSet;
use std::rc::Rc;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

/// Builder declaring every state of one universe.
///
/// The registration method chosen for an identity declares its entry shape:
/// [`state`](Self::state) for bare entry, [`payloaded`](Self::payloaded) for
/// payload entry, [`state_with_payload`](Self::state_with_payload) for both.
/// Factories run lazily, on the first resolve of their identity.
///
/// # Example
///
/// ```rust
/// use statewright::core::{BaseState, PayloadedState, State};
/// use statewright::engine::TransitionError;
/// use statewright::registry::RegistryBuilder;
/// use statewright::state_ids;
///
/// state_ids! {
///     pub enum CollectorState {
///         Idle,
///         Carry,
///     }
///     universe: "collector"
/// }
///
/// struct Idle;
/// impl BaseState for Idle {}
/// impl State for Idle {
///     fn enter(&self) -> Result<(), TransitionError> {
///         Ok(())
///     }
/// }
///
/// struct Carry;
/// impl BaseState for Carry {}
/// impl PayloadedState for Carry {
///     type Payload = u32;
///
///     fn enter_with(&self, _barrels: u32) -> Result<(), TransitionError> {
///         Ok(())
///     }
/// }
///
/// let registry = RegistryBuilder::new()
///     .state(CollectorState::Idle, || Idle)
///     .payloaded(CollectorState::Carry, || Carry)
///     .build()
///     .unwrap();
///
/// assert_eq!(registry.len(), 2);
/// assert!(!registry.is_constructed(CollectorState::Idle));
/// ```
pub struct RegistryBuilder<I: StateId> {
    entries: Vec<(I, Binding)>,
}

impl<I: StateId> RegistryBuilder<I> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Register a state entered without a payload.
    pub fn state<T, F>(self, state: I, factory: F) -> Self
    where
        T: State,
        F: Fn() -> T + 'static,
    {
        self.bind(state, EntryShape::bare(), move || {
            Rc::new(Bare(factory())) as Rc<dyn ErasedState>
        })
    }

    /// Register a state entered with a payload of `T::Payload`.
    pub fn payloaded<T, F>(self, state: I, factory: F) -> Self
    where
        T: PayloadedState,
        F: Fn() -> T + 'static,
    {
        self.bind(state, EntryShape::payloaded::<T::Payload>(), move || {
            Rc::new(Payloaded(factory())) as Rc<dyn ErasedState>
        })
    }

    /// Register a state accepting both entry shapes.
    pub fn state_with_payload<T, F>(self, state: I, factory: F) -> Self
    where
        T: State + PayloadedState,
        F: Fn() -> T + 'static,
    {
        self.bind(
            state,
            EntryShape::both::<<T as PayloadedState>::Payload>(),
            move || Rc::new(Dual(factory())) as Rc<dyn ErasedState>,
        )
    }

    fn bind<F>(mut self, state: I, shape: EntryShape, factory: F) -> Self
    where
        F: Fn() -> Rc<dyn ErasedState> + 'static,
    {
        self.entries.push((state, Binding::new(shape, Box::new(factory))));
        self
    }

    /// Validate the declaration and freeze it into a registry.
    ///
    /// Every problem is reported at once rather than stopping at the first.
    pub fn build(self) -> Result<StateRegistry<I>, BuildError> {
        let mut seen = HashSet::with_capacity(self.entries.len());
        let mut checks: Vec<Validation<(), NonEmptyVec<ConfigIssue>>> = Vec::new();

        if self.entries.is_empty() {
            checks.push(Validation::fail(ConfigIssue::Empty));
        }

        for (state, _) in &self.entries {
            let check = if seen.insert(*state) {
                Validation::success(())
            } else {
                Validation::fail(ConfigIssue::DuplicateState {
                    state: state.name(),
                })
            };
            checks.push(check);
        }

        match Validation::all_vec(checks) {
            Validation::Success(_) => Ok(StateRegistry::from_bindings(
                self.entries.into_iter().collect(),
            )),
            Validation::Failure(issues) => Err(BuildError::InvalidRegistry {
                universe: I::UNIVERSE,
                issues: issues.iter().cloned().collect(),
            }),
        }
    }
}

impl<I: StateId> Default for RegistryBuilder<I> {
    fn default() -> Self {
        Self::new()
    }
}
