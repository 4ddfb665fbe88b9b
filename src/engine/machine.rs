//! State machine engine.

use crate::core::{EntryPath, EntryShape, PayloadType, StateHistory, StateId, StateTransition};
use crate::engine::config::MachineConfig;
use crate::engine::error::TransitionError;
use crate::registry::erased::{Activation, ActivationError, ErasedState};
use crate::registry::{BuildError, StateRegistry};
use chrono::Utc;
use std::cell::{Cell, OnceCell, RefCell};
use std::fmt;
use std::panic::Location;
use std::rc::{Rc, Weak};
use tracing::{debug, debug_span, warn};
use uuid::Uuid;

/// The active identity and the instance bound to it.
struct Cursor<I> {
    state: I,
    instance: Rc<dyn ErasedState>,
    /// Cleared as soon as the exit hook is about to run.
    active: bool,
}

pub(crate) struct MachineInner<I: StateId> {
    id: Uuid,
    config: MachineConfig,
    registry: OnceCell<StateRegistry<I>>,
    cursor: RefCell<Option<Cursor<I>>>,
    depth: Cell<usize>,
    history: RefCell<StateHistory<I>>,
}

/// Finite-state machine owning exactly one active state of universe `I`.
///
/// Transitions run synchronously: the outgoing state's exit hook, then
/// resolution of the target through the registry, then the cursor update,
/// then the target's entry hook. A hook may request further transitions on
/// any machine; nested requests complete before the outer call returns, and
/// at no point is more than one state of a machine entered but not exited.
///
/// `StateMachine` is a cheap handle; clones share the same machine. States
/// that need to drive their own machine capture a [`MachineHandle`] instead,
/// which does not keep the machine alive.
///
/// # Example
///
/// ```rust
/// use statewright::core::{BaseState, PayloadedState, State};
/// use statewright::engine::{StateMachine, TransitionError};
/// use statewright::registry::RegistryBuilder;
/// use statewright::state_ids;
///
/// state_ids! {
///     enum PlayerState {
///         Idle,
///         Move,
///     }
///     universe: "player"
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
/// struct Move;
/// impl BaseState for Move {}
/// impl PayloadedState for Move {
///     type Payload = (f32, f32);
///
///     fn enter_with(&self, _destination: (f32, f32)) -> Result<(), TransitionError> {
///         Ok(())
///     }
/// }
///
/// let registry = RegistryBuilder::new()
///     .state(PlayerState::Idle, || Idle)
///     .payloaded(PlayerState::Move, || Move)
///     .build()
///     .unwrap();
/// let machine = StateMachine::from_registry(registry);
///
/// machine.enter(PlayerState::Idle).unwrap();
/// machine.enter_with(PlayerState::Move, (3.0_f32, 4.0_f32)).unwrap();
/// assert_eq!(machine.current(), Some(PlayerState::Move));
///
/// assert!(machine.enter(PlayerState::Move).is_err());
/// assert_eq!(machine.current(), Some(PlayerState::Move));
/// ```
pub struct StateMachine<I: StateId> {
    inner: Rc<MachineInner<I>>,
}

impl<I: StateId> StateMachine<I> {
    /// Create a machine without a registry. Call [`install`](Self::install)
    /// before the first transition.
    pub fn new(config: MachineConfig) -> Self {
        let history = StateHistory::with_capacity(config.history_capacity);
        Self {
            inner: Rc::new(MachineInner {
                id: Uuid::new_v4(),
                config,
                registry: OnceCell::new(),
                cursor: RefCell::new(None),
                depth: Cell::new(0),
                history: RefCell::new(history),
            }),
        }
    }

    /// Create a machine with the default configuration over `registry`.
    pub fn from_registry(registry: StateRegistry<I>) -> Self {
        let machine = Self::new(MachineConfig::default());
        // A fresh machine has an empty registry slot.
        let _ = machine.inner.registry.set(registry);
        machine
    }

    /// Create a machine whose registry is wired with a handle to the machine
    /// itself, for states that request transitions on their own machine.
    pub fn build<F>(config: MachineConfig, wire: F) -> Result<Self, BuildError>
    where
        F: FnOnce(MachineHandle<I>) -> Result<StateRegistry<I>, BuildError>,
    {
        let machine = Self::new(config);
        let registry = wire(machine.handle())?;
        machine.install(registry)?;
        Ok(machine)
    }

    /// Install the registry. A machine accepts exactly one registry.
    pub fn install(&self, registry: StateRegistry<I>) -> Result<(), BuildError> {
        self.inner
            .registry
            .set(registry)
            .map_err(|_| BuildError::AlreadyInstalled {
                universe: I::UNIVERSE,
            })
    }

    /// Weak handle for injecting into states and collaborators.
    pub fn handle(&self) -> MachineHandle<I> {
        MachineHandle {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Transition to `state` through its no-payload entry.
    #[track_caller]
    pub fn enter(&self, state: I) -> Result<(), TransitionError> {
        self.inner.transition(state, None, Activation::Bare, Location::caller())
    }

    /// Transition to `state` through its payload entry.
    #[track_caller]
    pub fn enter_with<P: 'static>(&self, state: I, payload: P) -> Result<(), TransitionError> {
        self.inner.transition(
            state,
            Some(PayloadType::of::<P>()),
            Activation::Payload(Box::new(payload)),
            Location::caller(),
        )
    }

    /// Identity of the current state; `None` until the first transition.
    pub fn current(&self) -> Option<I> {
        self.inner.current()
    }

    pub fn is_in(&self, state: I) -> bool {
        self.current() == Some(state)
    }

    /// Whether the current state has been entered and not yet exited.
    pub fn is_active(&self) -> bool {
        self.inner.is_active()
    }

    /// Exit the current state without entering another one.
    ///
    /// The cursor keeps naming the exited state. Exit failures are logged.
    /// Fails with [`TransitionError::DepthExceeded`] when exit hooks keep
    /// entering states past the nesting limit; the last state entered is
    /// left active.
    #[track_caller]
    pub fn shutdown(&self) -> Result<(), TransitionError> {
        self.inner.vacate(Location::caller()).map(|_| ())
    }

    pub fn registry(&self) -> Option<&StateRegistry<I>> {
        self.inner.registry.get()
    }

    /// Snapshot of the transition history.
    pub fn history(&self) -> StateHistory<I> {
        self.inner.history.borrow().clone()
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    /// Configured label, falling back to the universe name.
    pub fn label(&self) -> &str {
        self.inner.label()
    }

    pub fn universe(&self) -> &'static str {
        I::UNIVERSE
    }

    pub fn config(&self) -> &MachineConfig {
        &self.inner.config
    }
}

impl<I: StateId> Clone for StateMachine<I> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<I: StateId> fmt::Debug for StateMachine<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateMachine")
            .field("universe", &I::UNIVERSE)
            .field("id", &self.inner.id)
            .field("label", &self.inner.label())
            .field("current", &self.current())
            .field("active", &self.is_active())
            .finish()
    }
}

/// Non-owning handle to a [`StateMachine`].
///
/// States capture handles to request transitions on their own or another
/// machine without creating a reference cycle through the registry.
pub struct MachineHandle<I: StateId> {
    inner: Weak<MachineInner<I>>,
}

impl<I: StateId> MachineHandle<I> {
    #[track_caller]
    pub fn enter(&self, state: I) -> Result<(), TransitionError> {
        let caller = Location::caller();
        self.upgrade()?
            .transition(state, None, Activation::Bare, caller)
    }

    #[track_caller]
    pub fn enter_with<P: 'static>(&self, state: I, payload: P) -> Result<(), TransitionError> {
        let caller = Location::caller();
        self.upgrade()?.transition(
            state,
            Some(PayloadType::of::<P>()),
            Activation::Payload(Box::new(payload)),
            caller,
        )
    }

    pub fn current(&self) -> Option<I> {
        self.inner.upgrade().and_then(|inner| inner.current())
    }

    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }

    /// Owning handle to the machine, if it is still alive.
    pub fn machine(&self) -> Option<StateMachine<I>> {
        self.inner.upgrade().map(|inner| StateMachine { inner })
    }

    fn upgrade(&self) -> Result<Rc<MachineInner<I>>, TransitionError> {
        self.inner.upgrade().ok_or(TransitionError::MachineDropped {
            universe: I::UNIVERSE,
        })
    }
}

impl<I: StateId> Clone for MachineHandle<I> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<I: StateId> fmt::Debug for MachineHandle<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MachineHandle")
            .field("universe", &I::UNIVERSE)
            .field("alive", &self.is_alive())
            .finish()
    }
}

/// Decrements the nesting depth when a transition returns.
struct DepthGuard<'a>(&'a Cell<usize>);

impl<'a> DepthGuard<'a> {
    fn enter(depth: &'a Cell<usize>) -> Self {
        depth.set(depth.get() + 1);
        Self(depth)
    }
}

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.0.set(self.0.get() - 1);
    }
}

impl<I: StateId> MachineInner<I> {
    fn label(&self) -> &str {
        self.config.label.as_deref().unwrap_or(I::UNIVERSE)
    }

    fn current(&self) -> Option<I> {
        self.cursor.borrow().as_ref().map(|cursor| cursor.state)
    }

    fn is_active(&self) -> bool {
        self.active_state().is_some()
    }

    fn transition(
        &self,
        target: I,
        payload: Option<PayloadType>,
        activation: Activation,
        caller: &'static Location<'static>,
    ) -> Result<(), TransitionError> {
        let universe = I::UNIVERSE;
        let registry = self
            .registry
            .get()
            .ok_or(TransitionError::NotInstalled { universe, caller })
            .map_err(|err| self.reject(err))?;
        let binding = registry
            .binding(target)
            .ok_or(TransitionError::NotRegistered {
                universe,
                state: target.name(),
                caller,
            })
            .map_err(|err| self.reject(err))?;
        check_shape(target, binding.shape(), payload, caller).map_err(|err| self.reject(err))?;

        let depth = self.depth.get();
        if depth >= self.config.max_nested_depth {
            return Err(self.reject(TransitionError::DepthExceeded {
                universe,
                state: target.name(),
                limit: self.config.max_nested_depth,
                caller,
            }));
        }
        let _nested = DepthGuard::enter(&self.depth);

        let span = debug_span!(
            "transition",
            universe,
            machine = %self.id,
            label = self.label(),
            to = target.name(),
            depth
        );
        let _entered = span.enter();

        let exit_error = self.vacate(caller)?;
        let instance = binding.resolve();

        let from = {
            let mut cursor = self.cursor.borrow_mut();
            let from = cursor.as_ref().map(|c| c.state);
            *cursor = Some(Cursor {
                state: target,
                instance: Rc::clone(&instance),
                active: true,
            });
            from
        };

        self.history.borrow_mut().record(StateTransition {
            from,
            to: target,
            timestamp: Utc::now(),
            payload: payload.map(|p| p.name().to_string()),
            depth,
            exit_error,
        });

        debug!(from = from.map(|s| s.name()), "entering state");
        instance.activate(activation).map_err(|err| match err {
            ActivationError::Failed(err) => err,
            ActivationError::Refused => TransitionError::ShapeMismatch {
                universe,
                state: target.name(),
                path: if payload.is_some() {
                    EntryPath::Payload
                } else {
                    EntryPath::Bare
                },
                caller,
            },
        })
    }

    /// Exit states until none is active.
    ///
    /// An exit hook may itself request a transition; the state it entered is
    /// exited on the next turn of the loop. At most `max_nested_depth` exits
    /// run per call; the state still active past that is left in place.
    /// Returns the first exit failure.
    fn vacate(&self, caller: &'static Location<'static>) -> Result<Option<String>, TransitionError> {
        let limit = self.config.max_nested_depth;
        let mut first_error = None;
        let mut exits = 0;
        while let Some(state) = self.active_state() {
            if exits >= limit {
                return Err(self.reject(TransitionError::DepthExceeded {
                    universe: I::UNIVERSE,
                    state: state.name(),
                    limit,
                    caller,
                }));
            }
            exits += 1;
            let Some((state, instance)) = self.deactivate_cursor() else {
                break;
            };
            debug!(state = state.name(), "exiting state");
            if let Err(err) = instance.deactivate() {
                warn!(
                    universe = I::UNIVERSE,
                    machine = %self.id,
                    state = state.name(),
                    error = %err,
                    "exit hook failed, continuing transition"
                );
                if first_error.is_none() {
                    first_error = Some(err.to_string());
                }
            }
        }
        Ok(first_error)
    }

    fn active_state(&self) -> Option<I> {
        self.cursor
            .borrow()
            .as_ref()
            .filter(|cursor| cursor.active)
            .map(|cursor| cursor.state)
    }

    fn deactivate_cursor(&self) -> Option<(I, Rc<dyn ErasedState>)> {
        let mut cursor = self.cursor.borrow_mut();
        let cursor = cursor.as_mut().filter(|c| c.active)?;
        cursor.active = false;
        Some((cursor.state, Rc::clone(&cursor.instance)))
    }

    fn reject(&self, err: TransitionError) -> TransitionError {
        warn!(
            universe = I::UNIVERSE,
            machine = %self.id,
            label = self.label(),
            error = %err,
            "transition rejected"
        );
        err
    }
}

impl<I: StateId> Drop for MachineInner<I> {
    fn drop(&mut self) {
        if self.is_active() {
            debug!(universe = I::UNIVERSE, machine = %self.id, "machine dropped, exiting current state");
            let _ = self.vacate(Location::caller());
        }
    }
}

fn check_shape<I: StateId>(
    target: I,
    shape: EntryShape,
    payload: Option<PayloadType>,
    caller: &'static Location<'static>,
) -> Result<(), TransitionError> {
    let universe = I::UNIVERSE;
    let state = target.name();
    match (payload, shape.payload()) {
        (None, _) if shape.accepts_bare() => Ok(()),
        (None, _) => Err(TransitionError::ShapeMismatch {
            universe,
            state,
            path: EntryPath::Bare,
            caller,
        }),
        (Some(found), Some(expected)) if found == expected => Ok(()),
        (Some(found), Some(expected)) => Err(TransitionError::PayloadTypeMismatch {
            universe,
            state,
            expected: expected.name(),
            found: found.name(),
            caller,
        }),
        (Some(_), None) => Err(TransitionError::ShapeMismatch {
            universe,
            state,
            path: EntryPath::Payload,
            caller,
        }),
    }
}
