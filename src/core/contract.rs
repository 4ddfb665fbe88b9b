//! The contract every state implements.
//!
//! A state activates through one or both entry shapes and may declare an exit
//! hook:
//!
//! - [`State::enter`]: activation without data
//! - [`PayloadedState::enter_with`]: activation with a typed payload
//! - [`BaseState::exit`]: deactivation, defaulting to a no-op
//!
//! Hooks take `&self`. Instances are shared by the registry and a hook may
//! request a nested transition that exits the very state whose `enter` is
//! still on the stack, so state data lives behind `Cell`/`RefCell` and no
//! borrow may be held across a call into a machine.

use crate::engine::TransitionError;
use std::any::TypeId;
use std::fmt;
use thiserror::Error;

/// Failure reported by an exit hook.
///
/// Exit failures never abort a transition. The machine logs them, records them
/// in its history and carries on entering the next state.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct ExitError {
    message: String,
}

impl ExitError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Behavior shared by every state: the optional exit hook.
pub trait BaseState: 'static {
    /// Deactivation hook, called once before the next state is entered while
    /// the machine still reports this state as current.
    ///
    /// States that start background activity cancel it here. Default does
    /// nothing.
    fn exit(&self) -> Result<(), ExitError> {
        Ok(())
    }
}

/// A state entered without data.
///
/// # Example
///
/// ```rust
/// use statewright::core::{BaseState, State};
/// use statewright::engine::TransitionError;
/// use std::cell::Cell;
///
/// #[derive(Default)]
/// struct Idle {
///     entered: Cell<usize>,
/// }
///
/// impl BaseState for Idle {}
///
/// impl State for Idle {
///     fn enter(&self) -> Result<(), TransitionError> {
///         self.entered.set(self.entered.get() + 1);
///         Ok(())
///     }
/// }
/// ```
pub trait State: BaseState {
    /// Activation hook. Errors from nested transitions propagate to whoever
    /// requested this one.
    fn enter(&self) -> Result<(), TransitionError>;
}

/// A state entered with a value of its declared payload type.
///
/// The payload belongs to the entry call; anything the state needs later must
/// be copied out of it.
pub trait PayloadedState: BaseState {
    type Payload: 'static;

    fn enter_with(&self, payload: Self::Payload) -> Result<(), TransitionError>;
}

/// Runtime description of a payload type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PayloadType {
    id: TypeId,
    name: &'static str,
}

impl PayloadType {
    pub fn of<P: 'static>() -> Self {
        Self {
            id: TypeId::of::<P>(),
            name: std::any::type_name::<P>(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is<P: 'static>(&self) -> bool {
        self.id == TypeId::of::<P>()
    }
}

impl fmt::Display for PayloadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Entry shapes a registered state accepts.
///
/// Declared at registration time, so a request can be checked before the
/// outgoing state is disturbed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EntryShape {
    bare: bool,
    payload: Option<PayloadType>,
}

impl EntryShape {
    pub(crate) fn bare() -> Self {
        Self {
            bare: true,
            payload: None,
        }
    }

    pub(crate) fn payloaded<P: 'static>() -> Self {
        Self {
            bare: false,
            payload: Some(PayloadType::of::<P>()),
        }
    }

    pub(crate) fn both<P: 'static>() -> Self {
        Self {
            bare: true,
            payload: Some(PayloadType::of::<P>()),
        }
    }

    /// Whether the state can be entered without a payload.
    pub fn accepts_bare(&self) -> bool {
        self.bare
    }

    /// The payload type the state declares, if any.
    pub fn payload(&self) -> Option<PayloadType> {
        self.payload
    }
}

/// The entry path a transition request used.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryPath {
    Bare,
    Payload,
}

impl fmt::Display for EntryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bare => f.write_str("without a payload"),
            Self::Payload => f.write_str("with a payload"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Destination(u32);

    #[test]
    fn bare_shape_rejects_payloads() {
        let shape = EntryShape::bare();
        assert!(shape.accepts_bare());
        assert!(shape.payload().is_none());
    }

    #[test]
    fn payloaded_shape_records_payload_type() {
        let shape = EntryShape::payloaded::<Destination>();
        assert!(!shape.accepts_bare());

        let payload = shape.payload().unwrap();
        assert!(payload.is::<Destination>());
        assert!(!payload.is::<u32>());
        assert!(payload.name().ends_with("Destination"));
    }

    #[test]
    fn dual_shape_accepts_both_paths() {
        let shape = EntryShape::both::<String>();
        assert!(shape.accepts_bare());
        assert!(shape.payload().unwrap().is::<String>());
    }

    #[test]
    fn exit_error_keeps_message() {
        let err = ExitError::new("agent already destroyed");
        assert_eq!(err.message(), "agent already destroyed");
        assert_eq!(err.to_string(), "agent already destroyed");
    }

    #[test]
    fn default_exit_is_a_no_op() {
        struct Quiet;
        impl BaseState for Quiet {}

        assert_eq!(Quiet.exit(), Ok(()));
    }

    #[test]
    fn entry_path_describes_request() {
        assert_eq!(EntryPath::Bare.to_string(), "without a payload");
        assert_eq!(EntryPath::Payload.to_string(), "with a payload");
    }
}
