//! Type-erased adapters between the typed state contract and the engine.

use crate::core::{BaseState, ExitError, PayloadedState, State};
use crate::engine::TransitionError;
use std::any::Any;

/// How a state is being activated.
pub(crate) enum Activation {
    Bare,
    Payload(Box<dyn Any>),
}

pub(crate) enum ActivationError {
    /// The instance does not accept this activation.
    Refused,
    /// The entry hook ran and reported an error.
    Failed(TransitionError),
}

/// Object-safe view of a registered state instance.
pub(crate) trait ErasedState {
    fn activate(&self, activation: Activation) -> Result<(), ActivationError>;

    fn deactivate(&self) -> Result<(), ExitError>;
}

pub(crate) struct Bare<T>(pub T);

impl<T: State> ErasedState for Bare<T> {
    fn activate(&self, activation: Activation) -> Result<(), ActivationError> {
        match activation {
            Activation::Bare => self.0.enter().map_err(ActivationError::Failed),
            Activation::Payload(_) => Err(ActivationError::Refused),
        }
    }

    fn deactivate(&self) -> Result<(), ExitError> {
        self.0.exit()
    }
}

pub(crate) struct Payloaded<T>(pub T);

impl<T: PayloadedState> ErasedState for Payloaded<T> {
    fn activate(&self, activation: Activation) -> Result<(), ActivationError> {
        match activation {
            Activation::Bare => Err(ActivationError::Refused),
            Activation::Payload(value) => enter_payload(&self.0, value),
        }
    }

    fn deactivate(&self) -> Result<(), ExitError> {
        self.0.exit()
    }
}

pub(crate) struct Dual<T>(pub T);

impl<T: State + PayloadedState> ErasedState for Dual<T> {
    fn activate(&self, activation: Activation) -> Result<(), ActivationError> {
        match activation {
            Activation::Bare => State::enter(&self.0).map_err(ActivationError::Failed),
            Activation::Payload(value) => enter_payload(&self.0, value),
        }
    }

    fn deactivate(&self) -> Result<(), ExitError> {
        BaseState::exit(&self.0)
    }
}

fn enter_payload<T: PayloadedState>(
    state: &T,
    value: Box<dyn Any>,
) -> Result<(), ActivationError> {
    let payload = value
        .downcast::<T::Payload>()
        .map_err(|_| ActivationError::Refused)?;
    state.enter_with(*payload).map_err(ActivationError::Failed)
}
