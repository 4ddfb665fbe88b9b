//! Errors surfaced by transition requests.

use crate::background::ScheduleError;
use crate::core::EntryPath;
use std::panic::Location;
use thiserror::Error;

/// Errors that can occur when requesting a transition.
///
/// Registration, shape and payload errors are configuration defects: they are
/// detected before the current state is touched, leave the cursor unchanged,
/// and carry the universe, the attempted state and the requesting call site.
#[derive(Debug, Error)]
pub enum TransitionError {
    #[error("state '{state}' is not registered in universe '{universe}' (requested at {caller})")]
    NotRegistered {
        universe: &'static str,
        state: &'static str,
        caller: &'static Location<'static>,
    },

    #[error("state '{state}' in universe '{universe}' cannot be entered {path} (requested at {caller})")]
    ShapeMismatch {
        universe: &'static str,
        state: &'static str,
        path: EntryPath,
        caller: &'static Location<'static>,
    },

    #[error(
        "state '{state}' in universe '{universe}' expects a payload of type {expected}, got {found} (requested at {caller})"
    )]
    PayloadTypeMismatch {
        universe: &'static str,
        state: &'static str,
        expected: &'static str,
        found: &'static str,
        caller: &'static Location<'static>,
    },

    #[error("state machine for universe '{universe}' has no registry installed (requested at {caller})")]
    NotInstalled {
        universe: &'static str,
        caller: &'static Location<'static>,
    },

    #[error(
        "transition to '{state}' in universe '{universe}' exceeds the nesting limit of {limit} (requested at {caller})"
    )]
    DepthExceeded {
        universe: &'static str,
        state: &'static str,
        limit: usize,
        caller: &'static Location<'static>,
    },

    #[error("state machine for universe '{universe}' has been dropped")]
    MachineDropped { universe: &'static str },

    #[error(transparent)]
    Schedule(#[from] ScheduleError),
}

impl TransitionError {
    /// Universe the failed request targeted, if the error concerns one.
    pub fn universe(&self) -> Option<&'static str> {
        match self {
            Self::NotRegistered { universe, .. }
            | Self::ShapeMismatch { universe, .. }
            | Self::PayloadTypeMismatch { universe, .. }
            | Self::NotInstalled { universe, .. }
            | Self::DepthExceeded { universe, .. }
            | Self::MachineDropped { universe } => Some(*universe),
            Self::Schedule(_) => None,
        }
    }

    /// Call site that requested the failed transition.
    pub fn caller(&self) -> Option<&'static Location<'static>> {
        match self {
            Self::NotRegistered { caller, .. }
            | Self::ShapeMismatch { caller, .. }
            | Self::PayloadTypeMismatch { caller, .. }
            | Self::NotInstalled { caller, .. }
            | Self::DepthExceeded { caller, .. } => Some(*caller),
            Self::MachineDropped { .. } | Self::Schedule(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_mismatch_names_universe_state_and_caller() {
        let caller = Location::caller();
        let err = TransitionError::ShapeMismatch {
            universe: "player",
            state: "Move",
            path: EntryPath::Bare,
            caller,
        };

        let message = err.to_string();
        assert!(message.contains("'Move'"));
        assert!(message.contains("'player'"));
        assert!(message.contains("without a payload"));
        assert!(message.contains(caller.file()));
        assert_eq!(err.universe(), Some("player"));
        assert_eq!(err.caller(), Some(caller));
    }

    #[test]
    fn schedule_errors_convert() {
        let err: TransitionError = ScheduleError::ZeroInterval.into();
        assert!(matches!(err, TransitionError::Schedule(_)));
        assert!(err.universe().is_none());
        assert!(err.caller().is_none());
    }
}
