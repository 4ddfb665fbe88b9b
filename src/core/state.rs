//! State identities.
//!
//! A state identity is an opaque token naming one state inside one state
//! universe. Identities are compared and hashed, never ordered, and carry no
//! behavior of their own: behavior lives in the instance the registry binds
//! to the identity.

use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::hash::Hash;

/// Identity of a state within a single state universe.
///
/// Each universe (game flow, level flow, player, zombie, ...) defines its own
/// identity type, so identities of different universes can never be mixed up
/// at compile time. The [`state_ids!`](crate::state_ids) macro generates an
/// enum implementing this trait.
///
/// # Required Traits
///
/// - `Copy` + `Eq` + `Hash`: identities are registry keys
/// - `Debug`: identities show up in diagnostics
/// - `Serialize` + `Deserialize`: identities are recorded in [`StateHistory`](crate::core::StateHistory) dumps
///
/// # Example
///
/// ```rust
/// use statewright::core::StateId;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
/// enum PlayerState {
///     Idle,
///     Move,
/// }
///
/// impl StateId for PlayerState {
///     const UNIVERSE: &'static str = "player";
///
///     fn name(&self) -> &'static str {
///         match self {
///             Self::Idle => "Idle",
///             Self::Move => "Move",
///         }
///     }
/// }
///
/// assert_eq!(PlayerState::Move.name(), "Move");
/// assert_eq!(PlayerState::UNIVERSE, "player");
/// ```
pub trait StateId:
    Copy + Eq + Hash + Debug + Serialize + for<'de> Deserialize<'de> + Send + Sync + 'static
{
    /// Name of the universe this identity belongs to, used in diagnostics.
    const UNIVERSE: &'static str;

    /// Display name of the state.
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
    enum LevelState {
        Start,
        Loop,
        Completed,
        Failed,
    }

    impl StateId for LevelState {
        const UNIVERSE: &'static str = "level";

        fn name(&self) -> &'static str {
            match self {
                Self::Start => "Start",
                Self::Loop => "Loop",
                Self::Completed => "Completed",
                Self::Failed => "Failed",
            }
        }
    }

    #[test]
    fn name_returns_variant_name() {
        assert_eq!(LevelState::Start.name(), "Start");
        assert_eq!(LevelState::Loop.name(), "Loop");
        assert_eq!(LevelState::Completed.name(), "Completed");
        assert_eq!(LevelState::Failed.name(), "Failed");
    }

    #[test]
    fn universe_is_shared_by_all_identities() {
        assert_eq!(LevelState::UNIVERSE, "level");
    }

    #[test]
    fn identities_are_usable_as_keys() {
        let set: HashSet<LevelState> = [LevelState::Start, LevelState::Loop, LevelState::Start]
            .into_iter()
            .collect();
        assert_eq!(set.len(), 2);
        assert!(set.contains(&LevelState::Loop));
        assert!(!set.contains(&LevelState::Failed));
    }

    #[test]
    fn identity_serializes_correctly() {
        let json = serde_json::to_string(&LevelState::Completed).unwrap();
        let deserialized: LevelState = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, LevelState::Completed);
    }
}
