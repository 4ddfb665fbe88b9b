//! Macros for declaring state universes.

/// Declare the identity enum of a state universe.
///
/// Generates the enum with the derives [`StateId`](crate::core::StateId)
/// requires, plus the trait implementation naming the universe.
///
/// # Example
///
/// ```
/// use statewright::core::StateId;
/// use statewright::state_ids;
///
/// state_ids! {
///     pub enum ZombieState {
///         Idle,
///         Move,
///         Attack,
///     }
///     universe: "zombie"
/// }
///
/// assert_eq!(ZombieState::Attack.name(), "Attack");
/// assert_eq!(ZombieState::UNIVERSE, "zombie");
/// ```
#[macro_export]
macro_rules! state_ids {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident
            ),* $(,)?
        }

        universe: $universe:literal
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, serde::Serialize, serde::Deserialize)]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $variant
            ),*
        }

        impl $crate::core::StateId for $name {
            const UNIVERSE: &'static str = $universe;

            fn name(&self) -> &'static str {
                match self {
                    $(Self::$variant => stringify!($variant)),*
                }
            }
        }
    };
}
