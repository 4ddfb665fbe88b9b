//! Configuration errors raised while building a registry.

use thiserror::Error;

/// A single wiring problem found in a registry declaration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigIssue {
    #[error("state '{state}' is registered more than once")]
    DuplicateState { state: &'static str },

    #[error("no states registered")]
    Empty,
}

/// Errors that can occur when building or installing a registry.
///
/// These are wiring defects, not runtime conditions: the owning universe
/// cannot run until the declaration is fixed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("invalid registry for universe '{universe}': {}", join_issues(.issues))]
    InvalidRegistry {
        universe: &'static str,
        issues: Vec<ConfigIssue>,
    },

    #[error("state machine for universe '{universe}' already has a registry installed")]
    AlreadyInstalled { universe: &'static str },
}

impl BuildError {
    /// Problems found in the declaration, empty for installation errors.
    pub fn issues(&self) -> &[ConfigIssue] {
        match self {
            Self::InvalidRegistry { issues, .. } => issues,
            Self::AlreadyInstalled { .. } => &[],
        }
    }
}

fn join_issues(issues: &[ConfigIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
