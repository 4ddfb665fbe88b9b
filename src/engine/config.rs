//! Machine configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading a [`MachineConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid machine configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("max_nested_depth must be at least 1")]
    ZeroDepth,
}

/// Tunables for one machine.
///
/// Every field has a default, so configuration files only name what they
/// change.
///
/// # Example
///
/// ```rust
/// use statewright::engine::MachineConfig;
///
/// let config = MachineConfig::from_json(r#"{ "label": "zombie-7", "history_capacity": 16 }"#).unwrap();
/// assert_eq!(config.label.as_deref(), Some("zombie-7"));
/// assert_eq!(config.history_capacity, 16);
/// assert_eq!(config.max_nested_depth, 32);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    /// Name shown in logs next to the universe, e.g. which zombie this is
    pub label: Option<String>,
    /// Maximum number of transitions on the stack at once, including the
    /// outermost; also caps the exits a single transition runs while exit
    /// hooks keep entering states
    pub max_nested_depth: usize,
    /// Number of transitions kept in the history, zero disables it
    pub history_capacity: usize,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            label: None,
            max_nested_depth: 32,
            history_capacity: 64,
        }
    }
}

impl MachineConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()
    }

    pub fn validate(self) -> Result<Self, ConfigError> {
        if self.max_nested_depth == 0 {
            return Err(ConfigError::ZeroDepth);
        }
        Ok(self)
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_max_nested_depth(mut self, depth: usize) -> Self {
        self.max_nested_depth = depth;
        self
    }

    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }
}
