//! Transition history for diagnostics.
//!
//! Every machine keeps a bounded log of the transitions it performed. The log
//! is pure runtime state, rebuilt from scratch with the machine, and can be
//! dumped as JSON when chasing a wiring defect.

use super::state::StateId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

/// Record of a single completed transition.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct StateTransition<I: StateId> {
    /// State current when the target was installed; `None` for the first transition
    pub from: Option<I>,
    /// State entered
    pub to: I,
    /// When the cursor moved to `to`
    pub timestamp: DateTime<Utc>,
    /// Type name of the payload, for payload entries
    pub payload: Option<String>,
    /// Nesting depth of the request; 0 for transitions requested from outside any hook
    pub depth: usize,
    /// First failure reported by an exit hook while vacating
    pub exit_error: Option<String>,
}

/// Bounded, ordered history of transitions.
///
/// Once `capacity` records are held the oldest one is dropped for each new
/// record. A capacity of zero disables recording.
///
/// # Example
///
/// ```rust
/// use statewright::core::{StateHistory, StateTransition};
/// use statewright::state_ids;
/// use chrono::Utc;
///
/// state_ids! {
///     enum Phase {
///         Boot,
///         Play,
///     }
///     universe: "game"
/// }
///
/// let mut history = StateHistory::with_capacity(8);
/// history.record(StateTransition {
///     from: None,
///     to: Phase::Boot,
///     timestamp: Utc::now(),
///     payload: None,
///     depth: 0,
///     exit_error: None,
/// });
/// history.record(StateTransition {
///     from: Some(Phase::Boot),
///     to: Phase::Play,
///     timestamp: Utc::now(),
///     payload: None,
///     depth: 0,
///     exit_error: None,
/// });
///
/// assert_eq!(history.get_path(), vec![Phase::Boot, Phase::Play]);
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct StateHistory<I: StateId> {
    transitions: VecDeque<StateTransition<I>>,
    capacity: usize,
}

impl<I: StateId> StateHistory<I> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            transitions: VecDeque::with_capacity(capacity.min(256)),
            capacity,
        }
    }

    /// Append a transition, evicting the oldest record when full.
    pub fn record(&mut self, transition: StateTransition<I>) {
        if self.capacity == 0 {
            return;
        }
        while self.transitions.len() >= self.capacity {
            self.transitions.pop_front();
        }
        self.transitions.push_back(transition);
    }

    /// States traversed, oldest first.
    ///
    /// Starts with the `from` state of the oldest retained record when there
    /// is one, then lists the `to` state of every record.
    pub fn get_path(&self) -> Vec<I> {
        let mut path = Vec::with_capacity(self.transitions.len() + 1);
        if let Some(from) = self.transitions.front().and_then(|t| t.from) {
            path.push(from);
        }
        path.extend(self.transitions.iter().map(|t| t.to));
        path
    }

    /// Time between the oldest and newest retained records.
    pub fn duration(&self) -> Option<Duration> {
        let (first, last) = (self.transitions.front()?, self.transitions.back()?);
        last.timestamp
            .signed_duration_since(first.timestamp)
            .to_std()
            .ok()
    }

    pub fn transitions(&self) -> impl ExactSizeIterator<Item = &StateTransition<I>> {
        self.transitions.iter()
    }

    pub fn last(&self) -> Option<&StateTransition<I>> {
        self.transitions.back()
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Serialize the history as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
