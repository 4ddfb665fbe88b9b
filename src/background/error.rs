//! Background scheduling errors.

use thiserror::Error;

/// Errors that can occur when scheduling or driving background activity.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("background interval must be greater than zero")]
    ZeroInterval,

    #[error("scheduler advanced from inside one of its own callbacks")]
    Reentrant,
}
