//! Background activity owned by states.
//!
//! States that poll or observe while active do so through a cooperative
//! [`Scheduler`] driven by the game's tick loop. Scheduling returns a
//! [`TaskHandle`]; cancelling it is effective immediately, so a state that
//! cancels on exit never sees its callback again. [`BackgroundTask`] is the
//! slot a state keeps its handle in:
//!
//! - `restart` on entry cancels whatever a previous activation left behind
//!   before starting the new activity
//! - `cancel` on exit, unconditionally

mod error;
mod scheduler;
mod task;

pub use error::ScheduleError;
pub use scheduler::Scheduler;
pub use task::{BackgroundTask, TaskHandle};
