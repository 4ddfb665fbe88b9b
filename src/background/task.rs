//! Cancellable handles to background activity.

use crate::background::error::ScheduleError;
use crate::background::scheduler::SchedulerInner;
use std::cell::RefCell;
use std::fmt;
use std::rc::Weak;

/// Exclusive handle to one scheduled task.
///
/// Cancelling takes effect before `cancel` returns: the callback never runs
/// again, even later within an `advance` call already in progress. Cancelling
/// a finished or already cancelled task does nothing. Dropping the handle
/// cancels the task.
#[must_use = "dropping a TaskHandle cancels the task"]
pub struct TaskHandle {
    id: u64,
    scheduler: Weak<SchedulerInner>,
}

impl TaskHandle {
    pub(crate) fn new(id: u64, scheduler: Weak<SchedulerInner>) -> Self {
        Self { id, scheduler }
    }

    pub fn cancel(&self) {
        if let Some(scheduler) = self.scheduler.upgrade() {
            scheduler.cancel(self.id);
        }
    }

    /// Whether the task is still scheduled to fire.
    pub fn is_pending(&self) -> bool {
        self.scheduler
            .upgrade()
            .is_some_and(|scheduler| scheduler.is_pending(self.id))
    }
}

impl Drop for TaskHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("id", &self.id)
            .field("pending", &self.is_pending())
            .finish()
    }
}

/// Slot holding the background handle of one state instance.
///
/// Entry calls [`restart`](Self::restart), exit calls [`cancel`](Self::cancel).
/// `restart` cancels any handle left from an earlier activation before the new
/// activity is created, so entering twice without an exit in between never
/// leaves two tasks running.
///
/// # Example
///
/// ```rust
/// use statewright::background::{BackgroundTask, Scheduler};
/// use std::time::Duration;
///
/// let scheduler = Scheduler::new();
/// let polling = BackgroundTask::new();
///
/// polling.restart(|| scheduler.every(Duration::from_millis(100), || {})).unwrap();
/// polling.restart(|| scheduler.every(Duration::from_millis(100), || {})).unwrap();
/// assert_eq!(scheduler.pending(), 1);
///
/// polling.cancel();
/// assert!(!polling.is_running());
/// assert_eq!(scheduler.pending(), 0);
/// ```
#[derive(Default)]
pub struct BackgroundTask {
    handle: RefCell<Option<TaskHandle>>,
}

impl BackgroundTask {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel the current activity, then store the handle `start` returns.
    pub fn restart<F>(&self, start: F) -> Result<(), ScheduleError>
    where
        F: FnOnce() -> Result<TaskHandle, ScheduleError>,
    {
        self.cancel();
        let handle = start()?;
        let previous = self.handle.borrow_mut().replace(handle);
        drop(previous);
        Ok(())
    }

    /// Cancel the current activity, if any.
    pub fn cancel(&self) {
        let previous = self.handle.borrow_mut().take();
        if let Some(handle) = previous {
            handle.cancel();
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .borrow()
            .as_ref()
            .is_some_and(TaskHandle::is_pending)
    }
}

impl fmt::Debug for BackgroundTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackgroundTask")
            .field("running", &self.is_running())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::background::Scheduler;
    use std::cell::Cell;
    use std::rc::Rc;
    use std::time::Duration;

    #[test]
    fn cancel_without_activity_is_a_no_op() {
        let task = BackgroundTask::new();
        task.cancel();
        task.cancel();
        assert!(!task.is_running());
    }

    #[test]
    fn restart_replaces_previous_activity() {
        let scheduler = Scheduler::new();
        let first = Rc::new(Cell::new(0));
        let second = Rc::new(Cell::new(0));
        let task = BackgroundTask::new();

        let counter = Rc::clone(&first);
        task.restart(|| {
            scheduler.every(Duration::from_millis(10), move || counter.set(counter.get() + 1))
        })
        .unwrap();
        let counter = Rc::clone(&second);
        task.restart(|| {
            scheduler.every(Duration::from_millis(10), move || counter.set(counter.get() + 1))
        })
        .unwrap();

        scheduler.advance(Duration::from_millis(30)).unwrap();

        assert_eq!(first.get(), 0);
        assert_eq!(second.get(), 3);
        assert!(task.is_running());
    }

    #[test]
    fn failed_restart_leaves_slot_empty() {
        let scheduler = Scheduler::new();
        let task = BackgroundTask::new();
        task.restart(|| scheduler.every(Duration::from_millis(10), || {}))
            .unwrap();

        let result = task.restart(|| scheduler.every(Duration::ZERO, || {}));

        assert_eq!(result, Err(ScheduleError::ZeroInterval));
        assert!(!task.is_running());
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn handle_outliving_scheduler_is_inert() {
        let scheduler = Scheduler::new();
        let handle = scheduler.after(Duration::from_millis(5), || {});
        drop(scheduler);

        assert!(!handle.is_pending());
        handle.cancel();
    }
}
