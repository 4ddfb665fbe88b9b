//! Cooperative timeline for background callbacks.

use crate::background::error::ScheduleError;
use crate::background::task::TaskHandle;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;
use tracing::trace;

type Callback = Rc<RefCell<dyn FnMut()>>;

struct Task {
    due: Duration,
    period: Option<Duration>,
    callback: Callback,
}

#[derive(Default)]
struct Timeline {
    now: Duration,
    next_id: u64,
    tasks: BTreeMap<u64, Task>,
}

#[derive(Default)]
pub(crate) struct SchedulerInner {
    timeline: RefCell<Timeline>,
    advancing: Cell<bool>,
}

impl SchedulerInner {
    pub(crate) fn cancel(&self, id: u64) {
        // The callback may own handles of its own; drop it after the borrow ends.
        let removed = self.timeline.borrow_mut().tasks.remove(&id);
        if removed.is_some() {
            trace!(task = id, "background task cancelled");
        }
        drop(removed);
    }

    pub(crate) fn is_pending(&self, id: u64) -> bool {
        self.timeline.borrow().tasks.contains_key(&id)
    }
}

/// Single-threaded clock firing scheduled callbacks as it is advanced.
///
/// Nothing fires on its own: the owner calls [`advance`](Self::advance) from
/// its tick loop. Callbacks run in due-time order, ties broken by scheduling
/// order, and may freely schedule, cancel or request state transitions.
///
/// # Example
///
/// ```rust
/// use statewright::background::Scheduler;
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use std::time::Duration;
///
/// let scheduler = Scheduler::new();
/// let ticks = Rc::new(Cell::new(0));
/// let counter = Rc::clone(&ticks);
/// let handle = scheduler
///     .every(Duration::from_millis(100), move || counter.set(counter.get() + 1))
///     .unwrap();
///
/// scheduler.advance(Duration::from_millis(350)).unwrap();
/// assert_eq!(ticks.get(), 3);
///
/// handle.cancel();
/// scheduler.advance(Duration::from_secs(1)).unwrap();
/// assert_eq!(ticks.get(), 3);
/// ```
#[derive(Clone, Default)]
pub struct Scheduler {
    inner: Rc<SchedulerInner>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Time elapsed on this timeline.
    pub fn now(&self) -> Duration {
        self.inner.timeline.borrow().now
    }

    /// Number of scheduled tasks that have not finished or been cancelled.
    pub fn pending(&self) -> usize {
        self.inner.timeline.borrow().tasks.len()
    }

    /// Run `callback` every `period`, first one `period` from now.
    pub fn every<F>(&self, period: Duration, callback: F) -> Result<TaskHandle, ScheduleError>
    where
        F: FnMut() + 'static,
    {
        if period.is_zero() {
            return Err(ScheduleError::ZeroInterval);
        }
        Ok(self.schedule(period, Some(period), Rc::new(RefCell::new(callback))))
    }

    /// Run `callback` once, `delay` from now.
    pub fn after<F>(&self, delay: Duration, callback: F) -> TaskHandle
    where
        F: FnOnce() + 'static,
    {
        let mut callback = Some(callback);
        self.schedule(
            delay,
            None,
            Rc::new(RefCell::new(move || {
                if let Some(callback) = callback.take() {
                    callback();
                }
            })),
        )
    }

    fn schedule(&self, delay: Duration, period: Option<Duration>, callback: Callback) -> TaskHandle {
        let mut timeline = self.inner.timeline.borrow_mut();
        let id = timeline.next_id;
        timeline.next_id += 1;
        let due = timeline.now.saturating_add(delay);
        timeline.tasks.insert(
            id,
            Task {
                due,
                period,
                callback,
            },
        );
        trace!(task = id, due = ?due, periodic = period.is_some(), "background task scheduled");
        TaskHandle::new(id, Rc::downgrade(&self.inner))
    }

    /// Move the clock forward by `dt`, firing every callback that falls due.
    ///
    /// A periodic task fires once per elapsed period. A task cancelled by an
    /// earlier callback of the same call does not fire. Returns the number of
    /// callbacks run.
    pub fn advance(&self, dt: Duration) -> Result<usize, ScheduleError> {
        if self.inner.advancing.replace(true) {
            return Err(ScheduleError::Reentrant);
        }
        let _advancing = AdvanceGuard(&self.inner.advancing);

        let target = self.now().saturating_add(dt);
        let mut fired = 0;
        while let Some(callback) = self.next_due(target) {
            (&mut *callback.borrow_mut())();
            fired += 1;
        }
        self.inner.timeline.borrow_mut().now = target;
        Ok(fired)
    }

    /// Pop the earliest task due at or before `target`, moving the clock to
    /// its due time and rescheduling it when periodic.
    fn next_due(&self, target: Duration) -> Option<Callback> {
        let mut timeline = self.inner.timeline.borrow_mut();
        let (id, due) = timeline
            .tasks
            .iter()
            .filter(|(_, task)| task.due <= target)
            .map(|(id, task)| (*id, task.due))
            .min_by_key(|&(id, due)| (due, id))?;

        timeline.now = due;
        let task = timeline.tasks.get_mut(&id)?;
        let callback = Rc::clone(&task.callback);
        let period = task.period;
        let finished = match period {
            Some(period) => {
                task.due = due.saturating_add(period);
                None
            }
            None => timeline.tasks.remove(&id),
        };
        drop(timeline);
        drop(finished);
        Some(callback)
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("now", &self.now())
            .field("pending", &self.pending())
            .finish()
    }
}

struct AdvanceGuard<'a>(&'a Cell<bool>);

impl Drop for AdvanceGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    #[test]
    fn periodic_task_fires_once_per_period() {
        let scheduler = Scheduler::new();
        let fired = Rc::new(Cell::new(0));
        let counter = Rc::clone(&fired);
        let _handle = scheduler
            .every(ms(100), move || counter.set(counter.get() + 1))
            .unwrap();

        assert_eq!(scheduler.advance(ms(99)).unwrap(), 0);
        assert_eq!(scheduler.advance(ms(1)).unwrap(), 1);
        assert_eq!(scheduler.advance(ms(250)).unwrap(), 2);
        assert_eq!(fired.get(), 3);
        assert_eq!(scheduler.now(), ms(350));
    }

    #[test]
    fn zero_period_is_rejected() {
        let scheduler = Scheduler::new();
        let result = scheduler.every(Duration::ZERO, || {});
        assert_eq!(result.err(), Some(ScheduleError::ZeroInterval));
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn one_shot_fires_once_and_finishes() {
        let scheduler = Scheduler::new();
        let fired = Rc::new(Cell::new(0));
        let counter = Rc::clone(&fired);
        let handle = scheduler.after(ms(50), move || counter.set(counter.get() + 1));

        assert!(handle.is_pending());
        scheduler.advance(ms(200)).unwrap();
        assert_eq!(fired.get(), 1);
        assert!(!handle.is_pending());

        handle.cancel();
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn callbacks_fire_in_due_then_schedule_order() {
        let scheduler = Scheduler::new();
        let order = Rc::new(RefCell::new(Vec::new()));
        let (a, b, c) = (Rc::clone(&order), Rc::clone(&order), Rc::clone(&order));
        let _late = scheduler.after(ms(30), move || a.borrow_mut().push("late"));
        let _first = scheduler.after(ms(10), move || b.borrow_mut().push("first"));
        let _second = scheduler.after(ms(10), move || c.borrow_mut().push("second"));

        scheduler.advance(ms(30)).unwrap();

        assert_eq!(*order.borrow(), vec!["first", "second", "late"]);
    }

    #[test]
    fn cancel_from_earlier_callback_prevents_firing() {
        let scheduler = Scheduler::new();
        let fired = Rc::new(Cell::new(false));
        let flag = Rc::clone(&fired);
        let victim = Rc::new(scheduler.after(ms(20), move || flag.set(true)));

        let target = Rc::clone(&victim);
        let _killer = scheduler.after(ms(10), move || target.cancel());

        scheduler.advance(ms(100)).unwrap();

        assert!(!fired.get());
        assert!(!victim.is_pending());
    }

    #[test]
    fn callback_may_cancel_itself() {
        let scheduler = Scheduler::new();
        let fired = Rc::new(Cell::new(0));
        let slot: Rc<RefCell<Option<TaskHandle>>> = Rc::default();

        let counter = Rc::clone(&fired);
        let own = Rc::clone(&slot);
        let handle = scheduler
            .every(ms(10), move || {
                counter.set(counter.get() + 1);
                if let Some(handle) = own.borrow_mut().take() {
                    handle.cancel();
                }
            })
            .unwrap();
        *slot.borrow_mut() = Some(handle);

        scheduler.advance(ms(100)).unwrap();

        assert_eq!(fired.get(), 1);
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn nested_advance_is_rejected() {
        let scheduler = Scheduler::new();
        let nested = Rc::new(RefCell::new(None));
        let inner = scheduler.clone();
        let result = Rc::clone(&nested);
        let _handle = scheduler.after(ms(1), move || {
            *result.borrow_mut() = Some(inner.advance(ms(1)));
        });

        scheduler.advance(ms(1)).unwrap();

        assert_eq!(*nested.borrow(), Some(Err(ScheduleError::Reentrant)));
        assert!(scheduler.advance(ms(1)).is_ok());
    }

    #[test]
    fn dropping_handle_cancels_task() {
        let scheduler = Scheduler::new();
        let fired = Rc::new(Cell::new(false));
        let flag = Rc::clone(&fired);
        let handle = scheduler.every(ms(5), move || flag.set(true)).unwrap();

        drop(handle);
        scheduler.advance(ms(50)).unwrap();

        assert!(!fired.get());
        assert_eq!(scheduler.pending(), 0);
    }
}
