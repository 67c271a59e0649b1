#![forbid(unsafe_code)]

//! Single-threaded, priority-aware task queue.
//!
//! The queue plays the role of the host event loop: microtasks drain before
//! any callback, and callbacks run highest priority first, FIFO within a
//! priority. Nothing runs on its own; the embedder (or a test) pumps the
//! queue with [`TaskQueue::run_next`] or [`TaskQueue::run_until_idle`].
//!
//! # Invariants
//!
//! 1. No `RefCell` borrow is held while a task runs, so tasks may enqueue
//!    more tasks.
//! 2. While a callback runs, [`TaskQueue::current_priority`] reports its
//!    priority; microtasks inherit whatever was current when they run.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;

use tracing::trace;
use weft_core::{Clock, Priority};
use web_time::{Duration, Instant};

/// A queued unit of host work.
pub type Task = Box<dyn FnOnce()>;

/// Priority task queue with a microtask lane.
pub struct TaskQueue {
    clock: Clock,
    microtasks: RefCell<VecDeque<Task>>,
    /// One lane per priority, indexed highest first.
    lanes: RefCell<[VecDeque<Task>; 3]>,
    current: Cell<Option<Priority>>,
    executed: Cell<u64>,
}

fn lane(priority: Priority) -> usize {
    match priority {
        Priority::UserBlocking => 0,
        Priority::UserVisible => 1,
        Priority::Background => 2,
    }
}

impl TaskQueue {
    #[must_use]
    pub fn new(clock: Clock) -> Self {
        Self {
            clock,
            microtasks: RefCell::new(VecDeque::new()),
            lanes: RefCell::new([VecDeque::new(), VecDeque::new(), VecDeque::new()]),
            current: Cell::new(None),
            executed: Cell::new(0),
        }
    }

    #[must_use]
    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    #[must_use]
    pub fn now(&self) -> Instant {
        self.clock.now()
    }

    #[must_use]
    pub fn elapsed_since(&self, earlier: Instant) -> Duration {
        self.clock.elapsed_since(earlier)
    }

    pub fn queue_microtask(&self, task: Task) {
        self.microtasks.borrow_mut().push_back(task);
    }

    pub fn request_callback(&self, priority: Priority, task: Task) {
        self.lanes.borrow_mut()[lane(priority)].push_back(task);
    }

    /// Priority of the callback currently running, if any.
    #[must_use]
    pub fn current_priority(&self) -> Option<Priority> {
        self.current.get()
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.microtasks.borrow().is_empty() && self.lanes.borrow().iter().all(VecDeque::is_empty)
    }

    /// Number of queued tasks, microtasks included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.microtasks.borrow().len() + self.lanes.borrow().iter().map(VecDeque::len).sum::<usize>()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.is_idle()
    }

    /// Total tasks run so far.
    #[must_use]
    pub fn executed(&self) -> u64 {
        self.executed.get()
    }

    fn pop(&self) -> Option<(Option<Priority>, Task)> {
        if let Some(task) = self.microtasks.borrow_mut().pop_front() {
            return Some((None, task));
        }
        let mut lanes = self.lanes.borrow_mut();
        for priority in Priority::ALL {
            if let Some(task) = lanes[lane(priority)].pop_front() {
                return Some((Some(priority), task));
            }
        }
        None
    }

    /// Run one task. Returns `false` when the queue was empty.
    pub fn run_next(&self) -> bool {
        let Some((priority, task)) = self.pop() else {
            return false;
        };
        let previous = self.current.get();
        if priority.is_some() {
            self.current.set(priority);
        }
        trace!(priority = ?priority, "run task");
        task();
        self.current.set(previous);
        self.executed.set(self.executed.get() + 1);
        true
    }

    /// Drain microtasks only.
    pub fn run_microtasks(&self) -> usize {
        let mut count = 0;
        loop {
            let next = self.microtasks.borrow_mut().pop_front();
            let Some(task) = next else {
                break;
            };
            task();
            self.executed.set(self.executed.get() + 1);
            count += 1;
        }
        count
    }

    /// Run tasks until the queue is empty. Returns the number run.
    pub fn run_until_idle(&self) -> usize {
        let mut count = 0;
        while self.run_next() {
            count += 1;
        }
        count
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new(Clock::default())
    }
}

impl fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lanes = self.lanes.borrow();
        f.debug_struct("TaskQueue")
            .field("microtasks", &self.microtasks.borrow().len())
            .field("user_blocking", &lanes[0].len())
            .field("user_visible", &lanes[1].len())
            .field("background", &lanes[2].len())
            .field("current", &self.current.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    fn recorder() -> (Rc<RefCell<Vec<&'static str>>>, impl Fn(&'static str) -> Task) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let log2 = Rc::clone(&log);
        let make = move |name: &'static str| -> Task {
            let log = Rc::clone(&log2);
            Box::new(move || log.borrow_mut().push(name))
        };
        (log, make)
    }

    #[test]
    fn microtasks_run_before_callbacks() {
        let queue = TaskQueue::default();
        let (log, task) = recorder();
        queue.request_callback(Priority::UserBlocking, task("cb"));
        queue.queue_microtask(task("micro"));
        assert_eq!(queue.run_until_idle(), 2);
        assert_eq!(*log.borrow(), vec!["micro", "cb"]);
    }

    #[test]
    fn callbacks_by_priority_then_fifo() {
        let queue = TaskQueue::default();
        let (log, task) = recorder();
        queue.request_callback(Priority::Background, task("bg"));
        queue.request_callback(Priority::UserVisible, task("uv1"));
        queue.request_callback(Priority::UserBlocking, task("ub"));
        queue.request_callback(Priority::UserVisible, task("uv2"));
        queue.run_until_idle();
        assert_eq!(*log.borrow(), vec!["ub", "uv1", "uv2", "bg"]);
    }

    #[test]
    fn current_priority_tracks_running_callback() {
        let queue = Rc::new(TaskQueue::default());
        let seen = Rc::new(Cell::new(None));
        let (q, s) = (Rc::clone(&queue), Rc::clone(&seen));
        queue.request_callback(
            Priority::Background,
            Box::new(move || s.set(q.current_priority())),
        );
        assert_eq!(queue.current_priority(), None);
        queue.run_next();
        assert_eq!(seen.get(), Some(Priority::Background));
        assert_eq!(queue.current_priority(), None);
    }

    #[test]
    fn tasks_may_enqueue_tasks() {
        let queue = Rc::new(TaskQueue::default());
        let (log, task) = recorder();
        let q = Rc::clone(&queue);
        let follow_up = task("follow-up");
        queue.request_callback(
            Priority::UserVisible,
            Box::new(move || q.queue_microtask(follow_up)),
        );
        assert_eq!(queue.run_until_idle(), 2);
        assert_eq!(*log.borrow(), vec!["follow-up"]);
        assert!(queue.is_idle());
        assert_eq!(queue.executed(), 2);
    }
}
