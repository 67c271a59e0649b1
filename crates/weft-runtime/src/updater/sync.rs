#![forbid(unsafe_code)]

//! Microtask-batched updater.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tracing::{debug, error};
use weft_core::Error;

use super::Updater;
use crate::context::{UpdateContext, UpdateQueue};
use crate::runtime::Runtime;

#[derive(Default)]
struct SyncState {
    queue: RefCell<UpdateQueue>,
    scheduled: Cell<bool>,
    error: RefCell<Option<Error>>,
}

/// Accumulates every queue scheduled before the next microtask and flushes
/// them together, blocks in enqueue order.
#[derive(Default)]
pub struct SyncUpdater {
    state: Rc<SyncState>,
}

impl SyncUpdater {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn flush(state: &SyncState, runtime: &Runtime) {
        state.scheduled.set(false);
        let queue = state.queue.take();
        if queue.is_empty() {
            return;
        }
        debug!(blocks = queue.block_count(), "sync flush");
        let mut ctx = UpdateContext::with_queue(runtime.clone(), queue);
        if let Err(err) = ctx.flush() {
            error!(error = %err, code = err.code(), "sync flush aborted");
            state.error.borrow_mut().get_or_insert(err);
        }
        // Work scheduled during commit lands in the fresh queue and has its
        // own microtask.
    }
}

impl Updater for SyncUpdater {
    fn name(&self) -> &'static str {
        "sync"
    }

    fn schedule_update(&self, queue: UpdateQueue, runtime: &Runtime) {
        self.state.queue.borrow_mut().append(queue);
        if self.state.scheduled.replace(true) {
            return;
        }
        let state = Rc::clone(&self.state);
        let runtime_for_task = runtime.clone();
        runtime
            .host()
            .queue_microtask(Box::new(move || Self::flush(&state, &runtime_for_task)));
    }

    fn is_pending(&self) -> bool {
        self.state.scheduled.get() || !self.state.queue.borrow().is_empty()
    }

    fn take_error(&self) -> Option<Error> {
        self.state.error.borrow_mut().take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::Host;
    use crate::testing::{RenderLog, TestRuntime};
    use web_time::Duration;
    use weft_core::Priority;

    #[test]
    fn one_microtask_per_tick() {
        let rt = TestRuntime::sync();
        let log = RenderLog::default();
        let a = rt.log_block("a", &log, Duration::ZERO);
        let b = rt.log_block("b", &log, Duration::ZERO);
        a.schedule_update(Priority::Background);
        b.schedule_update(Priority::UserBlocking);
        assert_eq!(rt.host.tasks().len(), 1);
        assert!(rt.runtime.updater().is_pending());
        assert!(log.borrow().is_empty());

        rt.host.run_until_idle();
        assert_eq!(*log.borrow(), vec!["a", "b"], "enqueue order, not priority");
        assert!(!rt.runtime.updater().is_pending());
    }

    #[test]
    fn flush_error_is_stored_and_reported_once() {
        let rt = TestRuntime::sync();
        let block = rt.failing_block();
        block.schedule_update(Priority::UserVisible);
        let err = rt.runtime.wait_for_update().err();
        assert_eq!(err.as_ref().map(Error::code), Some("missing_context"));
        assert!(!block.is_updating(), "aborted blocks return to idle");
        assert!(rt.runtime.updater().take_error().is_none());
    }

    #[test]
    fn work_scheduled_after_flush_gets_new_tick() {
        let rt = TestRuntime::sync();
        let log = RenderLog::default();
        let a = rt.log_block("a", &log, Duration::ZERO);
        a.schedule_update(Priority::UserVisible);
        assert!(rt.host.run_pending_task());
        a.schedule_update(Priority::UserVisible);
        assert_eq!(rt.host.tasks().len(), 1);
        rt.host.run_until_idle();
        assert_eq!(*log.borrow(), vec!["a", "a"]);
    }
}
