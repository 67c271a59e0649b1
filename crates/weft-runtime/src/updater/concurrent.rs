#![forbid(unsafe_code)]

//! Priority-preemptive updater.
//!
//! Every scheduled queue becomes its own pipeline task at the queue's
//! highest block priority, so a user-blocking request overtakes background
//! work that is still rendering. A pipeline checks the frame budget before
//! each block (after rendering at least one in the current slice) and, when
//! over budget, re-queues itself at that block's priority.
//!
//! A finished pipeline commits in two host tasks: mutation and layout
//! effects at [`Priority::UserBlocking`], passive effects at
//! [`Priority::Background`].

use std::cell::{Cell, RefCell};
use std::mem;
use std::rc::Rc;

use tracing::{debug, error, trace};
use weft_core::{CommitPhase, Error, Priority};
use web_time::{Duration, Instant};

use super::Updater;
use crate::context::{UpdateContext, UpdateQueue};
use crate::runtime::Runtime;

#[derive(Default)]
struct ConcurrentState {
    /// Pipeline and commit tasks queued or running.
    outstanding: Cell<usize>,
    next_pipeline: Cell<u64>,
    error: RefCell<Option<Error>>,
}

impl ConcurrentState {
    fn begin(&self) {
        self.outstanding.set(self.outstanding.get() + 1);
    }

    fn end(&self) {
        self.outstanding.set(self.outstanding.get().saturating_sub(1));
    }

    fn fail(&self, err: Error) {
        error!(error = %err, code = err.code(), "pipeline aborted");
        self.error.borrow_mut().get_or_insert(err);
    }
}

/// Concurrent, cooperatively yielding updater.
#[derive(Default)]
pub struct ConcurrentUpdater {
    state: Rc<ConcurrentState>,
}

impl ConcurrentUpdater {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pipelines and commit units not yet finished.
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.state.outstanding.get()
    }
}

/// Whole microseconds for log fields, saturating.
fn micros(duration: Duration) -> u64 {
    u64::try_from(duration.as_micros()).unwrap_or(u64::MAX)
}

struct Pipeline {
    id: u64,
    ctx: UpdateContext,
    /// Next block to look at; the list grows while rendering.
    cursor: usize,
    slices: u32,
    state: Rc<ConcurrentState>,
}

impl Pipeline {
    /// Render until the queue is exhausted or the budget runs out.
    fn run(mut self) {
        let host = Rc::clone(self.ctx.host());
        let started: Instant = host.now();
        let mut rendered = 0usize;
        self.slices += 1;
        while let Some(block) = self.ctx.block_at(self.cursor) {
            let elapsed = host.now().saturating_duration_since(started);
            if rendered > 0 && host.should_yield_to_main(elapsed) {
                let priority = block.priority();
                debug!(
                    pipeline = self.id,
                    priority = ?priority,
                    rendered,
                    elapsed_us = micros(elapsed),
                    "pipeline yield"
                );
                host.yield_to_main(priority, Box::new(move || self.run()));
                return;
            }
            self.cursor += 1;
            if let Err(err) = self.ctx.process_block(&block) {
                let mut queue = self.ctx.into_queue();
                queue.abort();
                self.state.fail(err);
                self.state.end();
                return;
            }
            rendered += 1;
        }
        self.complete();
    }

    fn complete(self) {
        let Pipeline { id, ctx, slices, state, .. } = self;
        let runtime = ctx.runtime().clone();
        let mut queue = ctx.into_queue();
        queue.blocks.clear();
        let passive = mem::take(&mut queue.passive_effects);
        debug!(
            pipeline = id,
            slices,
            mutation = queue.mutation_effects.len(),
            layout = queue.layout_effects.len(),
            passive = passive.len(),
            "pipeline rendered"
        );
        let host = Rc::clone(runtime.host());

        state.begin();
        let commit_state = Rc::clone(&state);
        let commit_runtime = runtime.clone();
        host.request_callback(
            Priority::UserBlocking,
            Box::new(move || {
                let mut ctx = UpdateContext::with_queue(commit_runtime, queue);
                ctx.commit_phase(CommitPhase::Mutation);
                ctx.commit_phase(CommitPhase::Layout);
                ctx.finish_committing();
                commit_state.end();
            }),
        );

        if !passive.is_empty() {
            state.begin();
            let passive_state = Rc::clone(&state);
            let passive_host = Rc::clone(&host);
            host.request_callback(
                Priority::Background,
                Box::new(move || {
                    passive_host.flush_effects(passive, CommitPhase::Passive);
                    passive_state.end();
                }),
            );
        }
        // The pipeline task itself.
        state.end();
    }
}

impl Updater for ConcurrentUpdater {
    fn name(&self) -> &'static str {
        "concurrent"
    }

    fn schedule_update(&self, queue: UpdateQueue, runtime: &Runtime) {
        if queue.is_empty() {
            return;
        }
        let priority = queue.max_priority().unwrap_or(Priority::UserBlocking);
        let id = self.state.next_pipeline.get();
        self.state.next_pipeline.set(id + 1);
        trace!(pipeline = id, priority = ?priority, blocks = queue.block_count(), "pipeline scheduled");
        self.state.begin();
        let pipeline = Pipeline {
            id,
            ctx: UpdateContext::with_queue(runtime.clone(), queue),
            cursor: 0,
            slices: 0,
            state: Rc::clone(&self.state),
        };
        runtime
            .host()
            .request_callback(priority, Box::new(move || pipeline.run()));
    }

    fn is_pending(&self) -> bool {
        self.state.outstanding.get() > 0
    }

    fn take_error(&self) -> Option<Error> {
        self.state.error.borrow_mut().take()
    }
}
