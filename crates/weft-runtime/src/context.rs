#![forbid(unsafe_code)]

//! Per-transaction state: the [`UpdateQueue`] and the [`UpdateContext`]
//! threaded through every render.
//!
//! A transaction renders blocks in FIFO order (blocks enqueued during the
//! flush are picked up by the same loop), then commits the collected effects
//! phase by phase: mutation, layout, passive. Each phase list is taken
//! before it runs, so a phase is empty before the next begins.

use std::mem;
use std::rc::Rc;

use tracing::{debug, trace};
use weft_core::{CommitPhase, Priority, RenderSurface, Result};

use crate::block::{Block, BlockState};
use crate::host::Host;
use crate::runtime::Runtime;
use crate::updater::Updater;

/// A deferred unit of work run during commit.
pub trait Effect {
    fn commit(self: Box<Self>, surface: &dyn RenderSurface);
}

impl<F: FnOnce(&dyn RenderSurface)> Effect for F {
    fn commit(self: Box<Self>, surface: &dyn RenderSurface) {
        (*self)(surface);
    }
}

/// Pending blocks and effects for one transaction.
#[derive(Default)]
pub struct UpdateQueue {
    pub(crate) blocks: Vec<Block>,
    pub(crate) mutation_effects: Vec<Box<dyn Effect>>,
    pub(crate) layout_effects: Vec<Box<dyn Effect>>,
    pub(crate) passive_effects: Vec<Box<dyn Effect>>,
    /// Blocks rendered in this transaction, waiting for their commit.
    pub(crate) committing: Vec<Block>,
}

impl UpdateQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
            && self.mutation_effects.is_empty()
            && self.layout_effects.is_empty()
            && self.passive_effects.is_empty()
            && self.committing.is_empty()
    }

    #[must_use]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    #[must_use]
    pub fn effect_count(&self, phase: CommitPhase) -> usize {
        match phase {
            CommitPhase::Mutation => self.mutation_effects.len(),
            CommitPhase::Layout => self.layout_effects.len(),
            CommitPhase::Passive => self.passive_effects.len(),
        }
    }

    /// Highest priority among the pending blocks.
    #[must_use]
    pub fn max_priority(&self) -> Option<Priority> {
        self.blocks.iter().map(Block::priority).max()
    }

    pub(crate) fn effects_mut(&mut self, phase: CommitPhase) -> &mut Vec<Box<dyn Effect>> {
        match phase {
            CommitPhase::Mutation => &mut self.mutation_effects,
            CommitPhase::Layout => &mut self.layout_effects,
            CommitPhase::Passive => &mut self.passive_effects,
        }
    }

    /// Move everything from `other` onto the end of this queue.
    pub fn append(&mut self, mut other: UpdateQueue) {
        self.blocks.append(&mut other.blocks);
        self.mutation_effects.append(&mut other.mutation_effects);
        self.layout_effects.append(&mut other.layout_effects);
        self.passive_effects.append(&mut other.passive_effects);
        self.committing.append(&mut other.committing);
    }

    /// Drop all pending work, returning blocks to idle so later requests
    /// are not swallowed.
    pub(crate) fn abort(&mut self) {
        for block in self.blocks.drain(..) {
            block.cancel_update();
        }
        for block in self.committing.drain(..) {
            for adopted in block.take_deferred() {
                adopted.cancel_update();
            }
            block.abort_commit();
        }
        self.mutation_effects.clear();
        self.layout_effects.clear();
        self.passive_effects.clear();
    }
}

/// Context threaded through render and bind calls.
pub struct UpdateContext {
    runtime: Runtime,
    queue: UpdateQueue,
    current_block: Option<Block>,
}

impl UpdateContext {
    #[must_use]
    pub fn new(runtime: Runtime) -> Self {
        Self::with_queue(runtime, UpdateQueue::new())
    }

    #[must_use]
    pub fn with_queue(runtime: Runtime, queue: UpdateQueue) -> Self {
        Self {
            runtime,
            queue,
            current_block: None,
        }
    }

    #[must_use]
    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    #[must_use]
    pub fn host(&self) -> &Rc<dyn Host> {
        self.runtime.host()
    }

    #[must_use]
    pub fn updater(&self) -> &Rc<dyn Updater> {
        self.runtime.updater()
    }

    /// The surface, for creating detached nodes during render.
    #[must_use]
    pub fn surface(&self) -> &dyn RenderSurface {
        self.runtime.host().surface()
    }

    /// The block whose body is rendering, if any.
    #[must_use]
    pub fn current_block(&self) -> Option<&Block> {
        self.current_block.as_ref()
    }

    pub(crate) fn set_current_block(&mut self, block: Option<Block>) -> Option<Block> {
        mem::replace(&mut self.current_block, block)
    }

    #[must_use]
    pub fn queue(&self) -> &UpdateQueue {
        &self.queue
    }

    #[must_use]
    pub fn into_queue(self) -> UpdateQueue {
        self.queue
    }

    pub fn enqueue_block(&mut self, block: Block) {
        trace!(block = %block.name(), id = block.id().raw(), "enqueue block");
        self.queue.blocks.push(block);
    }

    pub fn enqueue_effect(&mut self, phase: CommitPhase, effect: impl Effect + 'static) {
        self.queue.effects_mut(phase).push(Box::new(effect));
    }

    pub fn enqueue_mutation_effect(&mut self, effect: impl Effect + 'static) {
        self.enqueue_effect(CommitPhase::Mutation, effect);
    }

    pub fn enqueue_layout_effect(&mut self, effect: impl Effect + 'static) {
        self.enqueue_effect(CommitPhase::Layout, effect);
    }

    pub fn enqueue_passive_effect(&mut self, effect: impl Effect + 'static) {
        self.enqueue_effect(CommitPhase::Passive, effect);
    }

    /// Whether this context or the updater still has outstanding work.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        !self.queue.is_empty() || self.runtime.updater().is_pending()
    }

    /// Hand the collected work to the updater.
    pub fn schedule(self) {
        if self.queue.is_empty() {
            return;
        }
        let runtime = self.runtime.clone();
        runtime.updater().schedule_update(self.queue, &runtime);
    }

    /// Block at `index` in the render queue, if any.
    pub(crate) fn block_at(&self, index: usize) -> Option<Block> {
        self.queue.blocks.get(index).cloned()
    }

    /// Render `block` if it should update now; otherwise hand it to its
    /// [blocker](Block::blocker), which re-enqueues it after rendering or
    /// committing.
    pub(crate) fn process_block(&mut self, block: &Block) -> Result<()> {
        if block.state() != BlockState::Updating {
            return Ok(());
        }
        if !block.is_connected() {
            block.cancel_update();
            return Ok(());
        }
        match block.blocker(&self.queue.committing) {
            None => block.update(self),
            Some(blocker) => {
                trace!(
                    block = %block.name(),
                    blocker = %blocker.name(),
                    blocker_state = ?blocker.state(),
                    in_flight = blocker.in_flight(),
                    "defer to blocker"
                );
                blocker.adopt(block.clone());
                Ok(())
            }
        }
    }

    pub(crate) fn mark_committing(&mut self, block: Block) {
        self.queue.committing.push(block);
    }

    /// Render every queued block, including blocks enqueued along the way.
    pub fn flush_blocks(&mut self) -> Result<()> {
        let mut index = 0;
        while let Some(block) = self.block_at(index) {
            index += 1;
            self.process_block(&block)?;
        }
        self.queue.blocks.clear();
        Ok(())
    }

    /// Commit one phase through the host.
    pub fn commit_phase(&mut self, phase: CommitPhase) {
        let effects = mem::take(self.queue.effects_mut(phase));
        if effects.is_empty() {
            return;
        }
        debug!(phase = phase.as_str(), count = effects.len(), "commit effects");
        self.runtime.host().flush_effects(effects, phase);
    }

    /// Return every block rendered by this transaction to idle, then
    /// schedule descendants that other transactions handed to them while
    /// they were committing.
    pub(crate) fn finish_committing(&mut self) {
        let committed = mem::take(&mut self.queue.committing);
        for block in &committed {
            block.commit_done();
        }
        let mut followup = UpdateContext::new(self.runtime.clone());
        for block in &committed {
            for adopted in block.take_deferred() {
                if adopted.is_updating() {
                    trace!(block = %adopted.name(), ancestor = %block.name(), "resume after ancestor commit");
                    followup.enqueue_block(adopted);
                }
            }
        }
        followup.schedule();
    }

    /// Render and commit everything, synchronously.
    pub fn flush(&mut self) -> Result<()> {
        if let Err(err) = self.flush_blocks() {
            self.queue.abort();
            return Err(err);
        }
        self.commit_phase(CommitPhase::Mutation);
        self.commit_phase(CommitPhase::Layout);
        self.finish_committing();
        self.commit_phase(CommitPhase::Passive);
        Ok(())
    }
}
