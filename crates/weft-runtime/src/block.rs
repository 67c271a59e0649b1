#![forbid(unsafe_code)]

//! Blocks: the unit of scheduling.
//!
//! A [`Block`] owns a render body (a component, a signal rebind, a root),
//! its hook list, a pending priority and a lifecycle state. Requesting an
//! update marks the block and places it on an [`UpdateContext`] queue;
//! rendering happens when the queue is flushed.
//!
//! # State machine
//!
//! ```text
//!            request_update            render
//!   Idle ───────────────────► Updating ─────────► Committing
//!    ▲                                                 │
//!    └──────────────── commit (mutation + layout) ─────┘
//! ```
//!
//! # Invariants
//!
//! 1. A block renders only while Updating, connected, with no Updating
//!    ancestor, and with no render of itself or an ancestor still waiting
//!    for another transaction's commit. A skipped block is adopted by the
//!    blocker and re-enqueued right after it renders, or in a follow-up
//!    transaction once it commits.
//! 2. A request at a priority no higher than an already pending one is
//!    coalesced.
//! 3. A parent-forced update runs at `max(pending, parent priority)`; a
//!    block without a parent uses [`Priority::UserBlocking`].

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use smallvec::SmallVec;
use tracing::{trace, warn};
use weft_core::{Priority, Result};

use crate::context::UpdateContext;
use crate::hooks::HookList;
use crate::runtime::Runtime;

/// Process-unique block identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(u64);

impl BlockId {
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "block#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockState {
    Idle,
    Updating,
    Committing,
}

/// What a block does when it renders.
pub trait BlockBody: Any {
    fn render(&mut self, block: &Block, ctx: &mut UpdateContext) -> Result<()>;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

struct BlockInner {
    id: BlockId,
    name: Rc<str>,
    parent: Option<Weak<BlockInner>>,
    runtime: Runtime,
    state: Cell<BlockState>,
    priority: Cell<Priority>,
    connected: Cell<bool>,
    hooks: RefCell<HookList>,
    body: RefCell<Box<dyn BlockBody>>,
    /// Renders waiting for their transaction's mutation commit.
    in_flight: Cell<usize>,
    /// Blocks skipped while this block was pending or committing.
    deferred: RefCell<SmallVec<[Block; 2]>>,
}

/// Shared handle to a block.
#[derive(Clone)]
pub struct Block {
    inner: Rc<BlockInner>,
}

/// Non-owning handle, used by subscriptions and dispatchers.
#[derive(Clone)]
pub struct WeakBlock {
    inner: Weak<BlockInner>,
}

impl WeakBlock {
    #[must_use]
    pub fn upgrade(&self) -> Option<Block> {
        self.inner.upgrade().map(|inner| Block { inner })
    }
}

impl Block {
    /// Create an idle, connected block.
    #[must_use]
    pub fn new(name: impl Into<Rc<str>>, parent: Option<&Block>, runtime: Runtime, body: impl BlockBody) -> Self {
        let id = BlockId::new(runtime.host().next_identifier());
        let priority = parent.map_or(Priority::UserBlocking, Block::priority);
        Self {
            inner: Rc::new(BlockInner {
                id,
                name: name.into(),
                parent: parent.map(|p| Rc::downgrade(&p.inner)),
                runtime,
                state: Cell::new(BlockState::Idle),
                priority: Cell::new(priority),
                connected: Cell::new(true),
                hooks: RefCell::new(HookList::default()),
                body: RefCell::new(Box::new(body)),
                in_flight: Cell::new(0),
                deferred: RefCell::new(SmallVec::new()),
            }),
        }
    }

    #[must_use]
    pub fn id(&self) -> BlockId {
        self.inner.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    #[must_use]
    pub fn runtime(&self) -> &Runtime {
        &self.inner.runtime
    }

    #[must_use]
    pub fn parent(&self) -> Option<Block> {
        self.inner
            .parent
            .as_ref()
            .and_then(Weak::upgrade)
            .map(|inner| Block { inner })
    }

    #[must_use]
    pub fn downgrade(&self) -> WeakBlock {
        WeakBlock {
            inner: Rc::downgrade(&self.inner),
        }
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Block) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    #[must_use]
    pub fn state(&self) -> BlockState {
        self.inner.state.get()
    }

    #[must_use]
    pub fn priority(&self) -> Priority {
        self.inner.priority.get()
    }

    #[must_use]
    pub fn is_updating(&self) -> bool {
        self.state() == BlockState::Updating
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inner.connected.get()
    }

    pub(crate) fn hooks(&self) -> &RefCell<HookList> {
        &self.inner.hooks
    }

    /// Borrow the body as `B`. `None` if the body is another type or is
    /// rendering.
    pub fn with_body<B: BlockBody, R>(&self, f: impl FnOnce(&mut B) -> R) -> Option<R> {
        let mut body = self.inner.body.try_borrow_mut().ok()?;
        body.as_any_mut().downcast_mut::<B>().map(f)
    }

    /// Ancestor chain, nearest first.
    pub fn ancestors(&self) -> impl Iterator<Item = Block> {
        std::iter::successors(self.parent(), Block::parent)
    }

    #[must_use]
    pub fn nearest_updating_ancestor(&self) -> Option<Block> {
        self.ancestors().find(Block::is_updating)
    }

    /// Updating, connected, and not shadowed by an updating ancestor.
    ///
    /// Ancestors committing for another transaction are only visible to the
    /// flush loop; see [`Block::blocking_ancestor`].
    #[must_use]
    pub fn should_update(&self) -> bool {
        self.is_updating() && self.is_connected() && self.nearest_updating_ancestor().is_none()
    }

    /// Whether a transaction other than the one that `rendered` these
    /// blocks holds an uncommitted render of this block.
    fn uncommitted_elsewhere(&self, rendered: &[Block]) -> bool {
        let own = rendered.iter().filter(|b| b.ptr_eq(self)).count();
        self.inner.in_flight.get() > own
    }

    /// The block this one has to wait for before rendering in the
    /// transaction that has `rendered` the given blocks: itself or an
    /// ancestor whose last render another transaction has not committed,
    /// otherwise the nearest updating ancestor.
    #[must_use]
    pub fn blocker(&self, rendered: &[Block]) -> Option<Block> {
        if self.uncommitted_elsewhere(rendered) {
            return Some(self.clone());
        }
        self.ancestors()
            .find(|ancestor| ancestor.is_updating() || ancestor.uncommitted_elsewhere(rendered))
    }

    /// Priority a parent-forced update inherits.
    #[must_use]
    pub fn inherited_priority(&self) -> Priority {
        self.parent().map_or(Priority::UserBlocking, |p| p.priority())
    }

    /// Mark for update at `priority` and enqueue on `ctx`.
    ///
    /// Coalesced when already pending at the same or a higher priority.
    pub fn request_update(&self, priority: Priority, ctx: &mut UpdateContext) {
        if !self.is_connected() {
            warn!(block = %self.name(), "update requested on disconnected block");
            return;
        }
        if self.is_updating() && self.priority() >= priority {
            trace!(block = %self.name(), priority = %priority, "coalesced");
            return;
        }
        self.inner.priority.set(priority);
        self.inner.state.set(BlockState::Updating);
        ctx.enqueue_block(self.clone());
    }

    /// Enqueue a render on `ctx` at the inherited priority, whether or not
    /// an update is already pending elsewhere.
    pub fn force_update(&self, ctx: &mut UpdateContext) {
        if !self.is_connected() {
            return;
        }
        let inherited = self.inherited_priority();
        let priority = if self.is_updating() {
            self.priority().max(inherited)
        } else {
            inherited
        };
        self.inner.priority.set(priority);
        self.inner.state.set(BlockState::Updating);
        ctx.enqueue_block(self.clone());
    }

    /// Request an update in a fresh transaction and hand it to the updater.
    pub fn schedule_update(&self, priority: Priority) {
        let mut ctx = UpdateContext::new(self.runtime().clone());
        self.request_update(priority, &mut ctx);
        ctx.schedule();
    }

    /// Drop a pending update.
    pub fn cancel_update(&self) {
        if self.state() != BlockState::Idle {
            self.inner.state.set(BlockState::Idle);
        }
    }

    pub(crate) fn adopt(&self, descendant: Block) {
        let mut deferred = self.inner.deferred.borrow_mut();
        if !deferred.iter().any(|b| b.ptr_eq(&descendant)) {
            deferred.push(descendant);
        }
    }

    pub(crate) fn take_deferred(&self) -> SmallVec<[Block; 2]> {
        std::mem::take(&mut *self.inner.deferred.borrow_mut())
    }

    /// Render the body. Called by the flush loop only.
    pub(crate) fn update(&self, ctx: &mut UpdateContext) -> Result<()> {
        trace!(block = %self.name(), id = self.id().raw(), priority = %self.priority(), "render block");
        let result = {
            let mut body = self.inner.body.borrow_mut();
            self.inner.hooks.borrow_mut().rewind();
            let previous = ctx.set_current_block(Some(self.clone()));
            let result = body.render(self, ctx);
            ctx.set_current_block(previous);
            result
        };
        result?;
        self.inner.in_flight.set(self.inner.in_flight.get() + 1);
        self.inner.state.set(BlockState::Committing);
        ctx.mark_committing(self.clone());
        for block in self.take_deferred() {
            if block.is_updating() {
                ctx.enqueue_block(block);
            }
        }
        Ok(())
    }

    pub(crate) fn commit_done(&self) {
        let remaining = self.inner.in_flight.get().saturating_sub(1);
        self.inner.in_flight.set(remaining);
        if remaining == 0 && self.state() == BlockState::Committing {
            self.inner.state.set(BlockState::Idle);
        }
    }

    /// Forget a render whose transaction was aborted.
    pub(crate) fn abort_commit(&self) {
        self.inner.in_flight.set(self.inner.in_flight.get().saturating_sub(1));
        self.cancel_update();
    }

    /// Renders not yet committed.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.get()
    }

    /// Queue cleanups for every effect hook; the effects re-run on the next
    /// render.
    pub fn unmount_effects(&self, ctx: &mut UpdateContext) {
        self.inner.hooks.borrow_mut().unmount_effects(ctx);
    }

    /// Permanent teardown: cancels pending work, queues effect cleanups,
    /// drops hooks and clears scoped values.
    pub fn disconnect(&self, ctx: &mut UpdateContext) {
        if !self.is_connected() {
            return;
        }
        trace!(block = %self.name(), id = self.id().raw(), "disconnect block");
        self.inner.connected.set(false);
        self.cancel_update();
        self.unmount_effects(ctx);
        let hooks = std::mem::take(&mut *self.inner.hooks.borrow_mut());
        drop(hooks);
        self.inner.deferred.borrow_mut().clear();
        self.runtime().host().clear_scoped_values(self.id());
    }
}

impl fmt::Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Block")
            .field("id", &self.id())
            .field("name", &self.name())
            .field("state", &self.state())
            .field("priority", &self.priority())
            .field("connected", &self.is_connected())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestRuntime;

    struct Counting {
        renders: Rc<Cell<u32>>,
    }

    impl BlockBody for Counting {
        fn render(&mut self, _block: &Block, _ctx: &mut UpdateContext) -> Result<()> {
            self.renders.set(self.renders.get() + 1);
            Ok(())
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    fn counting(rt: &TestRuntime, parent: Option<&Block>) -> (Block, Rc<Cell<u32>>) {
        let renders = Rc::new(Cell::new(0));
        let body = Counting {
            renders: Rc::clone(&renders),
        };
        (Block::new("counting", parent, rt.runtime.clone(), body), renders)
    }

    #[test]
    fn lifecycle_idle_updating_committing_idle() {
        let rt = TestRuntime::sync();
        let (block, renders) = counting(&rt, None);
        let mut ctx = rt.context();
        block.request_update(Priority::UserVisible, &mut ctx);
        assert_eq!(block.state(), BlockState::Updating);
        ctx.flush_blocks().expect("render");
        assert_eq!(block.state(), BlockState::Committing);
        ctx.flush().expect("commit");
        assert_eq!(block.state(), BlockState::Idle);
        assert_eq!(renders.get(), 1);
    }

    #[test]
    fn equal_or_lower_priority_requests_coalesce() {
        let rt = TestRuntime::sync();
        let (block, renders) = counting(&rt, None);
        let mut ctx = rt.context();
        block.request_update(Priority::UserVisible, &mut ctx);
        block.request_update(Priority::UserVisible, &mut ctx);
        block.request_update(Priority::Background, &mut ctx);
        assert_eq!(ctx.queue().block_count(), 1);
        block.request_update(Priority::UserBlocking, &mut ctx);
        assert_eq!(ctx.queue().block_count(), 2);
        assert_eq!(block.priority(), Priority::UserBlocking);
        ctx.flush().expect("flush");
        assert_eq!(renders.get(), 1, "second queue entry is skipped");
    }

    #[test]
    fn descendant_waits_for_updating_ancestor() {
        let rt = TestRuntime::sync();
        let (parent, parent_renders) = counting(&rt, None);
        let (child, child_renders) = counting(&rt, Some(&parent));
        let mut ctx = rt.context();
        child.request_update(Priority::UserVisible, &mut ctx);
        parent.request_update(Priority::UserVisible, &mut ctx);
        assert!(!child.should_update());
        ctx.flush().expect("flush");
        assert_eq!(parent_renders.get(), 1);
        assert_eq!(child_renders.get(), 1, "child re-enqueued after parent");
        assert_eq!(child.state(), BlockState::Idle);
    }

    #[test]
    fn uncommitted_ancestor_blocks_other_transactions_only() {
        let rt = TestRuntime::sync();
        let (parent, _) = counting(&rt, None);
        let (child, _) = counting(&rt, Some(&parent));
        let mut ctx = rt.context();
        parent.request_update(Priority::UserVisible, &mut ctx);
        ctx.flush_blocks().expect("render");
        assert_eq!(parent.in_flight(), 1);
        assert!(child.blocker(&ctx.queue().committing).is_none());
        assert!(child.blocker(&[]).is_some_and(|b| b.ptr_eq(&parent)));
        assert!(parent.blocker(&[]).is_some_and(|b| b.ptr_eq(&parent)));

        ctx.flush().expect("commit");
        assert_eq!(parent.in_flight(), 0);
        assert!(child.blocker(&[]).is_none());
    }

    #[test]
    fn forced_update_inherits_parent_priority() {
        let rt = TestRuntime::sync();
        let (root, _) = counting(&rt, None);
        assert_eq!(root.inherited_priority(), Priority::UserBlocking);
        let mut ctx = rt.context();
        root.request_update(Priority::Background, &mut ctx);
        let (child, _) = counting(&rt, Some(&root));
        child.force_update(&mut ctx);
        assert_eq!(child.priority(), Priority::Background);

        let mut ctx = rt.context();
        child.cancel_update();
        child.request_update(Priority::UserBlocking, &mut ctx);
        child.force_update(&mut ctx);
        assert_eq!(child.priority(), Priority::UserBlocking);
    }

    #[test]
    fn disconnected_block_ignores_requests() {
        let rt = TestRuntime::sync();
        let (block, renders) = counting(&rt, None);
        let mut ctx = rt.context();
        block.disconnect(&mut ctx);
        block.request_update(Priority::UserBlocking, &mut ctx);
        assert_eq!(ctx.queue().block_count(), 0);
        ctx.flush().expect("flush");
        assert_eq!(renders.get(), 0);
    }

    #[test]
    fn body_access_by_type() {
        let rt = TestRuntime::sync();
        let (block, renders) = counting(&rt, None);
        let seen = block.with_body(|body: &mut Counting| Rc::ptr_eq(&body.renders, &renders));
        assert_eq!(seen, Some(true));
        assert!(block.with_body(|_: &mut NotABody| ()).is_none());
    }

    struct NotABody;

    impl BlockBody for NotABody {
        fn render(&mut self, _block: &Block, _ctx: &mut UpdateContext) -> Result<()> {
            Ok(())
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }
}
