#![forbid(unsafe_code)]

//! Positional hooks and the [`RenderContext`] handed to render functions.
//!
//! Every hook call consumes the next slot of the block's [`HookList`]. The
//! first render records slots; `finish` appends a Finalizer and seals the
//! list. Later renders must replay the same sequence:
//!
//! - a slot of another type is [`Error::HookMismatch`];
//! - a hook where the Finalizer sits is [`Error::HookAfterFinalize`];
//! - stopping short of the Finalizer is [`Error::HookCountMismatch`].
//!
//! Dependencies are `Option<D>`: `None` re-runs every render, `Some(())`
//! runs once, anything else re-runs when it compares unequal.

use std::any::{Any, TypeId, type_name};
use std::cell::RefCell;
use std::fmt;
use std::iter;
use std::rc::Rc;

use tracing::trace;
use weft_core::{CommitPhase, Error, Priority, RenderSurface, Result};

use crate::block::{Block, WeakBlock};
use crate::context::UpdateContext;
use crate::host::Host;
use crate::reactive::Signal;

/// Teardown returned by an effect, run before the next run or on unmount.
pub type Cleanup = Option<Box<dyn FnOnce()>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookKind {
    InsertionEffect,
    LayoutEffect,
    PassiveEffect,
    Identifier,
    Memo,
    Reducer,
    Finalizer,
}

impl HookKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InsertionEffect => "insertion-effect",
            Self::LayoutEffect => "layout-effect",
            Self::PassiveEffect => "passive-effect",
            Self::Identifier => "identifier",
            Self::Memo => "memo",
            Self::Reducer => "reducer",
            Self::Finalizer => "finalizer",
        }
    }

    const fn phase(self) -> CommitPhase {
        match self {
            Self::InsertionEffect => CommitPhase::Mutation,
            Self::LayoutEffect => CommitPhase::Layout,
            _ => CommitPhase::Passive,
        }
    }
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

type CleanupCell = Rc<RefCell<Cleanup>>;

enum Hook {
    Effect {
        kind: HookKind,
        deps: Option<Box<dyn Any>>,
        /// Set on unmount so the effect runs again on remount.
        stale: bool,
        cleanup: CleanupCell,
    },
    Identifier(u64),
    Memo {
        value: Rc<dyn Any>,
        deps: Option<Box<dyn Any>>,
    },
    Reducer(Rc<dyn Any>),
    Finalizer,
}

impl Hook {
    fn kind(&self) -> HookKind {
        match self {
            Self::Effect { kind, .. } => *kind,
            Self::Identifier(_) => HookKind::Identifier,
            Self::Memo { .. } => HookKind::Memo,
            Self::Reducer(_) => HookKind::Reducer,
            Self::Finalizer => HookKind::Finalizer,
        }
    }
}

/// Ordered hook slots of one block.
#[derive(Default)]
pub struct HookList {
    hooks: Vec<Hook>,
    cursor: usize,
    sealed: bool,
}

impl HookList {
    #[must_use]
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    #[must_use]
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub(crate) fn rewind(&mut self) {
        self.cursor = 0;
    }

    /// Claim the next slot. `Some(index)` for an existing slot of `kind`,
    /// `None` when a new slot must be recorded.
    fn advance(&mut self, kind: HookKind, block: &str) -> Result<Option<usize>> {
        let index = self.cursor;
        self.cursor += 1;
        match self.hooks.get(index) {
            Some(hook) if hook.kind() == HookKind::Finalizer => Err(Error::HookAfterFinalize {
                block: block.to_string(),
                index,
            }),
            Some(hook) if hook.kind() != kind => Err(Error::HookMismatch {
                block: block.to_string(),
                index,
                expected: hook.kind().as_str(),
                actual: kind.as_str(),
            }),
            Some(_) => Ok(Some(index)),
            None if self.sealed => Err(Error::HookAfterFinalize {
                block: block.to_string(),
                index,
            }),
            None => Ok(None),
        }
    }

    fn record(&mut self, hook: Hook) {
        self.hooks.push(hook);
    }

    /// Seal on the first render; afterwards check the Finalizer was reached.
    pub(crate) fn finalize(&mut self, block: &str) -> Result<()> {
        if !self.sealed {
            self.hooks.push(Hook::Finalizer);
            self.sealed = true;
            return Ok(());
        }
        match self.hooks.get(self.cursor) {
            Some(Hook::Finalizer) => Ok(()),
            _ => Err(Error::HookCountMismatch {
                block: block.to_string(),
                expected: self.hooks.len().saturating_sub(1),
                actual: self.cursor,
            }),
        }
    }

    pub(crate) fn unmount_effects(&mut self, ctx: &mut UpdateContext) {
        for hook in &mut self.hooks {
            if let Hook::Effect {
                kind, stale, cleanup, ..
            } = hook
            {
                *stale = true;
                let cleanup = Rc::clone(cleanup);
                ctx.enqueue_effect(kind.phase(), move |_: &dyn RenderSurface| {
                    let pending = cleanup.borrow_mut().take();
                    if let Some(pending) = pending {
                        pending();
                    }
                });
            }
        }
    }
}

fn deps_changed<D: PartialEq + 'static>(old: Option<&dyn Any>, new: Option<&D>) -> bool {
    match (old, new) {
        (_, None) | (None, Some(_)) => true,
        (Some(old), Some(new)) => old.downcast_ref::<D>() != Some(new),
    }
}

fn boxed_deps<D: 'static>(deps: Option<D>) -> Option<Box<dyn Any>> {
    deps.map(|d| Box::new(d) as Box<dyn Any>)
}

// ---------------------------------------------------------------------------
// Reducer plumbing
// ---------------------------------------------------------------------------

trait Dispatcher<A> {
    fn dispatch(&self, action: A, priority: Option<Priority>);
}

struct ReducerCell<S, A> {
    state: RefCell<Rc<S>>,
    reducer: RefCell<Rc<dyn Fn(&S, A) -> S>>,
    block: WeakBlock,
}

impl<S: PartialEq + 'static, A: 'static> Dispatcher<A> for ReducerCell<S, A> {
    fn dispatch(&self, action: A, priority: Option<Priority>) {
        let reducer = Rc::clone(&self.reducer.borrow());
        let current = Rc::clone(&self.state.borrow());
        let next = reducer(&current, action);
        if next == *current {
            return;
        }
        *self.state.borrow_mut() = Rc::new(next);
        if let Some(block) = self.block.upgrade() {
            let priority = priority.unwrap_or_else(|| block.runtime().host().current_priority());
            trace!(block = %block.name(), priority = %priority, "state changed");
            block.schedule_update(priority);
        }
    }
}

/// Dispatch function returned by [`RenderContext::use_reducer`].
pub struct Dispatch<A> {
    target: Rc<dyn Dispatcher<A>>,
}

/// Setter returned by [`RenderContext::use_state`].
pub type SetState<S> = Dispatch<S>;

impl<A> Clone for Dispatch<A> {
    fn clone(&self) -> Self {
        Self {
            target: Rc::clone(&self.target),
        }
    }
}

impl<A> Dispatch<A> {
    /// Apply `action`; schedules a render at the host's current priority
    /// when the state changes.
    pub fn dispatch(&self, action: A) {
        self.target.dispatch(action, None);
    }

    pub fn dispatch_with_priority(&self, action: A, priority: Priority) {
        self.target.dispatch(action, Some(priority));
    }

    /// Whether both handles update the same hook.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.target, &other.target)
    }
}

impl<A> fmt::Debug for Dispatch<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Dispatch(..)")
    }
}

// ---------------------------------------------------------------------------
// RenderContext
// ---------------------------------------------------------------------------

/// Hook API available to a render function.
pub struct RenderContext<'a> {
    block: &'a Block,
    ctx: &'a mut UpdateContext,
}

impl<'a> RenderContext<'a> {
    pub(crate) fn new(block: &'a Block, ctx: &'a mut UpdateContext) -> Self {
        Self { block, ctx }
    }

    #[must_use]
    pub fn block(&self) -> &Block {
        self.block
    }

    #[must_use]
    pub fn host(&self) -> Rc<dyn Host> {
        Rc::clone(self.ctx.host())
    }

    #[must_use]
    pub fn current_priority(&self) -> Priority {
        self.ctx.host().current_priority()
    }

    /// Seal or validate the hook list.
    pub(crate) fn finish(self) -> Result<()> {
        self.block.hooks().borrow_mut().finalize(self.block.name())
    }

    fn effect<D: PartialEq + 'static>(
        &mut self,
        kind: HookKind,
        deps: Option<D>,
        effect: impl FnOnce() -> Cleanup + 'static,
    ) -> Result<()> {
        let run = {
            let mut hooks = self.block.hooks().borrow_mut();
            match hooks.advance(kind, self.block.name())? {
                Some(index) => match hooks.hooks.get_mut(index) {
                    Some(Hook::Effect {
                        deps: old,
                        stale,
                        cleanup,
                        ..
                    }) => {
                        let changed = *stale || deps_changed(old.as_deref(), deps.as_ref());
                        if changed {
                            *old = boxed_deps(deps);
                            *stale = false;
                        }
                        changed.then(|| Rc::clone(cleanup))
                    }
                    _ => None,
                },
                None => {
                    let cleanup: CleanupCell = Rc::new(RefCell::new(None));
                    hooks.record(Hook::Effect {
                        kind,
                        deps: boxed_deps(deps),
                        stale: false,
                        cleanup: Rc::clone(&cleanup),
                    });
                    Some(cleanup)
                }
            }
        };
        if let Some(cell) = run {
            self.ctx
                .enqueue_effect(kind.phase(), move |_: &dyn RenderSurface| {
                    let previous = cell.borrow_mut().take();
                    if let Some(previous) = previous {
                        previous();
                    }
                    let next = effect();
                    *cell.borrow_mut() = next;
                });
        }
        Ok(())
    }

    /// Passive effect, committed after layout.
    pub fn use_effect<D: PartialEq + 'static>(
        &mut self,
        deps: Option<D>,
        effect: impl FnOnce() -> Cleanup + 'static,
    ) -> Result<()> {
        self.effect(HookKind::PassiveEffect, deps, effect)
    }

    /// Effect committed right after surface mutations.
    pub fn use_layout_effect<D: PartialEq + 'static>(
        &mut self,
        deps: Option<D>,
        effect: impl FnOnce() -> Cleanup + 'static,
    ) -> Result<()> {
        self.effect(HookKind::LayoutEffect, deps, effect)
    }

    /// Effect committed with the surface mutations themselves.
    pub fn use_insertion_effect<D: PartialEq + 'static>(
        &mut self,
        deps: Option<D>,
        effect: impl FnOnce() -> Cleanup + 'static,
    ) -> Result<()> {
        self.effect(HookKind::InsertionEffect, deps, effect)
    }

    /// Stable identifier for this hook slot.
    pub fn use_id(&mut self) -> Result<u64> {
        let mut hooks = self.block.hooks().borrow_mut();
        match hooks.advance(HookKind::Identifier, self.block.name())? {
            Some(index) => match hooks.hooks.get(index) {
                Some(Hook::Identifier(id)) => Ok(*id),
                _ => Ok(0),
            },
            None => {
                let id = self.ctx.host().next_identifier();
                hooks.record(Hook::Identifier(id));
                Ok(id)
            }
        }
    }

    /// Value recomputed only when `deps` change.
    pub fn use_memo<T: Clone + 'static, D: PartialEq + 'static>(
        &mut self,
        deps: Option<D>,
        compute: impl FnOnce() -> T,
    ) -> Result<T> {
        let existing = {
            let mut hooks = self.block.hooks().borrow_mut();
            let existing = hooks.advance(HookKind::Memo, self.block.name())?;
            if let Some(index) = existing
                && let Some(Hook::Memo { value, deps: old }) = hooks.hooks.get(index)
                && !deps_changed(old.as_deref(), deps.as_ref())
                && let Some(cached) = value.downcast_ref::<T>()
            {
                return Ok(cached.clone());
            }
            existing
        };
        let fresh = compute();
        let mut hooks = self.block.hooks().borrow_mut();
        let memo = Hook::Memo {
            value: Rc::new(fresh.clone()),
            deps: boxed_deps(deps),
        };
        match existing {
            Some(index) if index < hooks.len() => hooks.hooks[index] = memo,
            _ => hooks.record(memo),
        }
        Ok(fresh)
    }

    /// Memoized callback handle.
    pub fn use_callback<F: 'static, D: PartialEq + 'static>(&mut self, deps: Option<D>, callback: F) -> Result<Rc<F>> {
        self.use_memo(deps, move || Rc::new(callback))
    }

    /// Mutable cell that lives as long as the block.
    pub fn use_ref<T: 'static>(&mut self, init: impl FnOnce() -> T) -> Result<Rc<RefCell<T>>> {
        self.use_memo(Some(()), move || Rc::new(RefCell::new(init())))
    }

    /// State driven by `reducer`. The latest reducer is used for dispatches.
    pub fn use_reducer<S, A>(
        &mut self,
        reducer: impl Fn(&S, A) -> S + 'static,
        init: impl FnOnce() -> S,
    ) -> Result<(Rc<S>, Dispatch<A>)>
    where
        S: PartialEq + 'static,
        A: 'static,
    {
        let mut hooks = self.block.hooks().borrow_mut();
        let cell = match hooks.advance(HookKind::Reducer, self.block.name())? {
            Some(index) => match hooks.hooks.get(index) {
                Some(Hook::Reducer(any)) => Rc::clone(any).downcast::<ReducerCell<S, A>>().ok(),
                _ => None,
            },
            None => None,
        };
        let cell = match cell {
            Some(cell) => {
                *cell.reducer.borrow_mut() = Rc::new(reducer) as Rc<dyn Fn(&S, A) -> S>;
                cell
            }
            None => {
                let cell = Rc::new(ReducerCell {
                    state: RefCell::new(Rc::new(init())),
                    reducer: RefCell::new(Rc::new(reducer) as Rc<dyn Fn(&S, A) -> S>),
                    block: self.block.downgrade(),
                });
                let index = hooks.cursor - 1;
                let hook = Hook::Reducer(Rc::clone(&cell) as Rc<dyn Any>);
                if index < hooks.len() {
                    hooks.hooks[index] = hook;
                } else {
                    hooks.record(hook);
                }
                cell
            }
        };
        let state = Rc::clone(&cell.state.borrow());
        Ok((state, Dispatch { target: cell }))
    }

    /// State replaced wholesale by its setter.
    pub fn use_state<S: PartialEq + 'static>(&mut self, init: impl FnOnce() -> S) -> Result<(Rc<S>, SetState<S>)> {
        self.use_reducer(|_: &S, next: S| next, init)
    }

    /// Subscribe this block to `signal` and read its value.
    ///
    /// The subscription follows the signal identity and is released with
    /// the block.
    pub fn use_signal<T, S>(&mut self, signal: &S) -> Result<T>
    where
        S: Signal<T> + Clone + 'static,
    {
        let block = self.block.downgrade();
        let source = signal.clone();
        self.use_memo(Some(signal.signal_id()), move || {
            Rc::new(source.subscribe(Rc::new(move || {
                if let Some(block) = block.upgrade() {
                    let priority = block.runtime().host().current_priority();
                    block.schedule_update(priority);
                }
            })))
        })?;
        Ok(signal.value())
    }

    /// Make `value` visible to this block and its descendants.
    pub fn provide_context<T: 'static>(&mut self, value: T) {
        self.ctx
            .host()
            .set_scoped_value(self.block.id(), TypeId::of::<T>(), Rc::new(value));
    }

    /// Nearest provided value of type `T`, searching this block first.
    pub fn use_context<T: Clone + 'static>(&self) -> Result<T> {
        let host = self.ctx.host();
        for block in iter::once(self.block.clone()).chain(self.block.ancestors()) {
            if let Some(value) = host.get_scoped_value(block.id(), TypeId::of::<T>())
                && let Ok(value) = value.downcast::<T>()
            {
                return Ok((*value).clone());
            }
        }
        Err(Error::MissingContext {
            type_name: type_name::<T>(),
            block: self.block.name().to_string(),
        })
    }
}
