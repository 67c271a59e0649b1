#![forbid(unsafe_code)]

//! Runtime: the fine-grained update engine.
//!
//! Values are resolved against [`Part`](weft_core::Part)s into
//! [`Binding`]s. Stateful render units ([`Block`]s) re-render when their
//! state changes; their output is diffed by bindings, and every surface
//! write is deferred into an [`UpdateQueue`] committed in three phases
//! (mutation, layout, passive). An [`Updater`] decides when queues flush:
//! [`SyncUpdater`] batches a microtask tick, [`ConcurrentUpdater`] renders
//! by priority and yields cooperatively.
//!
//! ```text
//!  Atom::set ─► SignalBinding ─► Block::request_update ─► UpdateQueue
//!                                                            │
//!                 Updater ◄──────────────────────────────────┘
//!                    │ render blocks (hooks, slots, lists)
//!                    ▼
//!          mutation ─► layout ─► passive   (Host::flush_effects)
//! ```

pub mod block;
pub mod component;
pub mod config;
pub mod context;
pub mod directive;
pub mod directives;
pub mod hooks;
pub mod host;
pub mod list;
pub mod primitive;
pub mod reactive;
pub mod root;
pub mod runtime;
pub mod scheduler;
pub mod template;
pub mod updater;

#[cfg(test)]
mod testing;

pub use block::{Block, BlockBody, BlockId, BlockState, WeakBlock};
pub use component::{Component, ComponentBinding, RenderFn};
pub use config::{RuntimeConfig, UpdaterKind};
pub use context::{Effect, UpdateContext, UpdateQueue};
pub use directive::{Binding, Directive, DirectiveKind, Slot, Value, ValueKind};
pub use directives::{ClassMap, NodeRef, StyleMap};
pub use hooks::{Cleanup, Dispatch, HookKind, RenderContext, SetState};
pub use host::{Host, StandardHost};
pub use list::{Key, KeyedList, PositionalList, ReconcileStats};
pub use reactive::{Atom, Computed, Projected, Signal, SignalExt, Subscription};
pub use root::{Root, mount};
pub use runtime::Runtime;
pub use scheduler::{Task, TaskQueue};
pub use template::{
    Template, TemplateBinding, TemplateCompiler, TemplateFragment, TemplateLiteral, TemplateMode, TemplateResult,
};
pub use updater::{ConcurrentUpdater, SyncUpdater, Updater};
