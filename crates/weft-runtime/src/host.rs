#![forbid(unsafe_code)]

//! The host boundary.
//!
//! [`Host`] is everything the engine needs from its environment: a render
//! surface, a template compiler, priority and time queries, task scheduling,
//! and a per-block store for scoped (context) values. [`StandardHost`] is the
//! in-process implementation backed by a [`TaskQueue`].

use std::any::{Any, TypeId};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use ahash::AHashMap;
use tracing::{debug, trace};
use weft_core::{Clock, CommitPhase, Error, Part, Priority, RenderSurface, Result};
use web_time::{Duration, Instant};

use crate::block::BlockId;
use crate::config::RuntimeConfig;
use crate::context::Effect;
use crate::directive::{Binding, Value};
use crate::primitive;
use crate::scheduler::{Task, TaskQueue};
use crate::template::{Template, TemplateCompiler, TemplateMode, preview};

/// Environment services used by the engine.
pub trait Host {
    fn surface(&self) -> &dyn RenderSurface;

    /// Priority of the work currently running.
    fn current_priority(&self) -> Priority;

    /// Compiled template for a literal's static strings, cached by identity.
    fn get_template(&self, strings: &'static [&'static str], mode: TemplateMode) -> Result<Rc<dyn Template>>;

    fn get_scoped_value(&self, block: BlockId, key: TypeId) -> Option<Rc<dyn Any>>;
    fn set_scoped_value(&self, block: BlockId, key: TypeId, value: Rc<dyn Any>);
    fn clear_scoped_values(&self, block: BlockId);

    /// Fresh, never-reused identifier.
    fn next_identifier(&self) -> u64;

    fn now(&self) -> Instant;

    /// Whether a render slice that has run for `elapsed` should yield.
    fn should_yield_to_main(&self, elapsed: Duration) -> bool;

    fn queue_microtask(&self, task: Task);
    fn request_callback(&self, priority: Priority, task: Task);

    /// Give the event loop a turn, then continue with `continuation`.
    fn yield_to_main(&self, priority: Priority, continuation: Task) {
        self.request_callback(priority, continuation);
    }

    /// Run one queued task. Returns `false` when nothing was queued.
    fn run_pending_task(&self) -> bool;

    /// Commit a batch of effects for `phase`.
    fn flush_effects(&self, effects: Vec<Box<dyn Effect>>, phase: CommitPhase) {
        trace!(phase = phase.as_str(), count = effects.len(), "flush effects");
        let surface = self.surface();
        for effect in effects {
            effect.commit(surface);
        }
    }

    /// Binding for a plain (non-directive) value.
    fn resolve_primitive(&self, value: Value, part: &Part) -> Result<Box<dyn Binding>> {
        primitive::resolve_primitive(value, part, self.surface())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct TemplateKey {
    strings: usize,
    len: usize,
    mode: TemplateMode,
}

/// In-process [`Host`] driven by a [`TaskQueue`].
pub struct StandardHost {
    surface: Rc<dyn RenderSurface>,
    config: RuntimeConfig,
    tasks: TaskQueue,
    compiler: Option<Box<dyn TemplateCompiler>>,
    templates: RefCell<AHashMap<TemplateKey, Rc<dyn Template>>>,
    scoped: RefCell<AHashMap<BlockId, AHashMap<TypeId, Rc<dyn Any>>>>,
    next_id: Cell<u64>,
    priority_override: Cell<Option<Priority>>,
}

impl StandardHost {
    #[must_use]
    pub fn new(surface: Rc<dyn RenderSurface>, config: RuntimeConfig) -> Self {
        Self {
            surface,
            config,
            tasks: TaskQueue::default(),
            compiler: None,
            templates: RefCell::new(AHashMap::new()),
            scoped: RefCell::new(AHashMap::new()),
            next_id: Cell::new(0),
            priority_override: Cell::new(None),
        }
    }

    /// Use `clock` for time queries (e.g. a lab clock in tests).
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.tasks = TaskQueue::new(clock);
        self
    }

    #[must_use]
    pub fn with_compiler(mut self, compiler: impl TemplateCompiler + 'static) -> Self {
        self.compiler = Some(Box::new(compiler));
        self
    }

    #[must_use]
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    #[must_use]
    pub fn tasks(&self) -> &TaskQueue {
        &self.tasks
    }

    /// Run `f` with `priority` reported as current, e.g. from an input
    /// handler.
    pub fn run_with_priority<R>(&self, priority: Priority, f: impl FnOnce() -> R) -> R {
        let previous = self.priority_override.replace(Some(priority));
        let out = f();
        self.priority_override.set(previous);
        out
    }

    /// Run every queued task. Returns the number run.
    pub fn run_until_idle(&self) -> usize {
        self.tasks.run_until_idle()
    }

    /// Number of blocks with scoped values stored.
    #[must_use]
    pub fn scoped_block_count(&self) -> usize {
        self.scoped.borrow().len()
    }
}

impl Host for StandardHost {
    fn surface(&self) -> &dyn RenderSurface {
        self.surface.as_ref()
    }

    fn current_priority(&self) -> Priority {
        self.priority_override
            .get()
            .or_else(|| self.tasks.current_priority())
            .unwrap_or(self.config.default_priority)
    }

    fn get_template(&self, strings: &'static [&'static str], mode: TemplateMode) -> Result<Rc<dyn Template>> {
        let key = TemplateKey {
            strings: strings.as_ptr() as usize,
            len: strings.len(),
            mode,
        };
        if let Some(template) = self.templates.borrow().get(&key) {
            return Ok(Rc::clone(template));
        }
        let Some(compiler) = self.compiler.as_ref() else {
            return Err(Error::TemplateNotFound {
                source_preview: preview(strings),
            });
        };
        let template = compiler.compile(strings, mode)?;
        debug!(holes = template.hole_count(), mode = ?mode, "compiled template");
        self.templates.borrow_mut().insert(key, Rc::clone(&template));
        Ok(template)
    }

    fn get_scoped_value(&self, block: BlockId, key: TypeId) -> Option<Rc<dyn Any>> {
        self.scoped
            .borrow()
            .get(&block)
            .and_then(|values| values.get(&key))
            .cloned()
    }

    fn set_scoped_value(&self, block: BlockId, key: TypeId, value: Rc<dyn Any>) {
        self.scoped.borrow_mut().entry(block).or_default().insert(key, value);
    }

    fn clear_scoped_values(&self, block: BlockId) {
        // Drop values outside the borrow; they may own blocks.
        let removed = self.scoped.borrow_mut().remove(&block);
        drop(removed);
    }

    fn next_identifier(&self) -> u64 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }

    fn now(&self) -> Instant {
        self.tasks.now()
    }

    fn should_yield_to_main(&self, elapsed: Duration) -> bool {
        elapsed >= self.config.frame_budget
    }

    fn queue_microtask(&self, task: Task) {
        self.tasks.queue_microtask(task);
    }

    fn request_callback(&self, priority: Priority, task: Task) {
        self.tasks.request_callback(priority, task);
    }

    fn run_pending_task(&self) -> bool {
        self.tasks.run_next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_core::testing::RecordingSurface;

    fn host() -> StandardHost {
        StandardHost::new(Rc::new(RecordingSurface::new()), RuntimeConfig::default())
    }

    #[test]
    fn identifiers_are_unique() {
        let host = host();
        let a = host.next_identifier();
        let b = host.next_identifier();
        assert_ne!(a, b);
    }

    #[test]
    fn priority_falls_back_to_config() {
        let host = host();
        assert_eq!(host.current_priority(), Priority::UserVisible);
        let inside = host.run_with_priority(Priority::UserBlocking, || host.current_priority());
        assert_eq!(inside, Priority::UserBlocking);
        assert_eq!(host.current_priority(), Priority::UserVisible);
    }

    #[test]
    fn scoped_values_are_per_block() {
        let host = host();
        let (a, b) = (BlockId::new(1), BlockId::new(2));
        host.set_scoped_value(a, TypeId::of::<u32>(), Rc::new(7u32));
        let got = host
            .get_scoped_value(a, TypeId::of::<u32>())
            .and_then(|v| v.downcast::<u32>().ok());
        assert_eq!(got.as_deref(), Some(&7));
        assert!(host.get_scoped_value(b, TypeId::of::<u32>()).is_none());
        host.clear_scoped_values(a);
        assert!(host.get_scoped_value(a, TypeId::of::<u32>()).is_none());
        assert_eq!(host.scoped_block_count(), 0);
    }

    #[test]
    fn missing_compiler_reports_template() {
        static STRINGS: [&str; 2] = ["<p>", "</p>"];
        let err = host().get_template(&STRINGS, TemplateMode::Html).err();
        assert!(matches!(err, Some(Error::TemplateNotFound { .. })));
    }

    #[test]
    fn yield_predicate_uses_frame_budget() {
        let host = host();
        assert!(!host.should_yield_to_main(Duration::from_millis(4)));
        assert!(host.should_yield_to_main(Duration::from_millis(5)));
    }
}
