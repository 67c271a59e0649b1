#![forbid(unsafe_code)]

//! Template lookup by literal source.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use ahash::AHashMap;
use tracing::debug;
use weft_core::{Error, Result};
use weft_runtime::template::preview;
use weft_runtime::{Template, TemplateCompiler, TemplateMode};

/// Serves templates registered under the literal's joined source
/// (`strings.join("${}")`).
#[derive(Default)]
pub struct TemplateRegistry {
    templates: RefCell<AHashMap<(String, TemplateMode), Rc<dyn Template>>>,
    compiles: Rc<Cell<usize>>,
}

impl TemplateRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `template` for the literal whose pieces are `strings`.
    pub fn register(&self, strings: &[&str], mode: TemplateMode, template: Rc<dyn Template>) {
        self.templates
            .borrow_mut()
            .insert((strings.join("${}"), mode), template);
    }

    #[must_use]
    pub fn with(self, strings: &[&str], template: Rc<dyn Template>) -> Self {
        self.register(strings, TemplateMode::Html, template);
        self
    }

    /// Shared counter of [`TemplateCompiler::compile`] calls, readable after
    /// the registry moved into a host.
    #[must_use]
    pub fn compile_counter(&self) -> Rc<Cell<usize>> {
        Rc::clone(&self.compiles)
    }
}

impl TemplateCompiler for TemplateRegistry {
    fn compile(&self, strings: &'static [&'static str], mode: TemplateMode) -> Result<Rc<dyn Template>> {
        self.compiles.set(self.compiles.get() + 1);
        let found = self.templates.borrow().get(&(strings.join("${}"), mode)).cloned();
        debug!(found = found.is_some(), ?mode, "registry lookup");
        found.ok_or_else(|| Error::TemplateNotFound {
            source_preview: preview(strings),
        })
    }
}
