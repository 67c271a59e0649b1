#![forbid(unsafe_code)]

//! Wiring for integration tests.

use std::rc::Rc;

use tracing::debug;
use weft_core::testing::RecordingSurface;
use weft_core::{Clock, LabClock, NodeId, RenderSurface, Result};
use weft_runtime::{Host, Root, Runtime, RuntimeConfig, StandardHost, UpdateContext, UpdaterKind, Value, mount};

use crate::registry::TemplateRegistry;

/// A recording surface with a `<main>` container, a [`StandardHost`] on a
/// lab clock, and a [`Runtime`].
pub struct Harness {
    pub surface: RecordingSurface,
    pub container: NodeId,
    pub clock: LabClock,
    pub host: Rc<StandardHost>,
    pub runtime: Runtime,
}

impl Harness {
    #[must_use]
    pub fn sync() -> Self {
        Self::build(RuntimeConfig::default(), TemplateRegistry::new())
    }

    #[must_use]
    pub fn concurrent() -> Self {
        Self::build(
            RuntimeConfig::default().with_updater(UpdaterKind::Concurrent),
            TemplateRegistry::new(),
        )
    }

    #[must_use]
    pub fn with_registry(updater: UpdaterKind, registry: TemplateRegistry) -> Self {
        Self::build(RuntimeConfig::default().with_updater(updater), registry)
    }

    #[must_use]
    pub fn build(config: RuntimeConfig, registry: TemplateRegistry) -> Self {
        let surface = RecordingSurface::new();
        let container = surface.create_element("main");
        surface.clear_ops();
        let clock = LabClock::new();
        let host = Rc::new(
            StandardHost::new(Rc::new(surface.clone()), config.clone())
                .with_clock(Clock::Lab(clock.clone()))
                .with_compiler(registry),
        );
        let runtime = Runtime::new(&config, Rc::clone(&host) as Rc<dyn Host>);
        debug!(updater = config.updater.as_str(), "harness ready");
        Self {
            surface,
            container,
            clock,
            host,
            runtime,
        }
    }

    /// Mount `value` and run it to completion.
    pub fn mount(&self, value: impl Into<Value>) -> Result<Root> {
        let root = mount(&self.runtime, value, self.container);
        root.wait_for_update()?;
        Ok(root)
    }

    /// Run host tasks until all scheduled work committed.
    pub fn settle(&self) -> Result<()> {
        self.runtime.wait_for_update()
    }

    /// Fresh transaction for driving bindings by hand.
    #[must_use]
    pub fn context(&self) -> UpdateContext {
        UpdateContext::new(self.runtime.clone())
    }

    /// Markup under the container, placeholders omitted.
    #[must_use]
    pub fn markup(&self) -> String {
        self.surface.inner_markup(self.container)
    }

    #[must_use]
    pub fn text(&self) -> String {
        self.surface.text_content(self.container)
    }
}
