#![forbid(unsafe_code)]

//! Unit-test fixture: a recording surface, a container node, and a runtime
//! over a [`StandardHost`] with a lab clock.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use weft_core::testing::RecordingSurface;
use weft_core::{Clock, Error, LabClock, NodeId, RenderSurface, Result};
use web_time::Duration;

use crate::block::{Block, BlockBody};
use crate::config::{RuntimeConfig, UpdaterKind};
use crate::context::UpdateContext;
use crate::host::StandardHost;
use crate::runtime::Runtime;

pub(crate) struct TestRuntime {
    pub surface: RecordingSurface,
    pub container: NodeId,
    pub clock: LabClock,
    pub host: Rc<StandardHost>,
    pub runtime: Runtime,
}

impl TestRuntime {
    pub fn sync() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    pub fn concurrent() -> Self {
        Self::with_config(RuntimeConfig::default().with_updater(UpdaterKind::Concurrent))
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        let surface = RecordingSurface::new();
        let container = surface.create_element("main");
        let clock = LabClock::new();
        let host = Rc::new(
            StandardHost::new(Rc::new(surface.clone()), config.clone()).with_clock(Clock::Lab(clock.clone())),
        );
        let runtime = Runtime::new(&config, Rc::clone(&host) as Rc<dyn crate::host::Host>);
        Self {
            surface,
            container,
            clock,
            host,
            runtime,
        }
    }

    /// Fresh transaction against this runtime.
    pub fn context(&self) -> UpdateContext {
        UpdateContext::new(self.runtime.clone())
    }

    /// Root block that appends `name` to `log` and advances the lab clock by
    /// `cost` each render.
    pub fn log_block(&self, name: &'static str, log: &RenderLog, cost: Duration) -> Block {
        let body = LogBody {
            name,
            log: Rc::clone(log),
            clock: self.clock.clone(),
            cost,
        };
        Block::new(name, None, self.runtime.clone(), body)
    }

    /// Root block whose render always fails.
    pub fn failing_block(&self) -> Block {
        Block::new("failing", None, self.runtime.clone(), FailingBody)
    }
}

pub(crate) type RenderLog = Rc<RefCell<Vec<&'static str>>>;

struct LogBody {
    name: &'static str,
    log: RenderLog,
    clock: LabClock,
    cost: Duration,
}

impl BlockBody for LogBody {
    fn render(&mut self, _block: &Block, _ctx: &mut UpdateContext) -> Result<()> {
        self.log.borrow_mut().push(self.name);
        self.clock.advance(self.cost);
        Ok(())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

struct FailingBody;

impl BlockBody for FailingBody {
    fn render(&mut self, block: &Block, _ctx: &mut UpdateContext) -> Result<()> {
        Err(Error::MissingContext {
            type_name: "Theme",
            block: block.name().to_string(),
        })
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
