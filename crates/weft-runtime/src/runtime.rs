#![forbid(unsafe_code)]

//! The host/updater pair every transaction runs against.

use std::fmt;
use std::rc::Rc;

use tracing::debug;
use weft_core::Result;

use crate::config::{RuntimeConfig, UpdaterKind};
use crate::host::Host;
use crate::updater::{ConcurrentUpdater, SyncUpdater, Updater};

/// Cheap, cloneable handle to a host and its updater.
#[derive(Clone)]
pub struct Runtime {
    host: Rc<dyn Host>,
    updater: Rc<dyn Updater>,
}

impl Runtime {
    /// Pair `host` with the updater `config` selects.
    #[must_use]
    pub fn new(config: &RuntimeConfig, host: Rc<dyn Host>) -> Self {
        let updater: Rc<dyn Updater> = match config.updater {
            UpdaterKind::Sync => Rc::new(SyncUpdater::new()),
            UpdaterKind::Concurrent => Rc::new(ConcurrentUpdater::new()),
        };
        debug!(updater = config.updater.as_str(), "runtime created");
        Self { host, updater }
    }

    #[must_use]
    pub fn with_updater(host: Rc<dyn Host>, updater: Rc<dyn Updater>) -> Self {
        Self { host, updater }
    }

    #[must_use]
    pub fn host(&self) -> &Rc<dyn Host> {
        &self.host
    }

    #[must_use]
    pub fn updater(&self) -> &Rc<dyn Updater> {
        &self.updater
    }

    /// Pump host tasks until no scheduled work remains.
    pub fn wait_for_update(&self) -> Result<()> {
        self.updater.wait_for_update(self.host.as_ref())
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("updater", &self.updater.name())
            .field("pending", &self.updater.is_pending())
            .finish()
    }
}
