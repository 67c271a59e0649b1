#![forbid(unsafe_code)]

//! Scheduling strategies.
//!
//! An [`Updater`] receives the queue of a finished render request and
//! decides when its blocks render and its effects commit.
//!
//! - [`SyncUpdater`]: batch everything scheduled in one tick, flush once on
//!   a microtask.
//! - [`ConcurrentUpdater`]: one pipeline per request, rendered at the
//!   queue's priority with cooperative yielding.

mod concurrent;
mod sync;

pub use concurrent::ConcurrentUpdater;
pub use sync::SyncUpdater;

use weft_core::{Error, Result};

use crate::context::UpdateQueue;
use crate::host::Host;
use crate::runtime::Runtime;

pub trait Updater {
    fn name(&self) -> &'static str;

    /// Take ownership of `queue` and arrange for it to be flushed.
    fn schedule_update(&self, queue: UpdateQueue, runtime: &Runtime);

    /// Whether scheduled work has not finished yet.
    fn is_pending(&self) -> bool;

    /// First fatal error raised by a scheduled flush since the last call.
    fn take_error(&self) -> Option<Error>;

    /// Run host tasks until nothing is pending, then report any stored
    /// error.
    fn wait_for_update(&self, host: &dyn Host) -> Result<()> {
        while self.is_pending() {
            if !host.run_pending_task() {
                break;
            }
        }
        self.take_error().map_or(Ok(()), Err)
    }
}
