#![forbid(unsafe_code)]

//! Core: render-surface contract, part descriptors, priorities, and errors.
//!
//! Everything here is shared by the update engine in `weft-runtime` and the
//! host that embeds it. No scheduling or binding logic lives in this crate.

pub mod clock;
pub mod error;
pub mod event;
pub mod part;
pub mod priority;
pub mod scalar;
pub mod surface;

#[cfg(any(test, feature = "test-helpers"))]
pub mod testing;

pub use clock::{Clock, LabClock};
pub use error::{Error, Result};
pub use event::{Event, EventListener};
pub use part::{NodeId, Part, PartKind};
pub use priority::{CommitPhase, Priority};
pub use scalar::Scalar;
pub use surface::RenderSurface;
