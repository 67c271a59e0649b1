#![forbid(unsafe_code)]

//! Signals: versioned observable values that plug into the binding graph.
//!
//! - [`Atom`]: a mutable cell; every write bumps the version and notifies.
//! - [`Computed`]: a memoized combinator whose version is the sum of its
//!   dependencies' versions.
//! - [`Projected`]: an unmemoized map over one upstream signal.
//!
//! # Architecture
//!
//! Handles share `Rc` interiors, single-threaded. Subscribers are stored as
//! `Weak` callbacks; the [`Subscription`] guard owns the strong side, so
//! dropping it unsubscribes. Dead entries are pruned lazily on notify.
//!
//! A signal converted into a [`Value`](crate::Value) renders as a
//! directive: its binding subscribes while mounted and, on notification,
//! schedules a rebind of the inner value.
//!
//! # Invariants
//!
//! 1. Versions never decrease.
//! 2. Subscribers are notified synchronously, in registration order.
//! 3. A dropped [`Subscription`] is never called again.

pub mod atom;
pub mod binding;
pub mod computed;
pub mod projected;
pub mod signal;

pub use atom::Atom;
pub use binding::{SignalBinding, SignalDirective};
pub use computed::Computed;
pub use projected::Projected;
pub use signal::{Signal, SignalExt, SignalId, Source, Subscription};
