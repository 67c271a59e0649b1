#![forbid(unsafe_code)]

//! Canonical event payload delivered to listeners attached through event parts.

use std::rc::Rc;

use crate::part::NodeId;
use crate::scalar::Scalar;

/// An event dispatched by the render surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Event type, e.g. `"click"`.
    pub name: Rc<str>,
    /// Node the event was dispatched on.
    pub target: NodeId,
    /// Host-defined payload (input value, key, ...).
    pub detail: Scalar,
}

impl Event {
    #[must_use]
    pub fn new(name: impl Into<Rc<str>>, target: NodeId) -> Self {
        Self {
            name: name.into(),
            target,
            detail: Scalar::None,
        }
    }

    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<Scalar>) -> Self {
        self.detail = detail.into();
        self
    }
}

/// A listener callback. Identity (for removal) is the `Rc` pointer.
pub type EventListener = Rc<dyn Fn(&Event)>;
