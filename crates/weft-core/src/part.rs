#![forbid(unsafe_code)]

//! Part descriptors: *where* a value attaches on the render surface.
//!
//! A [`Part`] is created once by the template layer and never mutated. Six
//! kinds exist; attribute, property, and event parts additionally carry the
//! name they write to.

use std::fmt;
use std::rc::Rc;

/// Opaque handle to a node owned by the render surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

impl NodeId {
    /// Create a node handle from a raw value.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw handle value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Discriminant of a [`Part`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartKind {
    Attribute,
    Property,
    Event,
    Element,
    /// An anchor node; content is inserted before it.
    ChildSlot,
    /// A text node whose data is replaced.
    TextSlot,
}

impl PartKind {
    /// Stable lowercase name, used in error messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Attribute => "attribute",
            Self::Property => "property",
            Self::Event => "event",
            Self::Element => "element",
            Self::ChildSlot => "child-slot",
            Self::TextSlot => "text-slot",
        }
    }
}

impl fmt::Display for PartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable attachment point on the render surface.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Part {
    Attribute { node: NodeId, name: Rc<str> },
    Property { node: NodeId, name: Rc<str> },
    Event { node: NodeId, name: Rc<str> },
    Element { node: NodeId },
    ChildSlot { anchor: NodeId },
    TextSlot { node: NodeId },
}

impl Part {
    #[must_use]
    pub fn attribute(node: NodeId, name: impl Into<Rc<str>>) -> Self {
        Self::Attribute {
            node,
            name: name.into(),
        }
    }

    #[must_use]
    pub fn property(node: NodeId, name: impl Into<Rc<str>>) -> Self {
        Self::Property {
            node,
            name: name.into(),
        }
    }

    #[must_use]
    pub fn event(node: NodeId, name: impl Into<Rc<str>>) -> Self {
        Self::Event {
            node,
            name: name.into(),
        }
    }

    #[must_use]
    pub const fn element(node: NodeId) -> Self {
        Self::Element { node }
    }

    #[must_use]
    pub const fn child_slot(anchor: NodeId) -> Self {
        Self::ChildSlot { anchor }
    }

    #[must_use]
    pub const fn text_slot(node: NodeId) -> Self {
        Self::TextSlot { node }
    }

    #[must_use]
    pub fn kind(&self) -> PartKind {
        match self {
            Self::Attribute { .. } => PartKind::Attribute,
            Self::Property { .. } => PartKind::Property,
            Self::Event { .. } => PartKind::Event,
            Self::Element { .. } => PartKind::Element,
            Self::ChildSlot { .. } => PartKind::ChildSlot,
            Self::TextSlot { .. } => PartKind::TextSlot,
        }
    }

    /// The node this part targets. For child slots this is the anchor.
    #[must_use]
    pub fn node(&self) -> NodeId {
        match self {
            Self::Attribute { node, .. }
            | Self::Property { node, .. }
            | Self::Event { node, .. }
            | Self::Element { node }
            | Self::TextSlot { node } => *node,
            Self::ChildSlot { anchor } => *anchor,
        }
    }

    /// Attribute, property, or event name, if this kind carries one.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Attribute { name, .. } | Self::Property { name, .. } | Self::Event { name, .. } => {
                Some(name)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_and_node_are_consistent() {
        let n = NodeId::new(7);
        let cases = [
            (Part::attribute(n, "class"), PartKind::Attribute, Some("class")),
            (Part::property(n, "value"), PartKind::Property, Some("value")),
            (Part::event(n, "click"), PartKind::Event, Some("click")),
            (Part::element(n), PartKind::Element, None),
            (Part::child_slot(n), PartKind::ChildSlot, None),
            (Part::text_slot(n), PartKind::TextSlot, None),
        ];
        for (part, kind, name) in cases {
            assert_eq!(part.kind(), kind);
            assert_eq!(part.node(), n);
            assert_eq!(part.name(), name);
        }
    }

    #[test]
    fn display_names() {
        assert_eq!(PartKind::ChildSlot.to_string(), "child-slot");
        assert_eq!(NodeId::new(3).to_string(), "#3");
    }
}
