#![forbid(unsafe_code)]

//! Programmatic templates.
//!
//! ```
//! use weft_harness::TemplateBuilder;
//!
//! // <li class=${}>${}<button @click=${}>x</button></li>
//! let item = TemplateBuilder::new()
//!     .open("li")
//!     .attribute_hole("class")
//!     .child_hole()
//!     .open("button")
//!     .event_hole("click")
//!     .text("x")
//!     .close()
//!     .close()
//!     .build();
//! assert_eq!(weft_runtime::Template::hole_count(&*item), 3);
//! ```

use std::rc::Rc;

use weft_core::{NodeId, Part, RenderSurface};
use weft_runtime::{Template, TemplateFragment};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Hole {
    Attribute(Rc<str>),
    Property(Rc<str>),
    Event(Rc<str>),
    Element,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TemplateNode {
    Element {
        tag: Rc<str>,
        attributes: Vec<(Rc<str>, Rc<str>)>,
        holes: Vec<Hole>,
        children: Vec<TemplateNode>,
    },
    Text(Rc<str>),
    /// Placeholder anchor for a child slot.
    ChildHole,
    /// Text node whose data is a hole.
    TextHole,
}

/// Immutable template tree; every [`Template::instantiate`] stamps a copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticTemplate {
    roots: Vec<TemplateNode>,
    holes: usize,
}

impl StaticTemplate {
    fn stamp(node: &TemplateNode, surface: &dyn RenderSurface, parts: &mut Vec<Part>) -> NodeId {
        match node {
            TemplateNode::Element {
                tag,
                attributes,
                holes,
                children,
            } => {
                let element = surface.create_element(tag);
                for (name, value) in attributes {
                    surface.set_attribute(element, name, value);
                }
                for hole in holes {
                    parts.push(match hole {
                        Hole::Attribute(name) => Part::attribute(element, Rc::clone(name)),
                        Hole::Property(name) => Part::property(element, Rc::clone(name)),
                        Hole::Event(name) => Part::event(element, Rc::clone(name)),
                        Hole::Element => Part::element(element),
                    });
                }
                for child in children {
                    let child = Self::stamp(child, surface, parts);
                    surface.append_child(element, child);
                }
                element
            }
            TemplateNode::Text(text) => surface.create_text(text),
            TemplateNode::ChildHole => {
                let anchor = surface.create_placeholder();
                parts.push(Part::child_slot(anchor));
                anchor
            }
            TemplateNode::TextHole => {
                let node = surface.create_text("");
                parts.push(Part::text_slot(node));
                node
            }
        }
    }
}

impl Template for StaticTemplate {
    fn instantiate(&self, surface: &dyn RenderSurface) -> TemplateFragment {
        let mut parts = Vec::with_capacity(self.holes);
        let nodes = self
            .roots
            .iter()
            .map(|root| Self::stamp(root, surface, &mut parts))
            .collect();
        TemplateFragment { nodes, parts }
    }

    fn hole_count(&self) -> usize {
        self.holes
    }
}

/// Builder for [`StaticTemplate`].
///
/// Element holes and attributes apply to the innermost open element. An
/// element's own holes are numbered before any hole among its children.
#[derive(Debug, Default)]
pub struct TemplateBuilder {
    roots: Vec<TemplateNode>,
    open: Vec<TemplateNode>,
    holes: usize,
}

impl TemplateBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, node: TemplateNode) {
        match self.open.last_mut() {
            Some(TemplateNode::Element { children, .. }) => children.push(node),
            _ => self.roots.push(node),
        }
    }

    fn push_hole(mut self, hole: Hole) -> Self {
        if let Some(TemplateNode::Element { holes, .. }) = self.open.last_mut() {
            holes.push(hole);
            self.holes += 1;
        }
        self
    }

    #[must_use]
    pub fn open(mut self, tag: &str) -> Self {
        self.open.push(TemplateNode::Element {
            tag: tag.into(),
            attributes: Vec::new(),
            holes: Vec::new(),
            children: Vec::new(),
        });
        self
    }

    #[must_use]
    pub fn close(mut self) -> Self {
        if let Some(node) = self.open.pop() {
            self.push(node);
        }
        self
    }

    /// Static attribute on the open element.
    #[must_use]
    pub fn attribute(mut self, name: &str, value: &str) -> Self {
        if let Some(TemplateNode::Element { attributes, .. }) = self.open.last_mut() {
            attributes.push((name.into(), value.into()));
        }
        self
    }

    #[must_use]
    pub fn text(mut self, text: &str) -> Self {
        self.push(TemplateNode::Text(text.into()));
        self
    }

    #[must_use]
    pub fn attribute_hole(self, name: &str) -> Self {
        self.push_hole(Hole::Attribute(name.into()))
    }

    #[must_use]
    pub fn property_hole(self, name: &str) -> Self {
        self.push_hole(Hole::Property(name.into()))
    }

    #[must_use]
    pub fn event_hole(self, name: &str) -> Self {
        self.push_hole(Hole::Event(name.into()))
    }

    #[must_use]
    pub fn element_hole(self) -> Self {
        self.push_hole(Hole::Element)
    }

    #[must_use]
    pub fn child_hole(mut self) -> Self {
        self.push(TemplateNode::ChildHole);
        self.holes += 1;
        self
    }

    #[must_use]
    pub fn text_hole(mut self) -> Self {
        self.push(TemplateNode::TextHole);
        self.holes += 1;
        self
    }

    /// Finish, closing any elements left open.
    #[must_use]
    pub fn build(mut self) -> Rc<StaticTemplate> {
        while !self.open.is_empty() {
            self = self.close();
        }
        Rc::new(StaticTemplate {
            roots: self.roots,
            holes: self.holes,
        })
    }
}
