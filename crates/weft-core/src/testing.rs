#![forbid(unsafe_code)]

//! In-memory render surface for tests and benchmarks.
//!
//! [`RecordingSurface`] keeps a real node tree (so traversal and moves behave
//! like a document) and logs every write in a [`SurfaceOp`] list. Node
//! creation is not logged: it is allowed during render and unobservable.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use crate::event::{Event, EventListener};
use crate::part::NodeId;
use crate::scalar::Scalar;
use crate::surface::RenderSurface;

/// A logged surface write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceOp {
    AppendChild { parent: NodeId, node: NodeId },
    /// `moved` is true when the node was attached before the call.
    InsertBefore {
        node: NodeId,
        reference: NodeId,
        moved: bool,
    },
    Remove { node: NodeId },
    SetText { node: NodeId, text: String },
    SetAttribute {
        node: NodeId,
        name: String,
        value: String,
    },
    RemoveAttribute { node: NodeId, name: String },
    SetProperty {
        node: NodeId,
        name: String,
        value: Scalar,
    },
    AddListener { node: NodeId, name: String },
    RemoveListener { node: NodeId, name: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum NodeData {
    Element(String),
    Text(String),
    Placeholder,
}

struct NodeRecord {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    attributes: BTreeMap<String, String>,
    properties: BTreeMap<String, Scalar>,
    listeners: Vec<(String, EventListener)>,
}

impl NodeRecord {
    fn new(data: NodeData) -> Self {
        Self {
            data,
            parent: None,
            children: Vec::new(),
            attributes: BTreeMap::new(),
            properties: BTreeMap::new(),
            listeners: Vec::new(),
        }
    }
}

#[derive(Default)]
struct State {
    next_id: u64,
    nodes: HashMap<NodeId, NodeRecord>,
    ops: Vec<SurfaceOp>,
}

impl State {
    fn create(&mut self, data: NodeData) -> NodeId {
        self.next_id += 1;
        let id = NodeId::new(self.next_id);
        self.nodes.insert(id, NodeRecord::new(data));
        id
    }

    fn detach(&mut self, node: NodeId) -> bool {
        let Some(parent) = self.nodes.get_mut(&node).and_then(|n| n.parent.take()) else {
            return false;
        };
        if let Some(p) = self.nodes.get_mut(&parent) {
            p.children.retain(|c| *c != node);
        }
        true
    }
}

/// Recording, in-memory [`RenderSurface`].
#[derive(Clone, Default)]
pub struct RecordingSurface {
    state: Rc<RefCell<State>>,
}

impl RecordingSurface {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every write since creation or the last [`clear_ops`](Self::clear_ops).
    #[must_use]
    pub fn ops(&self) -> Vec<SurfaceOp> {
        self.state.borrow().ops.clone()
    }

    /// Number of writes since the last clear.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.state.borrow().ops.len()
    }

    /// Number of `insert_before` calls that moved an attached node.
    #[must_use]
    pub fn move_count(&self) -> usize {
        self.state
            .borrow()
            .ops
            .iter()
            .filter(|op| matches!(op, SurfaceOp::InsertBefore { moved: true, .. }))
            .count()
    }

    pub fn clear_ops(&self) {
        self.state.borrow_mut().ops.clear();
    }

    #[must_use]
    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.state
            .borrow()
            .nodes
            .get(&node)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.state
            .borrow()
            .nodes
            .get(&node)
            .and_then(|n| n.attributes.get(name).cloned())
    }

    #[must_use]
    pub fn property(&self, node: NodeId, name: &str) -> Option<Scalar> {
        self.state
            .borrow()
            .nodes
            .get(&node)
            .and_then(|n| n.properties.get(name).cloned())
    }

    /// Tag name of an element node.
    #[must_use]
    pub fn tag(&self, node: NodeId) -> Option<String> {
        match self.state.borrow().nodes.get(&node).map(|n| &n.data) {
            Some(NodeData::Element(tag)) => Some(tag.clone()),
            _ => None,
        }
    }

    /// Text data of a text node.
    #[must_use]
    pub fn text(&self, node: NodeId) -> Option<String> {
        match self.state.borrow().nodes.get(&node).map(|n| &n.data) {
            Some(NodeData::Text(t)) => Some(t.clone()),
            _ => None,
        }
    }

    #[must_use]
    pub fn listener_count(&self, node: NodeId, name: &str) -> usize {
        self.state
            .borrow()
            .nodes
            .get(&node)
            .map(|n| n.listeners.iter().filter(|(n, _)| n == name).count())
            .unwrap_or(0)
    }

    #[must_use]
    pub fn is_attached(&self, node: NodeId) -> bool {
        self.state
            .borrow()
            .nodes
            .get(&node)
            .is_some_and(|n| n.parent.is_some())
    }

    /// Dispatch an event to every listener registered on `node` for `name`.
    ///
    /// Listeners are cloned out first so they may write to the surface.
    pub fn dispatch(&self, node: NodeId, name: &str, detail: impl Into<Scalar>) -> usize {
        let listeners: Vec<EventListener> = self
            .state
            .borrow()
            .nodes
            .get(&node)
            .map(|n| {
                n.listeners
                    .iter()
                    .filter(|(n, _)| n == name)
                    .map(|(_, l)| Rc::clone(l))
                    .collect()
            })
            .unwrap_or_default();
        let event = Event::new(name, node).with_detail(detail);
        for listener in &listeners {
            listener(&event);
        }
        listeners.len()
    }

    /// Serialize the children of `node` as compact markup.
    ///
    /// Placeholders are omitted, text is emitted raw, attributes are sorted.
    #[must_use]
    pub fn inner_markup(&self, node: NodeId) -> String {
        let state = self.state.borrow();
        let mut out = String::new();
        if let Some(record) = state.nodes.get(&node) {
            for child in &record.children {
                write_markup(&state, *child, &mut out);
            }
        }
        out
    }

    /// Text content of the subtree under `node`.
    #[must_use]
    pub fn text_content(&self, node: NodeId) -> String {
        let state = self.state.borrow();
        let mut out = String::new();
        collect_text(&state, node, &mut out);
        out
    }
}

fn write_markup(state: &State, node: NodeId, out: &mut String) {
    let Some(record) = state.nodes.get(&node) else {
        return;
    };
    match &record.data {
        NodeData::Placeholder => {}
        NodeData::Text(t) => out.push_str(t),
        NodeData::Element(tag) => {
            out.push('<');
            out.push_str(tag);
            for (name, value) in &record.attributes {
                out.push_str(&format!(" {name}=\"{value}\""));
            }
            out.push('>');
            for child in &record.children {
                write_markup(state, *child, out);
            }
            out.push_str(&format!("</{tag}>"));
        }
    }
}

fn collect_text(state: &State, node: NodeId, out: &mut String) {
    let Some(record) = state.nodes.get(&node) else {
        return;
    };
    if let NodeData::Text(t) = &record.data {
        out.push_str(t);
    }
    for child in &record.children {
        collect_text(state, *child, out);
    }
}

impl RenderSurface for RecordingSurface {
    fn create_element(&self, tag: &str) -> NodeId {
        self.state
            .borrow_mut()
            .create(NodeData::Element(tag.to_string()))
    }

    fn create_text(&self, text: &str) -> NodeId {
        self.state
            .borrow_mut()
            .create(NodeData::Text(text.to_string()))
    }

    fn create_placeholder(&self) -> NodeId {
        self.state.borrow_mut().create(NodeData::Placeholder)
    }

    fn append_child(&self, parent: NodeId, node: NodeId) {
        let mut state = self.state.borrow_mut();
        state.detach(node);
        if let Some(n) = state.nodes.get_mut(&node) {
            n.parent = Some(parent);
        }
        if let Some(p) = state.nodes.get_mut(&parent) {
            p.children.push(node);
        }
        state.ops.push(SurfaceOp::AppendChild { parent, node });
    }

    fn insert_before(&self, node: NodeId, reference: NodeId) {
        let mut state = self.state.borrow_mut();
        let moved = state.detach(node);
        let parent = state.nodes.get(&reference).and_then(|r| r.parent);
        if let Some(parent) = parent {
            if let Some(p) = state.nodes.get_mut(&parent) {
                let index = p
                    .children
                    .iter()
                    .position(|c| *c == reference)
                    .unwrap_or(p.children.len());
                p.children.insert(index, node);
            }
            if let Some(n) = state.nodes.get_mut(&node) {
                n.parent = Some(parent);
            }
        }
        state.ops.push(SurfaceOp::InsertBefore {
            node,
            reference,
            moved,
        });
    }

    fn remove_node(&self, node: NodeId) {
        let mut state = self.state.borrow_mut();
        state.detach(node);
        state.ops.push(SurfaceOp::Remove { node });
    }

    fn set_text(&self, node: NodeId, text: &str) {
        let mut state = self.state.borrow_mut();
        if let Some(n) = state.nodes.get_mut(&node) {
            n.data = NodeData::Text(text.to_string());
        }
        state.ops.push(SurfaceOp::SetText {
            node,
            text: text.to_string(),
        });
    }

    fn set_attribute(&self, node: NodeId, name: &str, value: &str) {
        let mut state = self.state.borrow_mut();
        if let Some(n) = state.nodes.get_mut(&node) {
            n.attributes.insert(name.to_string(), value.to_string());
        }
        state.ops.push(SurfaceOp::SetAttribute {
            node,
            name: name.to_string(),
            value: value.to_string(),
        });
    }

    fn remove_attribute(&self, node: NodeId, name: &str) {
        let mut state = self.state.borrow_mut();
        if let Some(n) = state.nodes.get_mut(&node) {
            n.attributes.remove(name);
        }
        state.ops.push(SurfaceOp::RemoveAttribute {
            node,
            name: name.to_string(),
        });
    }

    fn set_property(&self, node: NodeId, name: &str, value: &Scalar) {
        let mut state = self.state.borrow_mut();
        if let Some(n) = state.nodes.get_mut(&node) {
            n.properties.insert(name.to_string(), value.clone());
        }
        state.ops.push(SurfaceOp::SetProperty {
            node,
            name: name.to_string(),
            value: value.clone(),
        });
    }

    fn add_event_listener(&self, node: NodeId, name: &str, listener: &EventListener) {
        let mut state = self.state.borrow_mut();
        if let Some(n) = state.nodes.get_mut(&node) {
            n.listeners.push((name.to_string(), Rc::clone(listener)));
        }
        state.ops.push(SurfaceOp::AddListener {
            node,
            name: name.to_string(),
        });
    }

    fn remove_event_listener(&self, node: NodeId, name: &str, listener: &EventListener) {
        let mut state = self.state.borrow_mut();
        if let Some(n) = state.nodes.get_mut(&node) {
            n.listeners
                .retain(|(n, l)| !(n == name && Rc::ptr_eq(l, listener)));
        }
        state.ops.push(SurfaceOp::RemoveListener {
            node,
            name: name.to_string(),
        });
    }

    fn parent_node(&self, node: NodeId) -> Option<NodeId> {
        self.state.borrow().nodes.get(&node).and_then(|n| n.parent)
    }

    fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        let state = self.state.borrow();
        let parent = state.nodes.get(&node)?.parent?;
        let siblings = &state.nodes.get(&parent)?.children;
        let index = siblings.iter().position(|c| *c == node)?;
        siblings.get(index + 1).copied()
    }

    fn describe_location(&self, node: NodeId) -> String {
        let state = self.state.borrow();
        let mut path = Vec::new();
        let mut current = Some(node);
        while let Some(id) = current {
            let Some(record) = state.nodes.get(&id) else {
                break;
            };
            path.push(match &record.data {
                NodeData::Element(tag) => format!("<{tag}>"),
                NodeData::Text(_) => "#text".to_string(),
                NodeData::Placeholder => "<!---->".to_string(),
            });
            current = record.parent;
        }
        path.reverse();
        path.join(" > ")
    }
}
