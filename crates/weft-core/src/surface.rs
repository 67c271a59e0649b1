#![forbid(unsafe_code)]

//! The render-surface contract.
//!
//! The engine never owns the surface. It calls these primitives from effects
//! committed in a phase; the only calls made during render are the
//! `create_*` constructors, which produce detached (unobservable) nodes.
//!
//! # Invariants
//!
//! 1. `insert_before(node, reference)` moves `node` if it is already attached.
//! 2. `remove_node` on a detached node is a no-op.
//! 3. `next_sibling`/`parent_node` reflect every write made so far.

use crate::event::EventListener;
use crate::part::NodeId;
use crate::scalar::Scalar;

/// Mutable render target addressed through opaque [`NodeId`] handles.
pub trait RenderSurface {
    fn create_element(&self, tag: &str) -> NodeId;
    fn create_text(&self, text: &str) -> NodeId;
    /// Create an empty marker node used as a child-slot anchor.
    fn create_placeholder(&self) -> NodeId;

    fn append_child(&self, parent: NodeId, node: NodeId);
    fn insert_before(&self, node: NodeId, reference: NodeId);
    fn remove_node(&self, node: NodeId);

    fn set_text(&self, node: NodeId, text: &str);
    fn set_attribute(&self, node: NodeId, name: &str, value: &str);
    fn remove_attribute(&self, node: NodeId, name: &str);
    fn set_property(&self, node: NodeId, name: &str, value: &Scalar);
    fn add_event_listener(&self, node: NodeId, name: &str, listener: &EventListener);
    fn remove_event_listener(&self, node: NodeId, name: &str, listener: &EventListener);

    fn parent_node(&self, node: NodeId) -> Option<NodeId>;
    fn next_sibling(&self, node: NodeId) -> Option<NodeId>;

    /// Human-readable location of `node`, used in error messages.
    fn describe_location(&self, node: NodeId) -> String {
        node.to_string()
    }
}

/// Move the node range `[start, end]` (inclusive, following siblings) so it
/// sits immediately before `reference`.
///
/// Returns the number of nodes moved.
pub fn move_range(
    surface: &dyn RenderSurface,
    start: NodeId,
    end: NodeId,
    reference: NodeId,
) -> usize {
    let mut moved = 0;
    let mut current = Some(start);
    while let Some(node) = current {
        // Read the sibling before moving; insert_before rewires it.
        let next = if node == end {
            None
        } else {
            surface.next_sibling(node)
        };
        surface.insert_before(node, reference);
        moved += 1;
        current = next;
    }
    moved
}

/// Remove the node range `[start, end]` (inclusive, following siblings).
pub fn remove_range(surface: &dyn RenderSurface, start: NodeId, end: NodeId) {
    let mut current = Some(start);
    while let Some(node) = current {
        let next = if node == end {
            None
        } else {
            surface.next_sibling(node)
        };
        surface.remove_node(node);
        current = next;
    }
}
