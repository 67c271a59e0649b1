#![forbid(unsafe_code)]

//! List directives.
//!
//! Each item lives between the previous item's anchor and its own
//! placeholder anchor, so an item's node range is
//! `[slot.start_node(), anchor]` and can be moved as a unit.
//!
//! - [`KeyedList`]: identity follows keys; reorders move the minimum number
//!   of items.
//! - [`PositionalList`]: identity follows index; only the tail grows or
//!   shrinks.

pub mod keyed;
pub mod positional;
pub mod reconcile;

use weft_core::surface::move_range;
use weft_core::{NodeId, Part, RenderSurface, Result};

use crate::context::UpdateContext;
use crate::directive::{Binding, Slot, Value};

pub use keyed::{Key, KeyedList, KeyedListBinding};
pub use positional::{PositionalList, PositionalListBinding};
pub use reconcile::{KeyedPlan, longest_increasing_subsequence, plan_keyed};

/// Counters for one reconciliation, logged at trace level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReconcileStats {
    pub reused: usize,
    pub created: usize,
    pub removed: usize,
    pub moved: usize,
}

/// One list entry: its value slot and the placeholder closing its range.
pub(crate) struct ListItem {
    pub(crate) slot: Slot,
    pub(crate) anchor: NodeId,
}

impl ListItem {
    /// New item whose anchor is inserted before `reference` at commit.
    pub(crate) fn create(value: Value, reference: NodeId, ctx: &mut UpdateContext) -> Result<Self> {
        let anchor = ctx.surface().create_placeholder();
        ctx.enqueue_mutation_effect(move |surface: &dyn RenderSurface| {
            surface.insert_before(anchor, reference);
        });
        let mut slot = Slot::new(value, &Part::child_slot(anchor), ctx)?;
        slot.connect(ctx)?;
        Ok(Self { slot, anchor })
    }

    pub(crate) fn start_node(&self) -> NodeId {
        self.slot.start_node()
    }

    /// Queue a move of the item's whole range before `reference`.
    pub(crate) fn move_before(&self, reference: NodeId, ctx: &mut UpdateContext) {
        let (start, end) = (self.start_node(), self.anchor);
        ctx.enqueue_mutation_effect(move |surface: &dyn RenderSurface| {
            move_range(surface, start, end, reference);
        });
    }

    /// Unbind, tear down and drop the anchor.
    pub(crate) fn remove(mut self, ctx: &mut UpdateContext) {
        self.slot.unbind(ctx);
        self.slot.disconnect(ctx);
        let anchor = self.anchor;
        ctx.enqueue_mutation_effect(move |surface: &dyn RenderSurface| surface.remove_node(anchor));
    }

    /// Unbind, keeping the slot for a later remount; the anchor leaves the
    /// surface.
    pub(crate) fn hide(&mut self, ctx: &mut UpdateContext) {
        self.slot.unbind(ctx);
        let anchor = self.anchor;
        ctx.enqueue_mutation_effect(move |surface: &dyn RenderSurface| surface.remove_node(anchor));
    }

    /// Put a hidden item's anchor back before `reference`.
    pub(crate) fn reinsert_anchor(&self, reference: NodeId, ctx: &mut UpdateContext) {
        let anchor = self.anchor;
        ctx.enqueue_mutation_effect(move |surface: &dyn RenderSurface| surface.insert_before(anchor, reference));
    }
}
