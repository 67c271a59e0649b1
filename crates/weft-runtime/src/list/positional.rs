#![forbid(unsafe_code)]

//! Positional (index-identity) list directive.

use std::rc::Rc;

use tracing::trace;
use weft_core::{NodeId, Part, Result};

use super::{ListItem, ReconcileStats};
use crate::context::UpdateContext;
use crate::directive::{Binding, Directive, DirectiveKind, Value, ValueKind, ensure_child_slot, ensure_kind};

/// Items rendered with index-based identity.
#[derive(Debug, Clone, Default)]
pub struct PositionalList {
    items: Vec<Value>,
}

impl PositionalList {
    #[must_use]
    pub fn new(items: Vec<Value>) -> Self {
        Self { items }
    }

    pub fn from_items<T, V: Into<Value>>(items: impl IntoIterator<Item = T>, render: impl Fn(&T) -> V) -> Self {
        Self {
            items: items.into_iter().map(|item| render(&item).into()).collect(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Directive for PositionalList {
    fn kind(&self) -> DirectiveKind {
        DirectiveKind::of::<Self>("positional-list")
    }

    fn resolve(self: Rc<Self>, part: &Part, ctx: &mut UpdateContext) -> Result<Box<dyn Binding>> {
        ensure_child_slot("positional-list", part, ctx.surface())?;
        Ok(Box::new(PositionalListBinding {
            part: part.clone(),
            items: Vec::new(),
            pending: Some(self.items.clone()),
            mounted: false,
            last_stats: ReconcileStats::default(),
        }))
    }
}

impl From<PositionalList> for Value {
    fn from(list: PositionalList) -> Self {
        Value::directive(list)
    }
}

/// Binding for a [`PositionalList`].
pub struct PositionalListBinding {
    part: Part,
    items: Vec<ListItem>,
    pending: Option<Vec<Value>>,
    mounted: bool,
    last_stats: ReconcileStats,
}

impl PositionalListBinding {
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn last_stats(&self) -> ReconcileStats {
        self.last_stats
    }

    fn reconcile(&mut self, values: Vec<Value>, ctx: &mut UpdateContext) -> Result<()> {
        let anchor = self.part.node();
        if !self.mounted {
            for item in &self.items {
                item.reinsert_anchor(anchor, ctx);
            }
            self.mounted = true;
        }
        let mut stats = ReconcileStats::default();
        while self.items.len() > values.len() {
            if let Some(item) = self.items.pop() {
                item.remove(ctx);
                stats.removed += 1;
            }
        }
        for (index, value) in values.into_iter().enumerate() {
            if let Some(item) = self.items.get_mut(index) {
                item.slot.bind(value, ctx)?;
                stats.reused += 1;
            } else {
                self.items.push(ListItem::create(value, anchor, ctx)?);
                stats.created += 1;
            }
        }
        self.last_stats = stats;
        trace!(
            reused = stats.reused,
            created = stats.created,
            removed = stats.removed,
            "positional reconcile"
        );
        Ok(())
    }
}

impl Binding for PositionalListBinding {
    fn part(&self) -> &Part {
        &self.part
    }

    fn value_kind(&self) -> ValueKind {
        ValueKind::Directive(DirectiveKind::of::<PositionalList>("positional-list"))
    }

    fn connect(&mut self, ctx: &mut UpdateContext) -> Result<()> {
        if let Some(values) = self.pending.take() {
            self.mounted = true;
            self.reconcile(values, ctx)?;
        }
        Ok(())
    }

    fn bind(&mut self, value: Value, ctx: &mut UpdateContext) -> Result<()> {
        ensure_kind(self, &value)?;
        let values = value.downcast::<PositionalList>().map(|list| list.items.clone()).unwrap_or_default();
        self.pending = None;
        self.reconcile(values, ctx)
    }

    fn unbind(&mut self, ctx: &mut UpdateContext) {
        if !self.mounted {
            return;
        }
        for item in &mut self.items {
            item.hide(ctx);
        }
        self.mounted = false;
    }

    fn disconnect(&mut self, ctx: &mut UpdateContext) {
        for item in &mut self.items {
            item.slot.disconnect(ctx);
        }
    }

    fn start_node(&self) -> NodeId {
        match self.items.first() {
            Some(first) if self.mounted => first.start_node(),
            _ => self.part.node(),
        }
    }

    fn end_node(&self) -> NodeId {
        self.part.node()
    }
}
