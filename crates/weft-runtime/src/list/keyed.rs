#![forbid(unsafe_code)]

//! Keyed list directive.

use std::fmt;
use std::rc::Rc;

use tracing::trace;
use weft_core::{NodeId, Part, Result};

use super::reconcile::plan_keyed;
use super::{ListItem, ReconcileStats};
use crate::context::UpdateContext;
use crate::directive::{Binding, Directive, DirectiveKind, Value, ValueKind, ensure_child_slot, ensure_kind};

/// Item identity within a keyed list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    Int(i64),
    Str(Rc<str>),
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{i}"),
            Self::Str(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Key {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Key {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<u32> for Key {
    fn from(v: u32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<usize> for Key {
    fn from(v: usize) -> Self {
        i64::try_from(v).map_or_else(|_| Self::Str(v.to_string().into()), Self::Int)
    }
}

impl From<&str> for Key {
    fn from(v: &str) -> Self {
        Self::Str(v.into())
    }
}

impl From<String> for Key {
    fn from(v: String) -> Self {
        Self::Str(v.into())
    }
}

impl From<Rc<str>> for Key {
    fn from(v: Rc<str>) -> Self {
        Self::Str(v)
    }
}

/// Items rendered with key-based identity.
#[derive(Debug, Clone, Default)]
pub struct KeyedList {
    entries: Vec<(Key, Value)>,
}

impl KeyedList {
    #[must_use]
    pub fn new(entries: Vec<(Key, Value)>) -> Self {
        Self { entries }
    }

    /// Build from a collection with a key and a render function.
    pub fn from_items<T, K, V>(
        items: impl IntoIterator<Item = T>,
        key: impl Fn(&T) -> K,
        render: impl Fn(&T) -> V,
    ) -> Self
    where
        K: Into<Key>,
        V: Into<Value>,
    {
        Self {
            entries: items
                .into_iter()
                .map(|item| (key(&item).into(), render(&item).into()))
                .collect(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Directive for KeyedList {
    fn kind(&self) -> DirectiveKind {
        DirectiveKind::of::<Self>("keyed-list")
    }

    fn resolve(self: Rc<Self>, part: &Part, ctx: &mut UpdateContext) -> Result<Box<dyn Binding>> {
        ensure_child_slot("keyed-list", part, ctx.surface())?;
        Ok(Box::new(KeyedListBinding {
            part: part.clone(),
            items: Vec::new(),
            keys: Vec::new(),
            pending: Some(self.entries.clone()),
            mounted: false,
            last_stats: ReconcileStats::default(),
        }))
    }
}

impl From<KeyedList> for Value {
    fn from(list: KeyedList) -> Self {
        Value::directive(list)
    }
}

/// Binding for a [`KeyedList`].
pub struct KeyedListBinding {
    part: Part,
    items: Vec<ListItem>,
    keys: Vec<Key>,
    /// Entries received before the first connect.
    pending: Option<Vec<(Key, Value)>>,
    mounted: bool,
    last_stats: ReconcileStats,
}

impl KeyedListBinding {
    #[must_use]
    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    #[must_use]
    pub fn last_stats(&self) -> ReconcileStats {
        self.last_stats
    }

    fn remount(&mut self, ctx: &mut UpdateContext) {
        let anchor = self.part.node();
        for item in &self.items {
            item.reinsert_anchor(anchor, ctx);
        }
        self.mounted = true;
    }

    /// Reconcile to `entries`.
    ///
    /// Removals are queued first. Survivors and new items are then handled
    /// right to left so every insert or move targets a node that is already
    /// in its final place when the effect runs.
    fn reconcile(&mut self, entries: Vec<(Key, Value)>, ctx: &mut UpdateContext) -> Result<()> {
        if !self.mounted {
            self.remount(ctx);
        }
        let new_keys: Vec<Key> = entries.iter().map(|(key, _)| key.clone()).collect();
        let plan = plan_keyed(&self.keys, &new_keys);
        let mut stats = ReconcileStats {
            reused: plan.reused(),
            created: plan.created(),
            removed: plan.removed.len(),
            moved: plan.moves(),
        };

        let mut old: Vec<Option<ListItem>> = std::mem::take(&mut self.items).into_iter().map(Some).collect();
        for &index in &plan.removed {
            if let Some(item) = old.get_mut(index).and_then(Option::take) {
                item.remove(ctx);
            }
        }

        let mut built = Vec::with_capacity(entries.len());
        let mut reference = self.part.node();
        for (position, (_, value)) in entries.into_iter().enumerate().rev() {
            let reused = plan.sources[position].and_then(|index| old.get_mut(index).and_then(Option::take));
            let item = match reused {
                Some(mut item) => {
                    item.slot.bind(value, ctx)?;
                    if !plan.stable[position] {
                        item.move_before(reference, ctx);
                    }
                    item
                }
                None => ListItem::create(value, reference, ctx)?,
            };
            reference = item.start_node();
            built.push(item);
        }
        built.reverse();

        // Unmatched leftovers only exist if the plan and items disagree.
        for item in old.into_iter().flatten() {
            stats.removed += 1;
            item.remove(ctx);
        }

        self.items = built;
        self.keys = new_keys;
        self.last_stats = stats;
        trace!(
            reused = stats.reused,
            created = stats.created,
            removed = stats.removed,
            moves = stats.moved,
            "keyed reconcile"
        );
        Ok(())
    }
}

impl Binding for KeyedListBinding {
    fn part(&self) -> &Part {
        &self.part
    }

    fn value_kind(&self) -> ValueKind {
        ValueKind::Directive(DirectiveKind::of::<KeyedList>("keyed-list"))
    }

    fn connect(&mut self, ctx: &mut UpdateContext) -> Result<()> {
        if let Some(entries) = self.pending.take() {
            self.mounted = true;
            self.reconcile(entries, ctx)?;
        }
        Ok(())
    }

    fn bind(&mut self, value: Value, ctx: &mut UpdateContext) -> Result<()> {
        ensure_kind(self, &value)?;
        let entries = value.downcast::<KeyedList>().map(|list| list.entries.clone()).unwrap_or_default();
        self.pending = None;
        self.reconcile(entries, ctx)
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
