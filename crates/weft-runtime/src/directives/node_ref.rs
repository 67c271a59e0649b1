#![forbid(unsafe_code)]

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use weft_core::{NodeId, Part, PartKind, RenderSurface, Result};

use crate::context::UpdateContext;
use crate::directive::{Binding, Directive, DirectiveKind, Value, ValueKind, ensure_kind, ensure_part};

type RefCallback = Rc<dyn Fn(Option<NodeId>)>;

/// Hands the bound element to a callback during the layout phase.
#[derive(Clone)]
pub struct NodeRef {
    callback: RefCallback,
}

impl NodeRef {
    pub fn new(callback: impl Fn(Option<NodeId>) + 'static) -> Self {
        Self {
            callback: Rc::new(callback),
        }
    }

    /// Store the node in `cell`.
    #[must_use]
    pub fn to_cell(cell: &Rc<Cell<Option<NodeId>>>) -> Self {
        let cell = Rc::clone(cell);
        Self::new(move |node| cell.set(node))
    }

    fn same_callback(&self, other: &RefCallback) -> bool {
        Rc::ptr_eq(&self.callback, other)
    }
}

impl fmt::Debug for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRef").finish_non_exhaustive()
    }
}

impl Directive for NodeRef {
    fn kind(&self) -> DirectiveKind {
        DirectiveKind::of::<Self>("node-ref")
    }

    fn resolve(self: Rc<Self>, part: &Part, ctx: &mut UpdateContext) -> Result<Box<dyn Binding>> {
        ensure_part("node-ref", PartKind::Element.as_str(), part, ctx.surface(), |p| {
            p.kind() == PartKind::Element
        })?;
        Ok(Box::new(NodeRefBinding {
            part: part.clone(),
            callback: Rc::clone(&self.callback),
            attached: false,
        }))
    }
}

impl From<NodeRef> for Value {
    fn from(node_ref: NodeRef) -> Self {
        Value::directive(node_ref)
    }
}

pub struct NodeRefBinding {
    part: Part,
    callback: RefCallback,
    attached: bool,
}

impl NodeRefBinding {
    fn notify(callback: &RefCallback, node: Option<NodeId>, ctx: &mut UpdateContext) {
        let callback = Rc::clone(callback);
        ctx.enqueue_layout_effect(move |_: &dyn RenderSurface| callback(node));
    }
}

impl Binding for NodeRefBinding {
    fn part(&self) -> &Part {
        &self.part
    }

    fn value_kind(&self) -> ValueKind {
        ValueKind::Directive(DirectiveKind::of::<NodeRef>("node-ref"))
    }

    fn connect(&mut self, ctx: &mut UpdateContext) -> Result<()> {
        if !self.attached {
            self.attached = true;
            Self::notify(&self.callback, Some(self.part.node()), ctx);
        }
        Ok(())
    }

    fn bind(&mut self, value: Value, ctx: &mut UpdateContext) -> Result<()> {
        ensure_kind(self, &value)?;
        let Some(next) = value.downcast::<NodeRef>() else {
            return Ok(());
        };
        if self.attached && next.same_callback(&self.callback) {
            return Ok(());
        }
        if self.attached {
            Self::notify(&self.callback, None, ctx);
        }
        self.callback = Rc::clone(&next.callback);
        self.attached = true;
        Self::notify(&self.callback, Some(self.part.node()), ctx);
        Ok(())
    }

    fn unbind(&mut self, ctx: &mut UpdateContext) {
        if self.attached {
            self.attached = false;
            Self::notify(&self.callback, None, ctx);
        }
    }

    fn disconnect(&mut self, _ctx: &mut UpdateContext) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestRuntime;
    use weft_core::{CommitPhase, Error};

    #[test]
    fn reports_node_in_layout_phase() {
        let rt = TestRuntime::sync();
        let node = rt.surface.create_element("canvas");
        let cell = Rc::new(Cell::new(None));
        let node_ref = NodeRef::to_cell(&cell);
        let mut ctx = rt.context();
        let mut binding =
            crate::directive::resolve(node_ref.clone().into(), &Part::element(node), &mut ctx).expect("resolve");
        binding.connect(&mut ctx).expect("connect");
        assert_eq!(ctx.queue().effect_count(CommitPhase::Layout), 1);
        assert_eq!(cell.get(), None);
        ctx.flush().expect("flush");
        assert_eq!(cell.get(), Some(node));

        let mut ctx = rt.context();
        binding.bind(node_ref.into(), &mut ctx).expect("bind");
        assert!(ctx.queue().is_empty());

        binding.unbind(&mut ctx);
        ctx.flush().expect("flush");
        assert_eq!(cell.get(), None);
    }

    #[test]
    fn rejects_attribute_part() {
        let rt = TestRuntime::sync();
        let node = rt.surface.create_element("div");
        let mut ctx = rt.context();
        let err = crate::directive::resolve(NodeRef::new(|_| {}).into(), &Part::attribute(node, "ref"), &mut ctx).err();
        assert!(matches!(
            err,
            Some(Error::WrongPartKind {
                actual: PartKind::Attribute,
                ..
            })
        ));
    }
}
