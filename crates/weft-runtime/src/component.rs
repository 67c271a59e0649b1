#![forbid(unsafe_code)]

//! Components: render functions bound to a block.
//!
//! A [`Component`] pairs a render function with props. Binding it to a
//! child slot creates a [`Block`] whose body calls the render function and
//! binds the returned value into the slot. Re-binding with new props
//! enqueues the block after its parent in the same transaction.

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

use weft_core::{NodeId, Part, Result};

use crate::block::{Block, BlockBody};
use crate::context::UpdateContext;
use crate::directive::{Binding, Directive, DirectiveKind, Slot, Value, ValueKind, ensure_child_slot, ensure_kind};
use crate::hooks::RenderContext;

/// Render function signature.
pub type RenderFn<P> = fn(&P, &mut RenderContext<'_>) -> Result<Value>;

/// A render function plus props.
pub struct Component<P> {
    name: &'static str,
    render: RenderFn<P>,
    props: Rc<P>,
    props_eq: Option<fn(&P, &P) -> bool>,
}

impl<P: 'static> Component<P> {
    /// Re-renders whenever bound with a different props allocation.
    pub fn new(name: &'static str, render: RenderFn<P>, props: P) -> Self {
        Self::from_rc(name, render, Rc::new(props))
    }

    pub fn from_rc(name: &'static str, render: RenderFn<P>, props: Rc<P>) -> Self {
        Self {
            name,
            render,
            props,
            props_eq: None,
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn props(&self) -> &Rc<P> {
        &self.props
    }

    fn props_changed(&self, previous: &Rc<P>) -> bool {
        if Rc::ptr_eq(&self.props, previous) {
            return false;
        }
        match self.props_eq {
            Some(eq) => !eq(&self.props, previous),
            None => true,
        }
    }
}

impl<P: PartialEq + 'static> Component<P> {
    /// Skips re-rendering when the new props compare equal.
    pub fn memo(name: &'static str, render: RenderFn<P>, props: P) -> Self {
        Self {
            props_eq: Some(<P as PartialEq>::eq),
            ..Self::new(name, render, props)
        }
    }
}

impl<P> fmt::Debug for Component<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("name", &self.name)
            .field("memo", &self.props_eq.is_some())
            .finish()
    }
}

impl<P: 'static> Directive for Component<P> {
    fn kind(&self) -> DirectiveKind {
        DirectiveKind::of::<Self>(self.name).with_tag(self.render as usize)
    }

    fn resolve(self: Rc<Self>, part: &Part, ctx: &mut UpdateContext) -> Result<Box<dyn Binding>> {
        ensure_child_slot(self.name, part, ctx.surface())?;
        Ok(Box::new(ComponentBinding::new(self, part, ctx)))
    }
}

impl<P: 'static> From<Component<P>> for Value {
    fn from(component: Component<P>) -> Self {
        Value::directive(component)
    }
}

struct ComponentBody<P> {
    component: Rc<Component<P>>,
    part: Part,
    child: Option<Slot>,
}

impl<P: 'static> BlockBody for ComponentBody<P> {
    fn render(&mut self, block: &Block, ctx: &mut UpdateContext) -> Result<()> {
        let component = Rc::clone(&self.component);
        let value = {
            let mut rc = RenderContext::new(block, ctx);
            let value = (component.render)(&component.props, &mut rc)?;
            rc.finish()?;
            value
        };
        match self.child.as_mut() {
            Some(child) => child.bind(value, ctx),
            None => {
                let mut child = Slot::new(value, &self.part, ctx)?;
                child.connect(ctx)?;
                self.child = Some(child);
                Ok(())
            }
        }
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Binding that owns a component's block.
pub struct ComponentBinding<P> {
    part: Part,
    kind: DirectiveKind,
    block: Block,
    mounted: bool,
    _props: PhantomData<fn() -> P>,
}

impl<P: 'static> ComponentBinding<P> {
    fn new(component: Rc<Component<P>>, part: &Part, ctx: &mut UpdateContext) -> Self {
        let kind = component.kind();
        let body = ComponentBody {
            component: Rc::clone(&component),
            part: part.clone(),
            child: None,
        };
        let block = Block::new(component.name, ctx.current_block(), ctx.runtime().clone(), body);
        Self {
            part: part.clone(),
            kind,
            block,
            mounted: false,
            _props: PhantomData,
        }
    }

    #[must_use]
    pub fn block(&self) -> &Block {
        &self.block
    }

    fn with_body<R>(&self, f: impl FnOnce(&mut ComponentBody<P>) -> R) -> Option<R> {
        self.block.with_body(f)
    }
}

impl<P: 'static> Binding for ComponentBinding<P> {
    fn part(&self) -> &Part {
        &self.part
    }

    fn value_kind(&self) -> ValueKind {
        ValueKind::Directive(self.kind)
    }

    fn connect(&mut self, ctx: &mut UpdateContext) -> Result<()> {
        self.mounted = true;
        self.block.force_update(ctx);
        Ok(())
    }

    fn bind(&mut self, value: Value, ctx: &mut UpdateContext) -> Result<()> {
        ensure_kind(self, &value)?;
        let Some(next) = value.downcast::<Component<P>>() else {
            return Ok(());
        };
        let changed = self
            .with_body(|body| {
                let changed = next.props_changed(&body.component.props);
                body.component = Rc::clone(&next);
                changed
            })
            .unwrap_or(true);
        if changed || !self.mounted || self.block.is_updating() {
            self.mounted = true;
            self.block.force_update(ctx);
        }
        Ok(())
    }

    fn unbind(&mut self, ctx: &mut UpdateContext) {
        self.mounted = false;
        self.block.cancel_update();
        self.block.unmount_effects(ctx);
        self.with_body(|body| {
            if let Some(child) = body.child.as_mut() {
                child.unbind(ctx);
            }
        });
    }

    fn disconnect(&mut self, ctx: &mut UpdateContext) {
        self.with_body(|body| {
            if let Some(child) = body.child.as_mut() {
                child.disconnect(ctx);
            }
            body.child = None;
        });
        self.block.disconnect(ctx);
    }

    fn start_node(&self) -> NodeId {
        self.with_body(|body| body.child.as_ref().map(|child| child.start_node()))
            .flatten()
            .unwrap_or_else(|| self.part.node())
    }

    fn end_node(&self) -> NodeId {
        self.part.node()
    }
}
