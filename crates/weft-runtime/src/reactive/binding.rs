#![forbid(unsafe_code)]

//! Signals as directives.
//!
//! A signal converted into a [`Value`] is wrapped in a [`SignalDirective`].
//! Its binding owns a small block whose body rebinds the inner value; a
//! signal notification requests an update of that block, so the rebind goes
//! through the normal scheduling and commit path.

use std::any::Any;
use std::rc::Rc;

use tracing::trace;
use weft_core::{NodeId, Part, Result};

use super::atom::Atom;
use super::computed::Computed;
use super::projected::Projected;
use super::signal::{Signal, SignalId, Subscription};
use crate::block::{Block, BlockBody};
use crate::context::UpdateContext;
use crate::directive::{Binding, Directive, DirectiveKind, Slot, Value, ValueKind, ensure_kind};

/// Directive wrapper around any `Signal<T>`.
pub struct SignalDirective<T> {
    signal: Rc<dyn Signal<T>>,
}

impl<T: Clone + Into<Value> + 'static> SignalDirective<T> {
    pub fn new(signal: impl Signal<T> + 'static) -> Self {
        Self {
            signal: Rc::new(signal),
        }
    }

    #[must_use]
    pub fn signal_id(&self) -> SignalId {
        self.signal.signal_id()
    }
}

impl<T: Clone + Into<Value> + 'static> Directive for SignalDirective<T> {
    fn kind(&self) -> DirectiveKind {
        DirectiveKind::of::<Self>("signal")
    }

    fn resolve(self: Rc<Self>, part: &Part, ctx: &mut UpdateContext) -> Result<Box<dyn Binding>> {
        Ok(Box::new(SignalBinding::new(Rc::clone(&self.signal), part, ctx)?))
    }
}

impl<T: Clone + Into<Value> + 'static> From<Atom<T>> for Value {
    fn from(atom: Atom<T>) -> Self {
        Value::directive(SignalDirective::new(atom))
    }
}

impl<T: Clone + Into<Value> + 'static> From<&Atom<T>> for Value {
    fn from(atom: &Atom<T>) -> Self {
        Value::directive(SignalDirective::new(atom.clone()))
    }
}

impl<T: Clone + Into<Value> + 'static> From<Computed<T>> for Value {
    fn from(computed: Computed<T>) -> Self {
        Value::directive(SignalDirective::new(computed))
    }
}

impl<T: Clone + Into<Value> + 'static> From<&Computed<T>> for Value {
    fn from(computed: &Computed<T>) -> Self {
        Value::directive(SignalDirective::new(computed.clone()))
    }
}

impl<S: 'static, T: Clone + Into<Value> + 'static> From<Projected<S, T>> for Value {
    fn from(projected: Projected<S, T>) -> Self {
        Value::directive(SignalDirective::new(projected))
    }
}

struct SignalBody<T> {
    signal: Rc<dyn Signal<T>>,
    slot: Slot,
}

impl<T: Clone + Into<Value> + 'static> BlockBody for SignalBody<T> {
    fn render(&mut self, _block: &Block, ctx: &mut UpdateContext) -> Result<()> {
        self.slot.bind(self.signal.value().into(), ctx)
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Binding for a [`SignalDirective`]: subscribed while mounted.
pub struct SignalBinding<T> {
    part: Part,
    id: SignalId,
    block: Block,
    subscription: Option<Subscription>,
    _value: std::marker::PhantomData<fn() -> T>,
}

impl<T: Clone + Into<Value> + 'static> SignalBinding<T> {
    pub fn new(signal: Rc<dyn Signal<T>>, part: &Part, ctx: &mut UpdateContext) -> Result<Self> {
        let slot = Slot::new(signal.value().into(), part, ctx)?;
        let id = signal.signal_id();
        let body = SignalBody { signal, slot };
        let block = Block::new("signal", ctx.current_block(), ctx.runtime().clone(), body);
        Ok(Self {
            part: part.clone(),
            id,
            block,
            subscription: None,
            _value: std::marker::PhantomData,
        })
    }

    fn subscribe(&mut self) {
        let Some(signal) = self.block.with_body(|body: &mut SignalBody<T>| Rc::clone(&body.signal)) else {
            return;
        };
        let block = self.block.downgrade();
        self.subscription = Some(signal.subscribe(Rc::new(move || {
            if let Some(block) = block.upgrade() {
                let priority = block.runtime().host().current_priority();
                trace!(block = block.id().raw(), priority = %priority, "signal changed");
                block.schedule_update(priority);
            }
        })));
    }

    fn with_slot<R>(&self, f: impl FnOnce(&mut Slot) -> R) -> Option<R> {
        self.block.with_body(|body: &mut SignalBody<T>| f(&mut body.slot))
    }

    /// Whether a change notification currently reaches this binding.
    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }
}

impl<T: Clone + Into<Value> + 'static> Binding for SignalBinding<T> {
    fn part(&self) -> &Part {
        &self.part
    }

    fn value_kind(&self) -> ValueKind {
        ValueKind::Directive(DirectiveKind::of::<SignalDirective<T>>("signal"))
    }

    fn connect(&mut self, ctx: &mut UpdateContext) -> Result<()> {
        self.with_slot(|slot| slot.connect(ctx)).transpose()?;
        self.subscribe();
        Ok(())
    }

    fn bind(&mut self, value: Value, ctx: &mut UpdateContext) -> Result<()> {
        ensure_kind(self, &value)?;
        let Some(next) = value.downcast::<SignalDirective<T>>() else {
            return Ok(());
        };
        let same = next.signal_id() == self.id;
        if same && self.subscription.is_some() {
            return Ok(());
        }
        self.id = next.signal_id();
        let signal = Rc::clone(&next.signal);
        self.block
            .with_body(|body: &mut SignalBody<T>| {
                body.signal = Rc::clone(&signal);
                body.slot.bind(signal.value().into(), ctx)
            })
            .transpose()?;
        self.subscribe();
        Ok(())
    }

    fn unbind(&mut self, ctx: &mut UpdateContext) {
        self.subscription = None;
        self.block.cancel_update();
        self.with_slot(|slot| slot.unbind(ctx));
    }

    fn disconnect(&mut self, ctx: &mut UpdateContext) {
        self.subscription = None;
        self.with_slot(|slot| slot.disconnect(ctx));
        self.block.disconnect(ctx);
    }

    fn start_node(&self) -> NodeId {
        self.with_slot(|slot| slot.start_node())
            .unwrap_or_else(|| self.part.node())
    }

    fn end_node(&self) -> NodeId {
        self.part.node()
    }
}
