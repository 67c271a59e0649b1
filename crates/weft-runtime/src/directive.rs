#![forbid(unsafe_code)]

//! The Directive/Binding protocol.
//!
//! Every renderable [`Value`] is either plain data (a [`Scalar`] or an event
//! listener) or a [`Directive`]. Resolving a value against a [`Part`]
//! produces a [`Binding`]: the stateful adapter that owns the part and
//! decides which surface writes a new value requires.
//!
//! # Lifecycle
//!
//! ```text
//! resolve ─► connect ─► bind* ─► unbind ─► (bind ─► ...) ─► disconnect
//! ```
//!
//! `unbind` reverses the visible effects but keeps internal caches so a
//! later `bind` remounts cheaply; `disconnect` is the permanent teardown.
//!
//! # Invariants
//!
//! 1. `connect`/`bind`/`unbind` never write to the surface directly; every
//!    write is an effect queued on the [`UpdateContext`].
//! 2. Binding a value identical to the current one queues nothing.
//! 3. `bind` with a value of another kind is a fatal
//!    [`Error::DirectiveMismatch`]; only a [`Slot`] swaps bindings.

use std::any::{Any, TypeId};
use std::fmt;
use std::rc::Rc;

use weft_core::{Error, Event, EventListener, NodeId, Part, PartKind, RenderSurface, Result, Scalar};

use crate::context::UpdateContext;

/// Rc-level downcasting support, implemented for every `'static` type.
pub trait AsAnyRc: Any {
    fn into_any_rc(self: Rc<Self>) -> Rc<dyn Any>;
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAnyRc for T {
    fn into_any_rc(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Identity of a directive kind.
///
/// Two directives share a kind when they have the same concrete type and the
/// same `tag`. The tag distinguishes, for example, components with different
/// render functions or template results built from different templates.
#[derive(Debug, Clone, Copy)]
pub struct DirectiveKind {
    type_id: TypeId,
    tag: usize,
    name: &'static str,
}

impl DirectiveKind {
    #[must_use]
    pub fn of<D: ?Sized + 'static>(name: &'static str) -> Self {
        Self {
            type_id: TypeId::of::<D>(),
            tag: 0,
            name,
        }
    }

    #[must_use]
    pub fn with_tag(mut self, tag: usize) -> Self {
        self.tag = tag;
        self
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for DirectiveKind {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id && self.tag == other.tag
    }
}

impl Eq for DirectiveKind {}

/// A pure value that knows how to produce a [`Binding`] for a part.
pub trait Directive: AsAnyRc {
    /// Kind identity used to decide whether a binding can be reused.
    fn kind(&self) -> DirectiveKind {
        DirectiveKind::of::<Self>(short_type_name(std::any::type_name::<Self>()))
    }

    /// Build the binding for `part`. Must not touch the surface beyond
    /// creating detached nodes.
    fn resolve(self: Rc<Self>, part: &Part, ctx: &mut UpdateContext) -> Result<Box<dyn Binding>>;
}

fn short_type_name(full: &'static str) -> &'static str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// Kind of a [`Value`], compared when deciding binding reuse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Scalar,
    Listener,
    Directive(DirectiveKind),
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar => f.write_str("scalar"),
            Self::Listener => f.write_str("listener"),
            Self::Directive(kind) => f.write_str(kind.name()),
        }
    }
}

/// Anything that can be rendered into a part.
#[derive(Clone)]
pub enum Value {
    Scalar(Scalar),
    Listener(EventListener),
    Directive(Rc<dyn Directive>),
}

impl Value {
    /// The empty value.
    #[must_use]
    pub const fn none() -> Self {
        Self::Scalar(Scalar::None)
    }

    #[must_use]
    pub fn listener(f: impl Fn(&Event) + 'static) -> Self {
        Self::Listener(Rc::new(f))
    }

    #[must_use]
    pub fn directive<D: Directive>(directive: D) -> Self {
        Self::Directive(Rc::new(directive))
    }

    #[must_use]
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Scalar(_) => ValueKind::Scalar,
            Self::Listener(_) => ValueKind::Listener,
            Self::Directive(d) => ValueKind::Directive(d.kind()),
        }
    }

    /// `Object.is`-style identity: scalars by value, everything else by
    /// pointer.
    #[must_use]
    pub fn is_same(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::Scalar(a), Self::Scalar(b)) => a == b,
            (Self::Listener(a), Self::Listener(b)) => Rc::ptr_eq(a, b),
            (Self::Directive(a), Self::Directive(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Typed access to the directive payload.
    #[must_use]
    pub fn downcast<D: Directive>(&self) -> Option<Rc<D>> {
        match self {
            Self::Directive(d) => Rc::clone(d).into_any_rc().downcast::<D>().ok(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Self::Scalar(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(s) => f.debug_tuple("Scalar").field(s).finish(),
            Self::Listener(_) => f.write_str("Listener(..)"),
            Self::Directive(d) => f.debug_tuple("Directive").field(&d.kind().name()).finish(),
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Self::none()
    }
}

impl From<Scalar> for Value {
    fn from(v: Scalar) -> Self {
        Self::Scalar(v)
    }
}

macro_rules! scalar_into_value {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Self::Scalar(Scalar::from(v))
                }
            }
        )*
    };
}

scalar_into_value!((), bool, i32, i64, u32, usize, f64, &str, String, Rc<str>);

impl From<EventListener> for Value {
    fn from(v: EventListener) -> Self {
        Self::Listener(v)
    }
}

/// Stateful adapter between a value's lifecycle and one [`Part`].
pub trait Binding {
    fn part(&self) -> &Part;

    /// Kind of value this binding was built for.
    fn value_kind(&self) -> ValueKind;

    /// Whether `value` can be bound without replacing this binding.
    fn accepts(&self, value: &Value) -> bool {
        value.kind() == self.value_kind()
    }

    /// First-time activation. Queues the initial writes.
    fn connect(&mut self, ctx: &mut UpdateContext) -> Result<()>;

    /// Update to a new value of the same kind.
    fn bind(&mut self, value: Value, ctx: &mut UpdateContext) -> Result<()>;

    /// Reverse visible effects, keeping caches for a cheap remount.
    fn unbind(&mut self, ctx: &mut UpdateContext);

    /// Permanent teardown: release subscriptions and caches.
    fn disconnect(&mut self, ctx: &mut UpdateContext);

    /// First node of the rendered content (child-slot bindings).
    fn start_node(&self) -> NodeId {
        self.part().node()
    }

    /// Last node of the rendered content; the anchor for child slots.
    fn end_node(&self) -> NodeId {
        self.part().node()
    }
}

/// Fail with [`Error::DirectiveMismatch`] unless `binding` accepts `value`.
pub fn ensure_kind(binding: &dyn Binding, value: &Value) -> Result<()> {
    if binding.accepts(value) {
        Ok(())
    } else {
        Err(Error::DirectiveMismatch {
            expected: binding.value_kind().to_string(),
            actual: value.kind().to_string(),
        })
    }
}

/// Fail with [`Error::WrongPartKind`] unless `part` satisfies `accept`.
pub fn ensure_part(
    directive: &'static str,
    expected: &str,
    part: &Part,
    surface: &dyn RenderSurface,
    accept: impl FnOnce(&Part) -> bool,
) -> Result<()> {
    if accept(part) {
        Ok(())
    } else {
        Err(Error::WrongPartKind {
            directive,
            expected: expected.to_string(),
            actual: part.kind(),
            location: surface.describe_location(part.node()),
        })
    }
}

/// Shorthand for the common "must be a child slot" check.
pub fn ensure_child_slot(directive: &'static str, part: &Part, surface: &dyn RenderSurface) -> Result<()> {
    ensure_part(directive, PartKind::ChildSlot.as_str(), part, surface, |p| {
        p.kind() == PartKind::ChildSlot
    })
}

/// Resolve `value` into a fresh, unconnected binding for `part`.
///
/// Directives resolve themselves; plain values get the host's default
/// binding for the part kind.
pub fn resolve(value: Value, part: &Part, ctx: &mut UpdateContext) -> Result<Box<dyn Binding>> {
    match value {
        Value::Directive(directive) => directive.resolve(part, ctx),
        plain => {
            let host = Rc::clone(ctx.host());
            host.resolve_primitive(plain, part)
        }
    }
}

/// Owner of one logical slot.
///
/// Forwards values of the same kind to the current binding and replaces the
/// binding (unbind + disconnect, then resolve + connect) when the kind
/// changes.
pub struct Slot {
    binding: Box<dyn Binding>,
    connected: bool,
}

impl Slot {
    /// Resolve `value` for `part` without connecting.
    pub fn new(value: Value, part: &Part, ctx: &mut UpdateContext) -> Result<Self> {
        Ok(Self {
            binding: resolve(value, part, ctx)?,
            connected: false,
        })
    }

    #[must_use]
    pub fn binding(&self) -> &dyn Binding {
        self.binding.as_ref()
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected
    }
}

impl Binding for Slot {
    fn part(&self) -> &Part {
        self.binding.part()
    }

    fn value_kind(&self) -> ValueKind {
        self.binding.value_kind()
    }

    fn accepts(&self, _value: &Value) -> bool {
        true
    }

    fn connect(&mut self, ctx: &mut UpdateContext) -> Result<()> {
        self.binding.connect(ctx)?;
        self.connected = true;
        Ok(())
    }

    fn bind(&mut self, value: Value, ctx: &mut UpdateContext) -> Result<()> {
        if !self.connected {
            // Never connected (or torn down): start over with this value.
            let part = self.binding.part().clone();
            self.binding = resolve(value, &part, ctx)?;
            return self.connect(ctx);
        }
        if self.binding.accepts(&value) {
            return self.binding.bind(value, ctx);
        }
        let part = self.binding.part().clone();
        let mut next = resolve(value, &part, ctx)?;
        self.binding.unbind(ctx);
        self.binding.disconnect(ctx);
        next.connect(ctx)?;
        self.binding = next;
        Ok(())
    }

    fn unbind(&mut self, ctx: &mut UpdateContext) {
        self.binding.unbind(ctx);
    }

    fn disconnect(&mut self, ctx: &mut UpdateContext) {
        self.binding.disconnect(ctx);
        self.connected = false;
    }

    fn start_node(&self) -> NodeId {
        self.binding.start_node()
    }

    fn end_node(&self) -> NodeId {
        self.binding.end_node()
    }
}
