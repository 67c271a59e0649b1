#![forbid(unsafe_code)]

//! Default bindings for plain values.
//!
//! | Part | Binding | Write |
//! |---|---|---|
//! | attribute | [`AttributeBinding`] | set, or remove when absent |
//! | property | [`PropertyBinding`] | set property |
//! | event | [`EventBinding`] | one stable listener, swappable handler |
//! | text slot | [`TextBinding`] | set text |
//! | child slot | [`ChildValueBinding`] | text node before the anchor |
//!
//! An element part has no primitive binding.

use std::cell::RefCell;
use std::rc::Rc;

use weft_core::{Error, Event, EventListener, NodeId, Part, RenderSurface, Result, Scalar};

use crate::context::UpdateContext;
use crate::directive::{Binding, Value, ValueKind, ensure_kind};

/// Pick the primitive binding for `part`.
pub fn resolve_primitive(value: Value, part: &Part, surface: &dyn RenderSurface) -> Result<Box<dyn Binding>> {
    let binding: Box<dyn Binding> = match part {
        Part::Attribute { .. } => Box::new(AttributeBinding::new(part.clone(), scalar_of(value)?)),
        Part::Property { .. } => Box::new(PropertyBinding::new(part.clone(), scalar_of(value)?)),
        Part::Event { .. } => Box::new(EventBinding::new(part.clone(), listener_of(value)?)),
        Part::TextSlot { .. } => Box::new(TextBinding::new(part.clone(), scalar_of(value)?)),
        Part::ChildSlot { .. } => Box::new(ChildValueBinding::new(part.clone(), scalar_of(value)?, surface)),
        Part::Element { node } => {
            return Err(Error::NoPrimitiveBinding {
                kind: part.kind(),
                location: surface.describe_location(*node),
            });
        }
    };
    Ok(binding)
}

fn scalar_of(value: Value) -> Result<Scalar> {
    match value {
        Value::Scalar(s) => Ok(s),
        other => Err(Error::DirectiveMismatch {
            expected: ValueKind::Scalar.to_string(),
            actual: other.kind().to_string(),
        }),
    }
}

fn listener_of(value: Value) -> Result<Option<EventListener>> {
    match value {
        Value::Listener(l) => Ok(Some(l)),
        Value::Scalar(Scalar::None) => Ok(None),
        other => Err(Error::DirectiveMismatch {
            expected: ValueKind::Listener.to_string(),
            actual: other.kind().to_string(),
        }),
    }
}

fn attribute_name(part: &Part) -> Rc<str> {
    match part {
        Part::Attribute { name, .. } | Part::Property { name, .. } | Part::Event { name, .. } => Rc::clone(name),
        _ => Rc::from(""),
    }
}

// ---------------------------------------------------------------------------
// Attribute
// ---------------------------------------------------------------------------

pub struct AttributeBinding {
    part: Part,
    name: Rc<str>,
    value: Scalar,
    mounted: bool,
}

impl AttributeBinding {
    #[must_use]
    pub fn new(part: Part, value: Scalar) -> Self {
        Self {
            name: attribute_name(&part),
            part,
            value,
            mounted: false,
        }
    }

    fn write(&self, ctx: &mut UpdateContext) {
        let (node, name, value) = (self.part.node(), Rc::clone(&self.name), self.value.clone());
        ctx.enqueue_mutation_effect(move |surface: &dyn RenderSurface| {
            if value.is_absent() {
                surface.remove_attribute(node, &name);
            } else if value == Scalar::Bool(true) {
                surface.set_attribute(node, &name, "");
            } else {
                surface.set_attribute(node, &name, &value.to_text());
            }
        });
    }
}

impl Binding for AttributeBinding {
    fn part(&self) -> &Part {
        &self.part
    }

    fn value_kind(&self) -> ValueKind {
        ValueKind::Scalar
    }

    fn connect(&mut self, ctx: &mut UpdateContext) -> Result<()> {
        if !self.mounted {
            self.mounted = true;
            if !self.value.is_absent() {
                self.write(ctx);
            }
        }
        Ok(())
    }

    fn bind(&mut self, value: Value, ctx: &mut UpdateContext) -> Result<()> {
        ensure_kind(self, &value)?;
        let value = scalar_of(value)?;
        if self.mounted && value == self.value {
            return Ok(());
        }
        let was_present = self.mounted && !self.value.is_absent();
        self.value = value;
        self.mounted = true;
        if was_present || !self.value.is_absent() {
            self.write(ctx);
        }
        Ok(())
    }

    fn unbind(&mut self, ctx: &mut UpdateContext) {
        if self.mounted && !self.value.is_absent() {
            let (node, name) = (self.part.node(), Rc::clone(&self.name));
            ctx.enqueue_mutation_effect(move |surface: &dyn RenderSurface| surface.remove_attribute(node, &name));
        }
        self.mounted = false;
    }

    fn disconnect(&mut self, _ctx: &mut UpdateContext) {
        self.mounted = false;
    }
}

// ---------------------------------------------------------------------------
// Property
// ---------------------------------------------------------------------------

pub struct PropertyBinding {
    part: Part,
    name: Rc<str>,
    value: Scalar,
    mounted: bool,
}

impl PropertyBinding {
    #[must_use]
    pub fn new(part: Part, value: Scalar) -> Self {
        Self {
            name: attribute_name(&part),
            part,
            value,
            mounted: false,
        }
    }

    fn write(&self, value: Scalar, ctx: &mut UpdateContext) {
        let (node, name) = (self.part.node(), Rc::clone(&self.name));
        ctx.enqueue_mutation_effect(move |surface: &dyn RenderSurface| surface.set_property(node, &name, &value));
    }
}

impl Binding for PropertyBinding {
    fn part(&self) -> &Part {
        &self.part
    }

    fn value_kind(&self) -> ValueKind {
        ValueKind::Scalar
    }

    fn connect(&mut self, ctx: &mut UpdateContext) -> Result<()> {
        if !self.mounted {
            self.mounted = true;
            self.write(self.value.clone(), ctx);
        }
        Ok(())
    }

    fn bind(&mut self, value: Value, ctx: &mut UpdateContext) -> Result<()> {
        ensure_kind(self, &value)?;
        let value = scalar_of(value)?;
        if self.mounted && value == self.value {
            return Ok(());
        }
        self.value = value;
        self.mounted = true;
        self.write(self.value.clone(), ctx);
        Ok(())
    }

    fn unbind(&mut self, ctx: &mut UpdateContext) {
        if self.mounted {
            self.write(Scalar::None, ctx);
        }
        self.mounted = false;
    }

    fn disconnect(&mut self, _ctx: &mut UpdateContext) {
        self.mounted = false;
    }
}

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// Registers one trampoline listener; handler changes never touch the
/// surface.
pub struct EventBinding {
    part: Part,
    name: Rc<str>,
    handler: Option<EventListener>,
    /// Handler seen by dispatched events; swapped during commit.
    live: Rc<RefCell<Option<EventListener>>>,
    trampoline: EventListener,
    registered: bool,
}

impl EventBinding {
    #[must_use]
    pub fn new(part: Part, handler: Option<EventListener>) -> Self {
        let live: Rc<RefCell<Option<EventListener>>> = Rc::new(RefCell::new(None));
        let target = Rc::clone(&live);
        let trampoline: EventListener = Rc::new(move |event: &Event| {
            let handler = target.borrow().clone();
            if let Some(handler) = handler {
                handler(event);
            }
        });
        Self {
            name: attribute_name(&part),
            part,
            handler,
            live,
            trampoline,
            registered: false,
        }
    }

    fn sync(&mut self, ctx: &mut UpdateContext) {
        let (node, name) = (self.part.node(), Rc::clone(&self.name));
        let live = Rc::clone(&self.live);
        let handler = self.handler.clone();
        let trampoline = Rc::clone(&self.trampoline);
        let register = handler.is_some() && !self.registered;
        let release = handler.is_none() && self.registered;
        self.registered = handler.is_some();
        ctx.enqueue_mutation_effect(move |surface: &dyn RenderSurface| {
            *live.borrow_mut() = handler;
            if register {
                surface.add_event_listener(node, &name, &trampoline);
            } else if release {
                surface.remove_event_listener(node, &name, &trampoline);
            }
        });
    }

    fn release(&mut self, ctx: &mut UpdateContext) {
        if !self.registered {
            return;
        }
        self.registered = false;
        let (node, name) = (self.part.node(), Rc::clone(&self.name));
        let live = Rc::clone(&self.live);
        let trampoline = Rc::clone(&self.trampoline);
        ctx.enqueue_mutation_effect(move |surface: &dyn RenderSurface| {
            *live.borrow_mut() = None;
            surface.remove_event_listener(node, &name, &trampoline);
        });
    }
}

impl Binding for EventBinding {
    fn part(&self) -> &Part {
        &self.part
    }

    fn value_kind(&self) -> ValueKind {
        ValueKind::Listener
    }

    fn accepts(&self, value: &Value) -> bool {
        matches!(value, Value::Listener(_) | Value::Scalar(Scalar::None))
    }

    fn connect(&mut self, ctx: &mut UpdateContext) -> Result<()> {
        if self.handler.is_some() && !self.registered {
            self.sync(ctx);
        }
        Ok(())
    }

    fn bind(&mut self, value: Value, ctx: &mut UpdateContext) -> Result<()> {
        ensure_kind(self, &value)?;
        let handler = listener_of(value)?;
        let same = match (&handler, &self.handler) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        };
        if same && self.registered == handler.is_some() {
            return Ok(());
        }
        self.handler = handler;
        self.sync(ctx);
        Ok(())
    }

    fn unbind(&mut self, ctx: &mut UpdateContext) {
        self.release(ctx);
    }

    fn disconnect(&mut self, ctx: &mut UpdateContext) {
        self.release(ctx);
    }
}

// ---------------------------------------------------------------------------
// Text
// ---------------------------------------------------------------------------

pub struct TextBinding {
    part: Part,
    value: Scalar,
    mounted: bool,
}

impl TextBinding {
    #[must_use]
    pub fn new(part: Part, value: Scalar) -> Self {
        Self {
            part,
            value,
            mounted: false,
        }
    }

    fn write(&self, text: String, ctx: &mut UpdateContext) {
        let node = self.part.node();
        ctx.enqueue_mutation_effect(move |surface: &dyn RenderSurface| surface.set_text(node, &text));
    }
}

impl Binding for TextBinding {
    fn part(&self) -> &Part {
        &self.part
    }

    fn value_kind(&self) -> ValueKind {
        ValueKind::Scalar
    }

    fn connect(&mut self, ctx: &mut UpdateContext) -> Result<()> {
        if !self.mounted {
            self.mounted = true;
            self.write(self.value.to_text(), ctx);
        }
        Ok(())
    }

    fn bind(&mut self, value: Value, ctx: &mut UpdateContext) -> Result<()> {
        ensure_kind(self, &value)?;
        let value = scalar_of(value)?;
        if self.mounted && value == self.value {
            return Ok(());
        }
        self.value = value;
        self.mounted = true;
        self.write(self.value.to_text(), ctx);
        Ok(())
    }

    fn unbind(&mut self, ctx: &mut UpdateContext) {
        if self.mounted {
            self.write(String::new(), ctx);
        }
        self.mounted = false;
    }

    fn disconnect(&mut self, _ctx: &mut UpdateContext) {
        self.mounted = false;
    }
}

// ---------------------------------------------------------------------------
// Child value
// ---------------------------------------------------------------------------

/// A plain value rendered into a child slot as a text node placed before
/// the slot's anchor.
pub struct ChildValueBinding {
    part: Part,
    text_node: NodeId,
    value: Scalar,
    /// Text last written to the node.
    written: Option<String>,
    mounted: bool,
}

impl ChildValueBinding {
    #[must_use]
    pub fn new(part: Part, value: Scalar, surface: &dyn RenderSurface) -> Self {
        Self {
            text_node: surface.create_text(""),
            part,
            value,
            written: None,
            mounted: false,
        }
    }

    fn mount(&mut self, ctx: &mut UpdateContext) {
        let (node, anchor) = (self.text_node, self.part.node());
        let text = self.value.to_text();
        let write = self.written.as_deref() != Some(text.as_str());
        self.written = Some(text.clone());
        self.mounted = true;
        ctx.enqueue_mutation_effect(move |surface: &dyn RenderSurface| {
            if write {
                surface.set_text(node, &text);
            }
            surface.insert_before(node, anchor);
        });
    }
}

impl Binding for ChildValueBinding {
    fn part(&self) -> &Part {
        &self.part
    }

    fn value_kind(&self) -> ValueKind {
        ValueKind::Scalar
    }

    fn connect(&mut self, ctx: &mut UpdateContext) -> Result<()> {
        if !self.mounted {
            self.mount(ctx);
        }
        Ok(())
    }

    fn bind(&mut self, value: Value, ctx: &mut UpdateContext) -> Result<()> {
        ensure_kind(self, &value)?;
        let value = scalar_of(value)?;
        if !self.mounted {
            self.value = value;
            self.mount(ctx);
            return Ok(());
        }
        if value == self.value {
            return Ok(());
        }
        self.value = value;
        let text = self.value.to_text();
        if self.written.as_deref() == Some(text.as_str()) {
            return Ok(());
        }
        self.written = Some(text.clone());
        let node = self.text_node;
        ctx.enqueue_mutation_effect(move |surface: &dyn RenderSurface| surface.set_text(node, &text));
        Ok(())
    }

    fn unbind(&mut self, ctx: &mut UpdateContext) {
        if self.mounted {
            let node = self.text_node;
            ctx.enqueue_mutation_effect(move |surface: &dyn RenderSurface| surface.remove_node(node));
        }
        self.mounted = false;
    }

    fn disconnect(&mut self, _ctx: &mut UpdateContext) {
        self.mounted = false;
    }

    fn start_node(&self) -> NodeId {
        if self.mounted { self.text_node } else { self.part.node() }
    }

    fn end_node(&self) -> NodeId {
        self.part.node()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestRuntime;
    use weft_core::testing::{RecordingSurface, SurfaceOp};
    use weft_core::PartKind;

    fn element(rt: &TestRuntime, tag: &str) -> NodeId {
        let node = rt.surface.create_element(tag);
        rt.surface.append_child(rt.container, node);
        node
    }

    fn bind_and_commit(rt: &TestRuntime, binding: &mut dyn Binding, value: Value) {
        let mut ctx = rt.context();
        binding.bind(value, &mut ctx).expect("bind");
        ctx.flush().expect("flush");
    }

    #[test]
    fn attribute_writes_and_removes() {
        let rt = TestRuntime::sync();
        let node = element(&rt, "div");
        let part = Part::attribute(node, "title");
        let mut ctx = rt.context();
        let mut binding = resolve_primitive(Value::from("hello"), &part, &rt.surface).expect("resolve");
        binding.connect(&mut ctx).expect("connect");
        assert_eq!(ctx.queue().effect_count(weft_core::CommitPhase::Mutation), 1);
        assert_eq!(rt.surface.attribute(node, "title"), None, "no write before commit");
        ctx.flush().expect("flush");
        assert_eq!(rt.surface.attribute(node, "title").as_deref(), Some("hello"));

        bind_and_commit(&rt, binding.as_mut(), Value::none());
        assert_eq!(rt.surface.attribute(node, "title"), None);

        bind_and_commit(&rt, binding.as_mut(), Value::from(true));
        assert_eq!(rt.surface.attribute(node, "title").as_deref(), Some(""));
    }

    #[test]
    fn equal_value_queues_nothing() {
        let rt = TestRuntime::sync();
        let node = element(&rt, "div");
        let mut binding = AttributeBinding::new(Part::attribute(node, "id"), Scalar::from("a"));
        let mut ctx = rt.context();
        binding.connect(&mut ctx).expect("connect");
        ctx.flush().expect("flush");
        rt.surface.clear_ops();

        let mut ctx = rt.context();
        binding.bind(Value::from("a"), &mut ctx).expect("bind");
        binding.bind(Value::from("a"), &mut ctx).expect("bind");
        assert!(ctx.queue().is_empty());
        ctx.flush().expect("flush");
        assert_eq!(rt.surface.write_count(), 0);
    }

    #[test]
    fn absent_attribute_on_connect_writes_nothing() {
        let rt = TestRuntime::sync();
        let node = element(&rt, "input");
        let mut binding = AttributeBinding::new(Part::attribute(node, "disabled"), Scalar::Bool(false));
        let mut ctx = rt.context();
        binding.connect(&mut ctx).expect("connect");
        assert!(ctx.queue().is_empty());
    }

    #[test]
    fn property_unbind_clears() {
        let rt = TestRuntime::sync();
        let node = element(&rt, "input");
        let mut binding = PropertyBinding::new(Part::property(node, "value"), Scalar::from(3));
        let mut ctx = rt.context();
        binding.connect(&mut ctx).expect("connect");
        ctx.flush().expect("flush");
        assert_eq!(rt.surface.property(node, "value"), Some(Scalar::Int(3)));
        let mut ctx = rt.context();
        binding.unbind(&mut ctx);
        ctx.flush().expect("flush");
        assert_eq!(rt.surface.property(node, "value"), Some(Scalar::None));
    }

    #[test]
    fn event_handler_swaps_without_reregistering() {
        let rt = TestRuntime::sync();
        let node = element(&rt, "button");
        let hits = Rc::new(RefCell::new(Vec::new()));
        let listener = |tag: &'static str| -> EventListener {
            let hits = Rc::clone(&hits);
            Rc::new(move |_: &Event| hits.borrow_mut().push(tag))
        };
        let mut binding = EventBinding::new(Part::event(node, "click"), Some(listener("first")));
        let mut ctx = rt.context();
        binding.connect(&mut ctx).expect("connect");
        ctx.flush().expect("flush");
        rt.surface.dispatch(node, "click", ());

        bind_and_commit(&rt, &mut binding, Value::Listener(listener("second")));
        rt.surface.dispatch(node, "click", ());
        assert_eq!(*hits.borrow(), vec!["first", "second"]);
        assert_eq!(rt.surface.listener_count(node, "click"), 1);

        bind_and_commit(&rt, &mut binding, Value::none());
        assert_eq!(rt.surface.listener_count(node, "click"), 0);
        let adds = rt
            .surface
            .ops()
            .iter()
            .filter(|op| matches!(op, SurfaceOp::AddListener { .. }))
            .count();
        assert_eq!(adds, 1);
    }

    #[test]
    fn child_value_inserts_text_before_anchor() {
        let rt = TestRuntime::sync();
        let anchor = rt.surface.create_placeholder();
        rt.surface.append_child(rt.container, anchor);
        let part = Part::child_slot(anchor);
        let mut ctx = rt.context();
        let mut binding = resolve_primitive(Value::from(42), &part, &rt.surface).expect("resolve");
        binding.connect(&mut ctx).expect("connect");
        ctx.flush().expect("flush");
        assert_eq!(rt.surface.inner_markup(rt.container), "42");
        assert_ne!(binding.start_node(), anchor);

        bind_and_commit(&rt, binding.as_mut(), Value::from("x"));
        assert_eq!(rt.surface.inner_markup(rt.container), "x");

        let mut ctx = rt.context();
        binding.unbind(&mut ctx);
        ctx.flush().expect("flush");
        assert_eq!(rt.surface.inner_markup(rt.container), "");
        assert_eq!(binding.start_node(), anchor);
    }

    #[test]
    fn element_part_has_no_primitive() {
        let surface = RecordingSurface::new();
        let node = surface.create_element("div");
        let err = resolve_primitive(Value::from(1), &Part::element(node), &surface).err();
        assert!(matches!(
            err,
            Some(Error::NoPrimitiveBinding {
                kind: PartKind::Element,
                ..
            })
        ));
    }

    #[test]
    fn mismatched_value_is_fatal() {
        let rt = TestRuntime::sync();
        let node = element(&rt, "p");
        let mut binding = TextBinding::new(Part::text_slot(node), Scalar::from("a"));
        let mut ctx = rt.context();
        let err = binding.bind(Value::listener(|_| {}), &mut ctx).err();
        assert!(matches!(err, Some(Error::DirectiveMismatch { .. })));
    }
}
