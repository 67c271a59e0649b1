#![forbid(unsafe_code)]

//! Templates and their directives.
//!
//! A [`Template`] stamps out a detached fragment plus the parts its holes
//! map to. Parsing markup into a template is the job of a
//! [`TemplateCompiler`] supplied by the host.
//!
//! Two directives render templates into a child slot:
//!
//! - [`TemplateResult`]: an already compiled template plus hole values.
//! - [`TemplateLiteral`]: static strings plus hole values, compiled (and
//!   cached by strings identity) through [`Host::get_template`].
//!
//! Both resolve to a [`TemplateBinding`] that instantiates once, keeps one
//! [`Slot`] per hole, and moves its fragment in and out of the surface on
//! connect/unbind.
//!
//! [`Host::get_template`]: crate::Host::get_template

use std::fmt;
use std::rc::Rc;

use tracing::trace;
use weft_core::{Error, NodeId, Part, RenderSurface, Result};

use crate::context::UpdateContext;
use crate::directive::{Binding, Directive, DirectiveKind, Slot, Value, ValueKind, ensure_child_slot, ensure_kind};

/// Markup dialect of a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TemplateMode {
    #[default]
    Html,
    Svg,
    Math,
}

/// Freshly stamped, detached template instance.
#[derive(Debug, Clone, Default)]
pub struct TemplateFragment {
    /// Top-level nodes, in document order.
    pub nodes: Vec<NodeId>,
    /// One part per hole, in hole order.
    pub parts: Vec<Part>,
}

pub trait Template {
    /// Create a detached copy of the template's nodes.
    fn instantiate(&self, surface: &dyn RenderSurface) -> TemplateFragment;

    fn hole_count(&self) -> usize;
}

/// Turns a literal's static strings into a template.
pub trait TemplateCompiler {
    fn compile(&self, strings: &'static [&'static str], mode: TemplateMode) -> Result<Rc<dyn Template>>;
}

/// Short, single-line rendering of a literal for error messages.
#[must_use]
pub fn preview(strings: &[&str]) -> String {
    const LIMIT: usize = 60;
    let joined = strings.join("${}");
    let flat: String = joined.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= LIMIT {
        flat
    } else {
        let mut cut: String = flat.chars().take(LIMIT).collect();
        cut.push('…');
        cut
    }
}

// ---------------------------------------------------------------------------
// Directives
// ---------------------------------------------------------------------------

/// A compiled template with its hole values.
#[derive(Clone)]
pub struct TemplateResult {
    template: Rc<dyn Template>,
    values: Vec<Value>,
}

impl TemplateResult {
    pub fn new(template: Rc<dyn Template>, values: Vec<Value>) -> Self {
        Self { template, values }
    }

    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }
}

impl fmt::Debug for TemplateResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateResult")
            .field("holes", &self.template.hole_count())
            .field("values", &self.values)
            .finish()
    }
}

impl Directive for TemplateResult {
    fn kind(&self) -> DirectiveKind {
        DirectiveKind::of::<Self>("template").with_tag(Rc::as_ptr(&self.template).cast::<()>() as usize)
    }

    fn resolve(self: Rc<Self>, part: &Part, ctx: &mut UpdateContext) -> Result<Box<dyn Binding>> {
        let binding = TemplateBinding::new(self.kind(), self.template.as_ref(), self.values.clone(), part, ctx)?;
        Ok(Box::new(binding))
    }
}

impl From<TemplateResult> for Value {
    fn from(result: TemplateResult) -> Self {
        Value::directive(result)
    }
}

/// Static strings plus hole values; compiled through the host.
#[derive(Clone)]
pub struct TemplateLiteral {
    strings: &'static [&'static str],
    mode: TemplateMode,
    values: Vec<Value>,
}

impl TemplateLiteral {
    pub fn new(strings: &'static [&'static str], mode: TemplateMode, values: Vec<Value>) -> Self {
        Self { strings, mode, values }
    }

    pub fn html(strings: &'static [&'static str], values: Vec<Value>) -> Self {
        Self::new(strings, TemplateMode::Html, values)
    }

    pub fn svg(strings: &'static [&'static str], values: Vec<Value>) -> Self {
        Self::new(strings, TemplateMode::Svg, values)
    }

    pub fn math(strings: &'static [&'static str], values: Vec<Value>) -> Self {
        Self::new(strings, TemplateMode::Math, values)
    }

    #[must_use]
    pub fn strings(&self) -> &'static [&'static str] {
        self.strings
    }

    #[must_use]
    pub fn mode(&self) -> TemplateMode {
        self.mode
    }
}

impl fmt::Debug for TemplateLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateLiteral")
            .field("source", &preview(self.strings))
            .field("mode", &self.mode)
            .field("values", &self.values)
            .finish()
    }
}

impl Directive for TemplateLiteral {
    fn kind(&self) -> DirectiveKind {
        // Mode goes into the low bits; string tables are pointer aligned.
        let tag = self.strings.as_ptr() as usize ^ self.mode as usize;
        DirectiveKind::of::<Self>("template-literal").with_tag(tag)
    }

    fn resolve(self: Rc<Self>, part: &Part, ctx: &mut UpdateContext) -> Result<Box<dyn Binding>> {
        let template = ctx.host().get_template(self.strings, self.mode)?;
        let binding = TemplateBinding::new(self.kind(), template.as_ref(), self.values.clone(), part, ctx)?;
        Ok(Box::new(binding))
    }
}

impl From<TemplateLiteral> for Value {
    fn from(literal: TemplateLiteral) -> Self {
        Value::directive(literal)
    }
}

fn template_values(value: &Value) -> Option<Vec<Value>> {
    if let Some(result) = value.downcast::<TemplateResult>() {
        return Some(result.values.clone());
    }
    value.downcast::<TemplateLiteral>().map(|literal| literal.values.clone())
}

// ---------------------------------------------------------------------------
// Binding
// ---------------------------------------------------------------------------

/// One mounted template instance.
pub struct TemplateBinding {
    part: Part,
    kind: DirectiveKind,
    nodes: Vec<NodeId>,
    slots: Vec<Slot>,
    mounted: bool,
}

impl TemplateBinding {
    /// Instantiate `template` and resolve one slot per hole.
    pub fn new(
        kind: DirectiveKind,
        template: &dyn Template,
        values: Vec<Value>,
        part: &Part,
        ctx: &mut UpdateContext,
    ) -> Result<Self> {
        ensure_child_slot(kind.name(), part, ctx.surface())?;
        let fragment = template.instantiate(ctx.surface());
        if fragment.parts.len() != values.len() {
            return Err(Error::DirectiveMismatch {
                expected: format!("{} template values", fragment.parts.len()),
                actual: format!("{} values", values.len()),
            });
        }
        let mut slots = Vec::with_capacity(values.len());
        for (hole, value) in fragment.parts.iter().zip(values) {
            slots.push(Slot::new(value, hole, ctx)?);
        }
        trace!(nodes = fragment.nodes.len(), holes = slots.len(), "instantiated template");
        Ok(Self {
            part: part.clone(),
            kind,
            nodes: fragment.nodes,
            slots,
            mounted: false,
        })
    }

    fn insert(&mut self, ctx: &mut UpdateContext) {
        self.mounted = true;
        if self.nodes.is_empty() {
            return;
        }
        let (nodes, anchor) = (self.nodes.clone(), self.part.node());
        ctx.enqueue_mutation_effect(move |surface: &dyn RenderSurface| {
            for node in nodes {
                surface.insert_before(node, anchor);
            }
        });
    }
}

impl Binding for TemplateBinding {
    fn part(&self) -> &Part {
        &self.part
    }

    fn value_kind(&self) -> ValueKind {
        ValueKind::Directive(self.kind)
    }

    fn connect(&mut self, ctx: &mut UpdateContext) -> Result<()> {
        // Fragment first so holes at the fragment's top level have a parent.
        if !self.mounted {
            self.insert(ctx);
        }
        for slot in &mut self.slots {
            slot.connect(ctx)?;
        }
        Ok(())
    }

    fn bind(&mut self, value: Value, ctx: &mut UpdateContext) -> Result<()> {
        ensure_kind(self, &value)?;
        let values = template_values(&value).unwrap_or_default();
        if values.len() != self.slots.len() {
            return Err(Error::DirectiveMismatch {
                expected: format!("{} template values", self.slots.len()),
                actual: format!("{} values", values.len()),
            });
        }
        if !self.mounted {
            self.insert(ctx);
        }
        for (slot, value) in self.slots.iter_mut().zip(values) {
            slot.bind(value, ctx)?;
        }
        Ok(())
    }

    fn unbind(&mut self, ctx: &mut UpdateContext) {
        if !self.mounted {
            return;
        }
        for slot in &mut self.slots {
            slot.unbind(ctx);
        }
        self.mounted = false;
        let nodes = self.nodes.clone();
        ctx.enqueue_mutation_effect(move |surface: &dyn RenderSurface| {
            for node in nodes {
                surface.remove_node(node);
            }
        });
    }

    fn disconnect(&mut self, ctx: &mut UpdateContext) {
        for slot in &mut self.slots {
            slot.disconnect(ctx);
        }
    }

    fn start_node(&self) -> NodeId {
        match self.nodes.first() {
            Some(first) if self.mounted => *first,
            _ => self.part.node(),
        }
    }

    fn end_node(&self) -> NodeId {
        self.part.node()
    }
}
