#![forbid(unsafe_code)]

use std::rc::Rc;

use weft_core::{Part, Result};

use super::{is_named_attribute, write_attribute};
use crate::context::UpdateContext;
use crate::directive::{Binding, Directive, DirectiveKind, Value, ValueKind, ensure_kind, ensure_part};

/// Inline style declarations for a `style` attribute.
///
/// Property names may be given in camelCase; they are written in
/// kebab-case. Custom properties (`--x`) are kept verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleMap {
    declarations: Vec<(Rc<str>, Rc<str>)>,
}

impl StyleMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `property`; an empty value drops the declaration.
    #[must_use]
    pub fn with(mut self, property: &str, value: impl Into<Rc<str>>) -> Self {
        let property: Rc<str> = css_property_name(property).into();
        let value = value.into();
        self.declarations.retain(|(p, _)| *p != property);
        if !value.is_empty() {
            self.declarations.push((property, value));
        }
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    /// `name: value; ...` in insertion order.
    #[must_use]
    pub fn to_css(&self) -> String {
        self.declarations
            .iter()
            .map(|(p, v)| format!("{p}: {v}"))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

fn css_property_name(name: &str) -> String {
    if name.starts_with("--") {
        return name.to_string();
    }
    let mut out = String::with_capacity(name.len() + 4);
    for ch in name.chars() {
        if ch.is_ascii_uppercase() {
            out.push('-');
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

impl<'a, V: Into<Rc<str>>> FromIterator<(&'a str, V)> for StyleMap {
    fn from_iter<I: IntoIterator<Item = (&'a str, V)>>(iter: I) -> Self {
        iter.into_iter().fold(Self::new(), |map, (p, v)| map.with(p, v))
    }
}

impl Directive for StyleMap {
    fn kind(&self) -> DirectiveKind {
        DirectiveKind::of::<Self>("style-map")
    }

    fn resolve(self: Rc<Self>, part: &Part, ctx: &mut UpdateContext) -> Result<Box<dyn Binding>> {
        ensure_part("style-map", "attribute[style]", part, ctx.surface(), |p| {
            is_named_attribute(p, "style")
        })?;
        Ok(Box::new(StyleMapBinding {
            part: part.clone(),
            css: Rc::from(self.to_css()),
            mounted: false,
        }))
    }
}

impl From<StyleMap> for Value {
    fn from(map: StyleMap) -> Self {
        Value::directive(map)
    }
}

pub struct StyleMapBinding {
    part: Part,
    css: Rc<str>,
    mounted: bool,
}

impl StyleMapBinding {
    #[must_use]
    pub fn css(&self) -> &str {
        &self.css
    }
}

impl Binding for StyleMapBinding {
    fn part(&self) -> &Part {
        &self.part
    }

    fn value_kind(&self) -> ValueKind {
        ValueKind::Directive(DirectiveKind::of::<StyleMap>("style-map"))
    }

    fn connect(&mut self, ctx: &mut UpdateContext) -> Result<()> {
        if !self.mounted {
            self.mounted = true;
            if !self.css.is_empty() {
                write_attribute(self.part.node(), "style", Rc::clone(&self.css), ctx);
            }
        }
        Ok(())
    }

    fn bind(&mut self, value: Value, ctx: &mut UpdateContext) -> Result<()> {
        ensure_kind(self, &value)?;
        let css: Rc<str> = value.downcast::<StyleMap>().map(|map| map.to_css()).unwrap_or_default().into();
        if self.mounted && css == self.css {
            return Ok(());
        }
        self.css = css;
        self.mounted = true;
        write_attribute(self.part.node(), "style", Rc::clone(&self.css), ctx);
        Ok(())
    }

    fn unbind(&mut self, ctx: &mut UpdateContext) {
        if self.mounted {
            self.mounted = false;
            write_attribute(self.part.node(), "style", Rc::from(""), ctx);
        }
    }

    fn disconnect(&mut self, _ctx: &mut UpdateContext) {}
}
