#![forbid(unsafe_code)]

use std::rc::Rc;

use weft_core::{Part, Result};

use super::{is_named_attribute, write_attribute};
use crate::context::UpdateContext;
use crate::directive::{Binding, Directive, DirectiveKind, Value, ValueKind, ensure_kind, ensure_part};

/// Conditional class list for a `class` attribute.
///
/// Entries keep their insertion order; a name listed twice takes its last
/// flag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassMap {
    entries: Vec<(Rc<str>, bool)>,
}

impl ClassMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, name: impl Into<Rc<str>>, enabled: bool) -> Self {
        let name = name.into();
        if let Some(entry) = self.entries.iter_mut().find(|(n, _)| *n == name) {
            entry.1 = enabled;
        } else {
            self.entries.push((name, enabled));
        }
        self
    }

    /// Space-separated enabled class names.
    #[must_use]
    pub fn to_class_string(&self) -> String {
        let mut out = String::new();
        for (name, _) in self.entries.iter().filter(|(_, on)| *on) {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(name);
        }
        out
    }
}

impl<N: Into<Rc<str>>> FromIterator<(N, bool)> for ClassMap {
    fn from_iter<I: IntoIterator<Item = (N, bool)>>(iter: I) -> Self {
        iter.into_iter().fold(Self::new(), |map, (name, on)| map.with(name, on))
    }
}

impl Directive for ClassMap {
    fn kind(&self) -> DirectiveKind {
        DirectiveKind::of::<Self>("class-map")
    }

    fn resolve(self: Rc<Self>, part: &Part, ctx: &mut UpdateContext) -> Result<Box<dyn Binding>> {
        ensure_part("class-map", "attribute[class]", part, ctx.surface(), |p| {
            is_named_attribute(p, "class")
        })?;
        Ok(Box::new(ClassMapBinding {
            part: part.clone(),
            text: Rc::from(self.to_class_string()),
            mounted: false,
        }))
    }
}

impl From<ClassMap> for Value {
    fn from(map: ClassMap) -> Self {
        Value::directive(map)
    }
}

pub struct ClassMapBinding {
    part: Part,
    text: Rc<str>,
    mounted: bool,
}

impl ClassMapBinding {
    /// Current class attribute text.
    #[must_use]
    pub fn class_string(&self) -> &str {
        &self.text
    }
}

impl Binding for ClassMapBinding {
    fn part(&self) -> &Part {
        &self.part
    }

    fn value_kind(&self) -> ValueKind {
        ValueKind::Directive(DirectiveKind::of::<ClassMap>("class-map"))
    }

    fn connect(&mut self, ctx: &mut UpdateContext) -> Result<()> {
        if !self.mounted {
            self.mounted = true;
            if !self.text.is_empty() {
                write_attribute(self.part.node(), "class", Rc::clone(&self.text), ctx);
            }
        }
        Ok(())
    }

    fn bind(&mut self, value: Value, ctx: &mut UpdateContext) -> Result<()> {
        ensure_kind(self, &value)?;
        let text: Rc<str> = value
            .downcast::<ClassMap>()
            .map(|map| map.to_class_string())
            .unwrap_or_default()
            .into();
        if self.mounted && text == self.text {
            return Ok(());
        }
        self.text = text;
        self.mounted = true;
        write_attribute(self.part.node(), "class", Rc::clone(&self.text), ctx);
        Ok(())
    }

    fn unbind(&mut self, ctx: &mut UpdateContext) {
        if self.mounted {
            self.mounted = false;
            write_attribute(self.part.node(), "class", Rc::from(""), ctx);
        }
    }

    fn disconnect(&mut self, _ctx: &mut UpdateContext) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestRuntime;
    use weft_core::{Error, RenderSurface};

    #[test]
    fn class_string_skips_disabled() {
        let map: ClassMap = [("a", true), ("b", false), ("c", true), ("a", false)].into_iter().collect();
        assert_eq!(map.to_class_string(), "c");
        let map = ClassMap::new().with("x", true).with("y", true);
        assert_eq!(map.to_class_string(), "x y");
    }

    #[test]
    fn writes_only_when_set_changes() {
        let rt = TestRuntime::sync();
        let node = rt.surface.create_element("div");
        rt.surface.append_child(rt.container, node);
        let part = Part::attribute(node, "class");

        let mut ctx = rt.context();
        let mut slot = crate::directive::Slot::new(ClassMap::new().with("on", true).into(), &part, &mut ctx)
            .expect("resolve");
        slot.connect(&mut ctx).expect("connect");
        ctx.flush().expect("flush");
        assert_eq!(rt.surface.attribute(node, "class").as_deref(), Some("on"));
        rt.surface.clear_ops();

        let mut ctx = rt.context();
        let same = ClassMap::new().with("on", true).with("off", false);
        slot.bind(same.into(), &mut ctx).expect("bind");
        assert!(ctx.queue().is_empty());

        slot.bind(ClassMap::new().with("on", true).with("big", true).into(), &mut ctx)
            .expect("bind");
        ctx.flush().expect("flush");
        assert_eq!(rt.surface.attribute(node, "class").as_deref(), Some("on big"));
        assert_eq!(rt.surface.write_count(), 1);
    }

    #[test]
    fn rejects_other_attributes() {
        let rt = TestRuntime::sync();
        let node = rt.surface.create_element("div");
        let mut ctx = rt.context();
        let err = crate::directive::resolve(ClassMap::new().into(), &Part::attribute(node, "id"), &mut ctx).err();
        assert!(matches!(err, Some(Error::WrongPartKind { directive: "class-map", .. })));
    }
}
