#![forbid(unsafe_code)]

//! Directives bound to one specific part kind.
//!
//! | directive | part |
//! |---|---|
//! | [`ClassMap`] | attribute named `class` |
//! | [`StyleMap`] | attribute named `style` |
//! | [`NodeRef`] | element |

mod class_map;
mod node_ref;
mod style_map;

pub use class_map::{ClassMap, ClassMapBinding};
pub use node_ref::{NodeRef, NodeRefBinding};
pub use style_map::{StyleMap, StyleMapBinding};

use std::rc::Rc;

use weft_core::{NodeId, PartKind, RenderSurface};

use crate::context::UpdateContext;

fn is_named_attribute(part: &weft_core::Part, name: &str) -> bool {
    part.kind() == PartKind::Attribute && part.name() == Some(name)
}

/// Queue a write of `text` to attribute `name`, removing it when empty.
fn write_attribute(node: NodeId, name: &'static str, text: Rc<str>, ctx: &mut UpdateContext) {
    ctx.enqueue_mutation_effect(move |surface: &dyn RenderSurface| {
        if text.is_empty() {
            surface.remove_attribute(node, name);
        } else {
            surface.set_attribute(node, name, &text);
        }
    });
}
