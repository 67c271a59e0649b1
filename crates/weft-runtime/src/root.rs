#![forbid(unsafe_code)]

//! Mounting a value into a container.
//!
//! The root owns a top-level [`Block`] whose body binds the mounted value
//! into a child slot anchored at the end of the container. Root renders run
//! at [`Priority::UserBlocking`].

use std::any::Any;
use std::cell::Cell;

use tracing::debug;
use weft_core::{Error, NodeId, Part, Priority, RenderSurface, Result};

use crate::block::{Block, BlockBody};
use crate::context::UpdateContext;
use crate::directive::{Binding, Slot, Value};
use crate::runtime::Runtime;

struct RootBody {
    anchor: NodeId,
    next: Option<Value>,
    slot: Option<Slot>,
}

impl BlockBody for RootBody {
    fn render(&mut self, _block: &Block, ctx: &mut UpdateContext) -> Result<()> {
        let Some(value) = self.next.take() else {
            return Ok(());
        };
        match self.slot.as_mut() {
            Some(slot) => slot.bind(value, ctx),
            None => {
                let mut slot = Slot::new(value, &Part::child_slot(self.anchor), ctx)?;
                slot.connect(ctx)?;
                self.slot = Some(slot);
                Ok(())
            }
        }
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Handle to a mounted tree.
pub struct Root {
    runtime: Runtime,
    block: Block,
    container: NodeId,
    anchor: NodeId,
    mounted: Cell<bool>,
}

/// Render `value` into `container`.
///
/// The first render is scheduled, not performed: drive the host (or call
/// [`Root::wait_for_update`]) to see it on the surface.
#[must_use]
pub fn mount(runtime: &Runtime, value: impl Into<Value>, container: NodeId) -> Root {
    let anchor = runtime.host().surface().create_placeholder();
    let body = RootBody {
        anchor,
        next: Some(value.into()),
        slot: None,
    };
    let block = Block::new("root", None, runtime.clone(), body);
    debug!(container = container.raw(), block = %block.id(), "mount");

    let mut ctx = UpdateContext::new(runtime.clone());
    ctx.enqueue_mutation_effect(move |surface: &dyn RenderSurface| surface.append_child(container, anchor));
    block.request_update(Priority::UserBlocking, &mut ctx);
    ctx.schedule();

    Root {
        runtime: runtime.clone(),
        block,
        container,
        anchor,
        mounted: Cell::new(true),
    }
}

impl Root {
    #[must_use]
    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    #[must_use]
    pub fn block(&self) -> &Block {
        &self.block
    }

    #[must_use]
    pub fn container(&self) -> NodeId {
        self.container
    }

    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.mounted.get()
    }

    fn ensure_mounted(&self) -> Result<()> {
        if self.mounted.get() { Ok(()) } else { Err(Error::Unmounted) }
    }

    /// Schedule a render of `value` in place of the current one.
    pub fn update(&self, value: impl Into<Value>) -> Result<()> {
        self.ensure_mounted()?;
        let value = value.into();
        self.block.with_body(|body: &mut RootBody| body.next = Some(value));
        self.block.schedule_update(Priority::UserBlocking);
        Ok(())
    }

    /// Schedule removal of everything the root rendered.
    pub fn unmount(&self) -> Result<()> {
        self.ensure_mounted()?;
        self.mounted.set(false);
        debug!(container = self.container.raw(), block = %self.block.id(), "unmount");
        let mut ctx = UpdateContext::new(self.runtime.clone());
        let slot = self.block.with_body(|body: &mut RootBody| body.slot.take()).flatten();
        if let Some(mut slot) = slot {
            slot.unbind(&mut ctx);
            slot.disconnect(&mut ctx);
        }
        self.block.disconnect(&mut ctx);
        let anchor = self.anchor;
        ctx.enqueue_mutation_effect(move |surface: &dyn RenderSurface| surface.remove_node(anchor));
        ctx.schedule();
        Ok(())
    }

    /// Fatal error raised by a scheduled flush, if any.
    pub fn check_error(&self) -> Result<()> {
        self.runtime.updater().take_error().map_or(Ok(()), Err)
    }

    /// Run host tasks until every scheduled update has committed.
    pub fn wait_for_update(&self) -> Result<()> {
        self.runtime.wait_for_update()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestRuntime;

    #[test]
    fn mount_update_unmount() {
        let rt = TestRuntime::sync();
        let root = mount(&rt.runtime, "hello", rt.container);
        assert_eq!(rt.surface.inner_markup(rt.container), "", "first render is scheduled");
        root.wait_for_update().expect("mount");
        assert_eq!(rt.surface.text_content(rt.container), "hello");

        root.update("world").expect("update");
        root.wait_for_update().expect("update");
        assert_eq!(rt.surface.text_content(rt.container), "world");

        root.unmount().expect("unmount");
        root.wait_for_update().expect("unmount");
        assert!(rt.surface.children(rt.container).is_empty());
        assert!(!root.is_mounted());
        assert_eq!(root.update("again"), Err(Error::Unmounted));
        assert_eq!(root.unmount(), Err(Error::Unmounted));
    }

    #[test]
    fn updates_in_one_tick_batch() {
        let rt = TestRuntime::sync();
        let root = mount(&rt.runtime, 1, rt.container);
        root.update(2).expect("update");
        root.update(3).expect("update");
        root.wait_for_update().expect("flush");
        assert_eq!(rt.surface.text_content(rt.container), "3");
        let texts: Vec<String> = rt
            .surface
            .ops()
            .into_iter()
            .filter_map(|op| match op {
                weft_core::testing::SurfaceOp::SetText { text, .. } => Some(text),
                _ => None,
            })
            .collect();
        assert_eq!(texts, vec!["3".to_string()], "one render with the last value");
    }

    #[test]
    fn concurrent_root_renders_through_pipeline() {
        let rt = TestRuntime::concurrent();
        let root = mount(&rt.runtime, "x", rt.container);
        assert!(rt.runtime.updater().is_pending());
        root.wait_for_update().expect("mount");
        assert_eq!(rt.surface.text_content(rt.container), "x");
        assert!(!rt.runtime.updater().is_pending());
        root.check_error().expect("no error");
    }
}
