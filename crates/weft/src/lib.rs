#![forbid(unsafe_code)]

//! Weft public facade crate.
//!
//! Re-exports the surface-agnostic core, the update engine, and (with the
//! default `harness` feature) the template builder and test fixture.

pub use weft_core as core;
#[cfg(feature = "harness")]
pub use weft_harness as harness;
pub use weft_runtime as runtime;

pub mod prelude {
    pub use weft_core::{Error, Event, EventListener, NodeId, Part, Priority, RenderSurface, Result, Scalar};
    pub use weft_runtime::{
        Atom, ClassMap, Component, Computed, Key, KeyedList, NodeRef, PositionalList, RenderContext, Root, Runtime,
        RuntimeConfig, SetState, Signal, SignalExt, StandardHost, StyleMap, TemplateLiteral, TemplateResult,
        UpdaterKind, Value, mount,
    };

    #[cfg(feature = "harness")]
    pub use weft_harness::{Harness, TemplateBuilder, TemplateRegistry};
}
