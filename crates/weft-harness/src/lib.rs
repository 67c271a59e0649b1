#![forbid(unsafe_code)]

//! Test harness for weft.
//!
//! - [`template`]: build [`Template`](weft_runtime::Template)s from a small
//!   node description, no markup parser involved.
//! - [`registry`]: a [`TemplateCompiler`](weft_runtime::TemplateCompiler)
//!   that serves pre-built templates by their literal source.
//! - [`fixture`]: a recording surface, a host and a runtime wired together.

pub mod fixture;
pub mod registry;
pub mod template;

pub use fixture::Harness;
pub use registry::TemplateRegistry;
pub use template::{StaticTemplate, TemplateBuilder};
