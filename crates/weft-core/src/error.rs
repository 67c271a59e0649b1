#![forbid(unsafe_code)]

//! Fatal engine errors.
//!
//! Every variant is a programmer error: a violated structural invariant, not
//! a transient condition. None of them is retried or recovered from; the
//! transaction that raised one is aborted before any of its effects commit.

use thiserror::Error;

use crate::part::PartKind;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("{directive} cannot be attached to a {actual} part (expected {expected}) at {location}")]
    WrongPartKind {
        directive: &'static str,
        expected: String,
        actual: PartKind,
        location: String,
    },

    #[error("binding for {expected} received a value of kind {actual}")]
    DirectiveMismatch { expected: String, actual: String },

    #[error("hook {index} of <{block}> changed from {expected} to {actual} between renders")]
    HookMismatch {
        block: String,
        index: usize,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("<{block}> rendered {actual} hooks, but the previous render used {expected}")]
    HookCountMismatch {
        block: String,
        expected: usize,
        actual: usize,
    },

    #[error("<{block}> added hook {index} after its hook list was finalized")]
    HookAfterFinalize { block: String, index: usize },

    #[error("no {type_name} context was provided above <{block}>")]
    MissingContext {
        type_name: &'static str,
        block: String,
    },

    #[error("plain values cannot be bound to a {kind} part at {location}")]
    NoPrimitiveBinding { kind: PartKind, location: String },

    #[error("no template registered for {source_preview:?}")]
    TemplateNotFound { source_preview: String },

    #[error("root was used after unmount")]
    Unmounted,
}

impl Error {
    /// Short, stable identifier for logging.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::WrongPartKind { .. } => "wrong_part_kind",
            Self::DirectiveMismatch { .. } => "directive_mismatch",
            Self::HookMismatch { .. } => "hook_mismatch",
            Self::HookCountMismatch { .. } => "hook_count_mismatch",
            Self::HookAfterFinalize { .. } => "hook_after_finalize",
            Self::MissingContext { .. } => "missing_context",
            Self::NoPrimitiveBinding { .. } => "no_primitive_binding",
            Self::TemplateNotFound { .. } => "template_not_found",
            Self::Unmounted => "unmounted",
        }
    }
}
