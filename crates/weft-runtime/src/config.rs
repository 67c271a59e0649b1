#![forbid(unsafe_code)]

//! Runtime configuration.
//!
//! Defaults can be overridden from the environment:
//!
//! | Variable | Meaning |
//! |---|---|
//! | `WEFT_UPDATER` | `sync` or `concurrent` |
//! | `WEFT_FRAME_BUDGET_MS` | render time slice before yielding (concurrent only) |
//! | `WEFT_DEFAULT_PRIORITY` | priority used outside any running task |

use std::env;
use std::fmt;
use std::str::FromStr;

use weft_core::Priority;
use web_time::Duration;

/// Which updater drives transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdaterKind {
    /// One microtask per tick, flushed to completion.
    #[default]
    Sync,
    /// Prioritized, yielding pipelines.
    Concurrent,
}

impl UpdaterKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sync => "sync",
            Self::Concurrent => "concurrent",
        }
    }
}

impl fmt::Display for UpdaterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UpdaterKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sync" => Ok(Self::Sync),
            "concurrent" => Ok(Self::Concurrent),
            other => Err(format!("unknown updater: {other}")),
        }
    }
}

/// Configuration for a [`Runtime`](crate::Runtime).
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeConfig {
    pub updater: UpdaterKind,
    /// Render budget per slice before the concurrent updater yields.
    pub frame_budget: Duration,
    /// Priority reported when no prioritized task is running.
    pub default_priority: Priority,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            updater: UpdaterKind::Sync,
            frame_budget: Duration::from_millis(5),
            default_priority: Priority::UserVisible,
        }
    }
}

impl RuntimeConfig {
    /// Defaults with environment overrides applied.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| env::var(key).ok())
    }

    /// Apply overrides from `lookup`. Unparseable values are ignored.
    #[must_use]
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(val) = lookup("WEFT_UPDATER")
            && let Ok(kind) = val.parse()
        {
            self.updater = kind;
        }
        if let Some(val) = lookup("WEFT_FRAME_BUDGET_MS")
            && let Ok(ms) = val.trim().parse::<u64>()
        {
            self.frame_budget = Duration::from_millis(ms);
        }
        if let Some(val) = lookup("WEFT_DEFAULT_PRIORITY")
            && let Ok(priority) = val.parse()
        {
            self.default_priority = priority;
        }
        self
    }

    #[must_use]
    pub fn with_updater(mut self, updater: UpdaterKind) -> Self {
        self.updater = updater;
        self
    }

    #[must_use]
    pub fn with_frame_budget(mut self, budget: Duration) -> Self {
        self.frame_budget = budget;
        self
    }

    #[must_use]
    pub fn with_default_priority(mut self, priority: Priority) -> Self {
        self.default_priority = priority;
        self
    }
}
