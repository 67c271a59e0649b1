#![forbid(unsafe_code)]

//! Update priorities and effect commit phases.
//!
//! [`Priority`] is totally ordered: `Background < UserVisible < UserBlocking`.
//! A higher priority preempts lower ones in the concurrent updater and wins
//! when two requests for the same block are coalesced.

use std::fmt;
use std::str::FromStr;

/// Scheduling class of an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Priority {
    /// Work that can wait indefinitely (passive effects, prefetch).
    Background,
    /// Default class for state changes.
    #[default]
    UserVisible,
    /// Direct responses to input; also the floor for root renders.
    UserBlocking,
}

impl Priority {
    /// All priorities, highest first.
    pub const ALL: [Priority; 3] = [
        Priority::UserBlocking,
        Priority::UserVisible,
        Priority::Background,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Background => "background",
            Self::UserVisible => "user-visible",
            Self::UserBlocking => "user-blocking",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown priority name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsePriorityError(pub String);

impl fmt::Display for ParsePriorityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown priority: {}", self.0)
    }
}

impl std::error::Error for ParsePriorityError {}

impl FromStr for Priority {
    type Err = ParsePriorityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "background" => Ok(Self::Background),
            "user-visible" | "user_visible" => Ok(Self::UserVisible),
            "user-blocking" | "user_blocking" => Ok(Self::UserBlocking),
            other => Err(ParsePriorityError(other.to_string())),
        }
    }
}

/// The three ordered effect phases of a commit.
///
/// Mutation effects commit before layout effects, which commit before
/// passive effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CommitPhase {
    /// Surface writes and insertion effects.
    Mutation,
    /// Effects that read the freshly mutated surface.
    Layout,
    /// Deferred effects with no ordering requirement against painting.
    Passive,
}

impl CommitPhase {
    pub const ALL: [CommitPhase; 3] = [
        CommitPhase::Mutation,
        CommitPhase::Layout,
        CommitPhase::Passive,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mutation => "mutation",
            Self::Layout => "layout",
            Self::Passive => "passive",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering() {
        assert!(Priority::UserBlocking > Priority::UserVisible);
        assert!(Priority::UserVisible > Priority::Background);
        assert_eq!(
            Priority::Background.max(Priority::UserBlocking),
            Priority::UserBlocking
        );
        assert!(CommitPhase::Mutation < CommitPhase::Layout);
        assert!(CommitPhase::Layout < CommitPhase::Passive);
    }

    #[test]
    fn parse_round_trip() {
        for p in Priority::ALL {
            assert_eq!(p.as_str().parse::<Priority>(), Ok(p));
        }
        assert_eq!(" User_Blocking ".parse(), Ok(Priority::UserBlocking));
        assert!("urgent".parse::<Priority>().is_err());
    }
}
