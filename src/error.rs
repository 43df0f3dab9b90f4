//! Error types for the schedule state machine.
//!
//! Errors are strongly typed using thiserror and split along the fault
//! lines the deck-processing pipeline actually has: structural errors
//! abort a deck load, everything else is policy-gated and accumulates in
//! an [`ErrorGuard`](crate::context::ErrorGuard) so one load can surface
//! many diagnostics.

use thiserror::Error;

use crate::deck::KeywordLocation;

/// Structural deck errors. These abort deck processing immediately.
#[allow(missing_docs)]
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StructuralError {
    #[error("Invalid deck: {reason}")]
    InvalidDeck { reason: String },

    #[error("Report-step timestamps must be strictly increasing at step {step}")]
    NonIncreasingTime { step: usize },

    #[error("ACTIONX block '{name}' is not terminated by ENDACTIO")]
    UnterminatedAction { name: String },

    #[error("Unknown connection ordering '{value}' in {location}")]
    UnknownConnectionOrder { value: String, location: KeywordLocation },

    #[error("Well list '{list}' is not defined ({location})")]
    UndefinedWellList { list: String, location: KeywordLocation },

    #[error("VFP table {table} referenced by well '{well}' is not defined")]
    MissingVfpTable { well: String, table: i32 },

    #[error("Malformed expression in {keyword} '{name}': {reason}")]
    MalformedExpression {
        keyword: String,
        name: String,
        reason: String,
    },

    #[error("Well '{well}' is not defined at report step {step}")]
    UnknownWell { well: String, step: usize },

    #[error("Group '{group}' is not defined at report step {step}")]
    UnknownGroup { group: String, step: usize },

    #[error("Group tree cycle: group '{group}' would become its own ancestor")]
    GroupCycle { group: String },
}

/// Top-level error type for schedule operations.
#[allow(missing_docs)]
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SchedError {
    #[error("Structural error: {0}")]
    Structural(#[from] StructuralError),

    #[error("Invalid name pattern '{pattern}' ({location})")]
    NamePattern {
        pattern: String,
        location: KeywordLocation,
    },

    #[error("Unsupported keyword variant in {keyword}: {reason} ({location})")]
    UnsupportedKeyword {
        keyword: String,
        reason: String,
        location: KeywordLocation,
    },

    #[error("Restart inconsistency: {reason}")]
    RestartInconsistency { reason: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl SchedError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this error must abort deck processing regardless
    /// of the configured error policy.
    #[must_use]
    pub const fn is_structural(&self) -> bool {
        matches!(self, Self::Structural(_))
    }

    /// Returns true if this is a name-pattern resolution failure.
    #[must_use]
    pub const fn is_name_pattern(&self) -> bool {
        matches!(self, Self::NamePattern { .. })
    }

    /// Returns true if this is an unsupported-keyword-variant condition.
    #[must_use]
    pub const fn is_unsupported_keyword(&self) -> bool {
        matches!(self, Self::UnsupportedKeyword { .. })
    }
}

/// Result type alias for schedule operations.
pub type SchedResult<T> = Result<T, SchedError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn loc() -> KeywordLocation {
        KeywordLocation::new("WELOPEN", "CASE.DATA", 120)
    }

    #[test]
    fn structural_error_messages_carry_context() {
        let err = StructuralError::NonIncreasingTime { step: 4 };
        assert!(format!("{err}").contains("step 4"));

        let err = StructuralError::UnterminatedAction {
            name: "ACT1".to_string(),
        };
        assert!(format!("{err}").contains("ACT1"));
        assert!(format!("{err}").contains("ENDACTIO"));
    }

    #[test]
    fn sched_error_from_structural() {
        let err: SchedError = StructuralError::GroupCycle {
            group: "G1".to_string(),
        }
        .into();
        assert!(err.is_structural());
        assert!(!err.is_name_pattern());
    }

    #[test]
    fn name_pattern_error_is_not_structural() {
        let err = SchedError::NamePattern {
            pattern: "W*".to_string(),
            location: loc(),
        };
        assert!(err.is_name_pattern());
        assert!(!err.is_structural());
        assert!(format!("{err}").contains("W*"));
    }

    #[test]
    fn unsupported_keyword_error() {
        let err = SchedError::UnsupportedKeyword {
            keyword: "COMPORD".to_string(),
            reason: "only TRACK and INPUT are supported".to_string(),
            location: loc(),
        };
        assert!(err.is_unsupported_keyword());
        assert!(format!("{err}").contains("COMPORD"));
    }
}
