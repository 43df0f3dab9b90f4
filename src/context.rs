//! Policy-gated error collection for deck processing.
//!
//! Most conditions reachable from ordinary deck content are not fatal:
//! an invalid well name pattern or an unsupported COMPORD variant should
//! be reported and processing should continue, unless the caller has
//! configured a stricter policy. [`ParseContext`] holds the per-kind
//! policy, [`ErrorGuard`] accumulates the diagnostics of one deck load.

use std::collections::HashMap;
use std::fmt;

use tracing::{error, warn};

use crate::error::{SchedError, SchedResult};

/// Recoverable condition kinds whose handling is configuration, not code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A well/group name pattern matched nothing.
    InvalidNamePattern,
    /// A keyword variant the schedule does not support (for example a
    /// COMPORD ordering other than TRACK/INPUT/DEPTH).
    UnsupportedKeywordVariant,
    /// A geo-modifier keyword (MULTZ and friends) inside SCHEDULE.
    UnsupportedGeoModifier,
    /// WHISTCTL requested BHP control with run termination, which the
    /// simulator cannot honour.
    BhpHistoryTerminate,
    /// A keyword inside an ACTIONX block that cannot be replayed.
    ActionIllegalKeyword,
    /// PYACTION keyword seen without an installed script runner.
    ScriptRuntimeMissing,
    /// Restart state disagreed with the reconstructed schedule.
    RestartInconsistency,
}

/// What to do when a policy-gated condition is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Swallow the condition.
    Ignore,
    /// Log a warning and record it, then continue.
    #[default]
    Warn,
    /// Record it as an error; the batch fails on `check()`.
    Fatal,
}

/// Per-kind error handling policy.
///
/// Defaults follow the original: report-and-continue for most kinds,
/// fatal for the short safety-critical list.
#[derive(Debug, Clone)]
pub struct ParseContext {
    policies: HashMap<ErrorKind, ErrorPolicy>,
}

impl Default for ParseContext {
    fn default() -> Self {
        let mut policies = HashMap::new();
        policies.insert(ErrorKind::InvalidNamePattern, ErrorPolicy::Warn);
        policies.insert(ErrorKind::UnsupportedKeywordVariant, ErrorPolicy::Warn);
        policies.insert(ErrorKind::UnsupportedGeoModifier, ErrorPolicy::Warn);
        policies.insert(ErrorKind::BhpHistoryTerminate, ErrorPolicy::Fatal);
        policies.insert(ErrorKind::ActionIllegalKeyword, ErrorPolicy::Warn);
        policies.insert(ErrorKind::ScriptRuntimeMissing, ErrorPolicy::Warn);
        policies.insert(ErrorKind::RestartInconsistency, ErrorPolicy::Fatal);
        Self { policies }
    }
}

impl ParseContext {
    /// A context that treats every recoverable kind as fatal. Useful for
    /// strict regression runs.
    #[must_use]
    pub fn strict() -> Self {
        let mut ctx = Self::default();
        for policy in ctx.policies.values_mut() {
            *policy = ErrorPolicy::Fatal;
        }
        ctx
    }

    /// A context that ignores every recoverable kind.
    #[must_use]
    pub fn lenient() -> Self {
        let mut ctx = Self::default();
        for policy in ctx.policies.values_mut() {
            *policy = ErrorPolicy::Ignore;
        }
        ctx
    }

    /// Overrides the policy for one kind.
    #[must_use]
    pub fn with_policy(mut self, kind: ErrorKind, policy: ErrorPolicy) -> Self {
        self.policies.insert(kind, policy);
        self
    }

    /// Returns the policy for a kind.
    #[must_use]
    pub fn policy(&self, kind: ErrorKind) -> ErrorPolicy {
        self.policies.get(&kind).copied().unwrap_or_default()
    }

    /// Routes a condition through the configured policy, recording it in
    /// the guard as appropriate.
    pub fn handle(&self, kind: ErrorKind, err: SchedError, guard: &mut ErrorGuard) {
        match self.policy(kind) {
            ErrorPolicy::Ignore => {}
            ErrorPolicy::Warn => {
                warn!(kind = ?kind, "{err}");
                guard.add_warning(err);
            }
            ErrorPolicy::Fatal => {
                error!(kind = ?kind, "{err}");
                guard.add_error(err);
            }
        }
    }
}

/// Accumulates the diagnostics of one deck load.
#[derive(Debug, Default, Clone)]
pub struct ErrorGuard {
    warnings: Vec<SchedError>,
    errors: Vec<SchedError>,
}

impl ErrorGuard {
    /// Creates an empty guard.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a warning.
    pub fn add_warning(&mut self, err: SchedError) {
        self.warnings.push(err);
    }

    /// Records an error. The batch will fail on [`ErrorGuard::check`].
    pub fn add_error(&mut self, err: SchedError) {
        self.errors.push(err);
    }

    /// Recorded warnings, in report order.
    #[must_use]
    pub fn warnings(&self) -> &[SchedError] {
        &self.warnings
    }

    /// Recorded errors, in report order.
    #[must_use]
    pub fn errors(&self) -> &[SchedError] {
        &self.errors
    }

    /// Returns true if any fatal-policy condition was recorded.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Fails the batch if any error was recorded, returning the first
    /// one. Warnings never fail the batch.
    pub fn check(&self) -> SchedResult<()> {
        match self.errors.first() {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

impl fmt::Display for ErrorGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for err in &self.warnings {
            writeln!(f, "warning: {err}")?;
        }
        for err in &self.errors {
            writeln!(f, "error: {err}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deck::KeywordLocation;

    fn pattern_err() -> SchedError {
        SchedError::NamePattern {
            pattern: "Q*".to_string(),
            location: KeywordLocation::new("WCONPROD", "CASE.DATA", 7),
        }
    }

    #[test]
    fn default_policy_warns_on_name_pattern() {
        let ctx = ParseContext::default();
        let mut guard = ErrorGuard::new();
        ctx.handle(ErrorKind::InvalidNamePattern, pattern_err(), &mut guard);

        assert_eq!(guard.warnings().len(), 1);
        assert!(!guard.has_errors());
        assert!(guard.check().is_ok());
    }

    #[test]
    fn strict_policy_fails_the_batch() {
        let ctx = ParseContext::strict();
        let mut guard = ErrorGuard::new();
        ctx.handle(ErrorKind::InvalidNamePattern, pattern_err(), &mut guard);

        assert!(guard.has_errors());
        assert_eq!(guard.check().unwrap_err(), pattern_err());
    }

    #[test]
    fn lenient_policy_swallows_everything() {
        let ctx = ParseContext::lenient();
        let mut guard = ErrorGuard::new();
        ctx.handle(ErrorKind::BhpHistoryTerminate, pattern_err(), &mut guard);

        assert!(guard.warnings().is_empty());
        assert!(guard.check().is_ok());
    }

    #[test]
    fn bhp_history_terminate_is_fatal_by_default() {
        let ctx = ParseContext::default();
        assert_eq!(ctx.policy(ErrorKind::BhpHistoryTerminate), ErrorPolicy::Fatal);

        let mut guard = ErrorGuard::new();
        ctx.handle(ErrorKind::BhpHistoryTerminate, pattern_err(), &mut guard);
        assert!(guard.check().is_err());
    }

    #[test]
    fn guard_collects_many_diagnostics() {
        let ctx = ParseContext::default().with_policy(
            ErrorKind::UnsupportedGeoModifier,
            ErrorPolicy::Fatal,
        );
        let mut guard = ErrorGuard::new();
        ctx.handle(ErrorKind::InvalidNamePattern, pattern_err(), &mut guard);
        ctx.handle(ErrorKind::InvalidNamePattern, pattern_err(), &mut guard);
        ctx.handle(ErrorKind::UnsupportedGeoModifier, pattern_err(), &mut guard);

        assert_eq!(guard.warnings().len(), 2);
        assert_eq!(guard.errors().len(), 1);
        let rendered = format!("{guard}");
        assert!(rendered.contains("warning:"));
        assert!(rendered.contains("error:"));
    }
}
