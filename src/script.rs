//! External script-action execution seam.
//!
//! PYACTION names a script the simulator may run against the schedule.
//! The core has no script runtime; embedders provide one through this
//! trait, and without one registered scripts are logged and skipped.

use crate::error::SchedResult;
use crate::summary::SummaryState;

/// Executes registered script actions.
pub trait ScriptRunner {
    /// Runs one script. Returns true if the script requested any
    /// schedule change.
    ///
    /// # Errors
    ///
    /// Runtime failures are reported, not swallowed; the schedule
    /// policy decides whether they abort the run.
    fn run(&mut self, name: &str, filename: &str, summary: &mut SummaryState)
        -> SchedResult<bool>;
}
