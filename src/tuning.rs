//! Numerical tuning, message limits and oil vaporization parameters.
//!
//! All three are small versioned value objects: a TUNING/MESSAGES/
//! VAPPARS keyword produces a new snapshot in the schedule's
//! `DynamicState` for the current step.

use serde::{Deserialize, Serialize};

/// TUNING record 1 and 2 fields the schedule tracks. Times in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tuning {
    /// Initial timestep length after a report step.
    pub tsinit: f64,
    /// Maximum timestep length.
    pub tsmaxz: f64,
    /// Minimum timestep length.
    pub tsminz: f64,
    /// Maximum timestep increase factor.
    pub tfdiff: f64,
    /// Target saturation change per timestep.
    pub trgtte: f64,
    /// Maximum number of Newton iterations per timestep.
    pub newtmx: i32,
    /// Minimum number of Newton iterations per timestep.
    pub newtmn: i32,
    /// Maximum number of linear iterations per Newton iteration.
    pub litmax: i32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            tsinit: 86_400.0,
            tsmaxz: 31.0 * 86_400.0,
            tsminz: 0.1 * 86_400.0,
            tfdiff: 1.25,
            trgtte: 0.1,
            newtmx: 12,
            newtmn: 1,
            litmax: 25,
        }
    }
}

/// MESSAGES print and stop limits per severity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageLimits {
    /// Print limit for messages.
    pub message_print: i32,
    /// Print limit for comments.
    pub comment_print: i32,
    /// Print limit for warnings.
    pub warning_print: i32,
    /// Print limit for problems.
    pub problem_print: i32,
    /// Print limit for errors.
    pub error_print: i32,
    /// Stop limit for warnings.
    pub warning_stop: i32,
    /// Stop limit for problems.
    pub problem_stop: i32,
    /// Stop limit for errors.
    pub error_stop: i32,
}

impl Default for MessageLimits {
    fn default() -> Self {
        Self {
            message_print: 3_000_000,
            comment_print: 3_000_000,
            warning_print: 10_000,
            problem_print: 100,
            error_print: 100,
            warning_stop: 1_000_000,
            problem_stop: 700,
            error_stop: 100,
        }
    }
}

/// VAPPARS oil vaporization controls.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct OilVaporizationProperties {
    /// Vaporization parameter for oil into wet gas.
    pub vap1: f64,
    /// Density correction parameter.
    pub vap2: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_a_valid_baseline() {
        let tuning = Tuning::default();
        assert!(tuning.tsminz < tuning.tsinit);
        assert!(tuning.tsinit < tuning.tsmaxz);
        assert!(tuning.newtmn <= tuning.newtmx);
    }

    #[test]
    fn snapshots_compare_by_value() {
        let a = Tuning::default();
        let mut b = a.clone();
        assert_eq!(a, b);
        b.tsinit = 2.0 * 86_400.0;
        assert_ne!(a, b);
    }
}
