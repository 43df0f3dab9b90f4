//! Report-step time index.
//!
//! The [`TimeMap`] is the backbone index for every other component: an
//! ordered sequence of report-step timestamps. Index 0 is simulation
//! start. Timestamps are strictly increasing; a deck that violates that
//! is rejected with a structural error.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{SchedResult, StructuralError};

/// Directives a deck advances time with.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TimeDirective {
    /// DATES: advance to an absolute timestamp.
    Dates(DateTime<Utc>),
    /// TSTEP: advance by a step length in days.
    TStep(f64),
}

/// Ordered sequence of report-step timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeMap {
    points: Vec<DateTime<Utc>>,
}

impl TimeMap {
    /// Starts a time map at the simulation start time.
    #[must_use]
    pub fn new(start: DateTime<Utc>) -> Self {
        Self { points: vec![start] }
    }

    /// Builds a time map from the start time and a directive sequence.
    ///
    /// # Errors
    ///
    /// Returns [`StructuralError::NonIncreasingTime`] if a DATES
    /// directive does not move time forward, or
    /// [`StructuralError::InvalidDeck`] for a non-positive TSTEP.
    pub fn from_directives(
        start: DateTime<Utc>,
        directives: &[TimeDirective],
    ) -> SchedResult<Self> {
        let mut map = Self::new(start);
        for directive in directives {
            map.advance(*directive)?;
        }
        Ok(map)
    }

    /// Appends one report step.
    ///
    /// # Errors
    ///
    /// Same conditions as [`TimeMap::from_directives`].
    pub fn advance(&mut self, directive: TimeDirective) -> SchedResult<()> {
        let last = self.last();
        let next = match directive {
            TimeDirective::Dates(ts) => ts,
            TimeDirective::TStep(days) => {
                if days <= 0.0 || !days.is_finite() {
                    return Err(StructuralError::InvalidDeck {
                        reason: format!("TSTEP of {days} days is not positive"),
                    }
                    .into());
                }
                #[allow(clippy::cast_possible_truncation)]
                let millis = (days * 86_400_000.0).round() as i64;
                last + chrono::Duration::milliseconds(millis)
            }
        };

        if next <= last {
            return Err(StructuralError::NonIncreasingTime {
                step: self.points.len(),
            }
            .into());
        }
        self.points.push(next);
        Ok(())
    }

    /// Number of report steps (including step 0).
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always false; a time map holds at least the start time.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Timestamp of a report step.
    #[must_use]
    pub fn timestamp(&self, step: usize) -> Option<DateTime<Utc>> {
        self.points.get(step).copied()
    }

    /// Simulation start time.
    #[must_use]
    pub fn start(&self) -> DateTime<Utc> {
        self.points[0]
    }

    /// Timestamp of the last report step.
    #[must_use]
    pub fn last(&self) -> DateTime<Utc> {
        *self.points.last().expect("time map is never empty")
    }

    /// Seconds elapsed from simulation start to `step`.
    #[must_use]
    pub fn seconds(&self, step: usize) -> Option<f64> {
        let ts = self.timestamp(step)?;
        let delta = ts - self.start();
        Some(delta.num_milliseconds() as f64 / 1000.0)
    }

    /// Length in seconds of the interval starting at `step`.
    #[must_use]
    pub fn step_length(&self, step: usize) -> Option<f64> {
        let a = self.timestamp(step)?;
        let b = self.timestamp(step + 1)?;
        Some((b - a).num_milliseconds() as f64 / 1000.0)
    }

    /// Elapsed days from start, used for operator-facing notes.
    #[must_use]
    pub fn days(&self, step: usize) -> Option<f64> {
        self.seconds(step).map(|s| s / 86_400.0)
    }
}
