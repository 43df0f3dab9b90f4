//! Foreign restart-state representation.
//!
//! A [`RstState`] is what a restart file reader hands the schedule:
//! plain records with deck-style tokens, not our snapshot types. The
//! schedule validates and converts them once at construction; see
//! `Schedule::load_rst`.

use serde::{Deserialize, Serialize};

use crate::tuning::Tuning;

/// One connection record from a restart file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RstConnection {
    /// 0-based grid I index.
    pub i: usize,
    /// 0-based grid J index.
    pub j: usize,
    /// 0-based grid K index.
    pub k: usize,
    /// Status token, e.g. `OPEN`.
    pub state: String,
    /// Completion number.
    pub complnum: i32,
    /// Segment the connection feeds, 0 for none.
    pub segment: i32,
    /// Connection transmissibility factor, SI.
    pub ctf: f64,
    /// Skin factor.
    pub skin: f64,
    /// Measured depth, SI.
    pub depth: f64,
}

/// One segment record from a restart file. File order is arbitrary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RstSegment {
    /// Segment number.
    pub number: i32,
    /// Branch number.
    pub branch: i32,
    /// Outlet segment number, 0 for the top segment.
    pub outlet: i32,
    /// Node depth, SI.
    pub depth: f64,
    /// Length along the wellbore, SI.
    pub length: f64,
    /// Internal diameter, SI.
    pub diameter: f64,
}

/// One well record from a restart file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RstWell {
    /// Well name.
    pub name: String,
    /// Parent group name.
    pub group: String,
    /// 0-based wellhead I index.
    pub head_i: usize,
    /// 0-based wellhead J index.
    pub head_j: usize,
    /// BHP reference depth, SI.
    pub ref_depth: f64,
    /// Status token, e.g. `OPEN`.
    pub status: String,
    /// Well type token: `PROD`, `WINJ`, `GINJ`, `OINJ` or `MINJ`.
    pub well_type: String,
    /// Preferred phase token.
    pub preferred_phase: String,
    /// Crossflow allowed.
    pub allow_crossflow: bool,
    /// Efficiency factor.
    pub efficiency_factor: f64,
    /// Connection records, file order.
    pub connections: Vec<RstConnection>,
    /// Segment records, file order; empty for standard wells.
    pub segments: Vec<RstSegment>,
}

/// One group record from a restart file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RstGroup {
    /// Group name.
    pub name: String,
    /// Parent group name; empty for the field group.
    pub parent: String,
}

/// Everything the schedule consumes from a restart file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RstState {
    /// The report step the checkpoint was written at.
    pub report_step: usize,
    /// Group records; the field group may or may not be present.
    pub groups: Vec<RstGroup>,
    /// Well records.
    pub wells: Vec<RstWell>,
    /// Tuning at the checkpoint, if recorded.
    pub tuning: Option<Tuning>,
}
