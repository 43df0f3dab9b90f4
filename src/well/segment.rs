//! Multi-segment well structure (WELSEGS/COMPSEGS).
//!
//! Segments are kept sorted by segment number, not by input order. The
//! top segment is number 1 and has no outlet.

use serde::{Deserialize, Serialize};

use crate::error::{SchedResult, StructuralError};

/// One piece of wellbore with its own hydraulic properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Segment number, unique within the well, 1 is the top.
    pub number: i32,
    /// Branch this segment lies on; branch 1 is the main stem.
    pub branch: i32,
    /// Segment number this one flows into; `None` for the top segment.
    pub outlet: Option<i32>,
    /// Node depth at the segment end, SI.
    pub depth: f64,
    /// Length along the wellbore, SI.
    pub length: f64,
    /// Internal diameter, SI.
    pub diameter: f64,
    /// Absolute roughness, SI.
    pub roughness: f64,
}

impl Segment {
    /// Top segment of a well.
    #[must_use]
    pub fn top(depth: f64) -> Self {
        Self {
            number: 1,
            branch: 1,
            outlet: None,
            depth,
            length: 0.0,
            diameter: 0.0,
            roughness: 0.0,
        }
    }
}

/// The segment structure of a multi-segment well.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WellSegments {
    segments: Vec<Segment>,
}

impl WellSegments {
    /// Structure seeded with its top segment.
    #[must_use]
    pub fn new(top: Segment) -> Self {
        Self {
            segments: vec![top],
        }
    }

    /// Builds a structure from unordered segment records, e.g. restart
    /// data. Segments are sorted by number.
    ///
    /// # Errors
    ///
    /// Fails structurally when the set is empty, has duplicate numbers,
    /// or lacks a top segment (number 1 with no outlet).
    pub fn from_records(well: &str, mut segments: Vec<Segment>) -> SchedResult<Self> {
        if segments.is_empty() {
            return Err(StructuralError::InvalidDeck {
                reason: format!("well {well} has an empty segment set"),
            }
            .into());
        }
        segments.sort_by_key(|s| s.number);
        if segments.windows(2).any(|w| w[0].number == w[1].number) {
            return Err(StructuralError::InvalidDeck {
                reason: format!("well {well} has duplicate segment numbers"),
            }
            .into());
        }
        if segments[0].number != 1 || segments[0].outlet.is_some() {
            return Err(StructuralError::InvalidDeck {
                reason: format!("well {well} lacks a top segment"),
            }
            .into());
        }
        Ok(Self { segments })
    }

    /// Adds or replaces a segment, keeping number order.
    pub fn add(&mut self, segment: Segment) {
        match self
            .segments
            .binary_search_by_key(&segment.number, |s| s.number)
        {
            Ok(idx) => self.segments[idx] = segment,
            Err(idx) => self.segments.insert(idx, segment),
        }
    }

    /// Number of segments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Never true; a structure always has its top segment.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Segment by number.
    #[must_use]
    pub fn get(&self, number: i32) -> Option<&Segment> {
        self.segments
            .binary_search_by_key(&number, |s| s.number)
            .ok()
            .map(|idx| &self.segments[idx])
    }

    /// The top segment.
    #[must_use]
    pub fn top(&self) -> &Segment {
        &self.segments[0]
    }

    /// Iterates segments in number order.
    pub fn iter(&self) -> std::slice::Iter<'_, Segment> {
        self.segments.iter()
    }

    /// Segment numbers on a branch, in number order.
    #[must_use]
    pub fn branch_segments(&self, branch: i32) -> Vec<i32> {
        self.segments
            .iter()
            .filter(|s| s.branch == branch)
            .map(|s| s.number)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(number: i32, branch: i32, outlet: i32) -> Segment {
        Segment {
            number,
            branch,
            outlet: Some(outlet),
            depth: 2500.0 + f64::from(number),
            length: 10.0,
            diameter: 0.15,
            roughness: 1.0e-5,
        }
    }

    #[test]
    fn records_sorted_by_segment_number() {
        let segs = WellSegments::from_records(
            "OP-1",
            vec![seg(3, 1, 2), Segment::top(2500.0), seg(2, 1, 1)],
        )
        .unwrap();
        let numbers: Vec<i32> = segs.iter().map(|s| s.number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert_eq!(segs.top().number, 1);
    }

    #[test]
    fn duplicate_numbers_rejected() {
        let err = WellSegments::from_records(
            "OP-1",
            vec![Segment::top(2500.0), seg(2, 1, 1), seg(2, 1, 1)],
        )
        .unwrap_err();
        assert!(err.is_structural());
    }

    #[test]
    fn missing_top_rejected() {
        let err = WellSegments::from_records("OP-1", vec![seg(2, 1, 1)]).unwrap_err();
        assert!(err.is_structural());
        let err = WellSegments::from_records("OP-1", vec![]).unwrap_err();
        assert!(err.is_structural());
    }

    #[test]
    fn add_replaces_by_number() {
        let mut segs = WellSegments::new(Segment::top(2500.0));
        segs.add(seg(2, 1, 1));
        let mut replacement = seg(2, 1, 1);
        replacement.diameter = 0.2;
        segs.add(replacement);
        assert_eq!(segs.len(), 2);
        assert_eq!(segs.get(2).unwrap().diameter, 0.2);
    }

    #[test]
    fn branch_query() {
        let mut segs = WellSegments::new(Segment::top(2500.0));
        segs.add(seg(2, 1, 1));
        segs.add(seg(10, 2, 2));
        segs.add(seg(11, 2, 10));
        assert_eq!(segs.branch_segments(2), vec![10, 11]);
    }
}
