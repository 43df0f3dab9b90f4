//! RFT output scheduling (WRFT / WRFTPLT).
//!
//! Tracks, per well, the first report step at which RFT data should be
//! written, plus the open-well trigger WRFT arms.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// RFT output request for a well.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RftMode {
    #[default]
    No,
    /// Output once at the well's next flow.
    Rft,
    /// Output at every report step.
    Repts,
}

impl RftMode {
    /// Parses a WRFTPLT mode token.
    #[must_use]
    pub fn from_deck(token: &str) -> Option<Self> {
        match token {
            "NO" => Some(Self::No),
            "YES" | "RFT" => Some(Self::Rft),
            "REPT" | "REPTS" => Some(Self::Repts),
            _ => None,
        }
    }
}

/// The schedule-wide RFT configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RftConfig {
    modes: BTreeMap<String, (usize, RftMode)>,
    /// When set, every well subsequently opened gets an RFT request at
    /// its opening step (a bare WRFT record).
    rft_on_open: Option<usize>,
}

impl RftConfig {
    /// Empty configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests output for a well from a report step on.
    pub fn update(&mut self, well: impl Into<String>, step: usize, mode: RftMode) {
        self.modes.insert(well.into(), (step, mode));
    }

    /// Arms the open-well trigger from a report step on.
    pub fn set_rft_on_open(&mut self, step: usize) {
        self.rft_on_open = Some(step);
    }

    /// True if opening a well at `step` should record an RFT request.
    #[must_use]
    pub fn rft_on_open(&self, step: usize) -> bool {
        self.rft_on_open.is_some_and(|armed| step >= armed)
    }

    /// Current mode for a well at a report step.
    #[must_use]
    pub fn mode(&self, well: &str, step: usize) -> RftMode {
        match self.modes.get(well) {
            Some((from, mode)) if step >= *from => *mode,
            _ => RftMode::No,
        }
    }

    /// True if RFT data should be written for the well at the step.
    #[must_use]
    pub fn active(&self, well: &str, step: usize) -> bool {
        match self.mode(well, step) {
            RftMode::No => false,
            RftMode::Rft => self.modes.get(well).is_some_and(|(from, _)| step == *from),
            RftMode::Repts => true,
        }
    }

    /// The earliest report step with any RFT output, if any.
    #[must_use]
    pub fn first_rft(&self) -> Option<usize> {
        self.modes
            .values()
            .map(|(step, _)| *step)
            .chain(self.rft_on_open)
            .min()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_shot_rft() {
        let mut config = RftConfig::new();
        config.update("OP1", 3, RftMode::Rft);
        assert!(!config.active("OP1", 2));
        assert!(config.active("OP1", 3));
        assert!(!config.active("OP1", 4));
    }

    #[test]
    fn repeated_rft() {
        let mut config = RftConfig::new();
        config.update("OP1", 2, RftMode::Repts);
        assert!(!config.active("OP1", 1));
        assert!(config.active("OP1", 2));
        assert!(config.active("OP1", 7));
    }

    #[test]
    fn open_well_trigger() {
        let mut config = RftConfig::new();
        assert!(!config.rft_on_open(5));
        config.set_rft_on_open(4);
        assert!(!config.rft_on_open(3));
        assert!(config.rft_on_open(4));
    }

    #[test]
    fn first_rft_step() {
        let mut config = RftConfig::new();
        assert_eq!(config.first_rft(), None);
        config.update("OP1", 7, RftMode::Rft);
        config.update("OP2", 3, RftMode::Repts);
        assert_eq!(config.first_rft(), Some(3));
    }
}
