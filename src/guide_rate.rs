//! Guide-rate model configuration (GUIDERAT / WGRUPCON targets).

use serde::{Deserialize, Serialize};

use crate::well::Phase;

/// GUIDERAT target phase for the guide-rate formula.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GuideRateTarget {
    #[default]
    None,
    Oil,
    Liq,
    Gas,
    Res,
    Comb,
}

impl GuideRateTarget {
    /// Parses a deck target token.
    #[must_use]
    pub fn from_deck(token: &str) -> Option<Self> {
        match token {
            "NONE" | "''" => Some(Self::None),
            "OIL" => Some(Self::Oil),
            "LIQ" => Some(Self::Liq),
            "GAS" => Some(Self::Gas),
            "RES" => Some(Self::Res),
            "COMB" => Some(Self::Comb),
            _ => None,
        }
    }
}

/// GUIDERAT formula coefficients. The formula itself is evaluated by
/// the simulator; the schedule versions the parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuideRateModel {
    /// Minimum recomputation interval, seconds.
    pub time_interval: f64,
    /// Target phase.
    pub target: GuideRateTarget,
    /// Coefficients A through F of the formula.
    pub coefficients: [f64; 6],
    /// Allow guide rates to increase.
    pub allow_increase: bool,
    /// Damping factor applied to changes.
    pub damping_factor: f64,
}

impl Default for GuideRateModel {
    fn default() -> Self {
        Self {
            time_interval: 0.0,
            target: GuideRateTarget::None,
            coefficients: [0.0; 6],
            allow_increase: true,
            damping_factor: 1.0,
        }
    }
}

/// The versioned guide-rate configuration: the active model plus any
/// per-group potential-based guide targets.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GuideRateConfig {
    /// Active GUIDERAT model, if any.
    pub model: Option<GuideRateModel>,
    /// Per-group (name, phase, guide rate) overrides.
    pub group_targets: Vec<(String, Phase, f64)>,
}

impl GuideRateConfig {
    /// Installs the model. Returns true if different.
    pub fn update_model(&mut self, model: GuideRateModel) -> bool {
        if self.model.as_ref() == Some(&model) {
            return false;
        }
        self.model = Some(model);
        true
    }

    /// Sets a group override, replacing any existing entry for the
    /// group.
    pub fn set_group_target(&mut self, group: impl Into<String>, phase: Phase, rate: f64) {
        let group = group.into();
        if let Some(entry) = self.group_targets.iter_mut().find(|(g, _, _)| *g == group) {
            entry.1 = phase;
            entry.2 = rate;
        } else {
            self.group_targets.push((group, phase, rate));
        }
    }

    /// A group's override, if any.
    #[must_use]
    pub fn group_target(&self, group: &str) -> Option<(Phase, f64)> {
        self.group_targets
            .iter()
            .find(|(g, _, _)| g == group)
            .map(|(_, phase, rate)| (*phase, *rate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_update_reports_change() {
        let mut config = GuideRateConfig::default();
        let model = GuideRateModel {
            target: GuideRateTarget::Oil,
            ..GuideRateModel::default()
        };
        assert!(config.update_model(model.clone()));
        assert!(!config.update_model(model));
    }

    #[test]
    fn group_targets_replace_by_name() {
        let mut config = GuideRateConfig::default();
        config.set_group_target("PLAT", Phase::Oil, 100.0);
        config.set_group_target("PLAT", Phase::Gas, 50.0);
        assert_eq!(config.group_targets.len(), 1);
        assert_eq!(config.group_target("PLAT"), Some((Phase::Gas, 50.0)));
        assert_eq!(config.group_target("NONE"), None);
    }
}
