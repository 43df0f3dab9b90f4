//! Production, injection and economic-limit property blocks.
//!
//! These are plain value objects hanging off a [`Well`](super::Well)
//! snapshot. Keyword handlers clone the current block, mutate the clone
//! and hand it back to the well, which reports whether anything
//! actually changed.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Default producer BHP limit: one atmosphere, SI.
pub const DEFAULT_BHP_LIMIT: f64 = 101_325.0;

/// Reservoir fluid phase.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Phase {
    Oil,
    Gas,
    Water,
}

impl Phase {
    /// Parses a deck phase token (WELSPECS item "PHASE").
    #[must_use]
    pub fn from_deck(token: &str) -> Option<Self> {
        match token {
            "OIL" | "LIQ" => Some(Self::Oil),
            "GAS" => Some(Self::Gas),
            "WATER" | "WAT" => Some(Self::Water),
            _ => None,
        }
    }
}

/// Producer control modes.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProducerCMode {
    Orat,
    Wrat,
    Grat,
    Lrat,
    Crat,
    Resv,
    Bhp,
    Thp,
    Grup,
}

impl ProducerCMode {
    /// Parses a deck control-mode token.
    #[must_use]
    pub fn from_deck(token: &str) -> Option<Self> {
        match token {
            "ORAT" => Some(Self::Orat),
            "WRAT" => Some(Self::Wrat),
            "GRAT" => Some(Self::Grat),
            "LRAT" => Some(Self::Lrat),
            "CRAT" => Some(Self::Crat),
            "RESV" => Some(Self::Resv),
            "BHP" => Some(Self::Bhp),
            "THP" => Some(Self::Thp),
            "GRUP" => Some(Self::Grup),
            _ => None,
        }
    }
}

/// Injector control modes.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum InjectorCMode {
    Rate,
    Resv,
    Bhp,
    Thp,
    Grup,
}

impl InjectorCMode {
    /// Parses a deck control-mode token.
    #[must_use]
    pub fn from_deck(token: &str) -> Option<Self> {
        match token {
            "RATE" => Some(Self::Rate),
            "RESV" => Some(Self::Resv),
            "BHP" => Some(Self::Bhp),
            "THP" => Some(Self::Thp),
            "GRUP" => Some(Self::Grup),
            _ => None,
        }
    }
}

/// Injected fluid.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum InjectorType {
    Water,
    Gas,
    Oil,
    Multi,
}

impl InjectorType {
    /// Parses a deck injector-type token.
    #[must_use]
    pub fn from_deck(token: &str) -> Option<Self> {
        match token {
            "WATER" | "WAT" => Some(Self::Water),
            "GAS" => Some(Self::Gas),
            "OIL" => Some(Self::Oil),
            "MULTI" => Some(Self::Multi),
            _ => None,
        }
    }
}

/// Production configuration of a producing well. All quantities SI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionProperties {
    /// Surface oil rate target/limit.
    pub oil_rate: f64,
    /// Surface water rate target/limit.
    pub water_rate: f64,
    /// Surface gas rate target/limit.
    pub gas_rate: f64,
    /// Surface liquid rate target/limit.
    pub liquid_rate: f64,
    /// Reservoir volume rate target/limit.
    pub resv_rate: f64,
    /// Bottom-hole pressure limit.
    pub bhp_limit: f64,
    /// Tubing-head pressure limit.
    pub thp_limit: f64,
    /// Artificial lift quantity.
    pub alq: f64,
    /// VFP production table number, 0 for none.
    pub vfp_table: i32,
    /// Active control mode.
    pub cmode: Option<ProducerCMode>,
    /// Controls this well responds to.
    pub controls: BTreeSet<ProducerCMode>,
    /// Prediction mode (true) vs history mode (false).
    pub predict: bool,
    /// True once the well has ever produced.
    pub has_produced: bool,
}

impl Default for ProductionProperties {
    fn default() -> Self {
        Self {
            oil_rate: 0.0,
            water_rate: 0.0,
            gas_rate: 0.0,
            liquid_rate: 0.0,
            resv_rate: 0.0,
            bhp_limit: DEFAULT_BHP_LIMIT,
            thp_limit: 0.0,
            alq: 0.0,
            vfp_table: 0,
            cmode: None,
            controls: BTreeSet::new(),
            predict: true,
            has_produced: false,
        }
    }
}

impl ProductionProperties {
    /// Drops every registered control.
    pub fn clear_controls(&mut self) {
        self.controls.clear();
    }

    /// Registers a control.
    pub fn add_control(&mut self, cmode: ProducerCMode) {
        self.controls.insert(cmode);
    }

    /// True if the control is registered.
    #[must_use]
    pub fn has_control(&self, cmode: ProducerCMode) -> bool {
        self.controls.contains(&cmode)
    }

    /// Restores the default BHP limit. Applied when a well switches
    /// from injector to producer.
    pub fn reset_default_bhp_limit(&mut self) {
        self.bhp_limit = DEFAULT_BHP_LIMIT;
    }

    /// True if every surface/reservoir rate is zero.
    #[must_use]
    pub fn is_zero_rate(&self) -> bool {
        self.oil_rate == 0.0
            && self.water_rate == 0.0
            && self.gas_rate == 0.0
            && self.liquid_rate == 0.0
            && self.resv_rate == 0.0
    }
}

/// Injection configuration of an injecting well. All quantities SI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InjectionProperties {
    /// Injected fluid.
    pub injector_type: InjectorType,
    /// Surface injection rate target/limit.
    pub surface_rate: f64,
    /// Reservoir volume injection rate target/limit.
    pub reservoir_rate: f64,
    /// Bottom-hole pressure limit.
    pub bhp_limit: f64,
    /// Tubing-head pressure limit.
    pub thp_limit: f64,
    /// VFP injection table number, 0 for none.
    pub vfp_table: i32,
    /// Active control mode.
    pub cmode: Option<InjectorCMode>,
    /// Controls this well responds to.
    pub controls: BTreeSet<InjectorCMode>,
    /// Prediction mode (true) vs history mode (false).
    pub predict: bool,
    /// True once the well has ever injected.
    pub has_injected: bool,
}

impl Default for InjectionProperties {
    fn default() -> Self {
        Self {
            injector_type: InjectorType::Water,
            surface_rate: 0.0,
            reservoir_rate: 0.0,
            bhp_limit: 0.0,
            thp_limit: 0.0,
            vfp_table: 0,
            cmode: None,
            controls: BTreeSet::new(),
            predict: true,
            has_injected: false,
        }
    }
}

impl InjectionProperties {
    /// Drops every registered control.
    pub fn clear_controls(&mut self) {
        self.controls.clear();
    }

    /// Registers a control.
    pub fn add_control(&mut self, cmode: InjectorCMode) {
        self.controls.insert(cmode);
    }

    /// True if the control is registered.
    #[must_use]
    pub fn has_control(&self, cmode: InjectorCMode) -> bool {
        self.controls.contains(&cmode)
    }

    /// Clears the BHP limit. Applied when a well switches from producer
    /// to injector.
    pub fn reset_bhp_limit(&mut self) {
        self.bhp_limit = 0.0;
    }

    /// True if both injection rates are zero.
    #[must_use]
    pub fn is_zero_rate(&self) -> bool {
        self.surface_rate == 0.0 && self.reservoir_rate == 0.0
    }
}

/// WECON economic limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EconLimits {
    /// Minimum oil rate before workover/shut.
    pub min_oil_rate: f64,
    /// Minimum gas rate before workover/shut.
    pub min_gas_rate: f64,
    /// Maximum water cut.
    pub max_water_cut: f64,
    /// Maximum gas-oil ratio.
    pub max_gas_oil_ratio: f64,
    /// Maximum water-gas ratio.
    pub max_water_gas_ratio: f64,
    /// End the run when the limit shuts this well.
    pub end_run: bool,
}

impl Default for EconLimits {
    fn default() -> Self {
        Self {
            min_oil_rate: 0.0,
            min_gas_rate: 0.0,
            max_water_cut: 0.0,
            max_gas_oil_ratio: 0.0,
            max_water_gas_ratio: 0.0,
            end_run: false,
        }
    }
}

/// WFOAM surface foam concentration.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FoamProperties {
    /// Foam concentration in the injection stream.
    pub concentration: f64,
}

/// WPOLYMER polymer/salt injection concentrations.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PolymerProperties {
    /// Polymer concentration in the injection stream.
    pub polymer_concentration: f64,
    /// Salt concentration in the injection stream.
    pub salt_concentration: f64,
}

/// WSALT brine concentration.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BrineProperties {
    /// Salt concentration in the injection stream.
    pub concentration: f64,
}

/// WTRACER per-tracer injection concentrations.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TracerProperties {
    /// Tracer name to concentration.
    pub concentrations: std::collections::BTreeMap<String, f64>,
}

impl TracerProperties {
    /// Sets one tracer concentration.
    pub fn set(&mut self, tracer: impl Into<String>, concentration: f64) {
        self.concentrations.insert(tracer.into(), concentration);
    }

    /// Concentration of a tracer, zero when unset.
    #[must_use]
    pub fn get(&self, tracer: &str) -> f64 {
        self.concentrations.get(tracer).copied().unwrap_or(0.0)
    }
}

/// WGRUPCON guide-rate parameters for group control.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WellGuideRate {
    /// Available for group control.
    pub available: bool,
    /// Guide rate value, negative for "use potential".
    pub guide_rate: f64,
    /// Phase the guide rate applies to.
    pub phase: Option<Phase>,
    /// Scaling factor applied to the guide rate.
    pub scaling_factor: f64,
}

impl Default for WellGuideRate {
    fn default() -> Self {
        Self {
            available: true,
            guide_rate: -1.0,
            phase: None,
            scaling_factor: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cmode_parsing() {
        assert_eq!(ProducerCMode::from_deck("ORAT"), Some(ProducerCMode::Orat));
        assert_eq!(ProducerCMode::from_deck("GRUP"), Some(ProducerCMode::Grup));
        assert_eq!(ProducerCMode::from_deck("???"), None);
        assert_eq!(InjectorCMode::from_deck("RATE"), Some(InjectorCMode::Rate));
        assert_eq!(InjectorType::from_deck("MULTI"), Some(InjectorType::Multi));
        assert_eq!(Phase::from_deck("WAT"), Some(Phase::Water));
    }

    #[test]
    fn production_controls() {
        let mut props = ProductionProperties::default();
        props.add_control(ProducerCMode::Orat);
        props.add_control(ProducerCMode::Bhp);
        assert!(props.has_control(ProducerCMode::Orat));
        assert!(!props.has_control(ProducerCMode::Grat));

        props.clear_controls();
        assert!(!props.has_control(ProducerCMode::Orat));
    }

    #[test]
    fn default_bhp_limit_reset() {
        let mut props = ProductionProperties::default();
        props.bhp_limit = 5.0e7;
        props.reset_default_bhp_limit();
        assert_eq!(props.bhp_limit, DEFAULT_BHP_LIMIT);
    }

    #[test]
    fn zero_rate_detection() {
        let mut props = ProductionProperties::default();
        assert!(props.is_zero_rate());
        props.gas_rate = 1.0;
        assert!(!props.is_zero_rate());

        let mut inj = InjectionProperties::default();
        assert!(inj.is_zero_rate());
        inj.surface_rate = 10.0;
        assert!(!inj.is_zero_rate());
    }

    #[test]
    fn tracer_map() {
        let mut tracers = TracerProperties::default();
        tracers.set("SEA", 0.5);
        assert_eq!(tracers.get("SEA"), 0.5);
        assert_eq!(tracers.get("NONE"), 0.0);
    }

    #[test]
    fn property_equality_drives_change_detection() {
        let a = ProductionProperties::default();
        let mut b = a.clone();
        assert_eq!(a, b);
        b.oil_rate = 1.0;
        assert_ne!(a, b);
    }
}
