//! The versioned UDQ keyword configuration.
//!
//! A [`UdqConfig`] snapshot holds every ASSIGN/DEFINE/UNITS record seen
//! so far, in input order. Re-specifying a quantity replaces its record
//! in place, so evaluation order stays stable across redefinitions.

use std::collections::HashMap;

use crate::error::SchedResult;
use crate::name_match::{MatchResult, NameMatcher};
use crate::summary::SummaryState;
use crate::udq::ast::{UdqContext, UdqExpr};
use crate::udq::set::{UdqSet, UdqVarType};
use crate::wlist::WListManager;

/// An ASSIGN record: a constant value for selected members.
#[derive(Debug, Clone, PartialEq)]
pub struct UdqAssign {
    /// Quantity name.
    pub name: String,
    /// Member selector patterns; empty means all members.
    pub selectors: Vec<String>,
    /// Assigned value.
    pub value: f64,
}

/// A DEFINE record: a parsed expression plus its source text.
#[derive(Debug, Clone, PartialEq)]
pub struct UdqDefine {
    /// Quantity name.
    pub name: String,
    /// Parsed expression tree.
    pub expr: UdqExpr,
    /// Original expression text, kept for diagnostics and diffing.
    pub source: String,
}

/// One UDQ input record.
#[derive(Debug, Clone, PartialEq)]
pub enum UdqInput {
    /// Constant assignment.
    Assign(UdqAssign),
    /// Expression definition, re-evaluated every step.
    Define(UdqDefine),
}

impl UdqInput {
    /// The defined quantity's name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Assign(assign) => &assign.name,
            Self::Define(define) => &define.name,
        }
    }
}

/// All UDQ records active at one report step.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UdqConfig {
    inputs: Vec<UdqInput>,
    units: HashMap<String, String>,
}

impl UdqConfig {
    /// Empty configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an ASSIGN, replacing any existing record for the name.
    pub fn add_assign(&mut self, name: impl Into<String>, selectors: Vec<String>, value: f64) {
        self.insert(UdqInput::Assign(UdqAssign {
            name: name.into(),
            selectors,
            value,
        }));
    }

    /// Parses and records a DEFINE, replacing any existing record for
    /// the name.
    ///
    /// # Errors
    ///
    /// Propagates expression parse errors.
    pub fn add_define(&mut self, name: impl Into<String>, expression: &str) -> SchedResult<()> {
        let name = name.into();
        let expr = UdqExpr::parse(&name, expression)?;
        self.insert(UdqInput::Define(UdqDefine {
            name,
            expr,
            source: expression.to_string(),
        }));
        Ok(())
    }

    /// Records a UNITS declaration.
    pub fn add_unit(&mut self, name: impl Into<String>, unit: impl Into<String>) {
        self.units.insert(name.into(), unit.into());
    }

    fn insert(&mut self, input: UdqInput) {
        if let Some(existing) = self.inputs.iter_mut().find(|i| i.name() == input.name()) {
            *existing = input;
        } else {
            self.inputs.push(input);
        }
    }

    /// Records in input order.
    #[must_use]
    pub fn inputs(&self) -> &[UdqInput] {
        &self.inputs
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    /// True with no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    /// Declared unit of a quantity.
    #[must_use]
    pub fn unit_of(&self, name: &str) -> Option<&str> {
        self.units.get(name).map(String::as_str)
    }

    /// Evaluates every record in input order, writing each result into
    /// the summary state so later definitions see earlier results.
    /// Returns the produced sets for inspection.
    ///
    /// # Errors
    ///
    /// Propagates evaluation errors from individual definitions.
    pub fn eval(
        &self,
        summary: &mut SummaryState,
        wlists: Option<&WListManager>,
        wells: &[String],
        groups: &[String],
    ) -> SchedResult<Vec<UdqSet>> {
        let mut results = Vec::with_capacity(self.inputs.len());
        for input in &self.inputs {
            let set = match input {
                UdqInput::Assign(assign) => eval_assign(assign, wlists, wells, groups),
                UdqInput::Define(define) => {
                    let target = UdqVarType::from_name(&define.name);
                    let ctx = UdqContext {
                        summary,
                        wlists,
                        wells,
                        groups,
                    };
                    define.expr.eval(target, &ctx)?.with_name(define.name.clone())
                }
            };
            store(summary, &set);
            results.push(set);
        }
        Ok(results)
    }
}

fn eval_assign(
    assign: &UdqAssign,
    wlists: Option<&WListManager>,
    wells: &[String],
    groups: &[String],
) -> UdqSet {
    match UdqVarType::from_name(&assign.name) {
        UdqVarType::Well => {
            let mut set = UdqSet::wells(assign.name.clone(), wells);
            for name in selected(wells, &assign.selectors, wlists) {
                set.assign(&name, Some(assign.value));
            }
            set
        }
        UdqVarType::Group => {
            let mut set = UdqSet::groups(assign.name.clone(), groups);
            for name in selected(groups, &assign.selectors, wlists) {
                set.assign(&name, Some(assign.value));
            }
            set
        }
        UdqVarType::Field | UdqVarType::Scalar => {
            UdqSet::field(assign.name.clone(), Some(assign.value))
        }
    }
}

fn selected(names: &[String], selectors: &[String], wlists: Option<&WListManager>) -> Vec<String> {
    if selectors.is_empty() {
        return names.to_vec();
    }
    let mut matcher = NameMatcher::new(names);
    if let Some(wlists) = wlists {
        matcher = matcher.with_wlists(wlists);
    }
    let mut out = Vec::new();
    for selector in selectors {
        if let MatchResult::Matched(matched) = matcher.resolve(selector) {
            for name in matched {
                if !out.contains(&name) {
                    out.push(name);
                }
            }
        }
    }
    out
}

fn store(summary: &mut SummaryState, set: &UdqSet) {
    match set.var_type() {
        UdqVarType::Well => {
            for member in set.iter() {
                if let Some(value) = member.value {
                    summary.update_well_var(member.name.clone(), set.name().to_string(), value);
                }
            }
        }
        UdqVarType::Group => {
            for member in set.iter() {
                if let Some(value) = member.value {
                    summary.update_group_var(member.name.clone(), set.name().to_string(), value);
                }
            }
        }
        UdqVarType::Field | UdqVarType::Scalar => {
            if let Some(value) = set.scalar_value() {
                summary.update(set.name().to_string(), value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn fixture() -> (SummaryState, Vec<String>, Vec<String>) {
        let mut summary = SummaryState::new(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap());
        summary.update_well_var("OP1", "WOPR", 100.0);
        summary.update_well_var("OP2", "WOPR", 60.0);
        summary.update("FOPR", 160.0);
        let wells = vec!["OP1".to_string(), "OP2".to_string()];
        let groups = vec!["PLAT".to_string()];
        (summary, wells, groups)
    }

    #[test]
    fn assign_selects_members() {
        let mut config = UdqConfig::new();
        config.add_assign("WULIMIT", vec!["OP1".to_string()], 75.0);
        let (mut summary, wells, groups) = fixture();
        let sets = config.eval(&mut summary, None, &wells, &groups).unwrap();
        assert_eq!(sets[0].get("OP1"), Some(75.0));
        assert_eq!(sets[0].get("OP2"), None);
        assert_eq!(summary.get_well_var("OP1", "WULIMIT"), Some(75.0));
    }

    #[test]
    fn define_results_feed_later_defines() {
        let mut config = UdqConfig::new();
        config.add_define("FUHALF", "FOPR * 0.5").unwrap();
        config.add_define("FUQUART", "FUHALF * 0.5").unwrap();
        let (mut summary, wells, groups) = fixture();
        let sets = config.eval(&mut summary, None, &wells, &groups).unwrap();
        assert_eq!(sets[0].scalar_value(), Some(80.0));
        assert_eq!(sets[1].scalar_value(), Some(40.0));
        assert_eq!(summary.get("FUQUART"), Some(40.0));
    }

    #[test]
    fn redefinition_replaces_in_place() {
        let mut config = UdqConfig::new();
        config.add_define("FUA", "FOPR").unwrap();
        config.add_define("FUB", "FUA * 2").unwrap();
        config.add_define("FUA", "FOPR * 10").unwrap();
        assert_eq!(config.len(), 2);
        assert_eq!(config.inputs()[0].name(), "FUA");

        let (mut summary, wells, groups) = fixture();
        let sets = config.eval(&mut summary, None, &wells, &groups).unwrap();
        assert_eq!(sets[0].scalar_value(), Some(1600.0));
        assert_eq!(sets[1].scalar_value(), Some(3200.0));
    }

    #[test]
    fn units_tracked() {
        let mut config = UdqConfig::new();
        config.add_unit("FUA", "SM3/DAY");
        assert_eq!(config.unit_of("FUA"), Some("SM3/DAY"));
        assert_eq!(config.unit_of("FUB"), None);
    }

    #[test]
    fn bad_define_is_rejected() {
        let mut config = UdqConfig::new();
        assert!(config.add_define("FUA", "FOPR +").is_err());
        assert!(config.is_empty());
    }
}
