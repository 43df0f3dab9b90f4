//! Condition operand values and comparison evaluation.
//!
//! An [`ActionValue`] is either a plain scalar or a well-indexed map of
//! values. Comparing two values produces a truth flag plus the set of
//! wells that satisfied the comparison, which is what couples condition
//! evaluation to keyword replay.

/// Comparison operator in an ACTIONX condition.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Gt,
    Ge,
    Lt,
    Le,
    Eq,
    Ne,
}

impl Comparator {
    /// Parses a condition comparator token.
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            ">" => Some(Self::Gt),
            ">=" => Some(Self::Ge),
            "<" => Some(Self::Lt),
            "<=" => Some(Self::Le),
            "=" | "==" => Some(Self::Eq),
            "!=" => Some(Self::Ne),
            _ => None,
        }
    }

    /// Applies the comparison.
    #[must_use]
    pub fn compare(self, a: f64, b: f64) -> bool {
        match self {
            Self::Gt => a > b,
            Self::Ge => a >= b,
            Self::Lt => a < b,
            Self::Le => a <= b,
            Self::Eq => a == b,
            Self::Ne => a != b,
        }
    }
}

/// Outcome of evaluating a condition subtree.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionResult {
    /// Whether the subtree holds.
    pub truthy: bool,
    /// Wells satisfying the subtree; `None` when the subtree puts no
    /// constraint on wells (purely scalar conditions).
    pub wells: Option<Vec<String>>,
}

impl ActionResult {
    /// A scalar result with no well constraint.
    #[must_use]
    pub const fn scalar(truthy: bool) -> Self {
        Self {
            truthy,
            wells: None,
        }
    }

    /// A well-constrained result; truthy when any well matched.
    #[must_use]
    pub fn with_wells(wells: Vec<String>) -> Self {
        Self {
            truthy: !wells.is_empty(),
            wells: Some(wells),
        }
    }

    /// The matched wells, empty when unconstrained.
    #[must_use]
    pub fn matching_wells(&self) -> &[String] {
        self.wells.as_deref().unwrap_or(&[])
    }

    /// Conjunction: well sets intersect, an unconstrained side passes
    /// the other side's set through.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        let truthy = self.truthy && other.truthy;
        let wells = match (self.wells, other.wells) {
            (Some(a), Some(b)) => Some(a.into_iter().filter(|w| b.contains(w)).collect()),
            (Some(a), None) => Some(a),
            (None, Some(b)) => Some(b),
            (None, None) => None,
        };
        // A scalar-false side empties the matched set.
        match wells {
            Some(wells) if truthy => Self {
                truthy: !wells.is_empty(),
                wells: Some(wells),
            },
            Some(_) => Self {
                truthy: false,
                wells: Some(Vec::new()),
            },
            None => Self { truthy, wells: None },
        }
    }

    /// Disjunction: well sets union.
    #[must_use]
    pub fn or(self, other: Self) -> Self {
        let truthy = self.truthy || other.truthy;
        let wells = match (self.wells, other.wells) {
            (Some(a), Some(b)) => {
                let mut union = a;
                for well in b {
                    if !union.contains(&well) {
                        union.push(well);
                    }
                }
                Some(union)
            }
            (Some(a), None) => Some(a),
            (None, Some(b)) => Some(b),
            (None, None) => None,
        };
        Self { truthy, wells }
    }
}

/// A condition operand: scalar or well-indexed.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionValue {
    scalar: Option<f64>,
    wells: Vec<(String, f64)>,
}

impl ActionValue {
    /// A scalar operand.
    #[must_use]
    pub const fn scalar(value: f64) -> Self {
        Self {
            scalar: Some(value),
            wells: Vec::new(),
        }
    }

    /// An empty well-indexed operand.
    #[must_use]
    pub const fn well_indexed() -> Self {
        Self {
            scalar: None,
            wells: Vec::new(),
        }
    }

    /// Adds one well's value to a well-indexed operand.
    pub fn add_well(&mut self, well: impl Into<String>, value: f64) {
        self.wells.push((well.into(), value));
    }

    /// True for a scalar operand.
    #[must_use]
    pub const fn is_scalar(&self) -> bool {
        self.scalar.is_some()
    }

    /// The scalar value, if scalar.
    #[must_use]
    pub const fn scalar_value(&self) -> Option<f64> {
        self.scalar
    }

    /// Compares two operands. Well-indexed comparisons produce the set
    /// of wells satisfying the comparison; well-vs-well comparisons are
    /// evaluated over the wells present on both sides.
    #[must_use]
    pub fn eval_cmp(&self, cmp: Comparator, other: &Self) -> ActionResult {
        match (self.scalar, other.scalar) {
            (Some(a), Some(b)) => ActionResult::scalar(cmp.compare(a, b)),
            (None, Some(b)) => ActionResult::with_wells(
                self.wells
                    .iter()
                    .filter(|(_, a)| cmp.compare(*a, b))
                    .map(|(w, _)| w.clone())
                    .collect(),
            ),
            (Some(a), None) => ActionResult::with_wells(
                other
                    .wells
                    .iter()
                    .filter(|(_, b)| cmp.compare(a, *b))
                    .map(|(w, _)| w.clone())
                    .collect(),
            ),
            (None, None) => ActionResult::with_wells(
                self.wells
                    .iter()
                    .filter_map(|(well, a)| {
                        other
                            .wells
                            .iter()
                            .find(|(w, _)| w == well)
                            .filter(|(_, b)| cmp.compare(*a, *b))
                            .map(|_| well.clone())
                    })
                    .collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comparator_tokens() {
        assert_eq!(Comparator::from_token(">="), Some(Comparator::Ge));
        assert_eq!(Comparator::from_token("=="), Some(Comparator::Eq));
        assert_eq!(Comparator::from_token("<>"), None);
    }

    #[test]
    fn scalar_comparison() {
        let result = ActionValue::scalar(5.0).eval_cmp(Comparator::Gt, &ActionValue::scalar(3.0));
        assert!(result.truthy);
        assert!(result.wells.is_none());
    }

    #[test]
    fn well_vs_scalar_collects_matches() {
        let mut lhs = ActionValue::well_indexed();
        lhs.add_well("OP1", 150.0);
        lhs.add_well("OP2", 50.0);
        let result = lhs.eval_cmp(Comparator::Gt, &ActionValue::scalar(100.0));
        assert!(result.truthy);
        assert_eq!(result.matching_wells(), ["OP1".to_string()]);

        let result = lhs.eval_cmp(Comparator::Gt, &ActionValue::scalar(1000.0));
        assert!(!result.truthy);
        assert!(result.matching_wells().is_empty());
    }

    #[test]
    fn well_vs_well_uses_common_wells() {
        let mut lhs = ActionValue::well_indexed();
        lhs.add_well("OP1", 10.0);
        lhs.add_well("OP2", 1.0);
        let mut rhs = ActionValue::well_indexed();
        rhs.add_well("OP1", 5.0);
        rhs.add_well("OP3", 100.0);
        let result = lhs.eval_cmp(Comparator::Gt, &rhs);
        assert_eq!(result.matching_wells(), ["OP1".to_string()]);
    }

    #[test]
    fn and_intersects_or_unions() {
        let a = ActionResult::with_wells(vec!["OP1".to_string(), "OP2".to_string()]);
        let b = ActionResult::with_wells(vec!["OP2".to_string(), "OP3".to_string()]);

        let both = a.clone().and(b.clone());
        assert!(both.truthy);
        assert_eq!(both.matching_wells(), ["OP2".to_string()]);

        let either = a.or(b);
        assert!(either.truthy);
        assert_eq!(
            either.matching_wells(),
            ["OP1".to_string(), "OP2".to_string(), "OP3".to_string()]
        );
    }

    #[test]
    fn scalar_false_and_empties_well_set() {
        let wells = ActionResult::with_wells(vec!["OP1".to_string()]);
        let gated = wells.and(ActionResult::scalar(false));
        assert!(!gated.truthy);
        assert!(gated.matching_wells().is_empty());
    }

    #[test]
    fn scalar_true_and_passes_well_set() {
        let wells = ActionResult::with_wells(vec!["OP1".to_string()]);
        let gated = wells.and(ActionResult::scalar(true));
        assert!(gated.truthy);
        assert_eq!(gated.matching_wells(), ["OP1".to_string()]);
    }
}
