//! Vertical flow performance tables (VFPPROD/VFPINJ).
//!
//! The schedule only needs table identity and axes: interpolation is
//! the simulator's business. Tables are versioned per id so a later
//! VFPPROD with the same number supersedes the earlier one.

use serde::{Deserialize, Serialize};

/// Flow-rate kind of a table's rate axis.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VfpFlowKind {
    Oil,
    Liq,
    Gas,
    Wg,
}

impl VfpFlowKind {
    /// Parses a deck flow-kind token.
    #[must_use]
    pub fn from_deck(token: &str) -> Option<Self> {
        match token {
            "OIL" => Some(Self::Oil),
            "LIQ" => Some(Self::Liq),
            "GAS" => Some(Self::Gas),
            "WG" => Some(Self::Wg),
            _ => None,
        }
    }
}

/// Artificial-lift quantity kind of a production table.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VfpAlqKind {
    #[default]
    Undefined,
    Gaslift,
    Pump,
    Compressor,
}

impl VfpAlqKind {
    /// Parses a deck ALQ-kind token; blank and `''` mean undefined.
    #[must_use]
    pub fn from_deck(token: &str) -> Option<Self> {
        match token {
            "" | "''" => Some(Self::Undefined),
            "GRAT" | "GASLIFT" => Some(Self::Gaslift),
            "PUMP" => Some(Self::Pump),
            "COMP" | "COMPRESSOR" => Some(Self::Compressor),
            _ => None,
        }
    }
}

/// One VFPPROD table. Axes SI, BHP values SI, stored flat in
/// `(thp, wfr, gfr, alq, flo)` index order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VfpProdTable {
    /// Table number referenced from well VFP items.
    pub table_id: i32,
    /// Bottom-hole datum depth.
    pub datum_depth: f64,
    /// Rate axis kind.
    pub flow_kind: VfpFlowKind,
    /// ALQ axis kind.
    pub alq_kind: VfpAlqKind,
    /// Flow-rate axis.
    pub flo_axis: Vec<f64>,
    /// Tubing-head pressure axis.
    pub thp_axis: Vec<f64>,
    /// Water fraction axis.
    pub wfr_axis: Vec<f64>,
    /// Gas fraction axis.
    pub gfr_axis: Vec<f64>,
    /// Artificial-lift axis.
    pub alq_axis: Vec<f64>,
    /// BHP values, one per axis-product point.
    pub bhp_values: Vec<f64>,
}

impl VfpProdTable {
    /// Expected number of BHP values for the table's axes.
    #[must_use]
    pub fn expected_values(&self) -> usize {
        self.thp_axis.len()
            * self.wfr_axis.len()
            * self.gfr_axis.len()
            * self.alq_axis.len()
            * self.flo_axis.len()
    }

    /// True when the value block matches the axes.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.bhp_values.len() == self.expected_values()
    }
}

/// One VFPINJ table. Axes SI, stored flat in `(thp, flo)` index order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VfpInjTable {
    /// Table number referenced from well VFP items.
    pub table_id: i32,
    /// Bottom-hole datum depth.
    pub datum_depth: f64,
    /// Rate axis kind.
    pub flow_kind: VfpFlowKind,
    /// Flow-rate axis.
    pub flo_axis: Vec<f64>,
    /// Tubing-head pressure axis.
    pub thp_axis: Vec<f64>,
    /// BHP values, one per axis-product point.
    pub bhp_values: Vec<f64>,
}

impl VfpInjTable {
    /// True when the value block matches the axes.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.bhp_values.len() == self.thp_axis.len() * self.flo_axis.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alq_kind_parsing() {
        assert_eq!(VfpAlqKind::from_deck(""), Some(VfpAlqKind::Undefined));
        assert_eq!(VfpAlqKind::from_deck("GRAT"), Some(VfpAlqKind::Gaslift));
        assert_eq!(VfpAlqKind::from_deck("XXX"), None);
    }

    #[test]
    fn consistency_check() {
        let table = VfpProdTable {
            table_id: 1,
            datum_depth: 2500.0,
            flow_kind: VfpFlowKind::Liq,
            alq_kind: VfpAlqKind::Undefined,
            flo_axis: vec![10.0, 100.0],
            thp_axis: vec![10.0e5, 50.0e5],
            wfr_axis: vec![0.0],
            gfr_axis: vec![100.0],
            alq_axis: vec![0.0],
            bhp_values: vec![0.0; 4],
        };
        assert!(table.is_consistent());

        let mut bad = table;
        bad.bhp_values.pop();
        assert!(!bad.is_consistent());
    }
}
