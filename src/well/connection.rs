//! Well-to-grid connections (perforations).
//!
//! A [`WellConnections`] collection keeps the perforations of one well.
//! The ordering policy is fixed at well creation (COMPORD) and is
//! re-applied by `order()` after every mutation that may disturb it.

use serde::{Deserialize, Serialize};

use crate::deck::KeywordLocation;
use crate::error::{SchedResult, StructuralError};

/// Connection open/shut state.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConnectionState {
    Open,
    Shut,
    Auto,
}

impl ConnectionState {
    /// Parses a deck status token.
    #[must_use]
    pub fn from_deck(token: &str) -> Option<Self> {
        match token {
            "OPEN" => Some(Self::Open),
            "SHUT" | "STOP" => Some(Self::Shut),
            "AUTO" => Some(Self::Auto),
            _ => None,
        }
    }
}

/// Penetration direction of a connection.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConnectionDirection {
    X,
    Y,
    #[default]
    Z,
}

impl ConnectionDirection {
    /// Parses a deck direction token.
    #[must_use]
    pub fn from_deck(token: &str) -> Option<Self> {
        match token {
            "X" => Some(Self::X),
            "Y" => Some(Self::Y),
            "Z" => Some(Self::Z),
            _ => None,
        }
    }
}

/// Connection ordering policy, fixed at well creation.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConnectionOrder {
    #[default]
    Track,
    Input,
    Depth,
}

impl ConnectionOrder {
    /// Parses a COMPORD ordering token.
    ///
    /// # Errors
    ///
    /// Unknown ordering tokens are structural.
    pub fn from_deck(token: &str, location: &KeywordLocation) -> SchedResult<Self> {
        match token {
            "TRACK" => Ok(Self::Track),
            "INPUT" => Ok(Self::Input),
            "DEPTH" => Ok(Self::Depth),
            other => Err(StructuralError::UnknownConnectionOrder {
                value: other.to_string(),
                location: location.clone(),
            }
            .into()),
        }
    }
}

/// One perforation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    /// 0-based grid I index.
    pub i: usize,
    /// 0-based grid J index.
    pub j: usize,
    /// 0-based grid K index.
    pub k: usize,
    /// Open/shut state.
    pub state: ConnectionState,
    /// Penetration direction.
    pub direction: ConnectionDirection,
    /// Completion number (COMPLUMP grouping; defaults to input order).
    pub complnum: i32,
    /// Segment this connection feeds, for multi-segment wells.
    pub segment: Option<i32>,
    /// Connection transmissibility factor, SI.
    pub ctf: f64,
    /// Skin factor.
    pub skin: f64,
    /// Wellbore diameter, SI.
    pub diameter: f64,
    /// PVT region of the connected cell.
    pub pvt_region: i32,
    /// Measured depth along the wellbore; drives DEPTH ordering.
    pub depth: f64,
    /// Deck input order, ties broken by this under TRACK/DEPTH.
    pub input_index: usize,
}

impl Connection {
    /// An open connection at a cell with neutral hydraulic defaults.
    #[must_use]
    pub fn new(i: usize, j: usize, k: usize) -> Self {
        Self {
            i,
            j,
            k,
            state: ConnectionState::Open,
            direction: ConnectionDirection::Z,
            complnum: 0,
            segment: None,
            ctf: 0.0,
            skin: 0.0,
            diameter: 0.0,
            pvt_region: 0,
            depth: 0.0,
            input_index: 0,
        }
    }

    /// True if the connection is in a cell matching the given indices,
    /// where `None` acts as a wildcard (WELOPEN connection filters).
    #[must_use]
    pub fn matches_cell(&self, i: Option<usize>, j: Option<usize>, k: Option<usize>) -> bool {
        i.is_none_or(|i| i == self.i)
            && j.is_none_or(|j| j == self.j)
            && k.is_none_or(|k| k == self.k)
    }
}

/// Ordered collection of one well's connections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WellConnections {
    order: ConnectionOrder,
    /// Head cell I, used by TRACK ordering.
    head_i: usize,
    /// Head cell J, used by TRACK ordering.
    head_j: usize,
    connections: Vec<Connection>,
}

impl WellConnections {
    /// Empty collection with a fixed ordering policy.
    #[must_use]
    pub fn new(order: ConnectionOrder, head_i: usize, head_j: usize) -> Self {
        Self {
            order,
            head_i,
            head_j,
            connections: Vec::new(),
        }
    }

    /// The ordering policy.
    #[must_use]
    pub const fn ordering(&self) -> ConnectionOrder {
        self.order
    }

    /// Number of connections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// True if the well has no connections.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Adds a connection (or replaces the one in the same cell) and
    /// re-applies the ordering policy.
    pub fn add(&mut self, mut connection: Connection) {
        connection.input_index = self.connections.len();
        if connection.complnum == 0 {
            connection.complnum = (connection.input_index + 1) as i32;
        }
        if let Some(existing) = self
            .connections
            .iter_mut()
            .find(|c| c.i == connection.i && c.j == connection.j && c.k == connection.k)
        {
            connection.input_index = existing.input_index;
            connection.complnum = existing.complnum;
            *existing = connection;
        } else {
            self.connections.push(connection);
        }
        self.order_connections();
    }

    /// Iterates connections in policy order.
    pub fn iter(&self) -> std::slice::Iter<'_, Connection> {
        self.connections.iter()
    }

    /// Connection at a cell, if any.
    #[must_use]
    pub fn at_cell(&self, i: usize, j: usize, k: usize) -> Option<&Connection> {
        self.connections
            .iter()
            .find(|c| c.i == i && c.j == j && c.k == k)
    }

    /// Sets the state of every connection matching the cell filter.
    /// Returns the number of connections changed.
    pub fn set_state(
        &mut self,
        i: Option<usize>,
        j: Option<usize>,
        k: Option<usize>,
        state: ConnectionState,
    ) -> usize {
        let mut changed = 0;
        for connection in &mut self.connections {
            if connection.matches_cell(i, j, k) && connection.state != state {
                connection.state = state;
                changed += 1;
            }
        }
        changed
    }

    /// Assigns a completion number to matching connections (COMPLUMP).
    pub fn lump(&mut self, i: Option<usize>, j: Option<usize>, k: Option<usize>, complnum: i32) {
        for connection in &mut self.connections {
            if connection.matches_cell(i, j, k) {
                connection.complnum = complnum;
            }
        }
    }

    /// True if the well has connections and all of them are shut.
    #[must_use]
    pub fn all_shut(&self) -> bool {
        !self.connections.is_empty()
            && self
                .connections
                .iter()
                .all(|c| c.state == ConnectionState::Shut)
    }

    /// Removes connections whose cell is inactive. Returns how many
    /// were dropped.
    pub fn filter_cells<F>(&mut self, mut is_active: F) -> usize
    where
        F: FnMut(usize, usize, usize) -> bool,
    {
        let before = self.connections.len();
        self.connections.retain(|c| is_active(c.i, c.j, c.k));
        before - self.connections.len()
    }

    /// Re-applies the ordering policy.
    ///
    /// TRACK orders by wellbore trajectory approximated as distance
    /// from the wellhead column then depth; INPUT preserves deck order;
    /// DEPTH sorts on measured depth.
    pub fn order_connections(&mut self) {
        match self.order {
            ConnectionOrder::Input => {
                self.connections.sort_by_key(|c| c.input_index);
            }
            ConnectionOrder::Depth => {
                self.connections.sort_by(|a, b| {
                    a.depth
                        .partial_cmp(&b.depth)
                        .unwrap_or(std::cmp::Ordering::Equal)
                        .then(a.input_index.cmp(&b.input_index))
                });
            }
            ConnectionOrder::Track => {
                let (head_i, head_j) = (self.head_i, self.head_j);
                self.connections.sort_by(|a, b| {
                    let da = a.i.abs_diff(head_i) + a.j.abs_diff(head_j);
                    let db = b.i.abs_diff(head_i) + b.j.abs_diff(head_j);
                    a.k.cmp(&b.k)
                        .then(da.cmp(&db))
                        .then(a.input_index.cmp(&b.input_index))
                });
            }
        }
    }
}
