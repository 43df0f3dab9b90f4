//! Grid and field-property collaborators.
//!
//! The schedule never owns grid geometry; it queries it read-only when
//! resolving connection cells and PVT regions. The traits here are the
//! seam to the external grid/property libraries; the dense
//! implementations are for tests and small embedded cases.

use std::collections::HashSet;

/// Active-cell indexing over a structured grid.
pub trait ActiveCells {
    /// Grid dimensions (nx, ny, nz).
    fn dims(&self) -> (usize, usize, usize);

    /// True if the 0-based (i, j, k) cell is active.
    fn is_active(&self, i: usize, j: usize, k: usize) -> bool;

    /// Active-cell index for (i, j, k), if the cell is active.
    fn active_index(&self, i: usize, j: usize, k: usize) -> Option<usize>;

    /// Global (natural) index for (i, j, k), column-major in k.
    fn global_index(&self, i: usize, j: usize, k: usize) -> Option<usize> {
        let (nx, ny, nz) = self.dims();
        if i >= nx || j >= ny || k >= nz {
            return None;
        }
        Some(i + j * nx + k * nx * ny)
    }
}

/// Per-cell integer property arrays, e.g. PVTNUM.
pub trait CellProps {
    /// Value of integer property `keyword` at the global cell index.
    fn get_int(&self, keyword: &str, global_index: usize) -> Option<i64>;
}

/// A dense Cartesian grid where every cell is active unless deactivated.
#[derive(Debug, Clone)]
pub struct CartesianGrid {
    nx: usize,
    ny: usize,
    nz: usize,
    inactive: HashSet<usize>,
}

impl CartesianGrid {
    /// Fully active nx*ny*nz grid.
    #[must_use]
    pub fn new(nx: usize, ny: usize, nz: usize) -> Self {
        Self {
            nx,
            ny,
            nz,
            inactive: HashSet::new(),
        }
    }

    /// Deactivates one cell.
    pub fn deactivate(&mut self, i: usize, j: usize, k: usize) {
        if let Some(g) = self.global_index(i, j, k) {
            self.inactive.insert(g);
        }
    }
}

impl ActiveCells for CartesianGrid {
    fn dims(&self) -> (usize, usize, usize) {
        (self.nx, self.ny, self.nz)
    }

    fn is_active(&self, i: usize, j: usize, k: usize) -> bool {
        match self.global_index(i, j, k) {
            Some(g) => !self.inactive.contains(&g),
            None => false,
        }
    }

    fn active_index(&self, i: usize, j: usize, k: usize) -> Option<usize> {
        if !self.is_active(i, j, k) {
            return None;
        }
        let g = self.global_index(i, j, k)?;
        // Active index = global index minus inactive cells before it.
        let skipped = self.inactive.iter().filter(|&&x| x < g).count();
        Some(g - skipped)
    }
}

/// Uniform integer properties: every cell has the same value.
#[derive(Debug, Clone, Default)]
pub struct ConstProps {
    entries: Vec<(String, i64)>,
}

impl ConstProps {
    /// Empty property set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a uniform property value.
    #[must_use]
    pub fn with(mut self, keyword: impl Into<String>, value: i64) -> Self {
        self.entries.push((keyword.into(), value));
        self
    }
}

impl CellProps for ConstProps {
    fn get_int(&self, keyword: &str, _global_index: usize) -> Option<i64> {
        self.entries
            .iter()
            .find(|(k, _)| k == keyword)
            .map(|(_, v)| *v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_index_is_column_major() {
        let grid = CartesianGrid::new(3, 2, 2);
        assert_eq!(grid.global_index(0, 0, 0), Some(0));
        assert_eq!(grid.global_index(2, 0, 0), Some(2));
        assert_eq!(grid.global_index(0, 1, 0), Some(3));
        assert_eq!(grid.global_index(0, 0, 1), Some(6));
        assert_eq!(grid.global_index(3, 0, 0), None);
    }

    #[test]
    fn deactivation_shifts_active_index() {
        let mut grid = CartesianGrid::new(2, 2, 1);
        assert_eq!(grid.active_index(1, 1, 0), Some(3));
        grid.deactivate(0, 0, 0);
        assert!(!grid.is_active(0, 0, 0));
        assert_eq!(grid.active_index(0, 0, 0), None);
        assert_eq!(grid.active_index(1, 1, 0), Some(2));
    }

    #[test]
    fn const_props_lookup() {
        let props = ConstProps::new().with("PVTNUM", 2);
        assert_eq!(props.get_int("PVTNUM", 17), Some(2));
        assert_eq!(props.get_int("SATNUM", 0), None);
    }
}
