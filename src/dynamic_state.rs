//! Per-report-step versioned value container.
//!
//! [`DynamicState`] maps a report step to the most recently set value of
//! `T`: a value set at step `s` holds for every step `>= s` until it is
//! overwritten ("step-forward persistence"). Storage is a sparse list of
//! change points `(step, value)` in increasing step order, so a well
//! whose configuration changes three times over a thousand-step run
//! costs three entries.

use serde::{Deserialize, Serialize};

/// Sparse, append-mostly versioned container.
///
/// `update` always inserts or replaces the change point at exactly the
/// given step (last-write-wins within a step). Call sites that only want
/// to record semantic changes use [`DynamicState::update_if_changed`],
/// which keeps `find_not` "first appearance" queries exact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynamicState<T> {
    changes: Vec<(usize, T)>,
}

impl<T> Default for DynamicState<T> {
    fn default() -> Self {
        Self { changes: Vec::new() }
    }
}

impl<T> DynamicState<T> {
    /// Empty state: `get` answers `None` for every step.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// State with an initial value at step 0.
    #[must_use]
    pub fn with_initial(value: T) -> Self {
        Self {
            changes: vec![(0, value)],
        }
    }

    /// Number of change points.
    #[must_use]
    pub fn num_changes(&self) -> usize {
        self.changes.len()
    }

    /// True if no value has ever been set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// The value holding at `step`: the latest change point at or before
    /// `step`, or `None` if `step` precedes the first change point.
    #[must_use]
    pub fn get(&self, step: usize) -> Option<&T> {
        match self.changes.binary_search_by(|(s, _)| s.cmp(&step)) {
            Ok(idx) => Some(&self.changes[idx].1),
            Err(0) => None,
            Err(idx) => Some(&self.changes[idx - 1].1),
        }
    }

    /// The most recent value, regardless of step.
    #[must_use]
    pub fn back(&self) -> Option<&T> {
        self.changes.last().map(|(_, v)| v)
    }

    /// Step of the first change point.
    #[must_use]
    pub fn first_step(&self) -> Option<usize> {
        self.changes.first().map(|(s, _)| *s)
    }

    /// Inserts or overwrites the change point at `step`.
    ///
    /// Out-of-order insertion (a step before the current last change
    /// point) is supported for restart ingestion and keeps the list
    /// sorted.
    pub fn update(&mut self, step: usize, value: T) {
        match self.changes.binary_search_by(|(s, _)| s.cmp(&step)) {
            Ok(idx) => self.changes[idx].1 = value,
            Err(idx) => self.changes.insert(idx, (step, value)),
        }
    }

    /// Iterates the change points in step order.
    pub fn iter(&self) -> std::slice::Iter<'_, (usize, T)> {
        self.changes.iter()
    }
}

impl<T: PartialEq> DynamicState<T> {
    /// Inserts only if the value holding at `step` differs from `value`.
    /// Returns true if an insert happened.
    pub fn update_if_changed(&mut self, step: usize, value: T) -> bool {
        if self.get(step) == Some(&value) {
            return false;
        }
        self.update(step, value);
        true
    }

    /// First step whose change point differs from `value`, scanning
    /// change points in order. Used to discover an entity's first
    /// appearance step when the state was seeded with a sentinel.
    #[must_use]
    pub fn find_not(&self, value: &T) -> Option<usize> {
        self.changes
            .iter()
            .find(|(_, v)| v != value)
            .map(|(s, _)| *s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_forward_persistence() {
        let mut state = DynamicState::new();
        state.update(2, "a");
        state.update(5, "b");
        state.update(9, "c");

        assert_eq!(state.get(0), None);
        assert_eq!(state.get(1), None);
        assert_eq!(state.get(2), Some(&"a"));
        assert_eq!(state.get(4), Some(&"a"));
        assert_eq!(state.get(5), Some(&"b"));
        assert_eq!(state.get(8), Some(&"b"));
        assert_eq!(state.get(9), Some(&"c"));
        assert_eq!(state.get(1000), Some(&"c"));
        assert_eq!(state.back(), Some(&"c"));
    }

    #[test]
    fn last_write_wins_within_a_step() {
        let mut state = DynamicState::new();
        state.update(3, 10);
        state.update(3, 20);
        assert_eq!(state.num_changes(), 1);
        assert_eq!(state.get(3), Some(&20));
    }

    #[test]
    fn update_if_changed_skips_equal_values() {
        let mut state = DynamicState::with_initial(1);
        assert!(!state.update_if_changed(4, 1));
        assert_eq!(state.num_changes(), 1);

        assert!(state.update_if_changed(4, 2));
        assert_eq!(state.num_changes(), 2);

        // Equal to the value holding at step 6 (set at 4), so no insert.
        assert!(!state.update_if_changed(6, 2));
        assert_eq!(state.num_changes(), 2);
    }

    #[test]
    fn find_not_locates_first_appearance() {
        let mut state = DynamicState::with_initial(0);
        state.update(3, 0);
        state.update(7, 42);
        assert_eq!(state.find_not(&0), Some(7));
        assert_eq!(state.find_not(&42), Some(0));
        assert_eq!(DynamicState::<i32>::new().find_not(&0), None);
    }

    #[test]
    fn out_of_order_insert_keeps_order() {
        let mut state = DynamicState::new();
        state.update(8, "late");
        state.update(2, "early");
        assert_eq!(state.get(2), Some(&"early"));
        assert_eq!(state.get(7), Some(&"early"));
        assert_eq!(state.get(8), Some(&"late"));
        let steps: Vec<usize> = state.iter().map(|(s, _)| *s).collect();
        assert_eq!(steps, vec![2, 8]);
    }

    #[test]
    fn with_initial_defines_step_zero() {
        let state = DynamicState::with_initial(7usize);
        assert_eq!(state.get(0), Some(&7));
        assert_eq!(state.first_step(), Some(0));
    }

    #[test]
    fn serde_round_trip() {
        let mut state = DynamicState::new();
        state.update(1, 1.5f64);
        state.update(4, 2.5f64);
        let json = serde_json::to_string(&state).unwrap();
        let back: DynamicState<f64> = serde_json::from_str(&json).unwrap();
        assert_eq!(state, back);
    }
}
