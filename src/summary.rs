//! Live summary-vector state.
//!
//! [`SummaryState`] is the process-wide key/value store the simulator
//! feeds every timestep and UDQ/ACTIONX evaluation reads. Keys are the
//! usual summary mnemonics, with well- and group-indexed variables using
//! `"VAR:NAME"` composite keys and mirrored into nested per-variable
//! maps for "all wells with this var" queries.
//!
//! Rate-type keys overwrite; total/cumulative keys (suffix table below)
//! accumulate. That classification is by variable-name suffix and must
//! stay aligned with the summary vector naming convention.

use std::collections::HashMap;

use chrono::{DateTime, TimeZone, Utc};

use crate::error::{SchedError, SchedResult};

/// Variable-name suffixes that denote cumulative (total) vectors.
const TOTAL_SUFFIXES: &[&str] = &[
    "OPT", "GPT", "WPT", "GIT", "WIT", "OPTF", "OPTS", "OIT", "OVPT", "OVIT", "MWT", "WVPT",
    "WVIT", "GMT", "GPTF", "SGT", "GST", "FGT", "GCT", "GIMT", "WGPT", "WGIT", "EGT", "EXGT",
    "GVPT", "GVIT", "LPT", "VPT", "VIT", "NPT", "NIT", "TPT", "TIT", "CPT", "CIT", "SPT", "SIT",
    "EPT", "EIT",
];

/// True if `key` names a cumulative vector. Only the variable part
/// (before any `:`) is inspected.
#[must_use]
pub fn is_total(key: &str) -> bool {
    let var = key.split(':').next().unwrap_or(key);
    TOTAL_SUFFIXES
        .iter()
        .any(|suffix| var.len() > suffix.len() && var.ends_with(suffix))
        || TOTAL_SUFFIXES.iter().any(|suffix| var == *suffix)
}

/// Process-wide summary key/value store.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryState {
    sim_start: DateTime<Utc>,
    elapsed: f64,
    values: HashMap<String, f64>,
    well_values: HashMap<String, HashMap<String, f64>>,
    group_values: HashMap<String, HashMap<String, f64>>,
    well_names: Option<Vec<String>>,
    group_names: Option<Vec<String>>,
}

impl SummaryState {
    /// Creates a state anchored at the simulation start time.
    #[must_use]
    pub fn new(sim_start: DateTime<Utc>) -> Self {
        Self {
            sim_start,
            elapsed: 0.0,
            values: HashMap::new(),
            well_values: HashMap::new(),
            group_values: HashMap::new(),
            well_names: Some(Vec::new()),
            group_names: Some(Vec::new()),
        }
    }

    /// Simulation wall-clock start.
    #[must_use]
    pub const fn sim_start(&self) -> DateTime<Utc> {
        self.sim_start
    }

    /// Seconds of simulated time elapsed.
    #[must_use]
    pub const fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Advances elapsed simulated time.
    pub fn update_elapsed(&mut self, delta_seconds: f64) {
        self.elapsed += delta_seconds;
    }

    /// Sets a scalar key. Cumulative keys accumulate, rates overwrite.
    pub fn update(&mut self, key: impl Into<String>, value: f64) {
        let key = key.into();
        if is_total(&key) {
            *self.values.entry(key).or_insert(0.0) += value;
        } else {
            self.values.insert(key, value);
        }
    }

    /// Sets a well-indexed variable, maintaining both the flat
    /// `"VAR:WELL"` key and the nested map.
    pub fn update_well_var(&mut self, well: impl Into<String>, var: impl Into<String>, value: f64) {
        let well = well.into();
        let var = var.into();

        let nested = self
            .well_values
            .entry(var.clone())
            .or_default()
            .entry(well.clone())
            .or_insert(0.0);
        let flat = self.values.entry(format!("{var}:{well}")).or_insert(0.0);
        if is_total(&var) {
            *nested += value;
            *flat += value;
        } else {
            *nested = value;
            *flat = value;
        }

        // Invalidate the name cache on insert; recomputed lazily.
        self.well_names = None;
    }

    /// Sets a group-indexed variable. Same key discipline as wells.
    pub fn update_group_var(
        &mut self,
        group: impl Into<String>,
        var: impl Into<String>,
        value: f64,
    ) {
        let group = group.into();
        let var = var.into();

        let nested = self
            .group_values
            .entry(var.clone())
            .or_default()
            .entry(group.clone())
            .or_insert(0.0);
        let flat = self.values.entry(format!("{var}:{group}")).or_insert(0.0);
        if is_total(&var) {
            *nested += value;
            *flat += value;
        } else {
            *nested = value;
            *flat = value;
        }

        self.group_names = None;
    }

    /// True if the key is present (flat form for indexed variables).
    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Value of a flat key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<f64> {
        self.values.get(key).copied()
    }

    /// Value of a flat key, defaulting when absent.
    #[must_use]
    pub fn get_or(&self, key: &str, fallback: f64) -> f64 {
        self.get(key).unwrap_or(fallback)
    }

    /// True if `var` is defined for `well`.
    #[must_use]
    pub fn has_well_var(&self, well: &str, var: &str) -> bool {
        self.well_values
            .get(var)
            .is_some_and(|wells| wells.contains_key(well))
    }

    /// Value of `var` for `well`.
    #[must_use]
    pub fn get_well_var(&self, well: &str, var: &str) -> Option<f64> {
        self.well_values.get(var).and_then(|m| m.get(well)).copied()
    }

    /// True if `var` is defined for `group`.
    #[must_use]
    pub fn has_group_var(&self, group: &str, var: &str) -> bool {
        self.group_values
            .get(var)
            .is_some_and(|groups| groups.contains_key(group))
    }

    /// Value of `var` for `group`.
    #[must_use]
    pub fn get_group_var(&self, group: &str, var: &str) -> Option<f64> {
        self.group_values
            .get(var)
            .and_then(|m| m.get(group))
            .copied()
    }

    /// All values of a well variable, keyed by well name.
    #[must_use]
    pub fn well_var_values(&self, var: &str) -> HashMap<String, f64> {
        self.well_values.get(var).cloned().unwrap_or_default()
    }

    /// All well names ever seen. Lazily recomputed after inserts.
    pub fn wells(&mut self) -> Vec<String> {
        if self.well_names.is_none() {
            let mut names: Vec<String> = self
                .well_values
                .values()
                .flat_map(|m| m.keys().cloned())
                .collect();
            names.sort_unstable();
            names.dedup();
            self.well_names = Some(names);
        }
        self.well_names.clone().unwrap_or_default()
    }

    /// All group names ever seen. Lazily recomputed after inserts.
    pub fn groups(&mut self) -> Vec<String> {
        if self.group_names.is_none() {
            let mut names: Vec<String> = self
                .group_values
                .values()
                .flat_map(|m| m.keys().cloned())
                .collect();
            names.sort_unstable();
            names.dedup();
            self.group_names = Some(names);
        }
        self.group_names.clone().unwrap_or_default()
    }

    /// Serializes to a flat length-prefixed little-endian buffer:
    /// epoch seconds (i64), elapsed (f64), entry count (u64), then for
    /// each entry key length (u64) + key bytes + value (f64).
    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        let mut buffer = Vec::new();
        buffer.extend_from_slice(&self.sim_start.timestamp().to_le_bytes());
        buffer.extend_from_slice(&self.elapsed.to_le_bytes());

        // Deterministic ordering for reproducible checkpoints.
        let mut entries: Vec<(&String, &f64)> = self.values.iter().collect();
        entries.sort_by_key(|(key, _)| key.as_str());

        buffer.extend_from_slice(&(entries.len() as u64).to_le_bytes());
        for (key, value) in entries {
            buffer.extend_from_slice(&(key.len() as u64).to_le_bytes());
            buffer.extend_from_slice(key.as_bytes());
            buffer.extend_from_slice(&value.to_le_bytes());
        }
        buffer
    }

    /// Reconstructs a state from [`SummaryState::serialize`] output,
    /// rebuilding identical well/group sub-maps and name caches.
    ///
    /// # Errors
    ///
    /// Returns an internal error on a truncated or malformed buffer.
    pub fn deserialize(buffer: &[u8]) -> SchedResult<Self> {
        let mut cursor = Cursor::new(buffer);
        let epoch = cursor.read_i64()?;
        let elapsed = cursor.read_f64()?;
        let sim_start = Utc
            .timestamp_opt(epoch, 0)
            .single()
            .ok_or_else(|| SchedError::internal("checkpoint epoch out of range"))?;

        let mut state = Self::new(sim_start);
        state.elapsed = elapsed;

        let count = cursor.read_u64()? as usize;
        for _ in 0..count {
            let key_len = cursor.read_u64()? as usize;
            let key = cursor.read_string(key_len)?;
            let value = cursor.read_f64()?;

            // Direct insert: the buffer holds final values, so the
            // accumulate-on-update rule must not re-apply.
            if let Some((var, name)) = key.split_once(':') {
                if Self::is_group_key(var) {
                    state
                        .group_values
                        .entry(var.to_string())
                        .or_default()
                        .insert(name.to_string(), value);
                } else {
                    state
                        .well_values
                        .entry(var.to_string())
                        .or_default()
                        .insert(name.to_string(), value);
                }
            }
            state.values.insert(key, value);
        }

        state.well_names = None;
        state.group_names = None;
        Ok(state)
    }

    fn is_group_key(var: &str) -> bool {
        var.starts_with('G')
    }
}

struct Cursor<'a> {
    buffer: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    const fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, pos: 0 }
    }

    fn take(&mut self, n: usize) -> SchedResult<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.buffer.len())
            .ok_or_else(|| SchedError::internal("truncated summary checkpoint"))?;
        let slice = &self.buffer[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn read_u64(&mut self) -> SchedResult<u64> {
        let bytes: [u8; 8] = self.take(8)?.try_into().expect("slice length checked");
        Ok(u64::from_le_bytes(bytes))
    }

    fn read_i64(&mut self) -> SchedResult<i64> {
        let bytes: [u8; 8] = self.take(8)?.try_into().expect("slice length checked");
        Ok(i64::from_le_bytes(bytes))
    }

    fn read_f64(&mut self) -> SchedResult<f64> {
        let bytes: [u8; 8] = self.take(8)?.try_into().expect("slice length checked");
        Ok(f64::from_le_bytes(bytes))
    }

    fn read_string(&mut self, len: usize) -> SchedResult<String> {
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| SchedError::internal("non-utf8 key in summary checkpoint"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> SummaryState {
        SummaryState::new(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap())
    }

    #[test]
    fn total_classification() {
        assert!(is_total("FOPT"));
        assert!(is_total("WOPT:W1"));
        assert!(is_total("GGPT:GRP"));
        assert!(is_total("WWIT"));
        assert!(!is_total("WBHP:W1"));
        assert!(!is_total("WOPR"));
        assert!(!is_total("FGOR"));
    }

    #[test]
    fn totals_accumulate_rates_overwrite() {
        let mut st = state();
        st.update("WOPT:W1", 10.0);
        st.update("WOPT:W1", 5.0);
        assert_eq!(st.get("WOPT:W1"), Some(15.0));

        st.update("WBHP:W1", 10.0);
        st.update("WBHP:W1", 5.0);
        assert_eq!(st.get("WBHP:W1"), Some(5.0));
    }

    #[test]
    fn well_vars_mirror_flat_and_nested() {
        let mut st = state();
        st.update_well_var("W1", "WOPR", 100.0);
        st.update_well_var("W2", "WOPR", 200.0);
        st.update_well_var("W1", "WOPT", 10.0);
        st.update_well_var("W1", "WOPT", 10.0);

        assert_eq!(st.get("WOPR:W1"), Some(100.0));
        assert_eq!(st.get_well_var("W1", "WOPR"), Some(100.0));
        assert_eq!(st.get_well_var("W1", "WOPT"), Some(20.0));
        assert!(st.has_well_var("W2", "WOPR"));
        assert!(!st.has_well_var("W3", "WOPR"));

        let all = st.well_var_values("WOPR");
        assert_eq!(all.len(), 2);
        assert_eq!(all["W2"], 200.0);
    }

    #[test]
    fn group_vars() {
        let mut st = state();
        st.update_group_var("PLAT", "GOPR", 500.0);
        assert_eq!(st.get("GOPR:PLAT"), Some(500.0));
        assert_eq!(st.get_group_var("PLAT", "GOPR"), Some(500.0));
        assert_eq!(st.groups(), vec!["PLAT".to_string()]);
    }

    #[test]
    fn name_cache_invalidation() {
        let mut st = state();
        st.update_well_var("W2", "WOPR", 1.0);
        assert_eq!(st.wells(), vec!["W2".to_string()]);
        st.update_well_var("W1", "WWIR", 1.0);
        assert_eq!(st.wells(), vec!["W1".to_string(), "W2".to_string()]);
    }

    #[test]
    fn elapsed_time() {
        let mut st = state();
        st.update_elapsed(86_400.0);
        st.update_elapsed(43_200.0);
        assert_eq!(st.elapsed(), 129_600.0);
    }

    #[test]
    fn checkpoint_round_trip() {
        let mut st = state();
        st.update_elapsed(1000.0);
        st.update("FOPT", 123.0);
        st.update_well_var("W1", "WOPR", 50.0);
        st.update_well_var("W1", "WOPT", 5.0);
        st.update_group_var("PLAT", "GOPR", 100.0);

        let buffer = st.serialize();
        let mut back = SummaryState::deserialize(&buffer).unwrap();

        assert_eq!(back.sim_start(), st.sim_start());
        assert_eq!(back.elapsed(), 1000.0);
        assert_eq!(back.get("FOPT"), Some(123.0));
        assert_eq!(back.get_well_var("W1", "WOPR"), Some(50.0));
        assert_eq!(back.get_group_var("PLAT", "GOPR"), Some(100.0));
        assert_eq!(back.wells(), vec!["W1".to_string()]);
        assert_eq!(back.groups(), vec!["PLAT".to_string()]);

        // Accumulation continues from the restored totals.
        back.update("FOPT", 7.0);
        assert_eq!(back.get("FOPT"), Some(130.0));
    }

    #[test]
    fn deserialize_rejects_truncation() {
        let st = state();
        let buffer = st.serialize();
        assert!(SummaryState::deserialize(&buffer[..buffer.len() - 1]).is_err());
        assert!(SummaryState::deserialize(&[1, 2, 3]).is_err());
    }
}
