//! The versioned containers behind the schedule.
//!
//! Every entity and every global configuration object lives in a
//! [`DynamicState`], keyed by report step. This module is pure storage:
//! keyword semantics live in the handlers, orchestration in
//! [`Schedule`](crate::schedule::Schedule).

use std::collections::HashMap;

use crate::action::Actions;
use crate::dynamic_state::DynamicState;
use crate::error::{SchedResult, StructuralError};
use crate::events::{Events, ScheduleEvent, WellGroupEvents};
use crate::group::{Group, FIELD};
use crate::guide_rate::GuideRateConfig;
use crate::tuning::{MessageLimits, OilVaporizationProperties, Tuning};
use crate::udq::UdqConfig;
use crate::vfp::{VfpInjTable, VfpProdTable};
use crate::well::{ProducerCMode, Well};
use crate::wlist::WListManager;

/// All versioned schedule storage.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleState {
    wells: HashMap<String, DynamicState<Well>>,
    groups: HashMap<String, DynamicState<Group>>,
    well_order: Vec<String>,
    group_order: Vec<String>,

    /// Numerical tuning.
    pub tuning: DynamicState<Tuning>,
    /// Message print/stop limits.
    pub message_limits: DynamicState<MessageLimits>,
    /// Oil vaporization parameters.
    pub oil_vaporization: DynamicState<OilVaporizationProperties>,
    /// NUPCOL iteration limit.
    pub nupcol: DynamicState<i32>,
    /// UDQ definitions.
    pub udq: DynamicState<UdqConfig>,
    /// ACTIONX definitions.
    pub actions: DynamicState<Actions>,
    /// Well lists.
    pub wlists: DynamicState<WListManager>,
    /// Guide-rate configuration.
    pub guide_rate: DynamicState<GuideRateConfig>,
    /// WHISTCTL override of history-mode producer control.
    pub whistctl: DynamicState<Option<ProducerCMode>>,

    vfp_prod: HashMap<i32, DynamicState<VfpProdTable>>,
    vfp_inj: HashMap<i32, DynamicState<VfpInjTable>>,

    global_events: HashMap<usize, Events>,
    entity_events: HashMap<usize, WellGroupEvents>,
}

impl ScheduleState {
    /// Fresh storage with the FIELD group at step 0 and defaulted
    /// global configuration.
    #[must_use]
    pub fn new() -> Self {
        let mut groups = HashMap::new();
        groups.insert(
            FIELD.to_string(),
            DynamicState::with_initial(Group::field()),
        );
        Self {
            wells: HashMap::new(),
            groups,
            well_order: Vec::new(),
            group_order: vec![FIELD.to_string()],
            tuning: DynamicState::with_initial(Tuning::default()),
            message_limits: DynamicState::with_initial(MessageLimits::default()),
            oil_vaporization: DynamicState::with_initial(OilVaporizationProperties::default()),
            nupcol: DynamicState::with_initial(12),
            udq: DynamicState::with_initial(UdqConfig::new()),
            actions: DynamicState::with_initial(Actions::new()),
            wlists: DynamicState::with_initial(WListManager::new()),
            guide_rate: DynamicState::with_initial(GuideRateConfig::default()),
            whistctl: DynamicState::with_initial(None),
            vfp_prod: HashMap::new(),
            vfp_inj: HashMap::new(),
            global_events: HashMap::new(),
            entity_events: HashMap::new(),
        }
    }

    /// True if a well was ever defined.
    #[must_use]
    pub fn has_well(&self, name: &str) -> bool {
        self.wells.contains_key(name)
    }

    /// True if a group was ever defined.
    #[must_use]
    pub fn has_group(&self, name: &str) -> bool {
        self.groups.contains_key(name)
    }

    /// Number of wells ever defined.
    #[must_use]
    pub fn num_wells(&self) -> usize {
        self.wells.len()
    }

    /// The well's snapshot at a step.
    ///
    /// # Errors
    ///
    /// [`StructuralError::UnknownWell`] when the well does not exist at
    /// or before the step.
    pub fn well(&self, name: &str, step: usize) -> SchedResult<&Well> {
        self.wells
            .get(name)
            .and_then(|state| state.get(step))
            .ok_or_else(|| {
                StructuralError::UnknownWell {
                    well: name.to_string(),
                    step,
                }
                .into()
            })
    }

    /// The group's snapshot at a step.
    ///
    /// # Errors
    ///
    /// [`StructuralError::UnknownGroup`] when the group does not exist
    /// at or before the step.
    pub fn group(&self, name: &str, step: usize) -> SchedResult<&Group> {
        self.groups
            .get(name)
            .and_then(|state| state.get(step))
            .ok_or_else(|| {
                StructuralError::UnknownGroup {
                    group: name.to_string(),
                    step,
                }
                .into()
            })
    }

    /// Wells defined at or before a step, in insertion order.
    #[must_use]
    pub fn well_names(&self, step: usize) -> Vec<String> {
        self.well_order
            .iter()
            .filter(|name| {
                self.wells
                    .get(*name)
                    .and_then(|state| state.get(step))
                    .is_some()
            })
            .cloned()
            .collect()
    }

    /// Groups defined at or before a step, in insertion order (FIELD
    /// first).
    #[must_use]
    pub fn group_names(&self, step: usize) -> Vec<String> {
        self.group_order
            .iter()
            .filter(|name| {
                self.groups
                    .get(*name)
                    .and_then(|state| state.get(step))
                    .is_some()
            })
            .cloned()
            .collect()
    }

    /// Inserts a brand-new well at a step.
    pub fn add_well(&mut self, well: Well, step: usize) {
        let name = well.name.clone();
        let mut state = DynamicState::new();
        state.update(step, well);
        self.wells.insert(name.clone(), state);
        self.well_order.push(name);
    }

    /// Writes a well snapshot at a step only if it differs from the one
    /// holding there. Returns true when a change point was created.
    pub fn update_well(&mut self, well: Well, step: usize) -> bool {
        match self.wells.get_mut(&well.name) {
            Some(state) => state.update_if_changed(step, well),
            None => {
                self.add_well(well, step);
                true
            }
        }
    }

    /// Inserts a well snapshot unconditionally, used by restart
    /// ingestion where the change point must exist at the given step.
    pub fn force_well(&mut self, well: Well, step: usize) {
        match self.wells.get_mut(&well.name) {
            Some(state) => state.update(step, well),
            None => self.add_well(well, step),
        }
    }

    /// Inserts a brand-new group at a step.
    pub fn add_group(&mut self, group: Group, step: usize) {
        let name = group.name.clone();
        let mut state = DynamicState::new();
        state.update(step, group);
        self.groups.insert(name.clone(), state);
        self.group_order.push(name);
    }

    /// Writes a group snapshot at a step only if it differs. Returns
    /// true when a change point was created.
    pub fn update_group(&mut self, group: Group, step: usize) -> bool {
        match self.groups.get_mut(&group.name) {
            Some(state) => state.update_if_changed(step, group),
            None => {
                self.add_group(group, step);
                true
            }
        }
    }

    /// Next insertion index for a new group.
    #[must_use]
    pub fn next_group_index(&self) -> usize {
        self.group_order.len()
    }

    /// Next insertion index for a new well.
    #[must_use]
    pub fn next_well_index(&self) -> usize {
        self.well_order.len()
    }

    /// First report step at which the well exists.
    #[must_use]
    pub fn well_init_step(&self, name: &str) -> Option<usize> {
        self.wells.get(name).and_then(DynamicState::first_step)
    }

    /// The VFP production table with the given id at a step.
    #[must_use]
    pub fn vfp_prod_table(&self, table_id: i32, step: usize) -> Option<&VfpProdTable> {
        self.vfp_prod.get(&table_id).and_then(|s| s.get(step))
    }

    /// The VFP injection table with the given id at a step.
    #[must_use]
    pub fn vfp_inj_table(&self, table_id: i32, step: usize) -> Option<&VfpInjTable> {
        self.vfp_inj.get(&table_id).and_then(|s| s.get(step))
    }

    /// Installs a VFP production table at a step.
    pub fn update_vfp_prod(&mut self, table: VfpProdTable, step: usize) {
        self.vfp_prod
            .entry(table.table_id)
            .or_default()
            .update(step, table);
    }

    /// Installs a VFP injection table at a step.
    pub fn update_vfp_inj(&mut self, table: VfpInjTable, step: usize) {
        self.vfp_inj
            .entry(table.table_id)
            .or_default()
            .update(step, table);
    }

    /// Records an event in the step's global log.
    pub fn add_event(&mut self, step: usize, event: ScheduleEvent) {
        self.global_events.entry(step).or_default().add(event);
    }

    /// Records an event against a well or group.
    pub fn add_entity_event(&mut self, step: usize, name: &str, event: ScheduleEvent) {
        self.add_event(step, event);
        self.entity_events
            .entry(step)
            .or_default()
            .add(name, event);
    }

    /// The step's global event set.
    #[must_use]
    pub fn events(&self, step: usize) -> Events {
        self.global_events.get(&step).copied().unwrap_or_default()
    }

    /// True if the event was recorded against the name at the step.
    #[must_use]
    pub fn has_entity_event(&self, step: usize, name: &str, event: ScheduleEvent) -> bool {
        self.entity_events
            .get(&step)
            .is_some_and(|log| log.has(name, event))
    }

    /// Names with at least one event recorded at the step.
    #[must_use]
    pub fn entity_event_names(&self, step: usize) -> Vec<String> {
        self.entity_events
            .get(&step)
            .map(|log| log.names().into_iter().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Raw access to a well's full history, for diffing.
    #[must_use]
    pub fn well_history(&self, name: &str) -> Option<&DynamicState<Well>> {
        self.wells.get(name)
    }

    /// Raw access to a group's full history, for diffing.
    #[must_use]
    pub fn group_history(&self, name: &str) -> Option<&DynamicState<Group>> {
        self.groups.get(name)
    }
}

impl Default for ScheduleState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::well::{ConnectionOrder, Phase};

    fn well(name: &str, step: usize, index: usize) -> Well {
        Well::new(name, FIELD, step, index, 0, 0, Phase::Oil, ConnectionOrder::Track)
    }

    #[test]
    fn field_group_present_from_step_zero() {
        let state = ScheduleState::new();
        let field = state.group(FIELD, 0).unwrap();
        assert!(field.is_field());
        assert_eq!(state.group_names(0), vec![FIELD.to_string()]);
    }

    #[test]
    fn wells_appear_at_their_init_step() {
        let mut state = ScheduleState::new();
        state.add_well(well("OP1", 2, 0), 2);
        assert!(state.well("OP1", 1).is_err());
        assert!(state.well("OP1", 2).is_ok());
        assert!(state.well_names(1).is_empty());
        assert_eq!(state.well_names(2), vec!["OP1".to_string()]);
        assert_eq!(state.well_init_step("OP1"), Some(2));
    }

    #[test]
    fn update_well_skips_unchanged_snapshots() {
        let mut state = ScheduleState::new();
        state.add_well(well("OP1", 0, 0), 0);

        let unchanged = state.well("OP1", 3).unwrap().clone();
        assert!(!state.update_well(unchanged, 3));
        assert_eq!(state.well_history("OP1").unwrap().num_changes(), 1);

        let mut changed = state.well("OP1", 3).unwrap().clone();
        changed.update_efficiency_factor(0.5);
        assert!(state.update_well(changed, 3));
        assert_eq!(state.well_history("OP1").unwrap().num_changes(), 2);
    }

    #[test]
    fn insertion_order_preserved() {
        let mut state = ScheduleState::new();
        state.add_well(well("B", 0, 0), 0);
        state.add_well(well("A", 0, 1), 0);
        assert_eq!(
            state.well_names(0),
            vec!["B".to_string(), "A".to_string()]
        );
    }

    #[test]
    fn event_logs() {
        let mut state = ScheduleState::new();
        state.add_entity_event(1, "OP1", ScheduleEvent::ProductionUpdate);
        assert!(state.events(1).has(ScheduleEvent::ProductionUpdate));
        assert!(state.has_entity_event(1, "OP1", ScheduleEvent::ProductionUpdate));
        assert!(!state.has_entity_event(1, "OP2", ScheduleEvent::ProductionUpdate));
        assert!(state.events(2).is_empty());
    }
}
