//! Immutable group snapshots and the group tree.
//!
//! Groups form a strict tree rooted at FIELD. Parent and child links
//! are by name, never by reference, so snapshots stay plain values.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{SchedResult, StructuralError};
use crate::well::Phase;

/// Name of the root group, always present at index 0.
pub const FIELD: &str = "FIELD";

/// Group-level producer control modes.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GroupProducerCMode {
    None,
    Orat,
    Wrat,
    Grat,
    Lrat,
    Resv,
    Fld,
}

impl GroupProducerCMode {
    /// Parses a deck control-mode token.
    #[must_use]
    pub fn from_deck(token: &str) -> Option<Self> {
        match token {
            "NONE" => Some(Self::None),
            "ORAT" => Some(Self::Orat),
            "WRAT" => Some(Self::Wrat),
            "GRAT" => Some(Self::Grat),
            "LRAT" => Some(Self::Lrat),
            "RESV" => Some(Self::Resv),
            "FLD" => Some(Self::Fld),
            _ => None,
        }
    }
}

/// Group-level injector control modes.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GroupInjectorCMode {
    None,
    Rate,
    Resv,
    Rein,
    Vrep,
    Fld,
}

impl GroupInjectorCMode {
    /// Parses a deck control-mode token.
    #[must_use]
    pub fn from_deck(token: &str) -> Option<Self> {
        match token {
            "NONE" => Some(Self::None),
            "RATE" => Some(Self::Rate),
            "RESV" => Some(Self::Resv),
            "REIN" => Some(Self::Rein),
            "VREP" => Some(Self::Vrep),
            "FLD" => Some(Self::Fld),
            _ => None,
        }
    }
}

/// GCONPROD group production targets. All quantities SI.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GroupProductionProperties {
    /// Active control mode.
    pub cmode: Option<GroupProducerCMode>,
    /// Surface oil rate target.
    pub oil_target: f64,
    /// Surface water rate target.
    pub water_target: f64,
    /// Surface gas rate target.
    pub gas_target: f64,
    /// Surface liquid rate target.
    pub liquid_target: f64,
    /// Reservoir volume rate target.
    pub resv_target: f64,
    /// Group is available for higher-level (FLD) control.
    pub respond_to_parent: bool,
}

/// GCONINJE group injection targets for one phase. All quantities SI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupInjectionProperties {
    /// Injected phase.
    pub phase: Phase,
    /// Active control mode.
    pub cmode: Option<GroupInjectorCMode>,
    /// Surface injection rate target.
    pub surface_target: f64,
    /// Reservoir volume injection rate target.
    pub resv_target: f64,
    /// Reinjection fraction (REIN).
    pub reinjection_fraction: f64,
    /// Voidage replacement fraction (VREP).
    pub voidage_fraction: f64,
    /// Group is available for higher-level (FLD) control.
    pub respond_to_parent: bool,
}

impl Default for GroupInjectionProperties {
    fn default() -> Self {
        Self {
            phase: Phase::Water,
            cmode: None,
            surface_target: 0.0,
            resv_target: 0.0,
            reinjection_fraction: 0.0,
            voidage_fraction: 0.0,
            respond_to_parent: true,
        }
    }
}

/// One group's configuration at one report step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    /// Unique group name.
    pub name: String,
    /// Sequence index, insertion order across all groups; FIELD is 0.
    pub insert_index: usize,
    /// Report step the group was introduced at.
    pub init_step: usize,
    /// Parent group name; `None` only for FIELD.
    pub parent: Option<String>,
    /// Child group names.
    pub groups: BTreeSet<String>,
    /// Member well names.
    pub wells: BTreeSet<String>,
    /// Production targets.
    pub production: GroupProductionProperties,
    /// Injection targets, at most one block per phase.
    pub injection: Vec<GroupInjectionProperties>,
    /// Efficiency factor (GEFAC), 1.0 if unset.
    pub efficiency_factor: f64,
}

impl Group {
    /// A new empty group.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        insert_index: usize,
        init_step: usize,
        parent: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            insert_index,
            init_step,
            parent,
            groups: BTreeSet::new(),
            wells: BTreeSet::new(),
            production: GroupProductionProperties::default(),
            injection: Vec::new(),
            efficiency_factor: 1.0,
        }
    }

    /// The root group.
    #[must_use]
    pub fn field() -> Self {
        Self::new(FIELD, 0, 0, None)
    }

    /// True for the root group.
    #[must_use]
    pub fn is_field(&self) -> bool {
        self.parent.is_none()
    }

    /// Adds a member well. Returns true if it was not already a member.
    pub fn add_well(&mut self, well: impl Into<String>) -> bool {
        self.wells.insert(well.into())
    }

    /// Removes a member well. Returns true if it was a member.
    pub fn del_well(&mut self, well: &str) -> bool {
        self.wells.remove(well)
    }

    /// Adds a child group. Returns true if it was not already a child.
    pub fn add_group(&mut self, group: impl Into<String>) -> bool {
        self.groups.insert(group.into())
    }

    /// Removes a child group. Returns true if it was a child.
    pub fn del_group(&mut self, group: &str) -> bool {
        self.groups.remove(group)
    }

    /// Reparents the group. Returns true if the parent changed.
    pub fn update_parent(&mut self, parent: impl Into<String>) -> bool {
        let parent = Some(parent.into());
        if self.parent == parent {
            return false;
        }
        self.parent = parent;
        true
    }

    /// Installs production targets. Returns true if different.
    pub fn update_production(&mut self, production: GroupProductionProperties) -> bool {
        if self.production == production {
            return false;
        }
        self.production = production;
        true
    }

    /// Installs or replaces the injection block for the block's phase.
    /// Returns true on any observable change.
    pub fn update_injection(&mut self, injection: GroupInjectionProperties) -> bool {
        if let Some(existing) = self.injection.iter_mut().find(|p| p.phase == injection.phase) {
            if *existing == injection {
                return false;
            }
            *existing = injection;
        } else {
            self.injection.push(injection);
        }
        true
    }

    /// Injection block for a phase, if any.
    #[must_use]
    pub fn injection_for(&self, phase: Phase) -> Option<&GroupInjectionProperties> {
        self.injection.iter().find(|p| p.phase == phase)
    }

    /// Sets the efficiency factor. Returns true if different.
    pub fn update_efficiency_factor(&mut self, factor: f64) -> bool {
        if self.efficiency_factor == factor {
            return false;
        }
        self.efficiency_factor = factor;
        true
    }
}

/// Checks that making `child` a child of `parent` keeps the tree
/// acyclic, walking parent links through the provided resolver.
///
/// # Errors
///
/// [`StructuralError::GroupCycle`] when `parent` is `child` or a
/// descendant of `child`.
pub fn check_group_cycle<'a, F>(
    child: &str,
    parent: &str,
    mut parent_of: F,
) -> SchedResult<()>
where
    F: FnMut(&str) -> Option<&'a str>,
{
    let mut node = Some(parent);
    while let Some(name) = node {
        if name == child {
            return Err(StructuralError::GroupCycle {
                group: child.to_string(),
            }
            .into());
        }
        node = parent_of(name);
    }
    Ok(())
}
