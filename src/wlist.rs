//! Named well lists (WLIST).
//!
//! A well list is a named, duplicate-free set of well names; the list
//! name always begins with `*` and can be used wherever a well name
//! pattern is accepted. Lists are mutated by the WLIST keyword's
//! NEW/ADD/DEL/MOV actions.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One named well list. Insertion-ordered, duplicate-free.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WList {
    wells: Vec<String>,
}

impl WList {
    /// Empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a well if not already present.
    pub fn add(&mut self, well: impl Into<String>) {
        let well = well.into();
        if !self.wells.contains(&well) {
            self.wells.push(well);
        }
    }

    /// Removes a well if present.
    pub fn del(&mut self, well: &str) {
        self.wells.retain(|w| w != well);
    }

    /// True if the list contains `well`.
    #[must_use]
    pub fn contains(&self, well: &str) -> bool {
        self.wells.iter().any(|w| w == well)
    }

    /// Member names in insertion order.
    #[must_use]
    pub fn wells(&self) -> &[String] {
        &self.wells
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.wells.len()
    }

    /// True if the list has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.wells.is_empty()
    }
}

/// WLIST record actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WListAction {
    /// Create (or reset) a list with the given wells.
    New,
    /// Add wells to an existing list.
    Add,
    /// Remove wells from an existing list.
    Del,
    /// Add wells to this list and remove them from every other list.
    Mov,
}

impl WListAction {
    /// Parses a deck action token.
    #[must_use]
    pub fn from_deck(token: &str) -> Option<Self> {
        match token {
            "NEW" => Some(Self::New),
            "ADD" => Some(Self::Add),
            "DEL" => Some(Self::Del),
            "MOV" => Some(Self::Mov),
            _ => None,
        }
    }
}

/// All well lists of one report step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WListManager {
    lists: HashMap<String, WList>,
}

impl WListManager {
    /// Empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// True if a list with this name exists.
    #[must_use]
    pub fn has_list(&self, name: &str) -> bool {
        self.lists.contains_key(name)
    }

    /// The list with this name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&WList> {
        self.lists.get(name)
    }

    /// Creates (or resets) a list.
    pub fn new_list(&mut self, name: impl Into<String>, wells: &[String]) {
        let mut list = WList::new();
        for well in wells {
            list.add(well.clone());
        }
        self.lists.insert(name.into(), list);
    }

    /// Adds wells to a list. Returns false if the list does not exist.
    #[must_use]
    pub fn add_wells(&mut self, name: &str, wells: &[String]) -> bool {
        match self.lists.get_mut(name) {
            Some(list) => {
                for well in wells {
                    list.add(well.clone());
                }
                true
            }
            None => false,
        }
    }

    /// Removes wells from a list. Returns false if the list does not
    /// exist.
    #[must_use]
    pub fn del_wells(&mut self, name: &str, wells: &[String]) -> bool {
        match self.lists.get_mut(name) {
            Some(list) => {
                for well in wells {
                    list.del(well);
                }
                true
            }
            None => false,
        }
    }

    /// MOV: adds wells to `name` and removes them from every other list.
    /// Returns false if the target list does not exist.
    #[must_use]
    pub fn move_wells(&mut self, name: &str, wells: &[String]) -> bool {
        if !self.lists.contains_key(name) {
            return false;
        }
        for (list_name, list) in &mut self.lists {
            if list_name == name {
                for well in wells {
                    list.add(well.clone());
                }
            } else {
                for well in wells {
                    list.del(well);
                }
            }
        }
        true
    }

    /// Removes a well from every list (used when a well is deleted from
    /// the model on restart reconciliation).
    pub fn del_well(&mut self, well: &str) {
        for list in self.lists.values_mut() {
            list.del(well);
        }
    }

    /// List names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.lists.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
