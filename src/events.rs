//! Schedule events.
//!
//! Keyword handlers emit typed events into a global per-step log and a
//! per-well/group log. Consumers (the simulator driver, reporting code)
//! poll these to learn what changed in a report step.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One kind of schedule change. Values are bit positions.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ScheduleEvent {
    NewWell = 0,
    NewGroup = 1,
    WellStatusChange = 2,
    ProductionUpdate = 3,
    InjectionUpdate = 4,
    WellSwitchedInjectorProducer = 5,
    InjectionTypeChanged = 6,
    CompletionChange = 7,
    GroupChange = 8,
    GroupProductionUpdate = 9,
    GroupInjectionUpdate = 10,
    GeoModifier = 11,
    TuningChange = 12,
    ActionxTriggered = 13,
    RequestOpenWell = 14,
    WellWelspecsUpdate = 15,
}

impl ScheduleEvent {
    const fn bit(self) -> u64 {
        1u64 << (self as u8)
    }
}

/// A set of [`ScheduleEvent`]s, stored as a bit mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Events(u64);

impl Events {
    /// Empty set.
    #[must_use]
    pub const fn new() -> Self {
        Self(0)
    }

    /// Adds an event.
    pub fn add(&mut self, event: ScheduleEvent) {
        self.0 |= event.bit();
    }

    /// True if the event was recorded.
    #[must_use]
    pub const fn has(&self, event: ScheduleEvent) -> bool {
        self.0 & event.bit() != 0
    }

    /// True if nothing was recorded.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Clears the set.
    pub fn reset(&mut self) {
        self.0 = 0;
    }
}

/// Per-well/group event log for one report step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WellGroupEvents {
    events: HashMap<String, Events>,
}

impl WellGroupEvents {
    /// Empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an event against a well or group name.
    pub fn add(&mut self, name: impl Into<String>, event: ScheduleEvent) {
        self.events.entry(name.into()).or_default().add(event);
    }

    /// True if `name` saw `event` this step.
    #[must_use]
    pub fn has(&self, name: &str, event: ScheduleEvent) -> bool {
        self.events.get(name).is_some_and(|e| e.has(event))
    }

    /// The full event set for `name`.
    #[must_use]
    pub fn events(&self, name: &str) -> Events {
        self.events.get(name).copied().unwrap_or_default()
    }

    /// Names with at least one event this step.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.events.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_set_semantics() {
        let mut events = Events::new();
        assert!(events.is_empty());
        events.add(ScheduleEvent::ProductionUpdate);
        events.add(ScheduleEvent::WellStatusChange);

        assert!(events.has(ScheduleEvent::ProductionUpdate));
        assert!(events.has(ScheduleEvent::WellStatusChange));
        assert!(!events.has(ScheduleEvent::CompletionChange));

        events.reset();
        assert!(events.is_empty());
    }

    #[test]
    fn adding_twice_is_idempotent() {
        let mut events = Events::new();
        events.add(ScheduleEvent::NewWell);
        events.add(ScheduleEvent::NewWell);
        assert!(events.has(ScheduleEvent::NewWell));
    }

    #[test]
    fn per_well_log() {
        let mut log = WellGroupEvents::new();
        log.add("OP-1", ScheduleEvent::NewWell);
        log.add("OP-1", ScheduleEvent::ProductionUpdate);
        log.add("GRP-A", ScheduleEvent::NewGroup);

        assert!(log.has("OP-1", ScheduleEvent::ProductionUpdate));
        assert!(!log.has("OP-1", ScheduleEvent::NewGroup));
        assert!(!log.has("NOSUCH", ScheduleEvent::NewWell));
        assert_eq!(log.names(), vec!["GRP-A", "OP-1"]);
    }
}
