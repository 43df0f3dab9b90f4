//! The ACTIONX condition engine.
//!
//! An [`ActionX`] couples a parsed boolean condition with a captured
//! block of keywords replayed when the condition holds. Trigger counts
//! and times live in a separate [`ActionState`] so the versioned
//! [`Actions`] collection stays a plain value.

pub mod ast;
pub mod value;

use std::collections::HashMap;

pub use ast::{ActionContext, ActionExpr, ActionOperand};
pub use value::{ActionResult, ActionValue, Comparator};

use crate::deck::DeckKeyword;

/// Keywords allowed inside an ACTIONX block. Anything else is rejected
/// at parse time with an illegal-keyword diagnostic.
pub const ALLOWED_KEYWORDS: &[&str] = &[
    "WELOPEN", "WELPI", "WCONPROD", "WCONINJE", "WELTARG", "GCONPROD", "GCONINJE", "UDQ", "EXIT",
    "WLIST",
];

/// True if a keyword may appear inside an ACTIONX block.
#[must_use]
pub fn is_allowed_keyword(name: &str) -> bool {
    ALLOWED_KEYWORDS.contains(&name)
}

/// One named conditional action.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionX {
    /// Action name.
    pub name: String,
    /// Maximum number of triggers; 0 means unlimited.
    pub max_run: usize,
    /// Minimum simulated seconds between triggers.
    pub min_wait: f64,
    /// Parsed condition.
    pub condition: ActionExpr,
    /// Condition source text, kept for diagnostics and diffing.
    pub condition_source: String,
    /// Keywords captured between ACTIONX and ENDACTIO, replayed on
    /// trigger.
    pub keywords: Vec<DeckKeyword>,
}

impl ActionX {
    /// Creates an action.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        max_run: usize,
        min_wait: f64,
        condition: ActionExpr,
        condition_source: impl Into<String>,
        keywords: Vec<DeckKeyword>,
    ) -> Self {
        Self {
            name: name.into(),
            max_run,
            min_wait,
            condition,
            condition_source: condition_source.into(),
            keywords,
        }
    }

    /// True while the action may still be evaluated: not exhausted and
    /// past the minimum wait since the previous trigger.
    #[must_use]
    pub fn ready(&self, state: &ActionState, elapsed: f64) -> bool {
        let runs = state.run_count(&self.name);
        if self.max_run > 0 && runs >= self.max_run {
            return false;
        }
        match state.last_run(&self.name) {
            Some(last) => elapsed - last >= self.min_wait,
            None => true,
        }
    }

    /// Evaluates the condition.
    #[must_use]
    pub fn eval(&self, ctx: &ActionContext<'_>) -> ActionResult {
        self.condition.eval(ctx)
    }
}

/// A named external script action. Without a script runtime these are
/// registered but never executed.
#[derive(Debug, Clone, PartialEq)]
pub struct PyAction {
    /// Action name.
    pub name: String,
    /// Script file path from the deck.
    pub filename: String,
}

/// Trigger bookkeeping, separate from the versioned definitions.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ActionState {
    runs: HashMap<String, (usize, f64)>,
}

impl ActionState {
    /// Empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of times an action has triggered.
    #[must_use]
    pub fn run_count(&self, action: &str) -> usize {
        self.runs.get(action).map_or(0, |(count, _)| *count)
    }

    /// Elapsed time of the most recent trigger.
    #[must_use]
    pub fn last_run(&self, action: &str) -> Option<f64> {
        self.runs.get(action).map(|(_, elapsed)| *elapsed)
    }

    /// Records a trigger at the given elapsed time.
    pub fn register_run(&mut self, action: &str, elapsed: f64) {
        let entry = self.runs.entry(action.to_string()).or_insert((0, elapsed));
        entry.0 += 1;
        entry.1 = elapsed;
    }
}

/// The versioned collection of active action definitions.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Actions {
    actions: Vec<ActionX>,
    pyactions: Vec<PyAction>,
}

impl Actions {
    /// Empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an action, replacing any existing one with the same name.
    pub fn add(&mut self, action: ActionX) {
        if let Some(existing) = self.actions.iter_mut().find(|a| a.name == action.name) {
            *existing = action;
        } else {
            self.actions.push(action);
        }
    }

    /// Registers a script action, replacing by name.
    pub fn add_pyaction(&mut self, action: PyAction) {
        if let Some(existing) = self.pyactions.iter_mut().find(|a| a.name == action.name) {
            *existing = action;
        } else {
            self.pyactions.push(action);
        }
    }

    /// Action by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ActionX> {
        self.actions.iter().find(|a| a.name == name)
    }

    /// Actions in definition order.
    pub fn iter(&self) -> std::slice::Iter<'_, ActionX> {
        self.actions.iter()
    }

    /// Registered script actions.
    #[must_use]
    pub fn pyactions(&self) -> &[PyAction] {
        &self.pyactions
    }

    /// Number of ACTIONX definitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// True with no definitions of either kind.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty() && self.pyactions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action(name: &str, max_run: usize, min_wait: f64) -> ActionX {
        let condition = ActionExpr::parse(name, "FOPR > 100").unwrap();
        ActionX::new(name, max_run, min_wait, condition, "FOPR > 100", Vec::new())
    }

    #[test]
    fn allow_list() {
        assert!(is_allowed_keyword("WELOPEN"));
        assert!(is_allowed_keyword("EXIT"));
        assert!(!is_allowed_keyword("WELSPECS"));
        assert!(!is_allowed_keyword("DATES"));
    }

    #[test]
    fn exhaustion_by_run_count() {
        let act = action("ACT1", 2, 0.0);
        let mut state = ActionState::new();
        assert!(act.ready(&state, 0.0));
        state.register_run("ACT1", 100.0);
        assert!(act.ready(&state, 200.0));
        state.register_run("ACT1", 200.0);
        assert!(!act.ready(&state, 300.0));
    }

    #[test]
    fn unlimited_actions_never_exhaust() {
        let act = action("ACT1", 0, 0.0);
        let mut state = ActionState::new();
        for i in 0..10 {
            assert!(act.ready(&state, f64::from(i)));
            state.register_run("ACT1", f64::from(i));
        }
    }

    #[test]
    fn min_wait_gates_retriggering() {
        let act = action("ACT1", 0, 86_400.0);
        let mut state = ActionState::new();
        state.register_run("ACT1", 0.0);
        assert!(!act.ready(&state, 43_200.0));
        assert!(act.ready(&state, 86_400.0));
    }

    #[test]
    fn redefinition_replaces_by_name() {
        let mut actions = Actions::new();
        actions.add(action("ACT1", 1, 0.0));
        actions.add(action("ACT2", 1, 0.0));
        actions.add(action("ACT1", 5, 0.0));
        assert_eq!(actions.len(), 2);
        assert_eq!(actions.get("ACT1").map(|a| a.max_run), Some(5));
    }
}
