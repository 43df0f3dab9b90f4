//! Well/group name-pattern resolution.
//!
//! Keywords address wells by well list (`*NAME`), exact name, shell
//! glob (`*`, `?`), or the literal token `?` meaning "the wells matched
//! by the enclosing ACTIONX condition". The pattern text alone decides
//! which form applies; the forms are disjoint, so no lookup order is
//! involved:
//!
//! - `*NAME` - well-list expansion via the WListManager.
//! - exact name - known at-or-before the queried step.
//! - glob pattern - case-sensitive shell match against known names.
//! - `?` literal - the ACTIONX match set (empty outside ACTIONX).
//!
//! Globs are compiled to anchored regexes; everything but `*`/`?` is
//! escaped.

use regex::Regex;

use crate::wlist::WListManager;

/// Compiles a shell glob to an anchored regex.
///
/// Returns `None` for patterns that somehow fail to compile; with all
/// metacharacters escaped this does not happen for deck-legal names.
#[must_use]
pub fn glob_regex(pattern: &str) -> Option<Regex> {
    let mut expr = String::with_capacity(pattern.len() + 8);
    expr.push('^');
    for ch in pattern.chars() {
        match ch {
            '*' => expr.push_str(".*"),
            '?' => expr.push('.'),
            _ => expr.push_str(&regex::escape(&ch.to_string())),
        }
    }
    expr.push('$');
    Regex::new(&expr).ok()
}

/// True if `pattern` contains a glob metacharacter.
#[must_use]
pub fn has_glob_chars(pattern: &str) -> bool {
    pattern.contains('*') || pattern.contains('?')
}

/// Name resolution over the names known at one report step.
///
/// The name order is the deck insertion order; every resolution result
/// preserves it.
#[derive(Debug, Clone)]
pub struct NameMatcher<'a> {
    names: &'a [String],
    wlists: Option<&'a WListManager>,
    action_wells: &'a [String],
}

/// Outcome of a pattern resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchResult {
    /// Resolved names, in insertion order.
    Matched(Vec<String>),
    /// The pattern (or exact name) matched nothing known.
    Empty,
    /// The pattern referenced an undefined well list.
    UndefinedList(String),
}

impl MatchResult {
    /// The matched names, empty for the failure variants.
    #[must_use]
    pub fn names(self) -> Vec<String> {
        match self {
            Self::Matched(names) => names,
            Self::Empty | Self::UndefinedList(_) => Vec::new(),
        }
    }
}

impl<'a> NameMatcher<'a> {
    /// Matcher over `names`, without well-list or ACTIONX context.
    #[must_use]
    pub fn new(names: &'a [String]) -> Self {
        Self {
            names,
            wlists: None,
            action_wells: &[],
        }
    }

    /// Adds the well-list manager of the current step.
    #[must_use]
    pub fn with_wlists(mut self, wlists: &'a WListManager) -> Self {
        self.wlists = Some(wlists);
        self
    }

    /// Adds the ACTIONX match set for `?` resolution.
    #[must_use]
    pub fn with_action_wells(mut self, wells: &'a [String]) -> Self {
        self.action_wells = wells;
        self
    }

    /// Resolves a pattern per the precedence above.
    #[must_use]
    pub fn resolve(&self, pattern: &str) -> MatchResult {
        if pattern == "?" {
            // Outside ACTIONX the match set is empty; that is a valid
            // (empty) result, not an error.
            return MatchResult::Matched(self.action_wells.to_vec());
        }

        if let (Some(list_name), Some(wlists)) = (pattern.strip_prefix('*'), self.wlists) {
            if !list_name.is_empty() && !has_glob_chars(list_name) {
                return match wlists.get(pattern) {
                    Some(list) => {
                        // Keep insertion order of the known-name list,
                        // not of the well list.
                        let matched: Vec<String> = self
                            .names
                            .iter()
                            .filter(|name| list.contains(name))
                            .cloned()
                            .collect();
                        MatchResult::Matched(matched)
                    }
                    None => MatchResult::UndefinedList(pattern.to_string()),
                };
            }
        }

        if has_glob_chars(pattern) {
            let Some(re) = glob_regex(pattern) else {
                return MatchResult::Empty;
            };
            let matched: Vec<String> = self
                .names
                .iter()
                .filter(|name| re.is_match(name))
                .cloned()
                .collect();
            return if matched.is_empty() {
                MatchResult::Empty
            } else {
                MatchResult::Matched(matched)
            };
        }

        if self.names.iter().any(|name| name == pattern) {
            MatchResult::Matched(vec![pattern.to_string()])
        } else {
            MatchResult::Empty
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn glob_translation() {
        let re = glob_regex("W*").unwrap();
        assert!(re.is_match("W1"));
        assert!(re.is_match("WX1"));
        assert!(!re.is_match("OP1"));

        let re = glob_regex("OP-?").unwrap();
        assert!(re.is_match("OP-1"));
        assert!(!re.is_match("OP-12"));

        // Regex metacharacters in names are literal.
        let re = glob_regex("A.B*").unwrap();
        assert!(re.is_match("A.B1"));
        assert!(!re.is_match("AxB1"));
    }

    #[test]
    fn exact_name_requires_known_well() {
        let known = names(&["W1", "W2", "WX1"]);
        let matcher = NameMatcher::new(&known);
        assert_eq!(matcher.resolve("W1"), MatchResult::Matched(names(&["W1"])));
        assert_eq!(matcher.resolve("W9"), MatchResult::Empty);
    }

    #[test]
    fn glob_matches_in_insertion_order() {
        let known = names(&["W1", "OP1", "W2", "WX1"]);
        let matcher = NameMatcher::new(&known);
        assert_eq!(
            matcher.resolve("W*"),
            MatchResult::Matched(names(&["W1", "W2", "WX1"]))
        );
        assert_eq!(matcher.resolve("Q*"), MatchResult::Empty);
    }

    #[test]
    fn well_list_expansion() {
        let known = names(&["W1", "W2", "WX1"]);
        let mut wlm = WListManager::new();
        wlm.new_list("*GRP1", &names(&["W2", "W1"]));

        let matcher = NameMatcher::new(&known).with_wlists(&wlm);
        // Insertion order of the known names wins, not list order.
        assert_eq!(
            matcher.resolve("*GRP1"),
            MatchResult::Matched(names(&["W1", "W2"]))
        );
        assert_eq!(
            matcher.resolve("*NOPE"),
            MatchResult::UndefinedList("*NOPE".to_string())
        );
    }

    #[test]
    fn bare_star_matches_everything() {
        let known = names(&["W1", "OP1"]);
        let matcher = NameMatcher::new(&known);
        assert_eq!(matcher.resolve("*"), MatchResult::Matched(names(&["W1", "OP1"])));
    }

    #[test]
    fn question_mark_token_uses_action_set() {
        let known = names(&["W1", "W2", "W3"]);
        let action = names(&["W1", "W3"]);
        let matcher = NameMatcher::new(&known).with_action_wells(&action);
        assert_eq!(matcher.resolve("?"), MatchResult::Matched(names(&["W1", "W3"])));

        // Outside ACTIONX context the set is empty, not an error.
        let matcher = NameMatcher::new(&known);
        assert_eq!(matcher.resolve("?"), MatchResult::Matched(Vec::new()));
    }

    #[test]
    fn leading_star_without_manager_globs() {
        let known = names(&["W1", "W2"]);
        let matcher = NameMatcher::new(&known);
        // Without a well-list manager "*1" has no list semantics.
        assert_eq!(matcher.resolve("*1"), MatchResult::Matched(names(&["W1"])));
    }

    #[test]
    fn leading_star_with_manager_is_a_list_reference() {
        let known = names(&["W1", "W2"]);
        let wlm = WListManager::new();
        let matcher = NameMatcher::new(&known).with_wlists(&wlm);
        assert_eq!(
            matcher.resolve("*1"),
            MatchResult::UndefinedList("*1".to_string())
        );
    }
}
