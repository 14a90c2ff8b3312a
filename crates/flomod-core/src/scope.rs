//! Scenario/event scope values.
//!
//! Control files gate content behind `If Scenario == ...` and
//! `Define Event == ...` blocks. A [`Scope`] is the set of scenario and
//! event names active for a particular query; logic blocks are evaluated
//! against it to decide which parts are visible.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Which axis of the scope a condition tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScopeKey {
    Scenario,
    Event,
}

impl std::fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScopeKey::Scenario => write!(f, "Scenario"),
            ScopeKey::Event => write!(f, "Event"),
        }
    }
}

/// The scenario and event values currently in force.
///
/// An empty scope places no restriction at all: every conditional block
/// matches it. Comparison is case-insensitive, matching the behaviour of
/// the file format (values are stored lowercased).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    scenarios: BTreeSet<String>,
    events: BTreeSet<String>,
}

impl Scope {
    /// An empty scope (matches everything).
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a scope from scenario and event name lists.
    pub fn from_values<S: AsRef<str>>(scenarios: &[S], events: &[S]) -> Self {
        Self {
            scenarios: scenarios
                .iter()
                .map(|s| s.as_ref().to_lowercase())
                .collect(),
            events: events.iter().map(|s| s.as_ref().to_lowercase()).collect(),
        }
    }

    /// Add a scenario name.
    pub fn add_scenario(&mut self, name: impl AsRef<str>) {
        self.scenarios.insert(name.as_ref().to_lowercase());
    }

    /// Add an event name.
    pub fn add_event(&mut self, name: impl AsRef<str>) {
        self.events.insert(name.as_ref().to_lowercase());
    }

    /// True when no scenario or event values are set.
    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty() && self.events.is_empty()
    }

    /// Case-insensitive membership test on one axis.
    pub fn contains(&self, key: ScopeKey, value: &str) -> bool {
        let value = value.to_lowercase();
        match key {
            ScopeKey::Scenario => self.scenarios.contains(&value),
            ScopeKey::Event => self.events.contains(&value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_scope_contains_nothing() {
        let scope = Scope::new();
        assert!(scope.is_empty());
        assert!(!scope.contains(ScopeKey::Scenario, "dev"));
    }

    #[test]
    fn contains_is_case_insensitive() {
        let scope = Scope::from_values(&["DEV"], &["Q100"]);
        assert!(scope.contains(ScopeKey::Scenario, "dev"));
        assert!(scope.contains(ScopeKey::Scenario, "Dev"));
        assert!(scope.contains(ScopeKey::Event, "q100"));
        assert!(!scope.contains(ScopeKey::Event, "q200"));
    }

    #[test]
    fn axes_are_independent() {
        let scope = Scope::from_values::<&str>(&["dev"], &[]);
        assert!(scope.contains(ScopeKey::Scenario, "dev"));
        assert!(!scope.contains(ScopeKey::Event, "dev"));
    }
}
