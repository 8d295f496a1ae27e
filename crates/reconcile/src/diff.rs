//! Attribute-level diff between current and desired state

use crate::schema::{Mutability, ResourceSchema};
use crate::types::{ResourceState, Value};
use serde::{Deserialize, Serialize};

/// How one attribute differs between current and desired state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Change {
    Unchanged,
    /// Can be applied in place
    ChangedMutable,
    /// Forces replacement
    ChangedImmutable,
}

/// Per-attribute changes in schema order.
///
/// Computed attributes never appear. An attribute absent from the desired
/// state is not managed by the call and counts as unchanged; an explicit
/// `Null` is a change to "unset".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeDiff {
    entries: Vec<(String, Change)>,
}

impl AttributeDiff {
    /// Compare `desired` against `current` using `schema` mutability
    pub fn compute(schema: &ResourceSchema, current: &ResourceState, desired: &ResourceState) -> Self {
        let entries = schema
            .attributes()
            .iter()
            .filter(|a| !a.is_computed())
            .map(|attr| {
                let change = match desired.get(&attr.name) {
                    None => Change::Unchanged,
                    Some(wanted) => {
                        let have = current.get(&attr.name).unwrap_or(&Value::Null);
                        if wanted == have {
                            Change::Unchanged
                        } else if attr.mutability == Mutability::Immutable {
                            Change::ChangedImmutable
                        } else {
                            Change::ChangedMutable
                        }
                    }
                };
                (attr.name.clone(), change)
            })
            .collect();
        Self { entries }
    }

    /// Change for one attribute, `None` for computed or undeclared names
    pub fn get(&self, name: &str) -> Option<Change> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, c)| *c)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Change)> {
        self.entries.iter().map(|(n, c)| (n.as_str(), *c))
    }

    fn names(&self, change: Change) -> Vec<&str> {
        self.iter()
            .filter(|(_, c)| *c == change)
            .map(|(n, _)| n)
            .collect()
    }

    /// Attributes that can be updated in place, in schema order
    pub fn changed_mutable(&self) -> Vec<&str> {
        self.names(Change::ChangedMutable)
    }

    /// Attributes that force replacement, in schema order
    pub fn changed_immutable(&self) -> Vec<&str> {
        self.names(Change::ChangedImmutable)
    }

    pub fn requires_replacement(&self) -> bool {
        self.entries.iter().any(|(_, c)| *c == Change::ChangedImmutable)
    }

    /// Check if nothing changed
    pub fn is_noop(&self) -> bool {
        self.entries.iter().all(|(_, c)| *c == Change::Unchanged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Attribute;

    fn schema() -> ResourceSchema {
        ResourceSchema::managed(
            "test_warehouse",
            "/test/warehouse",
            vec![
                Attribute::string("name").required().immutable(),
                Attribute::string("size"),
                Attribute::string("comment"),
                Attribute::int("auto_suspend"),
                Attribute::string("state").computed(),
            ],
        )
        .unwrap()
    }

    fn current() -> ResourceState {
        ResourceState::with_id("w-1")
            .with("name", "wh1")
            .with("size", "SMALL")
            .with("comment", "c")
            .with("auto_suspend", 300)
            .with("state", "STARTED")
    }

    #[test]
    fn test_identical_is_noop() {
        let diff = AttributeDiff::compute(&schema(), &current(), &current());
        assert!(diff.is_noop());
        assert!(!diff.requires_replacement());
        assert_eq!(diff.get("state"), None);
    }

    #[test]
    fn test_absent_desired_is_unchanged() {
        let desired = ResourceState::new().with("size", "MEDIUM");
        let diff = AttributeDiff::compute(&schema(), &current(), &desired);
        assert_eq!(diff.changed_mutable(), vec!["size"]);
        assert_eq!(diff.get("comment"), Some(Change::Unchanged));
        assert_eq!(diff.get("name"), Some(Change::Unchanged));
    }

    #[test]
    fn test_null_is_a_change() {
        let desired = ResourceState::new().with("comment", Value::Null);
        let diff = AttributeDiff::compute(&schema(), &current(), &desired);
        assert_eq!(diff.get("comment"), Some(Change::ChangedMutable));
    }

    #[test]
    fn test_immutable_change() {
        let desired = ResourceState::new().with("name", "wh2").with("size", "LARGE");
        let diff = AttributeDiff::compute(&schema(), &current(), &desired);
        assert!(diff.requires_replacement());
        assert_eq!(diff.changed_immutable(), vec!["name"]);
        assert_eq!(diff.changed_mutable(), vec!["size"]);
        assert!(!diff.is_noop());
    }

    #[test]
    fn test_computed_ignored() {
        let desired = current().with("state", "SUSPENDED");
        let diff = AttributeDiff::compute(&schema(), &current(), &desired);
        assert!(diff.is_noop());
    }
}
