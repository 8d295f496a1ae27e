//! Execution planner - routes each instance to the action that converges it

use crate::config::ConnectionContext;
use crate::diff::AttributeDiff;
use crate::error::{Error, Result};
use crate::schema::Registry;
use crate::types::ResourceState;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One labelled resource instance, desired or recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    /// Caller-chosen name, unique within a plan
    pub label: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    #[serde(flatten)]
    pub state: ResourceState,
}

impl Instance {
    pub fn new(label: impl Into<String>, resource_type: impl Into<String>, state: ResourceState) -> Self {
        Self {
            label: label.into(),
            resource_type: resource_type.into(),
            state,
        }
    }
}

/// What the executor must do for one instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Create {
        desired: ResourceState,
    },
    Update {
        current: ResourceState,
        desired: ResourceState,
        attributes: Vec<String>,
    },
    /// Delete then create, because immutable attributes changed
    Replace {
        current: ResourceState,
        desired: ResourceState,
        attributes: Vec<String>,
    },
    Delete {
        current: ResourceState,
    },
    NoOp {
        current: ResourceState,
    },
}

impl Action {
    /// Short verb for display
    pub fn verb(&self) -> &'static str {
        match self {
            Self::Create { .. } => "create",
            Self::Update { .. } => "update",
            Self::Replace { .. } => "replace",
            Self::Delete { .. } => "delete",
            Self::NoOp { .. } => "no-op",
        }
    }

    /// Identity the action touches, if the instance exists
    pub fn identity(&self) -> Option<&str> {
        match self {
            Self::Create { .. } => None,
            Self::Update { current, .. }
            | Self::Replace { current, .. }
            | Self::Delete { current }
            | Self::NoOp { current } => Some(current.id.as_str()).filter(|id| !id.is_empty()),
        }
    }

    pub fn is_change(&self) -> bool {
        !matches!(self, Self::NoOp { .. })
    }
}

/// Planned action for one labelled instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedChange {
    pub label: String,
    pub resource_type: String,
    pub action: Action,
}

impl PlannedChange {
    /// Human-readable description
    pub fn description(&self) -> String {
        match &self.action {
            Action::Update { attributes, .. } | Action::Replace { attributes, .. } => format!(
                "{} {}.{} ({})",
                self.action.verb(),
                self.resource_type,
                self.label,
                attributes.join(", ")
            ),
            action => format!("{} {}.{}", action.verb(), self.resource_type, self.label),
        }
    }
}

/// An ordered set of planned changes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    pub changes: Vec<PlannedChange>,
}

impl Plan {
    pub fn summary(&self) -> PlanSummary {
        let mut summary = PlanSummary::default();
        for change in &self.changes {
            match change.action {
                Action::Create { .. } => summary.creates += 1,
                Action::Update { .. } => summary.updates += 1,
                Action::Replace { .. } => summary.replaces += 1,
                Action::Delete { .. } => summary.deletes += 1,
                Action::NoOp { .. } => summary.unchanged += 1,
            }
        }
        summary
    }

    /// Check if nothing needs to change
    pub fn is_empty(&self) -> bool {
        self.changes.iter().all(|c| !c.action.is_change())
    }

    /// Keep only changes matching a target of the form `type` or `type.label`
    #[must_use]
    pub fn filter_by_target(self, target: Option<&str>) -> Self {
        let Some(target) = target else {
            return self;
        };
        let (resource_type, label) = parse_target(target);
        Self {
            changes: self
                .changes
                .into_iter()
                .filter(|c| c.resource_type == resource_type && label.is_none_or(|l| c.label == l))
                .collect(),
        }
    }
}

/// Plan summary statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanSummary {
    pub creates: usize,
    pub updates: usize,
    pub replaces: usize,
    pub deletes: usize,
    pub unchanged: usize,
}

impl PlanSummary {
    /// Total number of changes
    pub fn total(&self) -> usize {
        self.creates + self.updates + self.replaces + self.deletes
    }

    pub fn has_changes(&self) -> bool {
        self.total() > 0
    }
}

/// Parse a target string like "type.label" into (type, label)
fn parse_target(target: &str) -> (&str, Option<&str>) {
    match target.split_once('.') {
        Some((resource_type, label)) => (resource_type, Some(label)),
        None => (target, None),
    }
}

/// Decide the action for one instance.
///
/// The desired state is treated as the full configuration: attributes it
/// omits fall back to their defaults, or to `Null` when they have none, so
/// removing an optional attribute from the configuration unsets it.
///
/// # Errors
///
/// Returns `Error::UnknownResourceType`, `Error::NotManaged` or
/// `Error::Validation` if the desired state is invalid.
pub fn plan_instance(
    registry: &Registry,
    context: Option<&ConnectionContext>,
    resource_type: &str,
    current: Option<&ResourceState>,
    desired: Option<&ResourceState>,
) -> Result<Action> {
    let schema = registry.get_managed(resource_type)?;
    let current = current.filter(|c| !c.is_absent());

    let Some(desired) = desired else {
        return Ok(match current {
            Some(current) => Action::Delete {
                current: current.clone(),
            },
            None => Action::NoOp {
                current: ResourceState::new(),
            },
        });
    };

    let mut desired = schema.apply_defaults(&schema.coerce(desired)?, context);
    schema.validate(&desired)?;
    for attr in schema.attributes().iter().filter(|a| !a.is_computed()) {
        desired
            .attributes
            .entry(attr.name.clone())
            .or_default();
    }

    let Some(current) = current else {
        return Ok(Action::Create { desired });
    };

    let diff = AttributeDiff::compute(schema, current, &desired);
    let owned = |names: Vec<&str>| names.into_iter().map(str::to_string).collect::<Vec<_>>();
    Ok(if diff.requires_replacement() {
        Action::Replace {
            current: current.clone(),
            attributes: owned(diff.changed_immutable()),
            desired,
        }
    } else if diff.is_noop() {
        Action::NoOp {
            current: current.clone(),
        }
    } else {
        Action::Update {
            current: current.clone(),
            attributes: owned(diff.changed_mutable()),
            desired,
        }
    })
}

/// Plan every desired instance against the recorded ones.
///
/// Desired instances come first in their given order; recorded instances no
/// longer desired follow as deletions. A label whose type changed plans a
/// deletion of the old instance and a creation of the new one.
///
/// # Errors
///
/// Returns `Error::Validation` for duplicate labels, or the first error of
/// [`plan_instance`].
pub fn plan(
    registry: &Registry,
    context: Option<&ConnectionContext>,
    desired: &[Instance],
    current: &[Instance],
) -> Result<Plan> {
    let mut seen = BTreeSet::new();
    for instance in desired {
        if !seen.insert(instance.label.as_str()) {
            return Err(Error::validation(
                &instance.resource_type,
                "label",
                format!("label {} is used twice", instance.label),
            ));
        }
    }

    let mut changes = Vec::new();
    for instance in desired {
        let recorded = current.iter().find(|c| c.label == instance.label);
        let same_type = recorded.filter(|c| c.resource_type == instance.resource_type);
        if let Some(stale) = recorded.filter(|c| c.resource_type != instance.resource_type) {
            changes.push(PlannedChange {
                label: stale.label.clone(),
                resource_type: stale.resource_type.clone(),
                action: plan_instance(registry, context, &stale.resource_type, Some(&stale.state), None)?,
            });
        }
        changes.push(PlannedChange {
            label: instance.label.clone(),
            resource_type: instance.resource_type.clone(),
            action: plan_instance(
                registry,
                context,
                &instance.resource_type,
                same_type.map(|c| &c.state),
                Some(&instance.state),
            )?,
        });
    }

    for recorded in current.iter().filter(|c| !seen.contains(c.label.as_str())) {
        changes.push(PlannedChange {
            label: recorded.label.clone(),
            resource_type: recorded.resource_type.clone(),
            action: plan_instance(registry, context, &recorded.resource_type, Some(&recorded.state), None)?,
        });
    }

    Ok(Plan { changes })
}
