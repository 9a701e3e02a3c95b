//! Diff computation between two plans

use crate::planner::ExecutionPlan;
use crate::resource::Resource;
use crate::types::RemovalPolicy;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// How a single resource differs between two plans
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Change {
    /// Only in the new plan
    Added,
    /// Only in the old plan
    Removed,
    /// In both plans, with differences
    Modified {
        /// Property keys whose values differ (top level only)
        properties: Vec<String>,
        /// Old and new removal policy, if it changed
        removal_policy: Option<(Option<RemovalPolicy>, Option<RemovalPolicy>)>,
        /// Whether the dependency set changed
        dependencies: bool,
        /// Whether the resource type changed
        replaced: bool,
    },
}

/// A diff for one logical resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceDiff {
    /// Logical id of the resource
    pub resource_id: String,
    /// Type of the resource (new type for modifications)
    pub resource_type: String,
    /// Human-readable description
    pub description: String,
    /// What changed
    pub change: Change,
    /// Old properties, if the resource existed before
    pub old: Option<Value>,
    /// New properties, if the resource exists after
    pub new: Option<Value>,
}

impl ResourceDiff {
    /// Compare two versions of the same resource, returning None if identical
    pub fn between(old: &dyn Resource, new: &dyn Resource) -> Option<Self> {
        let old_props = old.properties();
        let new_props = new.properties();

        let properties = changed_keys(&old_props, &new_props);
        let removal_policy = (old.removal_policy() != new.removal_policy())
            .then(|| (old.removal_policy(), new.removal_policy()));
        let dependencies = sorted(old.dependencies()) != sorted(new.dependencies());
        let replaced = old.resource_type() != new.resource_type();

        if properties.is_empty() && removal_policy.is_none() && !dependencies && !replaced {
            return None;
        }

        Some(Self {
            resource_id: new.id(),
            resource_type: new.resource_type().to_string(),
            description: new.description(),
            change: Change::Modified {
                properties,
                removal_policy,
                dependencies,
                replaced,
            },
            old: Some(old_props),
            new: Some(new_props),
        })
    }

    fn added(resource: &dyn Resource) -> Self {
        Self {
            resource_id: resource.id(),
            resource_type: resource.resource_type().to_string(),
            description: resource.description(),
            change: Change::Added,
            old: None,
            new: Some(resource.properties()),
        }
    }

    fn removed(resource: &dyn Resource) -> Self {
        Self {
            resource_id: resource.id(),
            resource_type: resource.resource_type().to_string(),
            description: resource.description(),
            change: Change::Removed,
            old: Some(resource.properties()),
            new: None,
        }
    }

    /// Check if this diff represents an addition
    pub fn is_addition(&self) -> bool {
        matches!(self.change, Change::Added)
    }

    /// Check if this diff represents a removal
    pub fn is_removal(&self) -> bool {
        matches!(self.change, Change::Removed)
    }

    /// Check if applying this diff replaces the resource
    pub fn is_replacement(&self) -> bool {
        matches!(self.change, Change::Modified { replaced: true, .. })
    }
}

fn sorted(mut ids: Vec<String>) -> Vec<String> {
    ids.sort();
    ids
}

/// Top-level keys whose values differ between two property documents
fn changed_keys(old: &Value, new: &Value) -> Vec<String> {
    match (old, new) {
        (Value::Object(a), Value::Object(b)) => {
            let mut keys: Vec<String> = a
                .iter()
                .filter(|(k, v)| b.get(*k) != Some(*v))
                .map(|(k, _)| k.clone())
                .collect();
            keys.extend(b.keys().filter(|k| !a.contains_key(*k)).cloned());
            keys.sort();
            keys
        }
        (a, b) if a == b => Vec::new(),
        _ => vec![String::new()],
    }
}

/// Compute diffs between an old and a new plan
///
/// Results follow the new plan's order, with removals appended in the old
/// plan's order. Resources that are identical in both are omitted.
pub fn compute_diffs(old: &ExecutionPlan, new: &ExecutionPlan) -> Vec<ResourceDiff> {
    let mut diffs = Vec::new();

    for resource in new.resources() {
        match old.get(&resource.id()) {
            None => diffs.push(ResourceDiff::added(resource.as_ref())),
            Some(previous) => {
                if let Some(diff) = ResourceDiff::between(previous, resource.as_ref()) {
                    diffs.push(diff);
                }
            }
        }
    }

    for resource in old.resources() {
        if new.get(&resource.id()).is_none() {
            diffs.push(ResourceDiff::removed(resource.as_ref()));
        }
    }

    diffs
}

/// Diff summary statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffSummary {
    /// Number of resources to add
    pub additions: usize,
    /// Number of resources to remove
    pub removals: usize,
    /// Number of resources to modify
    pub modifications: usize,
    /// Number of modifications that replace the resource
    pub replacements: usize,
}

impl DiffSummary {
    /// Create a summary from a list of diffs
    pub fn from_diffs(diffs: &[ResourceDiff]) -> Self {
        let mut summary = Self::default();
        for diff in diffs {
            if diff.is_addition() {
                summary.additions += 1;
            } else if diff.is_removal() {
                summary.removals += 1;
            } else {
                summary.modifications += 1;
            }
            if diff.is_replacement() {
                summary.replacements += 1;
            }
        }
        summary
    }

    /// Total number of changes
    pub fn total(&self) -> usize {
        self.additions + self.removals + self.modifications
    }

    /// Check if there are any changes
    pub fn has_changes(&self) -> bool {
        self.total() > 0
    }
}

/// Render a property document as sorted, pretty-printed lines
///
/// Used to produce stable text for line-based diff display.
pub fn render_properties(value: &Value) -> String {
    fn sort(value: &Value) -> Value {
        match value {
            Value::Object(map) => {
                let sorted: BTreeMap<&String, Value> =
                    map.iter().map(|(k, v)| (k, sort(v))).collect();
                Value::Object(sorted.into_iter().map(|(k, v)| (k.clone(), v)).collect())
            }
            Value::Array(items) => Value::Array(items.iter().map(sort).collect()),
            other => other.clone(),
        }
    }

    serde_json::to_string_pretty(&sort(value)).unwrap_or_default()
}
