//! Core types for declarative resource graphs

use serde::{Deserialize, Serialize};
use std::fmt;

/// What happens to a resource when the graph that declared it is torn down
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemovalPolicy {
    /// Delete the resource and its data
    Destroy,
    /// Keep the resource, orphaned from the graph
    Retain,
    /// Take a final snapshot, then delete
    Snapshot,
}

impl RemovalPolicy {
    /// Name used for the policy in rendered templates
    pub fn deletion_policy(&self) -> &'static str {
        match self {
            Self::Destroy => "Delete",
            Self::Retain => "Retain",
            Self::Snapshot => "Snapshot",
        }
    }

    /// Parse a rendered deletion policy back into a removal policy
    pub fn from_deletion_policy(value: &str) -> Option<Self> {
        match value {
            "Delete" => Some(Self::Destroy),
            "Retain" => Some(Self::Retain),
            "Snapshot" => Some(Self::Snapshot),
            _ => None,
        }
    }

    /// Whether tearing down the resource loses its data
    pub fn is_destructive(&self) -> bool {
        matches!(self, Self::Destroy)
    }
}

impl fmt::Display for RemovalPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Destroy => write!(f, "destroy"),
            Self::Retain => write!(f, "retain"),
            Self::Snapshot => write!(f, "snapshot"),
        }
    }
}

/// Result of handing a resource to an engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplyResult {
    /// Resource was accepted by the engine
    Created,
    /// Apply failed
    Failed { error: String },
}

impl ApplyResult {
    /// Check if the result represents success (no failure)
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }
}

/// Summary of execution results
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteSummary {
    pub created: usize,
    pub failed: usize,
    /// Resources never submitted because an earlier one failed
    pub skipped: usize,
}

impl ExecuteSummary {
    /// Check if execution was fully successful (no failures)
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Total number of resources accounted for
    pub fn total(&self) -> usize {
        self.created + self.failed + self.skipped
    }

    /// Add a result to the summary
    pub fn add_result(&mut self, result: &ApplyResult) {
        match result {
            ApplyResult::Created => self.created += 1,
            ApplyResult::Failed { .. } => self.failed += 1,
        }
    }
}
