//! Execution planner - builds ordered, dependency-checked resource plans

use crate::resource::{BoxedResource, Resource, ResourceExt};
use std::collections::HashSet;
use thiserror::Error;

/// Errors raised while building a plan
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    /// Two resources share a logical id
    #[error("duplicate resource id '{0}'")]
    DuplicateId(String),

    /// A resource references something not declared before it
    #[error("resource '{resource}' depends on '{dependency}', which has not been declared")]
    UnknownDependency { resource: String, dependency: String },
}

/// An ordered plan of declared resources
///
/// Resources are kept in declaration order. A resource may only depend on
/// resources added before it, so the order is always a valid topological
/// order of the graph.
pub struct ExecutionPlan {
    resources: Vec<BoxedResource>,
    ids: HashSet<String>,
}

impl ExecutionPlan {
    /// Create a new empty plan
    pub fn new() -> Self {
        Self {
            resources: Vec::new(),
            ids: HashSet::new(),
        }
    }

    /// Add a resource to the end of the plan
    ///
    /// Fails if the id is already taken or if any dependency has not been
    /// added yet.
    pub fn add_resource(&mut self, resource: BoxedResource) -> Result<(), PlanError> {
        let id = resource.id();
        if self.ids.contains(&id) {
            return Err(PlanError::DuplicateId(id));
        }

        if let Some(missing) = resource
            .dependencies()
            .into_iter()
            .find(|dep| !self.ids.contains(dep))
        {
            return Err(PlanError::UnknownDependency {
                resource: id,
                dependency: missing,
            });
        }

        log::trace!("plan: + {} ({})", id, resource.resource_type());
        self.ids.insert(id);
        self.resources.push(resource);
        Ok(())
    }

    /// Resources in declaration order
    pub fn resources(&self) -> &[BoxedResource] {
        &self.resources
    }

    /// Logical ids in declaration order
    pub fn ids(&self) -> Vec<String> {
        self.resources.iter().map(|r| r.id()).collect()
    }

    /// Look up a resource by logical id
    pub fn get(&self, id: &str) -> Option<&dyn Resource> {
        self.resources
            .iter()
            .find(|r| r.id() == id)
            .map(|r| r.as_ref())
    }

    /// Position of a resource in the plan
    pub fn position(&self, id: &str) -> Option<usize> {
        self.resources.iter().position(|r| r.id() == id)
    }

    /// Resources of a given type (see [`ResourceExt::matches_type`])
    pub fn of_type<'a>(&'a self, filter: &'a str) -> impl Iterator<Item = &'a dyn Resource> + 'a {
        self.resources
            .iter()
            .map(|r| r.as_ref())
            .filter(move |r| r.matches_type(filter))
    }

    /// Filter plan to only include resources matching a predicate
    ///
    /// Dependency edges pointing at dropped resources are kept as-is on the
    /// surviving resources; the filtered plan is for display, not for
    /// execution.
    pub fn filter<F>(self, predicate: F) -> Self
    where
        F: Fn(&dyn Resource) -> bool,
    {
        let resources: Vec<BoxedResource> = self
            .resources
            .into_iter()
            .filter(|r| predicate(r.as_ref()))
            .collect();
        let ids = resources.iter().map(|r| r.id()).collect();
        Self { resources, ids }
    }

    /// Filter plan to only include resources matching a target pattern
    ///
    /// Target format: "type" or "type.name"
    pub fn filter_by_target(self, target: Option<&str>) -> Self {
        match target {
            None => self,
            Some(t) => {
                let (resource_type, name) = parse_target(t);
                self.filter(|r| matches_filter(r, resource_type.as_deref(), name.as_deref()))
            }
        }
    }

    /// Total number of resources in the plan
    pub fn total_resources(&self) -> usize {
        self.resources.len()
    }

    /// Check if plan is empty
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

impl Default for ExecutionPlan {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ExecutionPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionPlan")
            .field("resources", &self.ids())
            .finish()
    }
}

/// Parse a target string like "type.name" into (type, name)
fn parse_target(target: &str) -> (Option<String>, Option<String>) {
    let parts: Vec<&str> = target.split('.').collect();
    match parts.len() {
        1 => (Some(parts[0].to_string()), None),
        2 => (Some(parts[0].to_string()), Some(parts[1].to_string())),
        _ => (None, Some(target.to_string())),
    }
}

/// Check if a resource matches the filter criteria
fn matches_filter(
    resource: &dyn Resource,
    resource_type: Option<&str>,
    name: Option<&str>,
) -> bool {
    if let Some(rt) = resource_type {
        // Allow common aliases
        let matches_type = match rt {
            "db" | "database" => resource.matches_type("DBInstance"),
            "secrets" => resource.matches_type("Secret"),
            "compute" => resource.resource_type().starts_with("AWS::ECS::"),
            "logs" => resource.matches_type("LogGroup"),
            "network" | "ingress" => resource.matches_type("SecurityGroupIngress"),
            "tls" | "cert" => resource.matches_type("Certificate"),
            _ => resource.matches_type(rt),
        };
        if !matches_type {
            return false;
        }
    }

    if let Some(n) = name
        && !resource.id().to_ascii_lowercase().contains(&n.to_ascii_lowercase())
    {
        return false;
    }

    true
}
