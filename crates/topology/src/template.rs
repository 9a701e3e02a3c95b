//! Template synthesis and loading.
//!
//! [`TemplateEngine`] is the [`Engine`] the composed plan is handed to: it
//! renders every resource into one JSON document for the external
//! provisioning engine. [`load_plan`] reads such a document back into an
//! [`ExecutionPlan`] so two syntheses can be diffed.
//!
//! Rendering is deterministic: object keys are sorted and the resource
//! order is recorded in `Metadata.ResourceOrder`.

use crate::error::{Error, Result};
use declarative::{
    ApplyContext, ApplyResult, Engine, ExecutionPlan, NoProgress, ProgressCallback,
    RemovalPolicy, Resource, execute,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::path::Path;

/// Resource types a template may contain.
const KNOWN_TYPES: &[&str] = &[
    "AWS::SecretsManager::Secret",
    "AWS::RDS::DBInstance",
    "AWS::ECS::Cluster",
    "AWS::Logs::LogGroup",
    "AWS::ECS::TaskDefinition",
    "AWS::CertificateManager::Certificate",
    "AWS::ECS::Service",
    "AWS::EC2::SecurityGroupIngress",
];

/// Stack-level values rendered into `Metadata`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateMetadata {
    pub stack_name: String,
    pub description: Option<String>,
    pub account: String,
    pub region: String,
    pub mode: String,
}

/// Engine that renders submitted resources into a template.
#[derive(Debug, Default)]
pub struct TemplateEngine {
    resources: Map<String, Value>,
    order: Vec<String>,
}

impl TemplateEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of resources rendered so far.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Assemble the final document.
    pub fn finish(self, metadata: &TemplateMetadata) -> Value {
        let mut doc = json!({
            "Metadata": {
                "StackName": metadata.stack_name,
                "Account": metadata.account,
                "Region": metadata.region,
                "Mode": metadata.mode,
                "ResourceOrder": self.order,
            },
            "Resources": Value::Object(self.resources),
        });
        if let (Some(description), Some(obj)) = (&metadata.description, doc.as_object_mut()) {
            obj.insert("Description".to_string(), json!(description));
        }
        doc
    }
}

impl Engine for TemplateEngine {
    fn submit(
        &mut self,
        resource: &dyn Resource,
        ctx: &ApplyContext,
    ) -> anyhow::Result<ApplyResult> {
        let id = resource.id();
        if self.resources.contains_key(&id) {
            anyhow::bail!("resource {id} rendered twice");
        }
        if ctx.position != self.order.len() {
            anyhow::bail!(
                "resource {id} submitted at position {} after {} rendered",
                ctx.position,
                self.order.len()
            );
        }

        let mut entry = Map::new();
        entry.insert("Type".to_string(), json!(resource.resource_type()));
        entry.insert("Properties".to_string(), resource.properties());
        let deps = resource.dependencies();
        if !deps.is_empty() {
            entry.insert("DependsOn".to_string(), json!(deps));
        }
        if let Some(policy) = resource.removal_policy() {
            entry.insert(
                "DeletionPolicy".to_string(),
                json!(policy.deletion_policy()),
            );
        }

        self.resources.insert(id.clone(), Value::Object(entry));
        self.order.push(id);
        Ok(ApplyResult::Created)
    }
}

/// Render a plan into a template document.
pub fn render(plan: &ExecutionPlan, metadata: &TemplateMetadata) -> Result<Value> {
    render_with(plan, metadata, &mut NoProgress)
}

/// Render a plan, reporting each resource to `progress`.
pub fn render_with<P: ProgressCallback + ?Sized>(
    plan: &ExecutionPlan,
    metadata: &TemplateMetadata,
    progress: &mut P,
) -> Result<Value> {
    let mut engine = TemplateEngine::new();
    let summary = execute(plan, &mut engine, progress);
    if !summary.is_success() {
        return Err(Error::Synthesis(format!(
            "{} of {} resources failed to render",
            summary.failed,
            plan.total_resources()
        )));
    }
    Ok(engine.finish(metadata))
}

/// Content hash of a rendered template.
pub fn fingerprint(template: &Value) -> Result<String> {
    let bytes = serde_json::to_vec(template).map_err(|e| Error::Synthesis(e.to_string()))?;
    Ok(blake3::hash(&bytes).to_hex().to_string())
}

// ============================================================================
// Loading
// ============================================================================

/// A resource read back from a template.
#[derive(Debug, Clone)]
pub struct TemplateResource {
    id: String,
    resource_type: &'static str,
    properties: Value,
    dependencies: Vec<String>,
    removal_policy: Option<RemovalPolicy>,
}

impl Resource for TemplateResource {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn description(&self) -> String {
        format!("{} ({})", self.id, self.resource_type)
    }

    fn resource_type(&self) -> &'static str {
        self.resource_type
    }

    fn dependencies(&self) -> Vec<String> {
        self.dependencies.clone()
    }

    fn properties(&self) -> Value {
        self.properties.clone()
    }

    fn removal_policy(&self) -> Option<RemovalPolicy> {
        self.removal_policy
    }
}

/// Load a template file into a plan.
pub fn load_plan(path: &Path) -> Result<ExecutionPlan> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    let value: Value = serde_json::from_str(&content).map_err(|e| invalid(path, e.to_string()))?;
    plan_from_value(&value, path)
}

/// Convert a template document into a plan.
///
/// `path` is only used in error messages.
pub fn plan_from_value(value: &Value, path: &Path) -> Result<ExecutionPlan> {
    let resources = value
        .get("Resources")
        .and_then(Value::as_object)
        .ok_or_else(|| invalid(path, "missing Resources object"))?;

    let order: Vec<String> = match value.pointer("/Metadata/ResourceOrder") {
        Some(Value::Array(ids)) => ids
            .iter()
            .map(|id| {
                id.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| invalid(path, "ResourceOrder entries must be strings"))
            })
            .collect::<Result<_>>()?,
        _ => resources.keys().cloned().collect(),
    };
    if order.len() != resources.len() || order.iter().any(|id| !resources.contains_key(id)) {
        return Err(invalid(path, "ResourceOrder does not match Resources"));
    }

    let mut plan = ExecutionPlan::new();
    for id in order {
        let resource = parse_resource(&id, &resources[&id], path)?;
        plan.add_resource(Box::new(resource))?;
    }
    Ok(plan)
}

fn parse_resource(id: &str, entry: &Value, path: &Path) -> Result<TemplateResource> {
    let type_name = entry
        .get("Type")
        .and_then(Value::as_str)
        .ok_or_else(|| invalid(path, format!("resource {id} has no Type")))?;
    let resource_type = KNOWN_TYPES
        .iter()
        .copied()
        .find(|t| *t == type_name)
        .ok_or_else(|| invalid(path, format!("resource {id} has unknown type {type_name}")))?;

    let dependencies = match entry.get("DependsOn") {
        None => Vec::new(),
        Some(Value::String(dep)) => vec![dep.clone()],
        Some(Value::Array(deps)) => deps
            .iter()
            .map(|dep| dep.as_str().map(str::to_string))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| invalid(path, format!("resource {id} has malformed DependsOn")))?,
        Some(_) => return Err(invalid(path, format!("resource {id} has malformed DependsOn"))),
    };

    let removal_policy = match entry.get("DeletionPolicy") {
        None => None,
        Some(Value::String(policy)) => {
            Some(RemovalPolicy::from_deletion_policy(policy).ok_or_else(|| {
                invalid(path, format!("resource {id} has unknown DeletionPolicy {policy}"))
            })?)
        }
        Some(_) => {
            return Err(invalid(path, format!("resource {id} has malformed DeletionPolicy")));
        }
    };

    Ok(TemplateResource {
        id: id.to_string(),
        resource_type,
        properties: entry.get("Properties").cloned().unwrap_or_else(|| json!({})),
        dependencies,
        removal_policy,
    })
}

fn invalid(path: &Path, message: impl Into<String>) -> Error {
    Error::InvalidDocument {
        kind: "template",
        path: path.to_path_buf(),
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::compute_diffs;

    #[derive(Debug)]
    struct Fake {
        id: &'static str,
        resource_type: &'static str,
        deps: Vec<String>,
        policy: Option<RemovalPolicy>,
        size: u32,
    }

    impl Resource for Fake {
        fn id(&self) -> String {
            self.id.to_string()
        }

        fn description(&self) -> String {
            self.id.to_string()
        }

        fn resource_type(&self) -> &'static str {
            self.resource_type
        }

        fn dependencies(&self) -> Vec<String> {
            self.deps.clone()
        }

        fn properties(&self) -> Value {
            json!({ "Size": self.size })
        }

        fn removal_policy(&self) -> Option<RemovalPolicy> {
            self.policy
        }
    }

    fn plan(size: u32) -> ExecutionPlan {
        let mut plan = ExecutionPlan::new();
        plan.add_resource(Box::new(Fake {
            id: "DatabaseSecret",
            resource_type: "AWS::SecretsManager::Secret",
            deps: vec![],
            policy: None,
            size: 1,
        }))
        .unwrap();
        plan.add_resource(Box::new(Fake {
            id: "Database",
            resource_type: "AWS::RDS::DBInstance",
            deps: vec!["DatabaseSecret".into()],
            policy: Some(RemovalPolicy::Snapshot),
            size,
        }))
        .unwrap();
        plan
    }

    fn metadata() -> TemplateMetadata {
        TemplateMetadata {
            stack_name: "SymfonyAppProdStack".into(),
            description: Some("test stack".into()),
            account: "123456789012".into(),
            region: "eu-west-1".into(),
            mode: "production".into(),
        }
    }

    #[test]
    fn test_render_template() {
        let doc = render(&plan(5), &metadata()).unwrap();
        assert_eq!(doc["Description"], json!("test stack"));
        assert_eq!(doc["Metadata"]["StackName"], json!("SymfonyAppProdStack"));
        assert_eq!(
            doc["Metadata"]["ResourceOrder"],
            json!(["DatabaseSecret", "Database"])
        );
        let db = &doc["Resources"]["Database"];
        assert_eq!(db["Type"], json!("AWS::RDS::DBInstance"));
        assert_eq!(db["DependsOn"], json!(["DatabaseSecret"]));
        assert_eq!(db["DeletionPolicy"], json!("Snapshot"));
        assert!(doc["Resources"]["DatabaseSecret"].get("DependsOn").is_none());
    }

    #[test]
    fn test_fingerprint_is_stable() {
        let a = render(&plan(5), &metadata()).unwrap();
        let b = render(&plan(5), &metadata()).unwrap();
        let c = render(&plan(20), &metadata()).unwrap();
        assert_eq!(fingerprint(&a).unwrap(), fingerprint(&b).unwrap());
        assert_ne!(fingerprint(&a).unwrap(), fingerprint(&c).unwrap());
    }

    #[test]
    fn test_load_back_and_diff() {
        let doc = render(&plan(5), &metadata()).unwrap();
        let loaded = plan_from_value(&doc, Path::new("old.json")).unwrap();
        assert_eq!(loaded.ids(), vec!["DatabaseSecret", "Database"]);
        assert_eq!(
            loaded.get("Database").unwrap().removal_policy(),
            Some(RemovalPolicy::Snapshot)
        );

        assert!(compute_diffs(&loaded, &plan(5)).is_empty());
        let diffs = compute_diffs(&loaded, &plan(20));
        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0].resource_id, "Database");
    }

    #[test]
    fn test_engine_rejects_out_of_order_submission() {
        let plan = plan(5);
        let mut engine = TemplateEngine::new();
        let database = plan.get("Database").unwrap();
        let err = engine
            .submit(database, &ApplyContext { position: 1 })
            .unwrap_err();
        assert!(err.to_string().contains("position 1"));
        assert!(engine.is_empty());
    }

    #[test]
    fn test_hand_retained_resource_shows_as_policy_change() {
        let mut doc = render(&plan(5), &metadata()).unwrap();
        doc["Resources"]["Database"]["DeletionPolicy"] = json!("Retain");
        let loaded = plan_from_value(&doc, Path::new("old.json")).unwrap();
        assert_eq!(
            loaded.get("Database").unwrap().removal_policy(),
            Some(RemovalPolicy::Retain)
        );

        let diffs = compute_diffs(&loaded, &plan(5));
        assert_eq!(diffs.len(), 1);
        match &diffs[0].change {
            declarative::Change::Modified { removal_policy, .. } => assert_eq!(
                *removal_policy,
                Some((Some(RemovalPolicy::Retain), Some(RemovalPolicy::Snapshot)))
            ),
            other => panic!("expected a modification, got {other:?}"),
        }
    }

    #[test]
    fn test_load_unknown_type() {
        let doc = json!({
            "Resources": { "Bucket": { "Type": "AWS::S3::Bucket" } }
        });
        let err = plan_from_value(&doc, Path::new("t.json")).unwrap_err();
        assert!(matches!(err, Error::InvalidDocument { kind: "template", .. }));
        assert!(err.to_string().contains("AWS::S3::Bucket"));
    }

    #[test]
    fn test_load_dangling_dependency() {
        let doc = json!({
            "Resources": {
                "Database": { "Type": "AWS::RDS::DBInstance", "DependsOn": "DatabaseSecret" }
            }
        });
        let err = plan_from_value(&doc, Path::new("t.json")).unwrap_err();
        assert!(matches!(err, Error::Plan(_)));
    }

    #[test]
    fn test_load_malformed_depends_on() {
        let doc = json!({
            "Resources": {
                "DatabaseSecret": { "Type": "AWS::SecretsManager::Secret" },
                "Database": {
                    "Type": "AWS::RDS::DBInstance",
                    "DependsOn": ["DatabaseSecret", 7]
                }
            }
        });
        let err = plan_from_value(&doc, Path::new("t.json")).unwrap_err();
        assert!(matches!(err, Error::InvalidDocument { kind: "template", .. }));
        assert!(err.to_string().contains("malformed DependsOn"));
    }

    #[test]
    fn test_load_malformed_deletion_policy() {
        let doc = json!({
            "Resources": {
                "LogGroup": { "Type": "AWS::Logs::LogGroup", "DeletionPolicy": true }
            }
        });
        let err = plan_from_value(&doc, Path::new("t.json")).unwrap_err();
        assert!(err.to_string().contains("malformed DeletionPolicy"));
    }

    #[test]
    fn test_load_mismatched_order() {
        let doc = json!({
            "Metadata": { "ResourceOrder": ["Cluster"] },
            "Resources": { "Database": { "Type": "AWS::RDS::DBInstance" } }
        });
        assert!(plan_from_value(&doc, Path::new("t.json")).is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_plan(Path::new("/nonexistent/template.json")).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
