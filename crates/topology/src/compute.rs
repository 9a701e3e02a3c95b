//! Compute topology.
//!
//! One cluster, one two-container task and one log destination. The edge
//! container (reverse proxy) is the only thing reachable from outside the
//! task; the runtime container sits behind it on the same host and receives
//! the database credentials as secret-backed variables.

use crate::backend::Backend;
use crate::config::ComputeConfig;
use crate::database::DatabaseInstance;
use crate::error::{Error, Result};
use crate::types::{ImageLocator, ImageSource, NetworkRef, SecretField, SecretFieldRef};
use declarative::{RemovalPolicy, Resource};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Hostname the edge container uses to reach the runtime process.
pub const SAME_HOST: &str = "localhost";

pub const CLUSTER_ID: &str = "Cluster";
pub const LOG_GROUP_ID: &str = "LogGroup";
pub const TASK_DEFINITION_ID: &str = "TaskDefinition";

/// The container cluster, bound to a network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    pub logical_id: String,
    pub vpc_id: String,
}

/// Log destination shared by both containers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogDestination {
    pub logical_id: String,
    pub retention_days: u32,
    /// Logs never outlive the stack.
    pub removal_policy: RemovalPolicy,
    pub stream_prefix: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerRole {
    /// Reverse proxy, receives all inbound traffic.
    Edge,
    /// Application runtime, never exposed.
    Runtime,
}

impl fmt::Display for ContainerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Edge => write!(f, "edge"),
            Self::Runtime => write!(f, "runtime"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortMapping {
    pub container_port: u16,
    pub protocol: Protocol,
}

impl PortMapping {
    pub fn tcp(container_port: u16) -> Self {
        Self {
            container_port,
            protocol: Protocol::Tcp,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tcp")
    }
}

/// One container of the task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerDefinition {
    pub name: String,
    pub role: ContainerRole,
    pub image: ImageLocator,
    /// Plaintext environment.
    pub environment: BTreeMap<String, String>,
    /// Secret-backed environment, by variable name.
    pub secrets: BTreeMap<String, SecretFieldRef>,
    pub port_mappings: Vec<PortMapping>,
}

/// A two-container task sharing one CPU/memory allocation.
///
/// Only constructible through [`TaskSpecification::new`], which enforces
/// the exposure rules. Deserializing goes through the same checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TaskParts")]
pub struct TaskSpecification {
    logical_id: String,
    cpu: u32,
    memory_mib: u32,
    log: LogDestination,
    edge: ContainerDefinition,
    runtime: ContainerDefinition,
    #[serde(skip)]
    exposed: PortMapping,
}

/// Unchecked task fields, as read from a document.
#[derive(Deserialize)]
struct TaskParts {
    cpu: u32,
    memory_mib: u32,
    log: LogDestination,
    edge: ContainerDefinition,
    runtime: ContainerDefinition,
}

impl TryFrom<TaskParts> for TaskSpecification {
    type Error = Error;

    fn try_from(parts: TaskParts) -> Result<Self> {
        Self::new(parts.cpu, parts.memory_mib, parts.log, parts.edge, parts.runtime)
    }
}

impl TaskSpecification {
    /// Assemble a task.
    ///
    /// # Errors
    ///
    /// `Error::ExposedRuntime` if the runtime container maps any port and
    /// `Error::EdgePortCount` unless the edge container maps exactly one.
    pub fn new(
        cpu: u32,
        memory_mib: u32,
        log: LogDestination,
        edge: ContainerDefinition,
        runtime: ContainerDefinition,
    ) -> Result<Self> {
        if !runtime.port_mappings.is_empty() {
            return Err(Error::ExposedRuntime {
                container: runtime.name,
            });
        }
        let [exposed] = edge.port_mappings[..] else {
            return Err(Error::EdgePortCount {
                count: edge.port_mappings.len(),
                container: edge.name,
            });
        };
        Ok(Self {
            logical_id: TASK_DEFINITION_ID.to_string(),
            cpu,
            memory_mib,
            log,
            edge,
            runtime,
            exposed,
        })
    }

    pub fn logical_id(&self) -> &str {
        &self.logical_id
    }

    pub fn cpu(&self) -> u32 {
        self.cpu
    }

    pub fn memory_mib(&self) -> u32 {
        self.memory_mib
    }

    pub fn log(&self) -> &LogDestination {
        &self.log
    }

    pub fn edge(&self) -> &ContainerDefinition {
        &self.edge
    }

    pub fn runtime(&self) -> &ContainerDefinition {
        &self.runtime
    }

    /// Containers in declaration order (edge first).
    pub fn containers(&self) -> [&ContainerDefinition; 2] {
        [&self.edge, &self.runtime]
    }

    /// The single port reachable from outside the task.
    pub fn exposed_port(&self) -> PortMapping {
        self.exposed
    }
}

/// Everything the compute step declares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputeTopology {
    pub cluster: Cluster,
    pub task: TaskSpecification,
}

/// Declare the cluster, log destination and task.
///
/// The runtime container gets the database's credential bundle as secrets
/// and a driver matching its engine. Both images are resolved before any
/// container is declared; a failure on either leaves nothing behind.
pub fn build<B: Backend + ?Sized>(
    backend: &B,
    network: &NetworkRef,
    database: &DatabaseInstance,
    config: &ComputeConfig,
    project_root: &Path,
) -> Result<ComputeTopology> {
    let context = config.build_context_path(project_root);
    let edge_image = backend.resolve_image(&image_source(
        &config.edge.name,
        &context,
        &config.edge.build_file,
    ))?;
    let runtime_image = backend.resolve_image(&image_source(
        &config.runtime.name,
        &context,
        &config.runtime.build_file,
    ))?;

    let cluster = Cluster {
        logical_id: CLUSTER_ID.to_string(),
        vpc_id: network.vpc_id.clone(),
    };

    let log = LogDestination {
        logical_id: LOG_GROUP_ID.to_string(),
        retention_days: config.log_retention_days,
        removal_policy: RemovalPolicy::Destroy,
        stream_prefix: config.log_stream_prefix.clone(),
    };

    let mut edge_env = config.edge.environment.clone();
    edge_env.insert(config.edge.upstream_variable.clone(), SAME_HOST.to_string());
    let edge = ContainerDefinition {
        name: config.edge.name.clone(),
        role: ContainerRole::Edge,
        image: edge_image,
        environment: edge_env,
        secrets: BTreeMap::new(),
        port_mappings: vec![PortMapping::tcp(config.edge.port)],
    };

    let mut runtime_env = config.runtime.environment.clone();
    runtime_env.insert("APP_ENV".to_string(), config.runtime.app_env.clone());
    let driver = config
        .runtime
        .db_driver
        .clone()
        .unwrap_or_else(|| database.engine.pdo_driver().to_string());
    runtime_env.insert("DB_DRIVER".to_string(), driver);
    let secrets = SecretField::ALL
        .iter()
        .map(|&field| (field.env_name().to_string(), database.credentials.field(field)))
        .collect();
    let runtime = ContainerDefinition {
        name: config.runtime.name.clone(),
        role: ContainerRole::Runtime,
        image: runtime_image,
        environment: runtime_env,
        secrets,
        port_mappings: Vec::new(),
    };

    let task = TaskSpecification::new(config.cpu, config.memory_mib, log, edge, runtime)?;
    log::debug!(
        "task {} CPU / {} MiB, edge {} on port {}",
        task.cpu(),
        task.memory_mib(),
        task.edge().name,
        task.exposed_port().container_port
    );

    Ok(ComputeTopology { cluster, task })
}

fn image_source(container: &str, context: &Path, file: &str) -> ImageSource {
    ImageSource {
        container: container.to_string(),
        context: context.to_path_buf(),
        file: PathBuf::from(file),
    }
}

// ============================================================================
// Resources
// ============================================================================

impl Resource for Cluster {
    fn id(&self) -> String {
        self.logical_id.clone()
    }

    fn description(&self) -> String {
        format!("Container cluster in {}", self.vpc_id)
    }

    fn resource_type(&self) -> &'static str {
        "AWS::ECS::Cluster"
    }

    fn properties(&self) -> Value {
        json!({ "VpcId": self.vpc_id })
    }
}

impl Resource for LogDestination {
    fn id(&self) -> String {
        self.logical_id.clone()
    }

    fn description(&self) -> String {
        format!("Task logs ({} days)", self.retention_days)
    }

    fn resource_type(&self) -> &'static str {
        "AWS::Logs::LogGroup"
    }

    fn properties(&self) -> Value {
        json!({ "RetentionInDays": self.retention_days })
    }

    fn removal_policy(&self) -> Option<RemovalPolicy> {
        Some(self.removal_policy)
    }
}

fn container_properties(container: &ContainerDefinition, log: &LogDestination) -> Value {
    let environment: Vec<Value> = container
        .environment
        .iter()
        .map(|(name, value)| json!({ "Name": name, "Value": value }))
        .collect();
    let secrets: Vec<Value> = container
        .secrets
        .iter()
        .map(|(name, r)| {
            json!({ "Name": name, "ValueFrom": { "SecretRef": [r.secret_id, r.field.key()] } })
        })
        .collect();
    let ports: Vec<Value> = container
        .port_mappings
        .iter()
        .map(|p| json!({ "ContainerPort": p.container_port, "Protocol": p.protocol }))
        .collect();

    json!({
        "Name": container.name,
        "Essential": true,
        "Image": {
            "Context": container.image.context,
            "File": container.image.file,
            "AssetHash": container.image.asset_hash,
        },
        "Environment": environment,
        "Secrets": secrets,
        "PortMappings": ports,
        "LogConfiguration": {
            "LogDriver": "awslogs",
            "Options": {
                "awslogs-group": { "Ref": log.logical_id },
                "awslogs-stream-prefix": log.stream_prefix,
            },
        },
    })
}

impl Resource for TaskSpecification {
    fn id(&self) -> String {
        self.logical_id.clone()
    }

    fn description(&self) -> String {
        format!(
            "{} + {} ({} CPU / {} MiB)",
            self.edge.name, self.runtime.name, self.cpu, self.memory_mib
        )
    }

    fn resource_type(&self) -> &'static str {
        "AWS::ECS::TaskDefinition"
    }

    fn dependencies(&self) -> Vec<String> {
        let mut deps = vec![self.log.logical_id.clone()];
        for r in self.runtime.secrets.values() {
            if !deps.contains(&r.secret_id) {
                deps.push(r.secret_id.clone());
            }
        }
        deps
    }

    fn properties(&self) -> Value {
        json!({
            "Cpu": self.cpu.to_string(),
            "Memory": self.memory_mib.to_string(),
            "NetworkMode": "awsvpc",
            "RequiresCompatibilities": ["FARGATE"],
            "ContainerDefinitions": self
                .containers()
                .iter()
                .map(|c| container_properties(c, &self.log))
                .collect::<Vec<_>>(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendCall, MockBackend};
    use crate::config::DatabaseConfig;
    use crate::database::{self, EngineKind};
    use crate::profile::{EnvironmentMode, EnvironmentProfile};
    use crate::types::DeployTarget;

    fn backend() -> MockBackend {
        MockBackend::with_default_fixtures(&DeployTarget::new("123456789012", "eu-west-1"))
    }

    fn database_with(config: &DatabaseConfig) -> DatabaseInstance {
        database::provision(
            &backend(),
            &MockBackend::sample_network(),
            &EnvironmentProfile::for_mode(EnvironmentMode::Dev),
            config,
        )
        .unwrap()
    }

    fn build_with(
        backend: &MockBackend,
        database: &DatabaseInstance,
        config: &ComputeConfig,
    ) -> Result<ComputeTopology> {
        build(
            backend,
            &MockBackend::sample_network(),
            database,
            config,
            Path::new("/srv/project"),
        )
    }

    fn build_default(backend: &MockBackend) -> Result<ComputeTopology> {
        build_with(
            backend,
            &database_with(&DatabaseConfig::default()),
            &ComputeConfig::default(),
        )
    }

    fn container(name: &str, role: ContainerRole, ports: Vec<PortMapping>) -> ContainerDefinition {
        ContainerDefinition {
            name: name.into(),
            role,
            image: ImageLocator {
                context: PathBuf::from("app"),
                file: PathBuf::from("Dockerfile"),
                asset_hash: "0".repeat(64),
            },
            environment: BTreeMap::new(),
            secrets: BTreeMap::new(),
            port_mappings: ports,
        }
    }

    fn log() -> LogDestination {
        LogDestination {
            logical_id: LOG_GROUP_ID.into(),
            retention_days: 30,
            removal_policy: RemovalPolicy::Destroy,
            stream_prefix: "symfony-app".into(),
        }
    }

    #[test]
    fn test_default_topology() {
        let topology = build_default(&backend()).unwrap();
        let task = &topology.task;

        assert_eq!(topology.cluster.vpc_id, "vpc-0default");
        assert_eq!(task.cpu(), 512);
        assert_eq!(task.memory_mib(), 1024);
        assert_eq!(task.containers().len(), 2);
        assert_eq!(task.exposed_port(), PortMapping::tcp(80));
        assert!(task.runtime().port_mappings.is_empty());
        assert_eq!(task.log().retention_days, 30);
        assert_eq!(task.log().removal_policy, RemovalPolicy::Destroy);
    }

    #[test]
    fn test_edge_points_at_runtime_on_same_host() {
        let topology = build_default(&backend()).unwrap();
        let edge = topology.task.edge();
        assert_eq!(edge.environment.get("PHP_HOST").map(String::as_str), Some(SAME_HOST));
        assert!(edge.secrets.is_empty());
    }

    #[test]
    fn test_runtime_environment_and_secrets() {
        let topology = build_default(&backend()).unwrap();
        let runtime = topology.task.runtime();

        assert_eq!(runtime.environment["APP_ENV"], "prod");
        assert_eq!(runtime.environment["DB_DRIVER"], "pdo_mysql");

        let names: Vec<&str> = runtime.secrets.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["DB_HOST", "DB_NAME", "DB_PASS", "DB_PORT", "DB_USER"]);
        let bundle = database_with(&DatabaseConfig::default()).credentials;
        assert_eq!(runtime.secrets["DB_PASS"], bundle.field(SecretField::Password));
        assert_eq!(runtime.secrets["DB_NAME"].field, SecretField::DbName);
        for secret_name in runtime.secrets.keys() {
            assert!(!runtime.environment.contains_key(secret_name));
        }
    }

    #[test]
    fn test_driver_follows_engine() {
        let postgres = DatabaseConfig {
            engine: EngineKind::Postgres,
            engine_version: "15".into(),
            ..DatabaseConfig::default()
        };
        let topology =
            build_with(&backend(), &database_with(&postgres), &ComputeConfig::default()).unwrap();
        assert_eq!(topology.task.runtime().environment["DB_DRIVER"], "pdo_pgsql");
    }

    #[test]
    fn test_explicit_driver_kept() {
        let mut config = ComputeConfig::default();
        config.runtime.db_driver = Some("pdo_mysql".into());
        let topology =
            build_with(&backend(), &database_with(&DatabaseConfig::default()), &config).unwrap();
        assert_eq!(topology.task.runtime().environment["DB_DRIVER"], "pdo_mysql");
    }

    #[test]
    fn test_images_share_build_context() {
        let topology = build_default(&backend()).unwrap();
        let [edge, runtime] = topology.task.containers();
        assert_eq!(edge.image.context, PathBuf::from("/srv/project/app"));
        assert_eq!(edge.image.context, runtime.image.context);
        assert_ne!(edge.image.file, runtime.image.file);
    }

    #[test]
    fn test_images_resolved_before_declaring() {
        let backend = backend();
        backend.fail_image("php");
        let err = build_default(&backend).unwrap_err();
        assert!(matches!(err, Error::ImageBuildContext { .. }));
        assert_eq!(
            backend.calls(),
            vec![
                BackendCall::ResolveImage("nginx".into()),
                BackendCall::ResolveImage("php".into())
            ]
        );
    }

    #[test]
    fn test_runtime_port_rejected() {
        let err = TaskSpecification::new(
            512,
            1024,
            log(),
            container("nginx", ContainerRole::Edge, vec![PortMapping::tcp(80)]),
            container("php", ContainerRole::Runtime, vec![PortMapping::tcp(9000)]),
        )
        .unwrap_err();
        match err {
            Error::ExposedRuntime { container } => assert_eq!(container, "php"),
            other => panic!("expected ExposedRuntime, got {other:?}"),
        }
    }

    #[test]
    fn test_edge_must_expose_exactly_one_port() {
        let err = TaskSpecification::new(
            512,
            1024,
            log(),
            container(
                "nginx",
                ContainerRole::Edge,
                vec![PortMapping::tcp(80), PortMapping::tcp(443)],
            ),
            container("php", ContainerRole::Runtime, vec![]),
        )
        .unwrap_err();
        assert!(matches!(err, Error::EdgePortCount { count: 2, .. }));

        let err = TaskSpecification::new(
            512,
            1024,
            log(),
            container("nginx", ContainerRole::Edge, vec![]),
            container("php", ContainerRole::Runtime, vec![]),
        )
        .unwrap_err();
        assert!(matches!(err, Error::EdgePortCount { count: 0, .. }));
    }

    #[test]
    fn test_deserialized_task_is_checked() {
        let topology = build_default(&backend()).unwrap();
        let mut doc = serde_json::to_value(&topology.task).unwrap();

        let back: TaskSpecification = serde_json::from_value(doc.clone()).unwrap();
        assert_eq!(back, topology.task);
        assert_eq!(back.exposed_port(), PortMapping::tcp(80));

        doc["runtime"]["port_mappings"] = json!([{ "container_port": 9000, "protocol": "tcp" }]);
        doc["edge"]["port_mappings"] = json!([]);
        let err = serde_json::from_value::<TaskSpecification>(doc).unwrap_err();
        assert!(err.to_string().contains("must not expose a port"));
    }

    #[test]
    fn test_task_resource_dependencies() {
        let topology = build_default(&backend()).unwrap();
        assert_eq!(
            topology.task.dependencies(),
            vec![LOG_GROUP_ID.to_string(), "DatabaseSecret".to_string()]
        );
        let props = topology.task.properties();
        let defs = props["ContainerDefinitions"].as_array().unwrap();
        assert_eq!(defs.len(), 2);
        assert_eq!(defs[1]["PortMappings"], json!([]));
        assert_eq!(
            defs[0]["LogConfiguration"]["Options"]["awslogs-stream-prefix"],
            json!("symfony-app")
        );
    }
}
