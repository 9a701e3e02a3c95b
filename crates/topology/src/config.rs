//! Stack configuration (`tierstack.toml`).
//!
//! Every field has a default, so an empty file (or no file) describes the
//! built-in stack: MariaDB behind an nginx + php-fpm task.

use crate::database::EngineKind;
use crate::error::{Error, Result};
use crate::profile::EnvironmentMode;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Retention periods the log service accepts, in days.
const LOG_RETENTION_DAYS: [u32; 22] = [
    1, 3, 5, 7, 14, 30, 60, 90, 120, 150, 180, 365, 400, 545, 731, 1096, 1827, 2192, 2557, 2922,
    3288, 3653,
];

static HOSTNAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z]{2,63}$")
        .expect("hostname pattern is valid")
});

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StackConfig {
    pub stack: StackSection,
    pub database: DatabaseConfig,
    pub compute: ComputeConfig,
    pub domain: DomainConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StackSection {
    /// Application name, used to build the stack name.
    pub app_name: String,
    /// Free-form description rendered into the template.
    pub description: Option<String>,
}

impl Default for StackSection {
    fn default() -> Self {
        Self {
            app_name: "SymfonyApp".to_string(),
            description: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub engine: EngineKind,
    pub engine_version: String,
    pub instance_type: String,
    pub allocated_storage_gib: u32,
    pub storage_type: String,
    pub multi_az: bool,
    pub database_name: String,
    /// User the credential secret is generated for.
    pub username: String,
    /// Listening port; the engine's default when unset.
    pub port: Option<u16>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            engine: EngineKind::MariaDb,
            engine_version: "10.5".to_string(),
            instance_type: "db.t3.micro".to_string(),
            allocated_storage_gib: 5,
            storage_type: "standard".to_string(),
            multi_az: false,
            database_name: "db".to_string(),
            username: "db_user".to_string(),
            port: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComputeConfig {
    /// CPU units for the whole task.
    pub cpu: u32,
    /// Memory for the whole task, in MiB.
    pub memory_mib: u32,
    /// Shared build context, relative to the project root.
    pub build_context: String,
    pub log_stream_prefix: String,
    pub log_retention_days: u32,
    pub edge: EdgeContainerConfig,
    pub runtime: RuntimeContainerConfig,
}

impl Default for ComputeConfig {
    fn default() -> Self {
        Self {
            cpu: 512,
            memory_mib: 1024,
            build_context: "app".to_string(),
            log_stream_prefix: "symfony-app".to_string(),
            log_retention_days: 30,
            edge: EdgeContainerConfig::default(),
            runtime: RuntimeContainerConfig::default(),
        }
    }
}

impl ComputeConfig {
    /// Build context directory, resolved against the project root.
    pub fn build_context_path(&self, project_root: &Path) -> PathBuf {
        let expanded = shellexpand::tilde(&self.build_context);
        project_root.join(expanded.as_ref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeContainerConfig {
    pub name: String,
    /// Build file, relative to the build context.
    pub build_file: String,
    /// The one port exposed by the task.
    pub port: u16,
    /// Variable that tells the edge process where the runtime listens.
    pub upstream_variable: String,
    /// Extra plaintext environment.
    pub environment: BTreeMap<String, String>,
}

impl Default for EdgeContainerConfig {
    fn default() -> Self {
        Self {
            name: "nginx".to_string(),
            build_file: "docker/nginx/Dockerfile".to_string(),
            port: 80,
            upstream_variable: "PHP_HOST".to_string(),
            environment: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeContainerConfig {
    pub name: String,
    /// Build file, relative to the build context.
    pub build_file: String,
    /// Value of `APP_ENV`.
    pub app_env: String,
    /// Value of `DB_DRIVER`; follows the database engine when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_driver: Option<String>,
    /// Extra plaintext environment.
    pub environment: BTreeMap<String, String>,
}

impl Default for RuntimeContainerConfig {
    fn default() -> Self {
        Self {
            name: "php".to_string(),
            build_file: "docker/php-fpm/Dockerfile".to_string(),
            app_env: "prod".to_string(),
            db_driver: None,
            environment: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DomainConfig {
    /// Apex of the hosted zone.
    pub root_domain: String,
    /// Hostname the certificate and DNS record are for.
    pub hostname: String,
}

impl Default for DomainConfig {
    fn default() -> Self {
        Self {
            root_domain: "example.com".to_string(),
            hostname: "app.example.com".to_string(),
        }
    }
}

impl StackConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::config(e.to_string()))
    }

    /// Load and validate a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let config = Self::from_toml_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Render as TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::config(e.to_string()))
    }

    /// Stack name for a mode, e.g. `SymfonyAppDevStack`.
    pub fn stack_name(&self, mode: EnvironmentMode) -> String {
        format!("{}{}Stack", self.stack.app_name, mode.stack_infix())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.stack.app_name.is_empty()
            || !self.stack.app_name.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(Error::config(format!(
                "stack.app_name '{}' must be non-empty and alphanumeric",
                self.stack.app_name
            )));
        }

        self.validate_database()?;
        self.validate_compute()?;
        self.validate_domain()?;
        Ok(())
    }

    fn validate_database(&self) -> Result<()> {
        let db = &self.database;
        if db.engine_version.trim().is_empty() {
            return Err(Error::config("database.engine_version must be set"));
        }
        if db.allocated_storage_gib == 0 {
            return Err(Error::config("database.allocated_storage_gib must be > 0"));
        }
        if db.database_name.is_empty() || db.username.is_empty() {
            return Err(Error::config(
                "database.database_name and database.username must be set",
            ));
        }
        if db.port == Some(0) {
            return Err(Error::config("database.port must be > 0"));
        }
        Ok(())
    }

    fn validate_compute(&self) -> Result<()> {
        let compute = &self.compute;
        if !is_valid_task_size(compute.cpu, compute.memory_mib) {
            return Err(Error::config(format!(
                "compute: {} CPU units with {} MiB is not a supported task size",
                compute.cpu, compute.memory_mib
            )));
        }
        if !LOG_RETENTION_DAYS.contains(&compute.log_retention_days) {
            return Err(Error::config(format!(
                "compute.log_retention_days {} is not a supported retention period",
                compute.log_retention_days
            )));
        }
        if compute.edge.name == compute.runtime.name {
            return Err(Error::config(format!(
                "edge and runtime containers are both named '{}'",
                compute.edge.name
            )));
        }
        if compute.edge.build_file == compute.runtime.build_file {
            return Err(Error::config(format!(
                "edge and runtime containers share build file '{}'",
                compute.edge.build_file
            )));
        }
        if compute.edge.port == 0 {
            return Err(Error::config("compute.edge.port must be > 0"));
        }
        if let Some(driver) = &compute.runtime.db_driver {
            let expected = self.database.engine.pdo_driver();
            if driver != expected {
                return Err(Error::config(format!(
                    "runtime db_driver '{driver}' does not fit engine {} (use '{expected}')",
                    self.database.engine
                )));
            }
        }

        // Credentials only ever arrive as secrets
        for field in crate::types::SecretField::ALL {
            let name = field.env_name();
            if compute.runtime.environment.contains_key(name)
                || compute.edge.environment.contains_key(name)
            {
                return Err(Error::config(format!(
                    "{name} is injected from the database secret and cannot be set as plaintext"
                )));
            }
        }
        Ok(())
    }

    fn validate_domain(&self) -> Result<()> {
        let domain = &self.domain;
        for (key, value) in [
            ("domain.root_domain", &domain.root_domain),
            ("domain.hostname", &domain.hostname),
        ] {
            if !HOSTNAME.is_match(value) {
                return Err(Error::config(format!("{key} '{value}' is not a valid DNS name")));
            }
        }

        let host = domain.hostname.to_ascii_lowercase();
        let root = domain.root_domain.to_ascii_lowercase();
        if host != root && !host.ends_with(&format!(".{root}")) {
            return Err(Error::config(format!(
                "hostname '{}' is not inside zone '{}'",
                domain.hostname, domain.root_domain
            )));
        }
        Ok(())
    }
}

/// Supported CPU/memory pairs for a serverless container task.
fn is_valid_task_size(cpu: u32, memory_mib: u32) -> bool {
    let gib = |n: u32| n * 1024;
    match cpu {
        256 => matches!(memory_mib, 512 | 1024 | 2048),
        512 => (gib(1)..=gib(4)).contains(&memory_mib) && memory_mib % 1024 == 0,
        1024 => (gib(2)..=gib(8)).contains(&memory_mib) && memory_mib % 1024 == 0,
        2048 => (gib(4)..=gib(16)).contains(&memory_mib) && memory_mib % 1024 == 0,
        4096 => (gib(8)..=gib(30)).contains(&memory_mib) && memory_mib % 1024 == 0,
        _ => false,
    }
}
