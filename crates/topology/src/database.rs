//! Database provisioning.
//!
//! Declares the managed relational database and its generated credential
//! secret. Teardown and backup policy come from the environment profile;
//! everything else is static configuration.

use crate::backend::Backend;
use crate::config::DatabaseConfig;
use crate::error::{Error, Result};
use crate::profile::EnvironmentProfile;
use crate::types::{CredentialBundle, NetworkRef, SecretField, SecretRequest, SubnetGroup};
use declarative::{RemovalPolicy, Resource};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;

/// Logical id of the database.
pub const DATABASE_ID: &str = "Database";

/// Characters kept out of generated passwords (they break connection URLs).
const EXCLUDED_PASSWORD_CHARACTERS: &str = " %+~`#$&*()|[]{}:;<>?!'/@\"\\";

/// Database engine family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    MariaDb,
    MySql,
    Postgres,
}

impl EngineKind {
    /// Port the engine listens on unless configured otherwise.
    pub fn default_port(&self) -> u16 {
        match self {
            Self::MariaDb | Self::MySql => 3306,
            Self::Postgres => 5432,
        }
    }

    /// PDO driver the runtime uses to talk to this engine.
    pub fn pdo_driver(&self) -> &'static str {
        match self {
            Self::MariaDb | Self::MySql => "pdo_mysql",
            Self::Postgres => "pdo_pgsql",
        }
    }

    /// Engine identifier understood by the provider.
    pub fn engine_id(&self) -> &'static str {
        match self {
            Self::MariaDb => "mariadb",
            Self::MySql => "mysql",
            Self::Postgres => "postgres",
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.engine_id())
    }
}

/// The declared database instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseInstance {
    pub logical_id: String,
    pub engine: EngineKind,
    pub engine_version: String,
    pub instance_type: String,
    pub allocated_storage_gib: u32,
    pub storage_type: String,
    pub multi_az: bool,
    pub database_name: String,
    pub vpc_id: String,
    /// Subnet group the instance is placed in.
    pub subnet_group: SubnetGroup,
    pub subnet_ids: Vec<String>,
    /// Always false; reachability is granted per source.
    pub publicly_accessible: bool,
    /// Port the instance listens on.
    pub port: u16,
    pub removal_policy: RemovalPolicy,
    pub retain_automated_backups: bool,
    pub credentials: CredentialBundle,
}

impl DatabaseInstance {
    /// Listening port of the instance.
    pub fn port(&self) -> u16 {
        self.port
    }
}

/// Declare the database.
///
/// Placement is the network's public subnet group while public
/// accessibility stays off. Credentials are always generated by the secret
/// store; a store that produces no secret aborts the composition with
/// [`Error::MissingCredentials`].
pub fn provision<B: Backend + ?Sized>(
    backend: &B,
    network: &NetworkRef,
    profile: &EnvironmentProfile,
    config: &DatabaseConfig,
) -> Result<DatabaseInstance> {
    let subnet_group = SubnetGroup::Public;
    let subnet_ids = network.subnet_ids(subnet_group)?;

    let request = SecretRequest {
        owner: DATABASE_ID.to_string(),
        username: config.username.clone(),
    };
    let secret = backend
        .generate_secret(&request)?
        .ok_or_else(|| Error::MissingCredentials {
            database: DATABASE_ID.to_string(),
        })?;

    let port = config.port.unwrap_or_else(|| config.engine.default_port());
    log::debug!(
        "database {} {} on port {port}, teardown {}, backups retained: {}",
        config.engine,
        config.engine_version,
        profile.removal_policy,
        profile.retain_automated_backups
    );

    Ok(DatabaseInstance {
        logical_id: DATABASE_ID.to_string(),
        engine: config.engine,
        engine_version: config.engine_version.clone(),
        instance_type: config.instance_type.clone(),
        allocated_storage_gib: config.allocated_storage_gib,
        storage_type: config.storage_type.clone(),
        multi_az: config.multi_az,
        database_name: config.database_name.clone(),
        vpc_id: network.vpc_id.clone(),
        subnet_group,
        subnet_ids,
        publicly_accessible: false,
        port,
        removal_policy: profile.removal_policy,
        retain_automated_backups: profile.retain_automated_backups,
        credentials: CredentialBundle {
            secret,
            username: config.username.clone(),
        },
    })
}

fn secret_value(bundle: &CredentialBundle, field: SecretField) -> Value {
    json!({ "SecretRef": [bundle.secret.logical_id, field.key()] })
}

impl Resource for DatabaseInstance {
    fn id(&self) -> String {
        self.logical_id.clone()
    }

    fn description(&self) -> String {
        format!(
            "{} {} ({}, {} GiB)",
            self.engine, self.engine_version, self.instance_type, self.allocated_storage_gib
        )
    }

    fn resource_type(&self) -> &'static str {
        "AWS::RDS::DBInstance"
    }

    fn dependencies(&self) -> Vec<String> {
        vec![self.credentials.secret.logical_id.clone()]
    }

    fn properties(&self) -> Value {
        json!({
            "Engine": self.engine.engine_id(),
            "EngineVersion": self.engine_version,
            "DBInstanceClass": self.instance_type,
            "AllocatedStorage": self.allocated_storage_gib.to_string(),
            "StorageType": self.storage_type,
            "MultiAZ": self.multi_az,
            "DBName": self.database_name,
            "Port": self.port.to_string(),
            "PubliclyAccessible": self.publicly_accessible,
            "DBSubnetGroup": {
                "VpcId": self.vpc_id,
                "SubnetGroup": self.subnet_group,
                "SubnetIds": self.subnet_ids,
            },
            "DeleteAutomatedBackups": !self.retain_automated_backups,
            "MasterUsername": secret_value(&self.credentials, SecretField::Username),
            "MasterUserPassword": secret_value(&self.credentials, SecretField::Password),
        })
    }

    fn removal_policy(&self) -> Option<RemovalPolicy> {
        Some(self.removal_policy)
    }
}

impl Resource for CredentialBundle {
    fn id(&self) -> String {
        self.secret.logical_id.clone()
    }

    fn description(&self) -> String {
        format!("Generated credentials for {}", self.username)
    }

    fn resource_type(&self) -> &'static str {
        "AWS::SecretsManager::Secret"
    }

    fn properties(&self) -> Value {
        json!({
            "Name": self.secret.name,
            "GenerateSecretString": {
                "SecretStringTemplate": { "username": self.username },
                "GenerateStringKey": SecretField::Password.key(),
                "ExcludeCharacters": EXCLUDED_PASSWORD_CHARACTERS,
            },
            "Fields": SecretField::ALL.iter().map(SecretField::key).collect::<Vec<_>>(),
        })
    }
}
