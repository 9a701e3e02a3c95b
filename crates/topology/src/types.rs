//! Handles passed between composition steps.
//!
//! These are references to things that exist (or will exist) outside the
//! process: networks, zones, secrets, image build contexts. Steps receive
//! them as explicit inputs and never reach into each other's state.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Environment variable carrying the target account.
pub const ACCOUNT_ENV: &str = "CDK_DEFAULT_ACCOUNT";

/// Environment variable carrying the target region.
pub const REGION_ENV: &str = "CDK_DEFAULT_REGION";

/// Account and region the stack is composed for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeployTarget {
    /// Cloud account id.
    pub account: String,
    /// Region name, e.g. `eu-west-1`.
    pub region: String,
}

impl DeployTarget {
    /// Create a target from known values.
    pub fn new(account: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            region: region.into(),
        }
    }

    /// Build a target from optional values, naming the missing variable.
    ///
    /// Lookups are account/region specific, so both must be present and
    /// non-blank.
    pub fn resolve(account: Option<String>, region: Option<String>) -> Result<Self> {
        let account = account
            .filter(|a| !a.trim().is_empty())
            .ok_or(Error::MissingDeployTarget {
                variable: ACCOUNT_ENV,
            })?;
        let region = region
            .filter(|r| !r.trim().is_empty())
            .ok_or(Error::MissingDeployTarget {
                variable: REGION_ENV,
            })?;
        Ok(Self::new(account.trim(), region.trim()))
    }
}

impl fmt::Display for DeployTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.account, self.region)
    }
}

// ============================================================================
// Network
// ============================================================================

/// Subnet grouping within a network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubnetGroup {
    /// Subnets with a route to an internet gateway.
    Public,
    /// Subnets without direct internet routing.
    Private,
}

impl fmt::Display for SubnetGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Public => write!(f, "public"),
            Self::Private => write!(f, "private"),
        }
    }
}

/// A single subnet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Subnet {
    /// Subnet id.
    pub id: String,
    /// Availability zone the subnet lives in.
    pub availability_zone: String,
}

/// Lookup key for an existing network.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NetworkLookup {
    /// Select the account's default network.
    pub is_default: bool,
}

impl NetworkLookup {
    /// Lookup for the default network.
    pub fn default_network() -> Self {
        Self { is_default: true }
    }
}

impl fmt::Display for NetworkLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_default {
            write!(f, "default")
        } else {
            write!(f, "non-default")
        }
    }
}

/// Handle to an existing network and its subnet groupings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NetworkRef {
    /// Network id.
    pub vpc_id: String,
    /// Whether this is the account's default network.
    #[serde(default)]
    pub is_default: bool,
    /// Public subnets.
    #[serde(default)]
    pub public_subnets: Vec<Subnet>,
    /// Private subnets.
    #[serde(default)]
    pub private_subnets: Vec<Subnet>,
}

impl NetworkRef {
    /// Subnets in a group.
    pub fn subnets(&self, group: SubnetGroup) -> &[Subnet] {
        match group {
            SubnetGroup::Public => &self.public_subnets,
            SubnetGroup::Private => &self.private_subnets,
        }
    }

    /// Subnet ids in a group, failing if the group is empty.
    pub fn subnet_ids(&self, group: SubnetGroup) -> Result<Vec<String>> {
        let subnets = self.subnets(group);
        if subnets.is_empty() {
            return Err(Error::EmptySubnetGroup {
                vpc_id: self.vpc_id.clone(),
                group,
            });
        }
        Ok(subnets.iter().map(|s| s.id.clone()).collect())
    }
}

// ============================================================================
// DNS
// ============================================================================

/// Handle to an existing DNS hosted zone.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HostedZone {
    /// Zone id.
    pub zone_id: String,
    /// Zone apex, e.g. `example.com`.
    pub name: String,
}

// ============================================================================
// Secrets
// ============================================================================

/// Request for a server-side generated credential secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretRequest {
    /// Logical id of the resource that owns the secret.
    pub owner: String,
    /// Username stored alongside the generated password.
    pub username: String,
}

/// Reference to a secret held by the secret store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SecretRef {
    /// Logical id of the secret in the resource graph.
    pub logical_id: String,
    /// Name of the secret in the secret store.
    pub name: String,
}

/// Named fields of a database credential secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SecretField {
    Username,
    Password,
    Host,
    DbName,
    Port,
}

impl SecretField {
    /// Every field, in injection order.
    pub const ALL: [SecretField; 5] = [
        SecretField::Username,
        SecretField::Password,
        SecretField::Host,
        SecretField::DbName,
        SecretField::Port,
    ];

    /// Key of the field inside the secret document.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Username => "username",
            Self::Password => "password",
            Self::Host => "host",
            Self::DbName => "dbname",
            Self::Port => "port",
        }
    }

    /// Environment variable the field is injected as.
    pub fn env_name(&self) -> &'static str {
        match self {
            Self::Username => "DB_USER",
            Self::Password => "DB_PASS",
            Self::Host => "DB_HOST",
            Self::DbName => "DB_NAME",
            Self::Port => "DB_PORT",
        }
    }
}

/// Generated database credentials, owned by the database.
///
/// Downstream steps hold [`SecretFieldRef`]s into the bundle, never the
/// values themselves.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CredentialBundle {
    /// The generated secret.
    pub secret: SecretRef,
    /// Username the secret was generated for.
    pub username: String,
}

impl CredentialBundle {
    /// Reference one field of the bundle.
    pub fn field(&self, field: SecretField) -> SecretFieldRef {
        SecretFieldRef {
            secret_id: self.secret.logical_id.clone(),
            field,
        }
    }
}

/// Reference to one field of a secret.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SecretFieldRef {
    /// Logical id of the secret.
    pub secret_id: String,
    /// Field within the secret.
    pub field: SecretField,
}

// ============================================================================
// Images
// ============================================================================

/// Where a container image is built from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageSource {
    /// Container the image is for.
    pub container: String,
    /// Build context directory.
    pub context: PathBuf,
    /// Build file, relative to the context.
    pub file: PathBuf,
}

/// A resolved image build.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageLocator {
    /// Build context directory.
    pub context: PathBuf,
    /// Build file, relative to the context.
    pub file: PathBuf,
    /// Content hash identifying the asset.
    pub asset_hash: String,
}
