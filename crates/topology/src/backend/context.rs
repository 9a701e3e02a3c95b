//! Context-file backend.
//!
//! Answers lookups from a cached JSON document (`tierstack.context.json`)
//! recorded for each account/region, and resolves images against the
//! local filesystem. Secrets are always generated server-side at deploy
//! time, so this backend only hands out references to them.
//!
//! ```json
//! {
//!   "networks": [
//!     {
//!       "account": "123456789012",
//!       "region": "eu-west-1",
//!       "is_default": true,
//!       "vpc_id": "vpc-0abc",
//!       "public_subnets": [{ "id": "subnet-1", "availability_zone": "eu-west-1a" }]
//!     }
//!   ],
//!   "hosted_zones": [
//!     { "account": "123456789012", "name": "example.com", "zone_id": "Z123" }
//!   ]
//! }
//! ```

use crate::backend::{Backend, secret_for};
use crate::error::{Error, Result};
use crate::types::{
    DeployTarget, HostedZone, ImageLocator, ImageSource, NetworkLookup, NetworkRef, SecretRef,
    SecretRequest, Subnet,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default file name of the lookup context.
pub const CONTEXT_FILE: &str = "tierstack.context.json";

/// A cached network lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkEntry {
    pub account: String,
    pub region: String,
    #[serde(default)]
    pub is_default: bool,
    pub vpc_id: String,
    #[serde(default)]
    pub public_subnets: Vec<Subnet>,
    #[serde(default)]
    pub private_subnets: Vec<Subnet>,
}

impl NetworkEntry {
    fn matches(&self, target: &DeployTarget, lookup: &NetworkLookup) -> bool {
        self.account == target.account
            && self.region == target.region
            && self.is_default == lookup.is_default
    }

    fn to_network(&self) -> NetworkRef {
        NetworkRef {
            vpc_id: self.vpc_id.clone(),
            is_default: self.is_default,
            public_subnets: self.public_subnets.clone(),
            private_subnets: self.private_subnets.clone(),
        }
    }
}

/// A cached hosted zone lookup.
///
/// Zones are global, so only the account is recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneEntry {
    pub account: String,
    pub name: String,
    pub zone_id: String,
}

/// Contents of a lookup context file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupContext {
    #[serde(default)]
    pub networks: Vec<NetworkEntry>,
    #[serde(default)]
    pub hosted_zones: Vec<ZoneEntry>,
}

impl LookupContext {
    /// Render as pretty JSON.
    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::config(e.to_string()))
    }
}

/// Backend reading lookups from a context file.
#[derive(Debug, Clone)]
pub struct ContextBackend {
    path: PathBuf,
    context: LookupContext,
}

impl ContextBackend {
    /// Load a context file.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| Error::io(&path, e))?;
        let context = serde_json::from_str(&content).map_err(|e| Error::InvalidDocument {
            kind: "lookup context",
            path: path.clone(),
            message: e.to_string(),
        })?;
        log::debug!("loaded lookup context from {}", path.display());
        Ok(Self { path, context })
    }

    /// Wrap an in-memory context.
    pub fn from_context(path: impl Into<PathBuf>, context: LookupContext) -> Self {
        Self {
            path: path.into(),
            context,
        }
    }

    /// Where the context came from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn context(&self) -> &LookupContext {
        &self.context
    }
}

impl Backend for ContextBackend {
    fn lookup_network(
        &self,
        target: &DeployTarget,
        lookup: &NetworkLookup,
    ) -> Result<Option<NetworkRef>> {
        Ok(self
            .context
            .networks
            .iter()
            .find(|entry| entry.matches(target, lookup))
            .map(NetworkEntry::to_network))
    }

    fn lookup_zone(&self, target: &DeployTarget, domain: &str) -> Result<Option<HostedZone>> {
        let domain = domain.trim_end_matches('.');
        Ok(self
            .context
            .hosted_zones
            .iter()
            .find(|z| {
                z.account == target.account
                    && z.name.trim_end_matches('.').eq_ignore_ascii_case(domain)
            })
            .map(|z| HostedZone {
                zone_id: z.zone_id.clone(),
                name: z.name.trim_end_matches('.').to_ascii_lowercase(),
            }))
    }

    fn generate_secret(&self, request: &SecretRequest) -> Result<Option<SecretRef>> {
        Ok(Some(secret_for(request)))
    }

    fn resolve_image(&self, source: &ImageSource) -> Result<ImageLocator> {
        let unresolved = |path: &Path, reason: &str| Error::ImageBuildContext {
            container: source.container.clone(),
            path: path.to_path_buf(),
            reason: reason.to_string(),
        };

        if !source.context.is_dir() {
            return Err(unresolved(&source.context, "build context is not a directory"));
        }
        let build_file = source.context.join(&source.file);
        if !build_file.is_file() {
            return Err(unresolved(&build_file, "build file not found"));
        }

        let content = std::fs::read(&build_file).map_err(|e| Error::io(&build_file, e))?;
        let mut hasher = blake3::Hasher::new();
        hasher.update(source.file.to_string_lossy().as_bytes());
        hasher.update(&content);
        let asset_hash = hasher.finalize().to_hex().to_string();

        log::debug!(
            "image for {} from {} ({})",
            source.container,
            build_file.display(),
            &asset_hash[..12]
        );
        Ok(ImageLocator {
            context: source.context.clone(),
            file: source.file.clone(),
            asset_hash,
        })
    }
}
