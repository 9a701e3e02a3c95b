//! Backend traits and implementations for provider lookups.
//!
//! Composition never talks to a cloud provider directly. Everything it
//! needs from the outside world (existing networks, DNS zones, generated
//! secrets, image build contexts) goes through the [`Backend`] trait.
//!
//! The primary implementation is [`context::ContextBackend`], which answers
//! lookups from a cached context file and resolves images on the local
//! filesystem.
//!
//! # Testing
//!
//! Use [`MockBackend`] for testing without a context file:
//!
//! ```
//! use topology::backend::{Backend, MockBackend};
//! use topology::{DeployTarget, NetworkLookup};
//!
//! let target = DeployTarget::new("123456789012", "eu-west-1");
//! let mock = MockBackend::with_default_fixtures(&target);
//!
//! let network = mock
//!     .lookup_network(&target, &NetworkLookup::default_network())
//!     .unwrap();
//! assert!(network.is_some());
//! ```

pub mod context;

use crate::error::{Error, Result};
use crate::types::{
    DeployTarget, HostedZone, ImageLocator, ImageSource, NetworkLookup, NetworkRef, SecretRef,
    SecretRequest, Subnet,
};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Backend trait for provider lookups.
///
/// Implementations must be side-effect free apart from secret generation
/// requests, and lookups must be repeatable.
pub trait Backend: Send + Sync {
    /// Find an existing network in the target account/region.
    ///
    /// Returns `Ok(None)` when nothing matches.
    fn lookup_network(
        &self,
        target: &DeployTarget,
        lookup: &NetworkLookup,
    ) -> Result<Option<NetworkRef>>;

    /// Find the hosted zone for a root domain.
    ///
    /// Returns `Ok(None)` when the zone does not exist.
    fn lookup_zone(&self, target: &DeployTarget, domain: &str) -> Result<Option<HostedZone>>;

    /// Request a generated credential secret.
    ///
    /// Returns `Ok(None)` if the store declined to produce one.
    fn generate_secret(&self, request: &SecretRequest) -> Result<Option<SecretRef>>;

    /// Resolve a container image from its build context.
    ///
    /// # Errors
    ///
    /// Returns `Error::ImageBuildContext` if the context or build file is
    /// missing.
    fn resolve_image(&self, source: &ImageSource) -> Result<ImageLocator>;
}

/// Derive the secret handle for an owner.
pub(crate) fn secret_for(request: &SecretRequest) -> SecretRef {
    SecretRef {
        logical_id: format!("{}Secret", request.owner),
        name: format!("{}/credentials", request.owner),
    }
}

// ============================================================================
// Mock
// ============================================================================

/// A call recorded by [`MockBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    LookupNetwork,
    LookupZone(String),
    GenerateSecret(String),
    ResolveImage(String),
}

#[derive(Debug, Default)]
struct MockState {
    networks: HashMap<(String, String), NetworkRef>,
    zones: HashMap<(String, String), HostedZone>,
    secrets_enabled: bool,
    failing_images: HashSet<String>,
    calls: Vec<BackendCall>,
}

/// Mock backend for testing without a context file.
///
/// Stores networks and zones in memory and records every call, so tests can
/// check which steps ran.
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    /// Create a mock that knows nothing and generates no secrets.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock with a default network and an `example.com` zone for
    /// one target, with secret generation and image resolution working.
    #[must_use]
    pub fn with_default_fixtures(target: &DeployTarget) -> Self {
        let mut mock = Self::new();
        mock.add_network(target, Self::sample_network());
        mock.add_zone(
            target,
            HostedZone {
                zone_id: "Z0123456789EXAMPLE".to_string(),
                name: "example.com".to_string(),
            },
        );
        mock.lock().secrets_enabled = true;
        mock
    }

    /// The network used by [`MockBackend::with_default_fixtures`].
    #[must_use]
    pub fn sample_network() -> NetworkRef {
        let subnet = |id: &str, az: &str| Subnet {
            id: id.to_string(),
            availability_zone: az.to_string(),
        };
        NetworkRef {
            vpc_id: "vpc-0default".to_string(),
            is_default: true,
            public_subnets: vec![
                subnet("subnet-public-a", "eu-west-1a"),
                subnet("subnet-public-b", "eu-west-1b"),
            ],
            private_subnets: vec![],
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn key(target: &DeployTarget) -> (String, String) {
        (target.account.clone(), target.region.clone())
    }

    /// Register a network for a target.
    pub fn add_network(&mut self, target: &DeployTarget, network: NetworkRef) {
        self.lock().networks.insert(Self::key(target), network);
    }

    /// Register a hosted zone for a target.
    pub fn add_zone(&mut self, target: &DeployTarget, zone: HostedZone) {
        let key = (target.account.clone(), zone.name.to_ascii_lowercase());
        self.lock().zones.insert(key, zone);
    }

    /// Make the secret store decline every request.
    pub fn fail_secret_generation(&self) {
        self.lock().secrets_enabled = false;
    }

    /// Make image resolution fail for one container.
    pub fn fail_image(&self, container: impl Into<String>) {
        self.lock().failing_images.insert(container.into());
    }

    /// Calls made so far, in order.
    pub fn calls(&self) -> Vec<BackendCall> {
        self.lock().calls.clone()
    }
}

impl Backend for MockBackend {
    fn lookup_network(
        &self,
        target: &DeployTarget,
        lookup: &NetworkLookup,
    ) -> Result<Option<NetworkRef>> {
        let mut state = self.lock();
        state.calls.push(BackendCall::LookupNetwork);
        Ok(state
            .networks
            .get(&Self::key(target))
            .filter(|n| n.is_default == lookup.is_default)
            .cloned())
    }

    fn lookup_zone(&self, target: &DeployTarget, domain: &str) -> Result<Option<HostedZone>> {
        let mut state = self.lock();
        state.calls.push(BackendCall::LookupZone(domain.to_string()));
        let key = (target.account.clone(), domain.to_ascii_lowercase());
        Ok(state.zones.get(&key).cloned())
    }

    fn generate_secret(&self, request: &SecretRequest) -> Result<Option<SecretRef>> {
        let mut state = self.lock();
        state
            .calls
            .push(BackendCall::GenerateSecret(request.owner.clone()));
        Ok(state.secrets_enabled.then(|| secret_for(request)))
    }

    fn resolve_image(&self, source: &ImageSource) -> Result<ImageLocator> {
        let mut state = self.lock();
        state
            .calls
            .push(BackendCall::ResolveImage(source.container.clone()));

        if state.failing_images.contains(&source.container) {
            return Err(Error::ImageBuildContext {
                container: source.container.clone(),
                path: source.context.join(&source.file),
                reason: "build file not found".to_string(),
            });
        }

        let mut hasher = blake3::Hasher::new();
        hasher.update(source.context.to_string_lossy().as_bytes());
        hasher.update(source.file.to_string_lossy().as_bytes());
        Ok(ImageLocator {
            context: source.context.clone(),
            file: source.file.clone(),
            asset_hash: hasher.finalize().to_hex().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn target() -> DeployTarget {
        DeployTarget::new("123456789012", "eu-west-1")
    }

    #[test]
    fn test_mock_backend_new() {
        let mock = MockBackend::new();
        let network = mock
            .lookup_network(&target(), &NetworkLookup::default_network())
            .unwrap();
        assert!(network.is_none());

        let request = SecretRequest {
            owner: "Database".into(),
            username: "db_user".into(),
        };
        assert!(mock.generate_secret(&request).unwrap().is_none());
    }

    #[test]
    fn test_mock_backend_fixtures() {
        let mock = MockBackend::with_default_fixtures(&target());
        let zone = mock.lookup_zone(&target(), "EXAMPLE.com").unwrap().unwrap();
        assert_eq!(zone.name, "example.com");

        let request = SecretRequest {
            owner: "Database".into(),
            username: "db_user".into(),
        };
        let secret = mock.generate_secret(&request).unwrap().unwrap();
        assert_eq!(secret.logical_id, "DatabaseSecret");
        assert_eq!(secret.name, "Database/credentials");
    }

    #[test]
    fn test_mock_backend_non_default_lookup() {
        let mock = MockBackend::with_default_fixtures(&target());
        let lookup = NetworkLookup { is_default: false };
        assert!(mock.lookup_network(&target(), &lookup).unwrap().is_none());
    }

    #[test]
    fn test_mock_backend_records_calls() {
        let mock = MockBackend::with_default_fixtures(&target());
        mock.lookup_network(&target(), &NetworkLookup::default_network())
            .unwrap();
        mock.lookup_zone(&target(), "example.com").unwrap();
        assert_eq!(
            mock.calls(),
            vec![
                BackendCall::LookupNetwork,
                BackendCall::LookupZone("example.com".into())
            ]
        );
    }

    #[test]
    fn test_mock_backend_image_hash_is_stable() {
        let mock = MockBackend::with_default_fixtures(&target());
        let source = ImageSource {
            container: "nginx".into(),
            context: PathBuf::from("app"),
            file: PathBuf::from("docker/nginx/Dockerfile"),
        };
        let first = mock.resolve_image(&source).unwrap();
        let second = mock.resolve_image(&source).unwrap();
        assert_eq!(first.asset_hash, second.asset_hash);
        assert_eq!(first.asset_hash.len(), 64);
    }

    #[test]
    fn test_mock_backend_failing_image() {
        let mock = MockBackend::with_default_fixtures(&target());
        mock.fail_image("php");
        let source = ImageSource {
            container: "php".into(),
            context: PathBuf::from("app"),
            file: PathBuf::from("docker/php-fpm/Dockerfile"),
        };
        let err = mock.resolve_image(&source).unwrap_err();
        assert!(matches!(err, Error::ImageBuildContext { .. }));
    }
}
