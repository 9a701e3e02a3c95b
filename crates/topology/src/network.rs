//! Network resolution.
//!
//! The network is never created here; it must already exist in the target
//! account/region.

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::types::{DeployTarget, NetworkLookup, NetworkRef};

/// Resolve an existing network.
///
/// Fails with [`Error::NetworkNotFound`] when nothing matches. Safe to call
/// any number of times.
pub fn resolve<B: Backend + ?Sized>(
    backend: &B,
    target: &DeployTarget,
    lookup: &NetworkLookup,
) -> Result<NetworkRef> {
    let network = backend
        .lookup_network(target, lookup)?
        .ok_or_else(|| Error::NetworkNotFound {
            lookup: lookup.to_string(),
            account: target.account.clone(),
            region: target.region.clone(),
        })?;

    log::debug!(
        "network {} ({} public / {} private subnets)",
        network.vpc_id,
        network.public_subnets.len(),
        network.private_subnets.len()
    );
    Ok(network)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockBackend;

    fn target() -> DeployTarget {
        DeployTarget::new("123456789012", "eu-west-1")
    }

    #[test]
    fn test_resolve_default_network() {
        let backend = MockBackend::with_default_fixtures(&target());
        let network = resolve(&backend, &target(), &NetworkLookup::default_network()).unwrap();
        assert!(network.is_default);
        assert!(!network.public_subnets.is_empty());
    }

    #[test]
    fn test_resolve_missing_network() {
        let backend = MockBackend::new();
        let err = resolve(&backend, &target(), &NetworkLookup::default_network()).unwrap_err();
        match err {
            Error::NetworkNotFound {
                lookup,
                account,
                region,
            } => {
                assert_eq!(lookup, "default");
                assert_eq!(account, "123456789012");
                assert_eq!(region, "eu-west-1");
            }
            other => panic!("expected NetworkNotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_resolve_is_repeatable() {
        let backend = MockBackend::with_default_fixtures(&target());
        let lookup = NetworkLookup::default_network();
        let first = resolve(&backend, &target(), &lookup).unwrap();
        let second = resolve(&backend, &target(), &lookup).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_resolve_other_region_not_found() {
        let backend = MockBackend::with_default_fixtures(&target());
        let other = DeployTarget::new("123456789012", "us-east-1");
        assert!(resolve(&backend, &other, &NetworkLookup::default_network()).is_err());
    }
}
