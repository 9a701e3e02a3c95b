//! DNS zone and certificate resolution.

use crate::backend::Backend;
use crate::config::DomainConfig;
use crate::error::{Error, Result};
use crate::types::{DeployTarget, HostedZone};
use declarative::Resource;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

pub const CERTIFICATE_ID: &str = "SiteCertificate";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ValidationMethod {
    Dns,
}

/// A certificate request for one hostname.
///
/// Issuance happens after deployment; nothing here waits for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    pub logical_id: String,
    pub domain_name: String,
    /// Zone the validation records are written to.
    pub zone_id: String,
    /// Region the certificate is issued in (the stack's region).
    pub region: String,
    pub validation: ValidationMethod,
}

/// Zone plus the certificate bound to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeBinding {
    pub zone: HostedZone,
    pub certificate: Certificate,
}

impl EdgeBinding {
    /// Hostname the service answers on.
    pub fn hostname(&self) -> &str {
        &self.certificate.domain_name
    }
}

/// Resolve the hosted zone and request a certificate for the hostname.
pub fn resolve<B: Backend + ?Sized>(
    backend: &B,
    target: &DeployTarget,
    domain: &DomainConfig,
) -> Result<EdgeBinding> {
    let zone = backend
        .lookup_zone(target, &domain.root_domain)?
        .ok_or_else(|| Error::ZoneNotFound {
            domain: domain.root_domain.clone(),
        })?;

    let certificate = Certificate {
        logical_id: CERTIFICATE_ID.to_string(),
        domain_name: domain.hostname.to_ascii_lowercase(),
        zone_id: zone.zone_id.clone(),
        region: target.region.clone(),
        validation: ValidationMethod::Dns,
    };
    log::debug!(
        "certificate for {} validated through zone {} ({})",
        certificate.domain_name,
        zone.name,
        zone.zone_id
    );

    Ok(EdgeBinding { zone, certificate })
}

impl Resource for Certificate {
    fn id(&self) -> String {
        self.logical_id.clone()
    }

    fn description(&self) -> String {
        format!("TLS certificate for {}", self.domain_name)
    }

    fn resource_type(&self) -> &'static str {
        "AWS::CertificateManager::Certificate"
    }

    fn properties(&self) -> Value {
        json!({
            "DomainName": self.domain_name,
            "ValidationMethod": self.validation,
            "DomainValidationOptions": [
                { "DomainName": self.domain_name, "HostedZoneId": self.zone_id }
            ],
            "Region": self.region,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockBackend;

    fn target() -> DeployTarget {
        DeployTarget::new("123456789012", "eu-west-1")
    }

    #[test]
    fn test_certificate_for_hostname() {
        let backend = MockBackend::with_default_fixtures(&target());
        let binding = resolve(&backend, &target(), &DomainConfig::default()).unwrap();

        assert_eq!(binding.hostname(), "app.example.com");
        assert_eq!(binding.certificate.zone_id, binding.zone.zone_id);
        assert_eq!(binding.certificate.region, "eu-west-1");
        assert_eq!(binding.certificate.validation, ValidationMethod::Dns);
        assert_eq!(binding.certificate.properties()["ValidationMethod"], json!("DNS"));
    }

    #[test]
    fn test_zone_not_found() {
        let backend = MockBackend::with_default_fixtures(&target());
        let domain = DomainConfig {
            root_domain: "example.org".into(),
            hostname: "app.example.org".into(),
        };
        let err = resolve(&backend, &target(), &domain).unwrap_err();
        match err {
            Error::ZoneNotFound { domain } => assert_eq!(domain, "example.org"),
            other => panic!("expected ZoneNotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_resolution_is_repeatable() {
        let backend = MockBackend::with_default_fixtures(&target());
        let first = resolve(&backend, &target(), &DomainConfig::default()).unwrap();
        let second = resolve(&backend, &target(), &DomainConfig::default()).unwrap();
        assert_eq!(first, second);
    }
}
