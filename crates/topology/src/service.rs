//! Public service composition and the database access grant.
//!
//! The service is the composition root: it references the cluster, task,
//! certificate, zone and network produced by the earlier steps. Replica
//! count, redirect and health-check policy are fixed.

use crate::certificate::EdgeBinding;
use crate::compute::{ComputeTopology, Protocol};
use crate::database::DatabaseInstance;
use crate::error::Result;
use crate::types::{NetworkRef, SubnetGroup};
use declarative::Resource;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::time::Duration;

pub const SERVICE_ID: &str = "Service";
pub const GRANT_ID: &str = "DatabaseIngressFromService";

/// Desired replica count.
pub const DESIRED_COUNT: u32 = 1;

/// Status codes the health check treats as healthy.
pub const HEALTHY_HTTP_CODES: [u16; 2] = [200, 307];

/// Health check interval.
pub const HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Port of the secure listener.
pub const SECURE_PORT: u16 = 443;

/// Port redirected to the secure listener.
pub const PLAINTEXT_PORT: u16 = 80;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheck {
    pub healthy_codes: Vec<u16>,
    pub interval: Duration,
}

impl HealthCheck {
    /// Codes in the provider's matcher syntax, e.g. `"200,307"`.
    pub fn http_codes(&self) -> String {
        self.healthy_codes
            .iter()
            .map(u16::to_string)
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl Default for HealthCheck {
    fn default() -> Self {
        Self {
            healthy_codes: HEALTHY_HTTP_CODES.to_vec(),
            interval: HEALTH_CHECK_INTERVAL,
        }
    }
}

/// Where task tags are copied from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TagPropagation {
    Service,
}

/// The publicly reachable, load-balanced service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicService {
    pub logical_id: String,
    pub cluster_id: String,
    pub task_id: String,
    pub certificate_id: String,
    pub hostname: String,
    pub zone_id: String,
    pub desired_count: u32,
    pub listener_port: u16,
    /// Plaintext port redirected to the secure listener.
    pub redirect_from: Option<u16>,
    /// Edge container port the load balancer forwards to.
    pub target_port: u16,
    pub subnet_group: SubnetGroup,
    pub subnet_ids: Vec<String>,
    pub assign_public_ip: bool,
    pub health_check: HealthCheck,
    pub propagate_tags: TagPropagation,
}

/// Compose the public service.
///
/// Tasks run in the public subnet group with a public address, so no NAT is
/// needed for outbound traffic.
pub fn compose(
    compute: &ComputeTopology,
    edge: &EdgeBinding,
    network: &NetworkRef,
) -> Result<PublicService> {
    let subnet_group = SubnetGroup::Public;
    let subnet_ids = network.subnet_ids(subnet_group)?;

    let service = PublicService {
        logical_id: SERVICE_ID.to_string(),
        cluster_id: compute.cluster.logical_id.clone(),
        task_id: compute.task.logical_id().to_string(),
        certificate_id: edge.certificate.logical_id.clone(),
        hostname: edge.hostname().to_string(),
        zone_id: edge.zone.zone_id.clone(),
        desired_count: DESIRED_COUNT,
        listener_port: SECURE_PORT,
        redirect_from: Some(PLAINTEXT_PORT),
        target_port: compute.task.exposed_port().container_port,
        subnet_group,
        subnet_ids,
        assign_public_ip: subnet_group == SubnetGroup::Public,
        health_check: HealthCheck::default(),
        propagate_tags: TagPropagation::Service,
    };
    log::debug!(
        "service on https://{} -> {}:{}",
        service.hostname,
        compute.task.edge().name,
        service.target_port
    );
    Ok(service)
}

/// Permission for the service to reach the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkAccessGrant {
    pub logical_id: String,
    pub source_id: String,
    pub target_id: String,
    pub port: u16,
    pub protocol: Protocol,
}

/// Allow the service to reach the database on its listening port.
pub fn grant_database_access(
    service: &PublicService,
    database: &DatabaseInstance,
) -> NetworkAccessGrant {
    NetworkAccessGrant {
        logical_id: GRANT_ID.to_string(),
        source_id: service.logical_id.clone(),
        target_id: database.logical_id.clone(),
        port: database.port(),
        protocol: Protocol::Tcp,
    }
}

impl Resource for PublicService {
    fn id(&self) -> String {
        self.logical_id.clone()
    }

    fn description(&self) -> String {
        format!(
            "Load-balanced service for {} ({} replica)",
            self.hostname, self.desired_count
        )
    }

    fn resource_type(&self) -> &'static str {
        "AWS::ECS::Service"
    }

    fn dependencies(&self) -> Vec<String> {
        vec![
            self.cluster_id.clone(),
            self.task_id.clone(),
            self.certificate_id.clone(),
        ]
    }

    fn properties(&self) -> Value {
        json!({
            "Cluster": { "Ref": self.cluster_id },
            "TaskDefinition": { "Ref": self.task_id },
            "DesiredCount": self.desired_count,
            "LaunchType": "FARGATE",
            "PropagateTags": self.propagate_tags,
            "NetworkConfiguration": {
                "Subnets": self.subnet_ids,
                "AssignPublicIp": if self.assign_public_ip { "ENABLED" } else { "DISABLED" },
            },
            "LoadBalancer": {
                "Scheme": "internet-facing",
                "Listener": {
                    "Port": self.listener_port,
                    "Protocol": "HTTPS",
                    "Certificate": { "Ref": self.certificate_id },
                },
                "RedirectFrom": self.redirect_from,
                "TargetPort": self.target_port,
                "HealthCheck": {
                    "Matcher": self.health_check.http_codes(),
                    "IntervalSeconds": self.health_check.interval.as_secs(),
                },
            },
            "DnsRecord": {
                "Name": self.hostname,
                "HostedZoneId": self.zone_id,
            },
        })
    }
}

impl Resource for NetworkAccessGrant {
    fn id(&self) -> String {
        self.logical_id.clone()
    }

    fn description(&self) -> String {
        format!(
            "{} may reach {} on {}/{}",
            self.source_id, self.target_id, self.protocol, self.port
        )
    }

    fn resource_type(&self) -> &'static str {
        "AWS::EC2::SecurityGroupIngress"
    }

    fn dependencies(&self) -> Vec<String> {
        vec![self.source_id.clone(), self.target_id.clone()]
    }

    fn properties(&self) -> Value {
        json!({
            "Source": { "Ref": self.source_id },
            "Target": { "Ref": self.target_id },
            "IpProtocol": self.protocol,
            "FromPort": self.port,
            "ToPort": self.port,
        })
    }
}
