//! Composition root.
//!
//! Runs the fixed chain of composition steps, once each, in order. Every
//! step receives the handles it needs from earlier steps as explicit
//! arguments. The first failure aborts the chain; no partial topology is
//! ever returned.

use crate::backend::Backend;
use crate::certificate::{self, EdgeBinding};
use crate::compute::{self, ComputeTopology};
use crate::config::StackConfig;
use crate::database::{self, DatabaseInstance};
use crate::error::Result;
use crate::network;
use crate::profile::{EnvironmentMode, EnvironmentProfile};
use crate::service::{self, NetworkAccessGrant, PublicService};
use crate::template::{self, TemplateMetadata};
use crate::types::{DeployTarget, NetworkLookup, NetworkRef};
use declarative::ExecutionPlan;
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;

/// Steps of the composition chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompositionStep {
    Network,
    Database,
    Compute,
    Certificate,
    Service,
    AccessGrant,
}

impl CompositionStep {
    /// The chain, in execution order.
    pub const ORDER: [CompositionStep; 6] = [
        CompositionStep::Network,
        CompositionStep::Database,
        CompositionStep::Compute,
        CompositionStep::Certificate,
        CompositionStep::Service,
        CompositionStep::AccessGrant,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Network => "resolve network",
            Self::Database => "provision database",
            Self::Compute => "build compute topology",
            Self::Certificate => "resolve zone and certificate",
            Self::Service => "compose public service",
            Self::AccessGrant => "grant database access",
        }
    }
}

impl fmt::Display for CompositionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Inputs of one composition run.
#[derive(Debug, Clone)]
pub struct CompositionRequest {
    pub config: StackConfig,
    pub mode: EnvironmentMode,
    pub target: DeployTarget,
    /// Directory the build context is resolved against.
    pub project_root: PathBuf,
}

/// The fully composed topology.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    pub stack_name: String,
    pub description: Option<String>,
    pub target: DeployTarget,
    pub profile: EnvironmentProfile,
    pub network: NetworkRef,
    pub database: DatabaseInstance,
    pub compute: ComputeTopology,
    pub edge: EdgeBinding,
    pub service: PublicService,
    pub grant: NetworkAccessGrant,
}

fn step(n: usize, s: CompositionStep) {
    log::info!("[{n}/{}] {s}", CompositionStep::ORDER.len());
}

/// Compose the stack.
///
/// The configuration is validated before the first lookup.
pub fn compose<B: Backend + ?Sized>(backend: &B, request: &CompositionRequest) -> Result<Topology> {
    let config = &request.config;
    config.validate()?;
    let profile = EnvironmentProfile::for_mode(request.mode);
    let stack_name = config.stack_name(request.mode);
    log::info!(
        "composing {stack_name} for {} ({} mode)",
        request.target,
        request.mode
    );
    if profile.is_destructive() {
        log::warn!("{stack_name}: database is destroyed with the stack and backups are not kept");
    }

    step(1, CompositionStep::Network);
    let network = network::resolve(backend, &request.target, &NetworkLookup::default_network())?;

    step(2, CompositionStep::Database);
    let database = database::provision(backend, &network, &profile, &config.database)?;

    step(3, CompositionStep::Compute);
    let compute = compute::build(
        backend,
        &network,
        &database,
        &config.compute,
        &request.project_root,
    )?;

    step(4, CompositionStep::Certificate);
    let edge = certificate::resolve(backend, &request.target, &config.domain)?;

    step(5, CompositionStep::Service);
    let service = service::compose(&compute, &edge, &network)?;

    step(6, CompositionStep::AccessGrant);
    let grant = service::grant_database_access(&service, &database);

    Ok(Topology {
        stack_name,
        description: config.stack.description.clone(),
        target: request.target.clone(),
        profile,
        network,
        database,
        compute,
        edge,
        service,
        grant,
    })
}

impl Topology {
    pub fn mode(&self) -> EnvironmentMode {
        self.profile.mode
    }

    /// Declared resources, in dependency order.
    pub fn to_plan(&self) -> Result<ExecutionPlan> {
        let mut plan = ExecutionPlan::new();
        plan.add_resource(Box::new(self.database.credentials.clone()))?;
        plan.add_resource(Box::new(self.database.clone()))?;
        plan.add_resource(Box::new(self.compute.cluster.clone()))?;
        plan.add_resource(Box::new(self.compute.task.log().clone()))?;
        plan.add_resource(Box::new(self.compute.task.clone()))?;
        plan.add_resource(Box::new(self.edge.certificate.clone()))?;
        plan.add_resource(Box::new(self.service.clone()))?;
        plan.add_resource(Box::new(self.grant.clone()))?;
        Ok(plan)
    }

    pub fn metadata(&self) -> TemplateMetadata {
        TemplateMetadata {
            stack_name: self.stack_name.clone(),
            description: self.description.clone(),
            account: self.target.account.clone(),
            region: self.target.region.clone(),
            mode: self.mode().name().to_string(),
        }
    }

    /// Render the template document.
    pub fn render(&self) -> Result<Value> {
        template::render(&self.to_plan()?, &self.metadata())
    }

    /// Structural identity of the topology.
    pub fn fingerprint(&self) -> Result<String> {
        template::fingerprint(&self.render()?)
    }
}
