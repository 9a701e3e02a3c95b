// Composing commands
pub mod diff;
pub mod plan;
pub mod synth;

// Project setup and health
pub mod doctor;
pub mod init;

use anyhow::{Context as AnyhowContext, Result};
use topology::{
    CompositionRequest, ContextBackend, DeployTarget, EnvironmentMode, Topology, compose,
};

use crate::Context;
use crate::cli::ModeArgs;
use crate::paths::Project;

/// Deployment target from flags or environment
pub fn deploy_target(ctx: &Context) -> Result<DeployTarget> {
    DeployTarget::resolve(ctx.account.clone(), ctx.region.clone())
        .context("Lookups are account/region specific")
}

/// Locate the project, load lookups and compose the stack
pub fn compose_stack(ctx: &Context, mode: ModeArgs) -> Result<Topology> {
    let project = Project::locate(ctx.config.as_deref(), ctx.context.as_deref())?;
    let config = project.load_config()?;
    let target = deploy_target(ctx)?;

    let backend = ContextBackend::load(&project.context_path).with_context(|| {
        format!(
            "Could not load lookup context {}",
            project.context_path.display()
        )
    })?;

    let request = CompositionRequest {
        config,
        mode: EnvironmentMode::from_dev_flag(mode.dev),
        target,
        project_root: project.root,
    };
    let topology = compose(&backend, &request).context("Composition failed")?;
    Ok(topology)
}
