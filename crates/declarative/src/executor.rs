//! Execution engine - hands plan resources to an engine, in order

use crate::context::{ApplyContext, ProgressCallback};
use crate::planner::ExecutionPlan;
use crate::resource::Resource;
use crate::types::{ApplyResult, ExecuteSummary};
use anyhow::Result;

/// Something that turns declared resources into real (or rendered) ones
///
/// The engine is an external collaborator: a template writer, a cloud
/// provisioning API, or a test recorder.
pub trait Engine {
    /// Accept one resource
    ///
    /// Called in plan order, each resource exactly once. Every dependency of
    /// `resource` has already been submitted successfully.
    fn submit(&mut self, resource: &dyn Resource, ctx: &ApplyContext) -> Result<ApplyResult>;
}

/// Execute a plan, reporting to `progress`
///
/// Resources are submitted sequentially in plan order. Execution stops at
/// the first failure; remaining resources are counted as skipped.
pub fn execute<E, P>(plan: &ExecutionPlan, engine: &mut E, progress: &mut P) -> ExecuteSummary
where
    E: Engine + ?Sized,
    P: ProgressCallback + ?Sized,
{
    let total = plan.total_resources();
    let mut summary = ExecuteSummary::default();
    if total == 0 {
        return summary;
    }

    progress.on_plan_start(total);
    for (position, resource) in plan.resources().iter().enumerate() {
        let id = resource.id();
        progress.on_resource_start(&id, &resource.description());

        let result = match engine.submit(resource.as_ref(), &ApplyContext { position }) {
            Ok(result) => result,
            Err(e) => ApplyResult::Failed {
                error: format!("{e:#}"),
            },
        };

        progress.on_resource_complete(&id, &result);
        summary.add_result(&result);

        if !result.is_success() {
            log::warn!("{id} failed, skipping {} remaining", total - position - 1);
            summary.skipped += total - position - 1;
            break;
        }
    }
    progress.on_plan_complete();

    summary
}
