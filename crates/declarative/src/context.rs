//! Apply context and progress reporting
//!
//! Lets the declarative crate report progress without depending on a
//! specific UI or provisioning backend.

use crate::types::ApplyResult;

/// Progress callback for execution operations
///
/// Implement this trait to receive progress updates during execution.
pub trait ProgressCallback: Send {
    /// Called once before the first resource is handed to the engine
    fn on_plan_start(&mut self, count: usize);

    /// Called when starting to apply a single resource
    fn on_resource_start(&mut self, id: &str, description: &str);

    /// Called when a resource application completes
    fn on_resource_complete(&mut self, id: &str, result: &ApplyResult);

    /// Called when the plan completes (or stops on a failure)
    fn on_plan_complete(&mut self);
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_plan_start(&mut self, _count: usize) {}
    fn on_resource_start(&mut self, _id: &str, _description: &str) {}
    fn on_resource_complete(&mut self, _id: &str, _result: &ApplyResult) {}
    fn on_plan_complete(&mut self) {}
}

/// Context passed to engine submissions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplyContext {
    /// Zero-based position of the resource in the plan
    pub position: usize,
}
