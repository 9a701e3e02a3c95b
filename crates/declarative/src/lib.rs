//! # Declarative
//!
//! A framework for declared resource graphs.
//!
//! This crate provides the core abstractions for declaring desired
//! infrastructure as an ordered graph, comparing two graphs, and handing a
//! graph to whatever engine turns it into real resources.
//!
//! ## Core Concepts
//!
//! - **Resource**: A node with a logical id, a type, properties and dependencies
//! - **ExecutionPlan**: Resources in declaration order; dependencies must come first
//! - **Diff**: Added / removed / modified resources between two plans
//! - **Engine**: External collaborator that receives resources in plan order
//!
//! ## Example
//!
//! ```ignore
//! use declarative::{
//!     ApplyContext, ApplyResult, Engine, ExecutionPlan, NoProgress, Resource, execute,
//! };
//!
//! #[derive(Debug)]
//! struct Queue;
//!
//! impl Resource for Queue {
//!     fn id(&self) -> String { "Queue".into() }
//!     fn description(&self) -> String { "Work queue".into() }
//!     fn resource_type(&self) -> &'static str { "AWS::SQS::Queue" }
//!     fn properties(&self) -> serde_json::Value { serde_json::json!({}) }
//! }
//!
//! struct Printer;
//!
//! impl Engine for Printer {
//!     fn submit(&mut self, r: &dyn Resource, _ctx: &ApplyContext) -> anyhow::Result<ApplyResult> {
//!         println!("{} ({})", r.id(), r.resource_type());
//!         Ok(ApplyResult::Created)
//!     }
//! }
//!
//! let mut plan = ExecutionPlan::new();
//! plan.add_resource(Box::new(Queue))?;
//! let summary = execute(&plan, &mut Printer, &mut NoProgress);
//! assert!(summary.is_success());
//! ```
//!
//! ## Progress
//!
//! [`ProgressCallback`] receives one event per submitted resource, so the
//! crate has no hard dependency on a UI framework or provisioning API.

pub mod context;
pub mod diff;
pub mod executor;
pub mod planner;
pub mod resource;
pub mod types;

// Re-export main types at crate root
pub use context::{ApplyContext, NoProgress, ProgressCallback};
pub use diff::{Change, DiffSummary, ResourceDiff, compute_diffs, render_properties};
pub use executor::{Engine, execute};
pub use planner::{ExecutionPlan, PlanError};
pub use resource::{BoxedResource, Resource, ResourceExt};
pub use types::{ApplyResult, ExecuteSummary, RemovalPolicy};
