//! # topology
//!
//! Composes the resource topology of a three-tier web stack: an existing
//! network, a managed database with generated credentials, a two-container
//! serverless task, a DNS-validated certificate and a public load-balanced
//! service, joined by a single database access grant.
//!
//! Nothing is provisioned here. The composed [`Topology`] is turned into a
//! [`declarative::ExecutionPlan`] and rendered as a template for an external
//! provisioning engine.
//!
//! ## Example
//!
//! ```
//! use std::path::PathBuf;
//! use topology::{
//!     CompositionRequest, DeployTarget, EnvironmentMode, MockBackend, StackConfig, compose,
//! };
//!
//! let target = DeployTarget::new("123456789012", "eu-west-1");
//! let backend = MockBackend::with_default_fixtures(&target);
//!
//! let request = CompositionRequest {
//!     config: StackConfig::default(),
//!     mode: EnvironmentMode::Dev,
//!     target,
//!     project_root: PathBuf::from("."),
//! };
//!
//! let topology = compose(&backend, &request).unwrap();
//! assert_eq!(topology.stack_name, "SymfonyAppDevStack");
//! assert_eq!(topology.grant.port, 3306);
//! ```
//!
//! ## Composition order
//!
//! | Step | Module          | Produces                          |
//! |------|-----------------|-----------------------------------|
//! | 1    | [`network`]     | [`NetworkRef`]                    |
//! | 2    | [`database`]    | database + [`CredentialBundle`]   |
//! | 3    | [`compute`]     | cluster, log group, task          |
//! | 4    | [`certificate`] | zone + certificate                |
//! | 5    | [`service`]     | public service                    |
//! | 6    | [`service`]     | service -> database access grant  |
//!
//! Any failure aborts the chain.

pub mod backend;
pub mod certificate;
pub mod compute;
pub mod config;
pub mod database;
pub mod error;
pub mod network;
pub mod profile;
pub mod service;
pub mod stack;
pub mod template;
pub mod types;

pub use backend::context::{CONTEXT_FILE, ContextBackend, LookupContext};
pub use backend::{Backend, MockBackend};
pub use config::StackConfig;
pub use database::EngineKind;
pub use error::{Error, ErrorCategory, Result};
pub use profile::{EnvironmentMode, EnvironmentProfile};
pub use stack::{CompositionRequest, CompositionStep, Topology, compose};
pub use types::{
    CredentialBundle, DeployTarget, HostedZone, NetworkLookup, NetworkRef, SecretField,
    SubnetGroup,
};
