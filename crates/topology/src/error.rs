//! Error types for topology composition.
//!
//! Every error aborts the whole composition. Errors are categorized so the
//! operator can tell which declarative input to fix; none of them is worth
//! retrying as-is.

use crate::types::SubnetGroup;
use std::fmt;
use std::io;
use std::path::PathBuf;

/// Result type alias for topology operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of composition errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// A referenced external resource does not exist (network, DNS zone).
    Lookup,
    /// An expected output of an earlier step is missing or malformed.
    Precondition,
    /// An image build context or build file cannot be resolved.
    BuildContext,
    /// The stack configuration or deployment target is invalid.
    Config,
    /// Reading or writing a local file failed.
    Io,
}

impl ErrorCategory {
    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Lookup => "Referenced resource not found",
            Self::Precondition => "Composition precondition violated",
            Self::BuildContext => "Image build context unresolved",
            Self::Config => "Invalid configuration",
            Self::Io => "File access failed",
        }
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Lookup => {
                "Check the account/region and the lookup context file for the missing resource"
            }
            Self::Precondition => "Fix the step that should have produced the missing output",
            Self::BuildContext => "Check the build context directory and the build file paths",
            Self::Config => "Fix tierstack.toml or the deployment environment variables",
            Self::Io => "Check that the path exists and is readable",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur while composing a topology.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No network matches the lookup in the target account/region.
    #[error("no {lookup} network found in {account}/{region}")]
    NetworkNotFound {
        /// Description of the lookup key.
        lookup: String,
        /// Target account.
        account: String,
        /// Target region.
        region: String,
    },

    /// The resolved network has no subnets in the group a resource needs.
    #[error("network {vpc_id} has no {group} subnets")]
    EmptySubnetGroup {
        /// Network id.
        vpc_id: String,
        /// Subnet group that was empty.
        group: SubnetGroup,
    },

    /// No hosted zone exists for the root domain.
    #[error("no hosted zone found for domain {domain}")]
    ZoneNotFound {
        /// Root domain that was looked up.
        domain: String,
    },

    /// The database did not produce a generated credential secret.
    #[error("no secret generated for database {database}")]
    MissingCredentials {
        /// Logical id of the database.
        database: String,
    },

    /// A container other than the edge container declares a port.
    #[error("container {container} must not expose a port; only the edge container is reachable")]
    ExposedRuntime {
        /// Offending container name.
        container: String,
    },

    /// The edge container does not expose exactly one port.
    #[error("edge container {container} must expose exactly one port, found {count}")]
    EdgePortCount {
        /// Edge container name.
        container: String,
        /// Number of port mappings found.
        count: usize,
    },

    /// An image build context or build file could not be resolved.
    #[error("cannot resolve image for container {container} at {}: {reason}", .path.display())]
    ImageBuildContext {
        /// Container whose image failed.
        container: String,
        /// Path that failed to resolve.
        path: PathBuf,
        /// What was wrong with it.
        reason: String,
    },

    /// Account or region is not set.
    #[error("deployment target incomplete: {variable} is not set")]
    MissingDeployTarget {
        /// Environment variable that should carry the value.
        variable: &'static str,
    },

    /// Configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A lookup context file or template could not be parsed.
    #[error("invalid {kind} at {}: {message}", .path.display())]
    InvalidDocument {
        /// What kind of document ("lookup context", "template").
        kind: &'static str,
        /// Where it came from.
        path: PathBuf,
        /// Parser message.
        message: String,
    },

    /// Rendering the resource graph into a template failed.
    #[error("template synthesis failed: {0}")]
    Synthesis(String),

    /// The declared resources do not form a valid plan.
    #[error("invalid resource graph: {0}")]
    Plan(#[from] declarative::PlanError),

    /// IO error during file operations.
    #[error("IO error at {}: {source}", .path.display())]
    Io {
        /// Path involved in the error.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

impl Error {
    /// Create an IO error with path context.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Get the error category.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::NetworkNotFound { .. }
            | Error::EmptySubnetGroup { .. }
            | Error::ZoneNotFound { .. } => ErrorCategory::Lookup,
            Error::MissingCredentials { .. }
            | Error::ExposedRuntime { .. }
            | Error::EdgePortCount { .. }
            | Error::Synthesis(_)
            | Error::Plan(_) => ErrorCategory::Precondition,
            Error::ImageBuildContext { .. } => ErrorCategory::BuildContext,
            Error::MissingDeployTarget { .. }
            | Error::InvalidConfig(_)
            | Error::InvalidDocument { .. } => ErrorCategory::Config,
            Error::Io { .. } => ErrorCategory::Io,
        }
    }
}
