//! Environment mode and the policy profile derived from it.

use declarative::RemovalPolicy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which environment a stack is composed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvironmentMode {
    Dev,
    Production,
}

impl EnvironmentMode {
    /// Mode selected by the single dev flag.
    pub fn from_dev_flag(dev: bool) -> Self {
        if dev { Self::Dev } else { Self::Production }
    }

    pub fn is_dev(&self) -> bool {
        matches!(self, Self::Dev)
    }

    /// Short name used in metadata and logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Dev => "dev",
            Self::Production => "production",
        }
    }

    /// Infix used in stack names (`SymfonyAppDevStack`).
    pub fn stack_infix(&self) -> &'static str {
        match self {
            Self::Dev => "Dev",
            Self::Production => "Prod",
        }
    }
}

impl fmt::Display for EnvironmentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for EnvironmentMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dev" | "development" => Ok(Self::Dev),
            "prod" | "production" => Ok(Self::Production),
            other => Err(format!("unknown environment mode '{other}'")),
        }
    }
}

/// Every environment-dependent policy, selected once per run.
///
/// Components read this record instead of branching on the mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnvironmentProfile {
    /// Mode the profile was selected for.
    pub mode: EnvironmentMode,
    /// Database teardown policy.
    pub removal_policy: RemovalPolicy,
    /// Keep automated backups after the database is deleted.
    pub retain_automated_backups: bool,
}

impl EnvironmentProfile {
    /// Select the profile for a mode.
    pub fn for_mode(mode: EnvironmentMode) -> Self {
        match mode {
            EnvironmentMode::Dev => Self {
                mode,
                removal_policy: RemovalPolicy::Destroy,
                retain_automated_backups: false,
            },
            EnvironmentMode::Production => Self {
                mode,
                removal_policy: RemovalPolicy::Snapshot,
                retain_automated_backups: true,
            },
        }
    }

    /// Whether tearing down the stack destroys data without a snapshot.
    pub fn is_destructive(&self) -> bool {
        self.removal_policy.is_destructive()
    }
}
