//! Sweep control-flow signals and errors
//!
//! Skipping a pass and waiting on an operation are expected outcomes, not
//! failures. They travel through the same `Result` plumbing as real errors
//! but stay distinguishable so the sweeper can branch on them.

use super::params::ScanScope;
use thiserror::Error;

/// Error type flowing through listing, removal and wait handling
#[derive(Debug, Error)]
pub enum SweepError {
    /// The pass does not apply to this resource type; no work was attempted
    #[error("skipped: {0}")]
    Skip(SkipReason),

    /// A previously issued operation has not completed yet
    #[error("operation {operation} still pending")]
    WaitPending { operation: String },

    /// A real failure
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SweepError {
    pub fn pending(operation: impl Into<String>) -> Self {
        SweepError::WaitPending {
            operation: operation.into(),
        }
    }

    pub fn is_skip(&self) -> bool {
        matches!(self, SweepError::Skip(_))
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, SweepError::WaitPending { .. })
    }
}

impl From<SkipReason> for SweepError {
    fn from(reason: SkipReason) -> Self {
        SweepError::Skip(reason)
    }
}

/// Why a resource type sat a pass out
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
    #[error("{required} resource type, pass is {actual}")]
    ScopeMismatch { required: ScanScope, actual: ScanScope },

    #[error("API {api} is not enabled on this project")]
    ApiDisabled { api: String },
}

/// A filter's decision to keep a resource alive
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct Veto(pub String);

impl Veto {
    pub fn new(reason: impl Into<String>) -> Self {
        Veto(reason.into())
    }
}

/// Problems assembling the registry or interpreting the sweep configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("resource type '{0}' registered twice")]
    DuplicateResourceType(String),

    #[error("resource type '{kind}' depends on unknown type '{dependency}'")]
    UnknownDependency { kind: String, dependency: String },

    #[error("dependency cycle among resource types: {0}")]
    DependencyCycle(String),

    #[error("unknown resource type '{0}'")]
    UnknownResourceType(String),

    #[error("unknown region '{0}'")]
    UnknownRegion(String),
}
