use std::path::PathBuf;

use thiserror::Error;

use crate::identity::ExecutionIdentity;

/// No workflow execution is bound to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error(
    "no workflow execution is bound to the current thread; rollback state may only be used inside an active execution"
)]
pub struct NoActiveExecution;

/// A rollback handler failed; the rollback that invoked it is incomplete.
///
/// The failing record and every record not yet processed are still pending
/// for `identity`, so a later rollback resumes with the failing record.
#[derive(Debug, Error)]
#[error("rollback handler '{handler}' failed for execution '{identity}'")]
pub struct RollbackFailure<E> {
    /// Execution whose rollback stopped.
    pub identity: ExecutionIdentity,
    /// Region of the failing record.
    pub region: Option<String>,
    /// Name of the failing handler.
    pub handler: String,
    /// The handler's error.
    #[source]
    pub source: E,
}

/// Error from a rollback resolved through the ambient binding.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RollbackError<E> {
    #[error(transparent)]
    NoActiveExecution(#[from] NoActiveExecution),

    #[error(transparent)]
    RollbackFailed(#[from] RollbackFailure<E>),
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("failed to read rollback config at '{path}'")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse rollback config")]
    Parse(#[from] toml::de::Error),

    #[error("shard-count must be at least 1")]
    InvalidShardCount,
}
