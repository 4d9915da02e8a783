use std::fmt::Debug;

use rollback_state::{NoActiveExecution, RollbackFailure};
use thiserror::Error;

/// Error from workflow execution.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WorkflowError<E: Debug> {
    /// An activity failed and every pending compensation was rolled back.
    #[error("activity '{activity}' failed")]
    ActivityFailed {
        /// Name of the activity that failed.
        activity: String,
        /// Number of compensation records undone.
        rolled_back: usize,
        /// The error that caused the activity to fail.
        #[source]
        source: E,
    },

    /// An activity failed and the rollback stopped at a failing handler.
    ///
    /// The records the rollback did not reach are still pending for the
    /// execution; a runner may retry with the same identity or clear them.
    #[error("activity '{activity}' failed, and rollback is incomplete")]
    RollbackFailed {
        /// Name of the activity that originally failed.
        activity: String,
        /// The error from the failed activity.
        activity_error: E,
        /// The rollback handler failure.
        #[source]
        rollback: RollbackFailure<E>,
    },

    #[error(transparent)]
    NoActiveExecution(#[from] NoActiveExecution),
}
