//! Sequential activity workflows with automatic rollback.
//!
//! A [`Workflow`] runs its activities in order under one
//! [`ExecutionIdentity`](rollback_state::ExecutionIdentity). Activities register
//! compensation with a shared [`WorkflowCoordinator`]; if one fails, the
//! workflow rolls the execution back before returning the error, and on
//! success it clears whatever is still pending.

mod activity;
mod builder;
mod context;
mod error;
mod workflow;

pub use activity::{Activity, ActivityHandler, ActivityRecord, ActivityScope, WorkflowCoordinator};
pub use builder::{Empty, HasActivities, WorkflowBuilder};
pub use context::ProcessContext;
pub use error::WorkflowError;
pub use workflow::Workflow;
