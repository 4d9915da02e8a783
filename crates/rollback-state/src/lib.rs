//! Compensation registry and rollback coordinator for activity workflows.
//!
//! Activities that mutate state register a [`CompensationRecord`] describing
//! how to undo the mutation. When a later activity fails, the runner rolls the
//! execution back: every pending record's [`RollbackHandler`] runs, oldest
//! first, and each record is removed as soon as it has been undone. Records
//! can be grouped into regions and rolled back or cleared per region.
//!
//! Pending records are isolated per [`ExecutionIdentity`], so any number of
//! executions can share one [`RollbackCoordinator`] concurrently.

pub mod ambient;
mod audit;
mod config;
mod coordinator;
mod error;
mod handler;
mod identity;
mod record;
mod state_items;
mod store;

pub use audit::{RollbackAuditLog, UndoRecord, UndoStatus};
pub use config::{DEFAULT_PENDING_WARN_THRESHOLD, DEFAULT_SHARD_COUNT, RollbackConfig};
pub use coordinator::{ExecutionScope, RollbackCoordinator};
pub use error::{ConfigError, NoActiveExecution, RollbackError, RollbackFailure};
pub use handler::{FnHandler, RollbackHandler, SharedHandler, handler_fn};
pub use identity::ExecutionIdentity;
pub use record::CompensationRecord;
pub use state_items::StateItems;
pub use store::RegistryStore;
