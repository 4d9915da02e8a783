use rollback_state::{
    CompensationRecord, ExecutionIdentity, ExecutionScope, RollbackCoordinator, RollbackFailure,
    SharedHandler, StateItems,
};

use crate::context::ProcessContext;

/// Coordinator shared by workflows whose activities are identified by name.
pub type WorkflowCoordinator<S, E> = RollbackCoordinator<&'static str, S, E>;

/// Rollback handler an activity registers.
pub type ActivityHandler<S, E> = SharedHandler<&'static str, S, E>;

/// Compensation record an activity registers.
pub type ActivityRecord<S, E> = CompensationRecord<&'static str, S, E>;

/// One step of a workflow.
///
/// An activity either registers compensation itself through its
/// [`ActivityScope`] while it mutates state, or returns a handler from
/// [`Activity::rollback_handler`] that the workflow registers once
/// [`Activity::execute`] succeeds.
pub trait Activity<S, E>: Send + Sync {
    /// Human-readable name for logging, error messages, and compensation records.
    fn name(&self) -> &'static str;

    /// Run the activity.
    ///
    /// # Errors
    ///
    /// Returns an error if the activity fails; the workflow then rolls back
    /// every compensation registered so far in this execution.
    fn execute(&self, ctx: &mut ProcessContext<S>, scope: &ActivityScope<'_, S, E>)
    -> Result<(), E>;

    /// Whether the activity runs for this context. Skipped activities register nothing.
    fn should_execute(&self, ctx: &ProcessContext<S>) -> bool {
        let _ = ctx;
        true
    }

    /// Handler registered automatically after a successful `execute`.
    ///
    /// The record carries the activity's name and a snapshot of the seed as
    /// left by `execute`. The default registers nothing, suitable for
    /// read-only activities.
    fn rollback_handler(&self) -> Option<ActivityHandler<S, E>> {
        None
    }

    /// Region for the automatically registered record.
    fn rollback_region(&self) -> Option<&str> {
        None
    }

    /// Data captured for the automatically registered record.
    fn state_items(&self, ctx: &ProcessContext<S>) -> StateItems {
        let _ = ctx;
        StateItems::new()
    }
}

/// An activity's view of the execution's pending compensation.
pub struct ActivityScope<'a, S, E> {
    execution: &'a ExecutionScope<'a, &'static str, S, E>,
    activity: &'static str,
}

impl<'a, S, E> ActivityScope<'a, S, E> {
    pub(crate) fn new(
        execution: &'a ExecutionScope<'a, &'static str, S, E>,
        activity: &'static str,
    ) -> Self {
        Self {
            execution,
            activity,
        }
    }

    #[must_use]
    pub fn activity(&self) -> &'static str {
        self.activity
    }

    #[must_use]
    pub fn identity(&self) -> &ExecutionIdentity {
        self.execution.identity()
    }

    /// A record attributed to this activity, ready for [`ActivityScope::register`].
    ///
    /// The handler receives no process context; use
    /// [`ActivityScope::record_in_context`] to capture one.
    #[must_use]
    pub fn record(
        &self,
        handler: ActivityHandler<S, E>,
        state_items: StateItems,
    ) -> ActivityRecord<S, E> {
        CompensationRecord::new(handler, state_items).with_activity(self.activity)
    }

    /// Like [`ActivityScope::record`], also capturing a snapshot of the
    /// context's seed for the handler.
    #[must_use]
    pub fn record_in_context(
        &self,
        handler: ActivityHandler<S, E>,
        state_items: StateItems,
        ctx: &ProcessContext<S>,
    ) -> ActivityRecord<S, E>
    where
        S: Clone,
    {
        self.record(handler, state_items).with_process_context(ctx.seed().clone())
    }

    pub fn register(&self, record: ActivityRecord<S, E>) {
        self.execution.register(record);
    }

    /// See [`ExecutionScope::clear_region`].
    pub fn clear_region(&self, region: Option<&str>) -> bool {
        self.execution.clear_region(region)
    }

    /// See [`ExecutionScope::rollback_region`].
    ///
    /// # Errors
    ///
    /// Returns the first handler failure; see [`ExecutionScope::rollback_region`].
    pub fn rollback_region(&self, region: Option<&str>) -> Result<usize, RollbackFailure<E>> {
        self.execution.rollback_region(region)
    }

    #[must_use]
    pub fn pending(&self) -> usize {
        self.execution.pending()
    }
}
