use std::fmt::Debug;
use std::sync::Arc;

use rollback_state::{ExecutionIdentity, ExecutionScope, ambient};
use tracing::{debug, warn};

use crate::activity::{Activity, ActivityScope, WorkflowCoordinator};
use crate::context::ProcessContext;
use crate::error::WorkflowError;

/// A built workflow ready for execution.
///
/// Activities run in order against one [`ProcessContext`]. If any activity
/// fails, every compensation registered during the execution is rolled back,
/// oldest first. On success the pending compensation is discarded.
pub struct Workflow<S, E> {
    name: String,
    activities: Vec<Box<dyn Activity<S, E>>>,
    coordinator: Arc<WorkflowCoordinator<S, E>>,
}

impl<S, E> Workflow<S, E>
where
    E: Debug,
{
    pub(crate) fn from_activities(
        name: String,
        activities: Vec<Box<dyn Activity<S, E>>>,
        coordinator: Arc<WorkflowCoordinator<S, E>>,
    ) -> Self {
        Self {
            name,
            activities,
            coordinator,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn coordinator(&self) -> &Arc<WorkflowCoordinator<S, E>> {
        &self.coordinator
    }
}

impl<S, E> Workflow<S, E>
where
    S: Clone,
    E: Debug,
{
    /// Execute every activity for `seed` under `identity`.
    ///
    /// The identity is bound to the calling thread for the duration, so code
    /// called from an activity can reach the execution through
    /// [`RollbackCoordinator::current_scope`](rollback_state::RollbackCoordinator::current_scope).
    ///
    /// # Errors
    ///
    /// Returns `WorkflowError::ActivityFailed` if an activity fails and the
    /// rollback completes.
    /// Returns `WorkflowError::RollbackFailed` if an activity fails and a
    /// rollback handler also fails.
    pub fn execute(
        &self,
        identity: ExecutionIdentity,
        seed: S,
    ) -> Result<ProcessContext<S>, WorkflowError<E>> {
        let _binding = ambient::bind(identity);
        let scope = self.coordinator.current_scope()?;
        let mut ctx = ProcessContext::new(seed);

        debug!(workflow = %self.name, execution = %scope.identity(), "starting workflow");

        for activity in &self.activities {
            if ctx.is_stopped() {
                debug!(
                    workflow = %self.name,
                    activity = activity.name(),
                    "process stopped; skipping remaining activities"
                );
                break;
            }
            if !activity.should_execute(&ctx) {
                debug!(workflow = %self.name, activity = activity.name(), "skipping activity");
                continue;
            }

            let activity_scope = ActivityScope::new(&scope, activity.name());
            match activity.execute(&mut ctx, &activity_scope) {
                Ok(()) => {
                    if let Some(handler) = activity.rollback_handler() {
                        let record = activity_scope
                            .record_in_context(handler, activity.state_items(&ctx), &ctx)
                            .with_region(activity.rollback_region());
                        scope.register(record);
                    }
                }
                Err(error) => {
                    warn!(
                        workflow = %self.name,
                        activity = activity.name(),
                        error = ?error,
                        "activity failed; rolling back"
                    );
                    return Err(self.roll_back(&scope, activity.name(), error));
                }
            }
        }

        let discarded = scope.clear_all();
        debug!(workflow = %self.name, discarded, "workflow completed");
        Ok(ctx)
    }

    fn roll_back(
        &self,
        scope: &ExecutionScope<'_, &'static str, S, E>,
        activity: &str,
        activity_error: E,
    ) -> WorkflowError<E> {
        match scope.rollback_all() {
            Ok(rolled_back) => {
                debug!(workflow = %self.name, rolled_back, "rollback complete");
                WorkflowError::ActivityFailed {
                    activity: activity.to_string(),
                    rolled_back,
                    source: activity_error,
                }
            }
            Err(rollback) => WorkflowError::RollbackFailed {
                activity: activity.to_string(),
                activity_error,
                rollback,
            },
        }
    }
}
