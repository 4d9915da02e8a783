use std::fmt::Debug;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::activity::{Activity, WorkflowCoordinator};
use crate::workflow::Workflow;

/// Marker type for a builder with no activities.
pub struct Empty;

/// Marker type for a builder with at least one activity.
pub struct HasActivities;

/// Type-state builder for workflows.
///
/// A workflow without activities cannot be built:
///
/// ```compile_fail
/// use std::sync::Arc;
/// use rollback_workflow::{WorkflowBuilder, WorkflowCoordinator};
///
/// let coordinator: Arc<WorkflowCoordinator<(), ()>> = Arc::default();
/// // `build()` is only available after `first_activity()`
/// let workflow = WorkflowBuilder::<(), (), _>::new("empty").build(coordinator);
/// ```
pub struct WorkflowBuilder<S, E, State> {
    name: String,
    activities: Vec<Box<dyn Activity<S, E>>>,
    _state: PhantomData<State>,
}

impl<S, E> WorkflowBuilder<S, E, Empty> {
    /// Create a new workflow builder in the empty state.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            activities: Vec::new(),
            _state: PhantomData,
        }
    }

    /// Add the first activity to the workflow.
    #[must_use]
    pub fn first_activity<A>(self, activity: A) -> WorkflowBuilder<S, E, HasActivities>
    where
        A: Activity<S, E> + 'static,
    {
        let mut activities = self.activities;
        activities.push(Box::new(activity));
        WorkflowBuilder {
            name: self.name,
            activities,
            _state: PhantomData,
        }
    }
}

impl<S, E> WorkflowBuilder<S, E, HasActivities> {
    /// Add another activity, run after those already added.
    #[must_use]
    pub fn then<A>(mut self, activity: A) -> Self
    where
        A: Activity<S, E> + 'static,
    {
        self.activities.push(Box::new(activity));
        self
    }

    /// Build the workflow, registering compensation with `coordinator`.
    #[must_use]
    pub fn build(self, coordinator: Arc<WorkflowCoordinator<S, E>>) -> Workflow<S, E>
    where
        E: Debug,
    {
        Workflow::from_activities(self.name, self.activities, coordinator)
    }
}
