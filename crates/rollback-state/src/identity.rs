use std::fmt;

/// Identifies one running workflow execution on one worker.
///
/// The pair must be unique among concurrently running executions and stay
/// the same for every call made on behalf of that execution.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExecutionIdentity {
    worker: String,
    workflow: String,
}

impl ExecutionIdentity {
    #[must_use]
    pub fn new(worker: impl Into<String>, workflow: impl Into<String>) -> Self {
        Self {
            worker: worker.into(),
            workflow: workflow.into(),
        }
    }

    /// Identity for `workflow` running on the calling thread.
    #[must_use]
    pub fn for_current_thread(workflow: impl Into<String>) -> Self {
        Self::new(format!("{:?}", std::thread::current().id()), workflow)
    }

    #[must_use]
    pub fn worker(&self) -> &str {
        &self.worker
    }

    #[must_use]
    pub fn workflow(&self) -> &str {
        &self.workflow
    }
}

impl fmt::Display for ExecutionIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.worker, self.workflow)
    }
}
