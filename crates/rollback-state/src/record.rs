use std::fmt;

use crate::handler::SharedHandler;
use crate::state_items::StateItems;

/// One pending compensation: a handler, the data it needs, and a region tag.
///
/// Records are assembled with the `with_*`/`in_region` builder methods and
/// are immutable once handed to [`ExecutionScope::register`].
///
/// [`ExecutionScope::register`]: crate::ExecutionScope::register
pub struct CompensationRecord<A, P, E> {
    region: Option<String>,
    handler: SharedHandler<A, P, E>,
    state_items: StateItems,
    activity: Option<A>,
    process_context: Option<P>,
}

impl<A, P, E> CompensationRecord<A, P, E> {
    /// A record in the unnamed region with no activity or process context.
    #[must_use]
    pub fn new(handler: SharedHandler<A, P, E>, state_items: StateItems) -> Self {
        Self {
            region: None,
            handler,
            state_items,
            activity: None,
            process_context: None,
        }
    }

    #[must_use]
    pub fn in_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Like [`CompensationRecord::in_region`], keeping the unnamed region for `None`.
    #[must_use]
    pub fn with_region(mut self, region: Option<&str>) -> Self {
        self.region = region.map(str::to_owned);
        self
    }

    #[must_use]
    pub fn with_activity(mut self, activity: A) -> Self {
        self.activity = Some(activity);
        self
    }

    #[must_use]
    pub fn with_process_context(mut self, process_context: P) -> Self {
        self.process_context = Some(process_context);
        self
    }

    #[must_use]
    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    #[must_use]
    pub fn handler_name(&self) -> &str {
        self.handler.name()
    }

    #[must_use]
    pub fn state_items(&self) -> &StateItems {
        &self.state_items
    }

    #[must_use]
    pub fn activity(&self) -> Option<&A> {
        self.activity.as_ref()
    }

    #[must_use]
    pub fn process_context(&self) -> Option<&P> {
        self.process_context.as_ref()
    }

    /// Region equality, where the unnamed region only matches `None`.
    pub(crate) fn is_in(&self, region: Option<&str>) -> bool {
        self.region.as_deref() == region
    }

    pub(crate) fn undo(&self) -> Result<(), E> {
        self.handler.rollback_state(
            self.activity.as_ref(),
            self.process_context.as_ref(),
            &self.state_items,
        )
    }
}

impl<A, P, E> fmt::Debug for CompensationRecord<A, P, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompensationRecord")
            .field("region", &self.region)
            .field("handler", &self.handler.name())
            .field("state_items", &self.state_items)
            .field("has_activity", &self.activity.is_some())
            .field("has_process_context", &self.process_context.is_some())
            .finish()
    }
}
