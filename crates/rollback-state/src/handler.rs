use std::marker::PhantomData;
use std::sync::Arc;

use crate::state_items::StateItems;

/// Undoes one registered mutation.
///
/// A single handler instance is typically shared by every record an activity
/// registers, so implementations must be `Send + Sync`.
///
/// # Type Parameters
///
/// - `Activity`: The activity that registered the record, if it was supplied
/// - `Context`: The process context captured at registration, if it was supplied
/// - `Error`: The error type for a failed undo
pub trait RollbackHandler: Send + Sync {
    /// The registering activity.
    type Activity;

    /// Process context captured at registration.
    type Context;

    /// Error type for a failed undo.
    type Error;

    /// Human-readable name for logging and error messages.
    fn name(&self) -> &str {
        "rollback handler"
    }

    /// Undo the mutation described by `state_items`.
    ///
    /// # Errors
    ///
    /// Returns an error if the mutation could not be undone. The record stays
    /// pending and the rollback that invoked this handler stops.
    fn rollback_state(
        &self,
        activity: Option<&Self::Activity>,
        context: Option<&Self::Context>,
        state_items: &StateItems,
    ) -> Result<(), Self::Error>;
}

/// A handler shared between the registering code and its pending records.
pub type SharedHandler<A, P, E> = Arc<dyn RollbackHandler<Activity = A, Context = P, Error = E>>;

/// Adapts a closure into a [`RollbackHandler`].
pub struct FnHandler<A, P, E, F> {
    name: String,
    undo: F,
    _marker: PhantomData<fn(&A, &P) -> E>,
}

impl<A, P, E, F> RollbackHandler for FnHandler<A, P, E, F>
where
    F: Fn(Option<&A>, Option<&P>, &StateItems) -> Result<(), E> + Send + Sync,
{
    type Activity = A;
    type Context = P;
    type Error = E;

    fn name(&self) -> &str {
        &self.name
    }

    fn rollback_state(
        &self,
        activity: Option<&A>,
        context: Option<&P>,
        state_items: &StateItems,
    ) -> Result<(), E> {
        (self.undo)(activity, context, state_items)
    }
}

/// Build a shared handler from a closure.
#[must_use]
pub fn handler_fn<A, P, E, F>(name: impl Into<String>, undo: F) -> SharedHandler<A, P, E>
where
    A: 'static,
    P: 'static,
    E: 'static,
    F: Fn(Option<&A>, Option<&P>, &StateItems) -> Result<(), E> + Send + Sync + 'static,
{
    Arc::new(FnHandler {
        name: name.into(),
        undo,
        _marker: PhantomData,
    })
}
