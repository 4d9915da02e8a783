//! Thread-bound "current execution" for callers that cannot pass an
//! [`ExecutionScope`](crate::ExecutionScope) down to where compensation is
//! registered.
//!
//! A runner binds the identity once at the start of an execution; code deeper
//! in the call stack resolves it with [`current`] or
//! [`RollbackCoordinator::current_scope`](crate::RollbackCoordinator::current_scope).

use std::cell::RefCell;
use std::marker::PhantomData;

use crate::error::NoActiveExecution;
use crate::identity::ExecutionIdentity;

thread_local! {
    static CURRENT: RefCell<Option<ExecutionIdentity>> = const { RefCell::new(None) };
}

/// Bind `identity` to the current thread until the guard is dropped.
///
/// Bindings nest: dropping the guard restores whatever was bound before.
pub fn bind(identity: ExecutionIdentity) -> BindingGuard {
    let previous = CURRENT.with(|current| current.replace(Some(identity)));
    BindingGuard {
        previous,
        _not_send: PhantomData,
    }
}

/// The identity bound to the current thread.
///
/// # Errors
///
/// Returns [`NoActiveExecution`] if nothing is bound.
pub fn current() -> Result<ExecutionIdentity, NoActiveExecution> {
    CURRENT
        .with(|current| current.borrow().clone())
        .ok_or(NoActiveExecution)
}

#[must_use]
pub fn is_bound() -> bool {
    CURRENT.with(|current| current.borrow().is_some())
}

/// Keeps an identity bound to the thread that created it.
#[must_use = "the identity is unbound as soon as the guard is dropped"]
pub struct BindingGuard {
    previous: Option<ExecutionIdentity>,
    _not_send: PhantomData<*const ()>,
}

impl Drop for BindingGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        CURRENT.with(|current| *current.borrow_mut() = previous);
    }
}
