use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, warn};

use crate::ambient;
use crate::audit::RollbackAuditLog;
use crate::config::RollbackConfig;
use crate::error::{NoActiveExecution, RollbackError, RollbackFailure};
use crate::identity::ExecutionIdentity;
use crate::record::CompensationRecord;
use crate::store::RegistryStore;

/// Tracks pending compensation for every running workflow execution.
///
/// Construct one coordinator per process (or per workflow engine) and share
/// it, typically behind an `Arc`. All operations go through an
/// [`ExecutionScope`], obtained either from an explicit identity with
/// [`RollbackCoordinator::scope`] or from the thread's ambient binding with
/// [`RollbackCoordinator::current_scope`].
pub struct RollbackCoordinator<A, P, E> {
    store: RegistryStore<Pending<A, P, E>>,
    config: RollbackConfig,
    sequence: AtomicU64,
}

impl<A, P, E> Default for RollbackCoordinator<A, P, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A, P, E> RollbackCoordinator<A, P, E> {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(RollbackConfig::default())
    }

    #[must_use]
    pub fn with_config(config: RollbackConfig) -> Self {
        Self {
            store: RegistryStore::new(config.shard_count()),
            config,
            sequence: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn config(&self) -> &RollbackConfig {
        &self.config
    }

    /// Operations on behalf of the execution identified by `identity`.
    #[must_use]
    pub fn scope(&self, identity: ExecutionIdentity) -> ExecutionScope<'_, A, P, E> {
        ExecutionScope {
            coordinator: self,
            identity,
        }
    }

    /// Operations on behalf of the execution bound to the current thread.
    ///
    /// # Errors
    ///
    /// Returns [`NoActiveExecution`] if no identity is bound.
    pub fn current_scope(&self) -> Result<ExecutionScope<'_, A, P, E>, NoActiveExecution> {
        ambient::current().map(|identity| self.scope(identity))
    }

    /// Register `record` for the execution bound to the current thread.
    ///
    /// # Errors
    ///
    /// Returns [`NoActiveExecution`] if no identity is bound. Nothing is
    /// registered in that case.
    pub fn register_current(
        &self,
        record: CompensationRecord<A, P, E>,
    ) -> Result<(), NoActiveExecution> {
        self.current_scope()?.register(record);
        Ok(())
    }

    /// [`ExecutionScope::clear_all`] for the execution bound to the current thread.
    ///
    /// # Errors
    ///
    /// Returns [`NoActiveExecution`] if no identity is bound.
    pub fn clear_current(&self) -> Result<usize, NoActiveExecution> {
        Ok(self.current_scope()?.clear_all())
    }

    /// [`ExecutionScope::rollback_all`] for the execution bound to the current thread.
    ///
    /// # Errors
    ///
    /// Returns [`RollbackError::NoActiveExecution`] if no identity is bound,
    /// or [`RollbackError::RollbackFailed`] for the first failing handler.
    pub fn rollback_current(&self) -> Result<usize, RollbackError<E>> {
        Ok(self.current_scope()?.rollback_all()?)
    }

    /// [`ExecutionScope::rollback_region`] for the execution bound to the current thread.
    ///
    /// # Errors
    ///
    /// Same as [`RollbackCoordinator::rollback_current`].
    pub fn rollback_current_region(
        &self,
        region: Option<&str>,
    ) -> Result<usize, RollbackError<E>> {
        Ok(self.current_scope()?.rollback_region(region)?)
    }

    /// Identities that currently have pending compensation.
    #[must_use]
    pub fn active_executions(&self) -> Vec<ExecutionIdentity> {
        self.store.identities()
    }

    /// Pending records across all executions.
    #[must_use]
    pub fn total_pending(&self) -> usize {
        self.store.total_pending()
    }
}

/// Handle to one execution's pending compensation.
///
/// Calls for one identity are expected to come from a single flow of control
/// at a time; different identities may be used concurrently.
pub struct ExecutionScope<'c, A, P, E> {
    coordinator: &'c RollbackCoordinator<A, P, E>,
    identity: ExecutionIdentity,
}

impl<A, P, E> ExecutionScope<'_, A, P, E> {
    #[must_use]
    pub fn identity(&self) -> &ExecutionIdentity {
        &self.identity
    }

    fn store(&self) -> &RegistryStore<Pending<A, P, E>> {
        &self.coordinator.store
    }

    /// Append `record` to this execution's pending list.
    ///
    /// No handler is invoked and identical records are all kept.
    pub fn register(&self, record: CompensationRecord<A, P, E>) {
        let region = record.region().map(str::to_owned);
        let handler = record.handler_name().to_owned();
        let sequence = self.coordinator.sequence.fetch_add(1, Ordering::Relaxed);
        let pending = self.store().append(
            &self.identity,
            Pending {
                sequence,
                record: Arc::new(record),
            },
        );

        debug!(
            execution = %self.identity,
            handler = %handler,
            region = ?region,
            pending,
            "registered compensation"
        );

        let threshold = self.coordinator.config.pending_warn_threshold();
        if threshold.is_some_and(|threshold| threshold.checked_add(1) == Some(pending)) {
            warn!(
                execution = %self.identity,
                pending,
                threshold = ?threshold,
                "pending compensation exceeds threshold; execution may never be cleared"
            );
        }
    }

    /// Discard every pending record without invoking any handler.
    ///
    /// Returns the number of records discarded.
    pub fn clear_all(&self) -> usize {
        let discarded = self.store().remove(&self.identity).map_or(0, |list| list.len());
        debug!(execution = %self.identity, discarded, "cleared compensation");
        discarded
    }

    /// Discard the oldest pending record in `region` without invoking its handler.
    ///
    /// At most one record is removed per call. Returns whether one was.
    pub fn clear_region(&self, region: Option<&str>) -> bool {
        let removed = self
            .store()
            .remove_first(&self.identity, |pending| pending.record.is_in(region))
            .is_some();
        debug!(
            execution = %self.identity,
            region = ?region,
            removed,
            "cleared region compensation"
        );
        removed
    }

    /// Undo every pending record, oldest first.
    ///
    /// Each record stays pending while its handler runs and is removed as soon
    /// as the handler succeeds. Records registered while the rollback is
    /// running are left pending. Returns the number of records undone.
    ///
    /// # Errors
    ///
    /// Returns [`RollbackFailure`] for the first handler that fails. That
    /// record and every later one stay pending, so calling this again resumes
    /// with the failed record.
    pub fn rollback_all(&self) -> Result<usize, RollbackFailure<E>> {
        self.rollback(Selection::All, &mut RollbackAuditLog::new())
    }

    /// Undo every pending record in `region`, oldest first.
    ///
    /// Records in other regions are left pending in place.
    ///
    /// # Errors
    ///
    /// Returns [`RollbackFailure`] for the first handler that fails. That
    /// record and every record not yet visited, including later ones in
    /// `region`, stay pending.
    pub fn rollback_region(&self, region: Option<&str>) -> Result<usize, RollbackFailure<E>> {
        self.rollback(Selection::Region(region), &mut RollbackAuditLog::new())
    }

    /// [`ExecutionScope::rollback_all`], also returning an audit of the handlers invoked.
    pub fn rollback_all_with_audit(&self) -> (Result<usize, RollbackFailure<E>>, RollbackAuditLog) {
        let mut audit_log = RollbackAuditLog::new();
        let result = self.rollback(Selection::All, &mut audit_log);
        (result, audit_log)
    }

    /// [`ExecutionScope::rollback_region`], also returning an audit of the handlers invoked.
    pub fn rollback_region_with_audit(
        &self,
        region: Option<&str>,
    ) -> (Result<usize, RollbackFailure<E>>, RollbackAuditLog) {
        let mut audit_log = RollbackAuditLog::new();
        let result = self.rollback(Selection::Region(region), &mut audit_log);
        (result, audit_log)
    }

    #[must_use]
    pub fn pending(&self) -> usize {
        self.store().len(&self.identity)
    }

    #[must_use]
    pub fn pending_in_region(&self, region: Option<&str>) -> usize {
        self.store()
            .with_list(&self.identity, |list| {
                list.iter().filter(|pending| pending.record.is_in(region)).count()
            })
            .unwrap_or(0)
    }

    fn rollback(
        &self,
        selection: Selection<'_>,
        audit_log: &mut RollbackAuditLog,
    ) -> Result<usize, RollbackFailure<E>> {
        let pending = self.pending();
        if pending == 0 {
            return Ok(0);
        }

        debug!(
            execution = %self.identity,
            selection = ?selection,
            pending,
            "rolling back compensation"
        );

        // Only records registered before this point are visited. No shard lock
        // is held while a handler runs.
        let end = self.coordinator.sequence.load(Ordering::Relaxed);
        let mut cursor = 0;
        let mut undone = 0;

        while let Some((sequence, record)) = self.next_selected(selection, cursor, end) {
            cursor = sequence + 1;

            audit_log.record_start(record.handler_name(), record.region());
            match record.undo() {
                Ok(()) => {
                    audit_log.record_rolled_back();
                    self.store()
                        .remove_first(&self.identity, |pending| pending.sequence == sequence);
                    undone += 1;
                    debug!(
                        execution = %self.identity,
                        handler = %record.handler_name(),
                        region = ?record.region(),
                        "rolled back compensation"
                    );
                }
                Err(source) => {
                    audit_log.record_failure();
                    let failure = RollbackFailure {
                        identity: self.identity.clone(),
                        region: record.region().map(str::to_owned),
                        handler: record.handler_name().to_owned(),
                        source,
                    };
                    warn!(
                        execution = %self.identity,
                        handler = %failure.handler,
                        region = ?failure.region,
                        undone,
                        remaining = self.pending(),
                        "rollback handler failed; rollback is incomplete"
                    );
                    return Err(failure);
                }
            }
        }

        Ok(undone)
    }

    /// The oldest selected record with a sequence number in `from..end`.
    fn next_selected(
        &self,
        selection: Selection<'_>,
        from: u64,
        end: u64,
    ) -> Option<(u64, Arc<CompensationRecord<A, P, E>>)> {
        self.store()
            .with_list(&self.identity, |list| {
                list.iter()
                    .find(|pending| {
                        (from..end).contains(&pending.sequence) && selection.matches(pending)
                    })
                    .map(|pending| (pending.sequence, Arc::clone(&pending.record)))
            })
            .flatten()
    }
}

/// A registered record tagged with its registration sequence number.
struct Pending<A, P, E> {
    sequence: u64,
    record: Arc<CompensationRecord<A, P, E>>,
}

#[derive(Debug, Clone, Copy)]
enum Selection<'r> {
    All,
    Region(Option<&'r str>),
}

impl Selection<'_> {
    fn matches<A, P, E>(self, pending: &Pending<A, P, E>) -> bool {
        match self {
            Self::All => true,
            Self::Region(region) => pending.record.is_in(region),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::handler::{RollbackHandler, SharedHandler};
    use crate::state_items::StateItems;

    #[derive(Debug, PartialEq, thiserror::Error)]
    #[error("{0}")]
    struct TestError(String);

    type Coordinator = RollbackCoordinator<&'static str, (), TestError>;

    struct RecordingHandler {
        log: Arc<Mutex<Vec<String>>>,
        fail_on: Option<&'static str>,
    }

    impl RollbackHandler for RecordingHandler {
        type Activity = &'static str;
        type Context = ();
        type Error = TestError;

        fn name(&self) -> &str {
            "recording"
        }

        fn rollback_state(
            &self,
            _activity: Option<&Self::Activity>,
            _context: Option<&Self::Context>,
            state_items: &StateItems,
        ) -> Result<(), Self::Error> {
            let label = state_items
                .get::<&'static str>("label")
                .copied()
                .unwrap_or("?");
            if self.fail_on == Some(label) {
                return Err(TestError(format!("cannot undo {label}")));
            }
            self.log
                .lock()
                .map_err(|_| TestError("poisoned".to_string()))?
                .push(label.to_string());
            Ok(())
        }
    }

    fn recording(
        log: &Arc<Mutex<Vec<String>>>,
        fail_on: Option<&'static str>,
    ) -> SharedHandler<&'static str, (), TestError> {
        Arc::new(RecordingHandler {
            log: Arc::clone(log),
            fail_on,
        })
    }

    fn record(
        handler: &SharedHandler<&'static str, (), TestError>,
        label: &'static str,
        region: Option<&str>,
    ) -> CompensationRecord<&'static str, (), TestError> {
        CompensationRecord::new(Arc::clone(handler), StateItems::new().with("label", label))
            .with_region(region)
    }

    fn logged(log: &Arc<Mutex<Vec<String>>>) -> Vec<String> {
        log.lock().map(|entries| entries.clone()).unwrap_or_default()
    }

    #[test]
    fn rollback_without_pending_records_is_noop() -> anyhow::Result<()> {
        let coordinator = Coordinator::new();
        let scope = coordinator.scope(ExecutionIdentity::new("w", "empty"));

        assert_eq!(scope.rollback_all()?, 0);
        assert_eq!(scope.rollback_region(Some("A"))?, 0);
        Ok(())
    }

    #[test]
    fn rollback_all_runs_in_registration_order() -> anyhow::Result<()> {
        let log = Arc::new(Mutex::new(Vec::new()));
        let handler = recording(&log, None);
        let coordinator = Coordinator::new();
        let scope = coordinator.scope(ExecutionIdentity::new("w", "order"));

        for label in ["one", "two", "three"] {
            scope.register(record(&handler, label, None));
        }

        assert_eq!(scope.rollback_all()?, 3);
        assert_eq!(logged(&log), ["one", "two", "three"]);
        assert_eq!(scope.pending(), 0);
        assert!(coordinator.active_executions().is_empty());
        Ok(())
    }

    #[test]
    fn handler_may_register_during_rollback() -> anyhow::Result<()> {
        let coordinator: Arc<Coordinator> = Arc::new(Coordinator::new());
        let identity = ExecutionIdentity::new("w", "reentrant");
        let log = Arc::new(Mutex::new(Vec::new()));
        let follow_up = recording(&log, None);

        let reentrant: SharedHandler<&'static str, (), TestError> = {
            let coordinator = Arc::clone(&coordinator);
            let identity = identity.clone();
            crate::handler::handler_fn("reentrant", move |_, _, _| {
                coordinator
                    .scope(identity.clone())
                    .register(record(&follow_up, "follow-up", None));
                Ok(())
            })
        };

        let scope = coordinator.scope(identity);
        scope.register(CompensationRecord::new(reentrant, StateItems::new()));

        assert_eq!(scope.rollback_all()?, 1);
        assert_eq!(scope.pending(), 1);
        assert_eq!(scope.rollback_all()?, 1);
        assert_eq!(logged(&log), ["follow-up"]);
        Ok(())
    }

    #[test]
    fn failure_leaves_unvisited_records_in_place() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let handler = recording(&log, Some("a2"));
        let coordinator = Coordinator::new();
        let scope = coordinator.scope(ExecutionIdentity::new("w", "in-place"));

        scope.register(record(&handler, "b1", Some("B")));
        scope.register(record(&handler, "a1", Some("A")));
        scope.register(record(&handler, "b2", Some("B")));
        scope.register(record(&handler, "a2", Some("A")));
        scope.register(record(&handler, "a3", Some("A")));

        let failure = scope.rollback_region(Some("A")).err();
        assert_eq!(failure.map(|f| f.region), Some(Some("A".to_string())));
        assert_eq!(logged(&log), ["a1"]);
        assert_eq!(scope.pending(), 4);
        assert_eq!(scope.pending_in_region(Some("B")), 2);
        assert_eq!(scope.pending_in_region(Some("A")), 2);
    }

    #[test]
    fn panicking_handler_leaves_records_pending() {
        let coordinator: Coordinator = Coordinator::new();
        let scope = coordinator.scope(ExecutionIdentity::new("w", "panic"));
        let panicking: SharedHandler<&'static str, (), TestError> =
            crate::handler::handler_fn("panicking", |_, _, _| panic!("handler bug"));

        scope.register(CompensationRecord::new(panicking, StateItems::new()));

        let outcome =
            std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| scope.rollback_all()));
        assert!(outcome.is_err());
        assert_eq!(scope.pending(), 1);
    }

    #[test]
    fn pending_warn_threshold_does_not_limit_registration() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let handler = recording(&log, None);
        let config = RollbackConfig::default().with_pending_warn_threshold(Some(1));
        let coordinator = Coordinator::with_config(config);
        let scope = coordinator.scope(ExecutionIdentity::new("w", "threshold"));

        for label in ["one", "two", "three"] {
            scope.register(record(&handler, label, None));
        }
        assert_eq!(scope.pending(), 3);
    }

    #[test]
    fn maximal_warn_threshold_never_overflows() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let handler = recording(&log, None);
        let config = RollbackConfig::default().with_pending_warn_threshold(Some(usize::MAX));
        let coordinator = Coordinator::with_config(config);
        let scope = coordinator.scope(ExecutionIdentity::new("w", "max-threshold"));

        scope.register(record(&handler, "one", None));
        scope.register(record(&handler, "two", None));
        assert_eq!(scope.pending(), 2);
    }

    #[test]
    fn records_stay_visible_until_their_handler_succeeds() -> anyhow::Result<()> {
        let coordinator: Arc<Coordinator> = Arc::new(Coordinator::new());
        let identity = ExecutionIdentity::new("w", "visible");
        let seen = Arc::new(Mutex::new(Vec::new()));

        let observing: SharedHandler<&'static str, (), TestError> = {
            let coordinator = Arc::clone(&coordinator);
            let identity = identity.clone();
            let seen = Arc::clone(&seen);
            crate::handler::handler_fn("observing", move |_, _, _| {
                let pending = coordinator.scope(identity.clone()).pending();
                let total = coordinator.total_pending();
                seen.lock()
                    .map_err(|_| TestError("poisoned".to_string()))?
                    .push((pending, total));
                Ok(())
            })
        };

        let scope = coordinator.scope(identity);
        scope.register(CompensationRecord::new(Arc::clone(&observing), StateItems::new()));
        scope.register(CompensationRecord::new(observing, StateItems::new()));

        assert_eq!(scope.rollback_all()?, 2);
        assert_eq!(
            seen.lock().map(|seen| seen.clone()).unwrap_or_default(),
            [(2, 2), (1, 1)]
        );
        assert_eq!(scope.pending(), 0);
        Ok(())
    }

    #[test]
    fn handler_clearing_its_execution_ends_rollback() -> anyhow::Result<()> {
        let coordinator: Arc<Coordinator> = Arc::new(Coordinator::new());
        let identity = ExecutionIdentity::new("w", "cleared");
        let log = Arc::new(Mutex::new(Vec::new()));
        let later = recording(&log, None);
        let discarded = Arc::new(Mutex::new(None));

        let clearing: SharedHandler<&'static str, (), TestError> = {
            let coordinator = Arc::clone(&coordinator);
            let identity = identity.clone();
            let discarded = Arc::clone(&discarded);
            crate::handler::handler_fn("clearing", move |_, _, _| {
                let count = coordinator.scope(identity.clone()).clear_all();
                *discarded
                    .lock()
                    .map_err(|_| TestError("poisoned".to_string()))? = Some(count);
                Ok(())
            })
        };

        let scope = coordinator.scope(identity);
        scope.register(CompensationRecord::new(clearing, StateItems::new()));
        scope.register(record(&later, "later", None));
        scope.register(record(&later, "latest", None));

        assert_eq!(scope.rollback_all()?, 1);
        assert_eq!(discarded.lock().map(|d| *d).unwrap_or_default(), Some(3));
        assert!(logged(&log).is_empty());
        assert_eq!(scope.pending(), 0);
        assert!(coordinator.active_executions().is_empty());
        Ok(())
    }

    #[test]
    fn current_scope_requires_binding() {
        let coordinator = Coordinator::new();
        assert!(matches!(coordinator.current_scope(), Err(NoActiveExecution)));

        let identity = ExecutionIdentity::new("w", "bound");
        let _guard = ambient::bind(identity.clone());
        let scope = coordinator.current_scope();
        assert_eq!(scope.map(|s| s.identity().clone()).ok(), Some(identity));
    }
}
