use std::time::Instant;

/// Outcome of one handler invocation during a rollback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum UndoStatus {
    /// The handler is running.
    Started,
    /// The handler succeeded and the record was removed.
    RolledBack,
    /// The handler failed and the record is still pending.
    Failed,
}

/// Record of one handler invocation.
#[derive(Debug)]
pub struct UndoRecord {
    /// Name of the handler.
    pub handler: String,
    /// Region of the record being undone.
    pub region: Option<String>,
    /// Current status.
    pub status: UndoStatus,
    /// When the handler was invoked.
    pub started_at: Instant,
    /// When the handler returned.
    pub completed_at: Option<Instant>,
}

/// Audit log of the handlers one rollback call invoked, in invocation order.
#[derive(Debug, Default)]
pub struct RollbackAuditLog {
    records: Vec<UndoRecord>,
}

impl RollbackAuditLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_start(&mut self, handler: &str, region: Option<&str>) {
        self.records.push(UndoRecord {
            handler: handler.to_string(),
            region: region.map(str::to_owned),
            status: UndoStatus::Started,
            started_at: Instant::now(),
            completed_at: None,
        });
    }

    pub(crate) fn record_rolled_back(&mut self) {
        self.complete_last(UndoStatus::RolledBack);
    }

    pub(crate) fn record_failure(&mut self) {
        self.complete_last(UndoStatus::Failed);
    }

    fn complete_last(&mut self, status: UndoStatus) {
        if let Some(record) = self.records.last_mut() {
            record.status = status;
            record.completed_at = Some(Instant::now());
        }
    }

    #[must_use]
    pub fn records(&self) -> &[UndoRecord] {
        &self.records
    }

    /// Number of handlers that completed successfully.
    #[must_use]
    pub fn rolled_back(&self) -> usize {
        self.records
            .iter()
            .filter(|record| record.status == UndoStatus::RolledBack)
            .count()
    }

    /// The failed invocation, if the rollback stopped early.
    #[must_use]
    pub fn failure(&self) -> Option<&UndoRecord> {
        self.records
            .iter()
            .find(|record| record.status == UndoStatus::Failed)
    }

    /// One line per invocation, for display.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut lines = Vec::new();
        for record in &self.records {
            let status = match record.status {
                UndoStatus::Started => "…",
                UndoStatus::RolledBack => "↩",
                UndoStatus::Failed => "⚠",
            };
            match &record.region {
                Some(region) => lines.push(format!("{status} {} [{region}]", record.handler)),
                None => lines.push(format!("{status} {}", record.handler)),
            }
        }
        lines.join("\n")
    }
}
