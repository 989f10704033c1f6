use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing intake activity.
#[derive(Default)]
pub struct IntakeMetrics {
    projects_packaged: AtomicU64,
    documents_summarized: AtomicU64,
    failed_runs: AtomicU64,
}

impl IntakeMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a packaged project and the number of documents summarized for it.
    pub fn record_project(&self, documents: u64) {
        self.projects_packaged.fetch_add(1, Ordering::Relaxed);
        self.documents_summarized
            .fetch_add(documents, Ordering::Relaxed);
    }

    /// Record a run that stopped before producing an archive.
    pub fn record_failure(&self) {
        self.failed_runs.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            projects_packaged: self.projects_packaged.load(Ordering::Relaxed),
            documents_summarized: self.documents_summarized.load(Ordering::Relaxed),
            failed_runs: self.failed_runs.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of intake counters used for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Number of archives produced since startup.
    pub projects_packaged: u64,
    /// Documents (inputs plus final deliverables) summarized across packaged projects.
    pub documents_summarized: u64,
    /// Runs that ended with an error.
    pub failed_runs: u64,
}
