use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Process-wide job counters shared by every worker.
///
/// Each counter is updated atomically; `snapshot` reads them one by one, so a
/// snapshot taken mid-job may be a moment stale but never torn per counter.
#[derive(Debug, Default)]
pub struct StatsTracker {
    processing: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    lead_sync_updated: AtomicU64,
    lead_sync_failed: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StatsSnapshot {
    pub processing: u64,
    pub completed: u64,
    pub failed: u64,
    pub lead_sync_updated: u64,
    pub lead_sync_failed: u64,
    /// `completed / (completed + failed)`; `None` before the first outcome.
    pub success_rate: Option<f64>,
}

impl StatsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn job_started(&self) {
        self.processing.fetch_add(1, Ordering::SeqCst);
    }

    /// Records the outcome of a job previously passed to `job_started`.
    pub fn job_finished(&self, success: bool) {
        if success {
            self.completed.fetch_add(1, Ordering::SeqCst);
        } else {
            self.failed.fetch_add(1, Ordering::SeqCst);
        }
        // Saturating: never wrap below zero even if calls are mismatched.
        let _ = self
            .processing
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
    }

    pub fn lead_sync(&self, updated: bool) {
        if updated {
            self.lead_sync_updated.fetch_add(1, Ordering::SeqCst);
        } else {
            self.lead_sync_failed.fetch_add(1, Ordering::SeqCst);
        }
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let completed = self.completed.load(Ordering::SeqCst);
        let failed = self.failed.load(Ordering::SeqCst);
        let finished = completed + failed;
        StatsSnapshot {
            processing: self.processing.load(Ordering::SeqCst),
            completed,
            failed,
            lead_sync_updated: self.lead_sync_updated.load(Ordering::SeqCst),
            lead_sync_failed: self.lead_sync_failed.load(Ordering::SeqCst),
            success_rate: (finished > 0).then(|| completed as f64 / finished as f64),
        }
    }
}

impl StatsSnapshot {
    /// Success rate as a percentage for log lines, 0 before any outcome.
    pub fn success_percentage(&self) -> f64 {
        self.success_rate.unwrap_or(0.0) * 100.0
    }
}
