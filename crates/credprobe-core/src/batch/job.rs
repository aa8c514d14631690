//! Batch job record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{CheckKind, CheckOutcome};

/// Lifecycle of a batch job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Items are still being processed.
    Running,
    /// Every item has an outcome.
    Completed,
}

/// A batch of checks processed in the background.
///
/// `results[i]` is the outcome of item `i`, so `results.len() == progress`
/// at all times.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchJob {
    /// `batch_<uuid>`.
    pub id: String,
    /// What the items are.
    pub kind: CheckKind,
    /// Running or completed.
    pub status: JobStatus,
    /// Number of submitted items.
    pub total: usize,
    /// Number of items with an outcome.
    pub progress: usize,
    /// Outcomes in submission order.
    pub results: Vec<CheckOutcome>,
    /// When the job was submitted.
    pub started_at: DateTime<Utc>,
    /// When the last item finished.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl BatchJob {
    /// Creates a running job with no results yet.
    #[must_use]
    pub fn new(id: impl Into<String>, kind: CheckKind, total: usize) -> Self {
        Self {
            id: id.into(),
            kind,
            status: JobStatus::Running,
            total,
            progress: 0,
            results: Vec::with_capacity(total),
            started_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Appends the next outcome. Returns false if every slot is already filled.
    pub fn record(&mut self, outcome: CheckOutcome) -> bool {
        if self.progress >= self.total {
            return false;
        }
        self.results.push(outcome);
        self.progress = self.results.len();
        true
    }

    /// Marks the job completed. Only the first call has any effect.
    pub fn complete(&mut self) {
        if self.status == JobStatus::Running {
            self.status = JobStatus::Completed;
            self.completed_at = Some(Utc::now());
        }
    }

    /// Returns true once the job is completed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.status == JobStatus::Completed
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_record_stops_at_total() {
        let mut job = BatchJob::new("batch_x", CheckKind::Email, 2);
        assert!(job.record(CheckOutcome::success("a")));
        assert!(job.record(CheckOutcome::failed("b")));
        assert!(!job.record(CheckOutcome::error("c")));
        assert_eq!(job.progress, 2);
        assert_eq!(job.results.len(), 2);
    }

    #[test]
    fn test_complete_is_idempotent() {
        let mut job = BatchJob::new("batch_x", CheckKind::Proxy, 0);
        job.complete();
        let first = job.completed_at;
        job.complete();
        assert!(job.is_complete());
        assert_eq!(job.completed_at, first);
    }

    #[test]
    fn test_running_job_omits_completed_at() {
        let job = BatchJob::new("batch_x", CheckKind::Email, 3);
        let json = serde_json::to_value(&job).unwrap();
        assert_eq!(json["status"], "running");
        assert_eq!(json["total"], 3);
        assert!(json.get("completed_at").is_none());
    }
}
