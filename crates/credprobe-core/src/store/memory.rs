//! In-memory store.

use std::collections::{BTreeMap, HashMap};
use std::sync::{PoisonError, RwLock};

use super::CheckStore;
use crate::batch::BatchJob;
use crate::error::{Error, Result};
use crate::model::CheckRecord;

/// Process-lifetime store backed by two `RwLock`ed maps. Nothing is evicted.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<BTreeMap<u64, CheckRecord>>,
    jobs: RwLock<HashMap<String, BatchJob>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CheckStore for MemoryStore {
    fn put_record(&self, record: CheckRecord) -> Result<()> {
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        if records.contains_key(&record.id) {
            return Err(Error::DuplicateRecord(record.id));
        }
        records.insert(record.id, record);
        Ok(())
    }

    fn get_record(&self, id: u64) -> Option<CheckRecord> {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }

    fn list_records(&self) -> Vec<CheckRecord> {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    fn insert_job(&self, job: BatchJob) -> Result<()> {
        let mut jobs = self.jobs.write().unwrap_or_else(PoisonError::into_inner);
        if jobs.contains_key(&job.id) {
            return Err(Error::DuplicateJob(job.id));
        }
        jobs.insert(job.id.clone(), job);
        Ok(())
    }

    fn update_job(&self, id: &str, apply: &mut dyn FnMut(&mut BatchJob)) -> Result<()> {
        let mut jobs = self.jobs.write().unwrap_or_else(PoisonError::into_inner);
        let job = jobs
            .get_mut(id)
            .ok_or_else(|| Error::JobNotFound(id.to_string()))?;
        apply(job);
        Ok(())
    }

    fn get_job(&self, id: &str) -> Option<BatchJob> {
        self.jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    fn list_jobs(&self) -> Vec<BatchJob> {
        let mut jobs: Vec<BatchJob> = self
            .jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        jobs.sort_by(|a, b| a.started_at.cmp(&b.started_at).then_with(|| a.id.cmp(&b.id)));
        jobs
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
    use chrono::Utc;

    use super::*;
    use crate::model::{CheckKind, CheckOutcome};

    fn record(id: u64) -> CheckRecord {
        CheckRecord {
            id,
            kind: CheckKind::Proxy,
            target: "10.0.0.1:8080".to_string(),
            detail: "http".to_string(),
            outcome: CheckOutcome::failed("Connection failed to 10.0.0.1:8080"),
            checked_at: Utc::now(),
        }
    }

    #[test]
    fn test_records_are_write_once() {
        let store = MemoryStore::new();
        store.put_record(record(2)).unwrap();
        store.put_record(record(1)).unwrap();
        assert!(matches!(
            store.put_record(record(1)),
            Err(Error::DuplicateRecord(1))
        ));
        let ids: Vec<u64> = store.list_records().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(store.get_record(2).unwrap().target, "10.0.0.1:8080");
        assert!(store.get_record(3).is_none());
    }

    #[test]
    fn test_job_update_in_place() {
        let store = MemoryStore::new();
        store
            .insert_job(BatchJob::new("batch_a", CheckKind::Email, 1))
            .unwrap();
        assert!(matches!(
            store.insert_job(BatchJob::new("batch_a", CheckKind::Email, 1)),
            Err(Error::DuplicateJob(_))
        ));

        store
            .update_job("batch_a", &mut |job| {
                job.record(CheckOutcome::success("SMTP authentication successful"));
                job.complete();
            })
            .unwrap();
        let job = store.get_job("batch_a").unwrap();
        assert_eq!(job.progress, 1);
        assert!(job.is_complete());
    }

    #[test]
    fn test_unknown_job() {
        let store = MemoryStore::new();
        assert!(store.get_job("batch_missing").is_none());
        assert!(matches!(
            store.update_job("batch_missing", &mut |_| {}),
            Err(Error::JobNotFound(_))
        ));
        assert!(store.list_jobs().is_empty());
    }
}
