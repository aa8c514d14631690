//! Storage for check records and batch jobs.

mod memory;

pub use memory::MemoryStore;

use crate::batch::BatchJob;
use crate::error::Result;
use crate::model::CheckRecord;

/// Backing store shared by the service and the batch workers.
///
/// Implementations synchronize internally. None of these calls may block on
/// the network, and callers never hold a borrow across an `.await`.
pub trait CheckStore: Send + Sync {
    /// Stores a single-check record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateRecord`](crate::Error::DuplicateRecord) if
    /// the id is taken.
    fn put_record(&self, record: CheckRecord) -> Result<()>;

    /// Looks up a record by id.
    fn get_record(&self, id: u64) -> Option<CheckRecord>;

    /// All records ordered by id.
    fn list_records(&self) -> Vec<CheckRecord>;

    /// Stores a new batch job.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateJob`](crate::Error::DuplicateJob) if the id
    /// is taken.
    fn insert_job(&self, job: BatchJob) -> Result<()>;

    /// Mutates a job in place under the store's lock.
    ///
    /// # Errors
    ///
    /// Returns [`Error::JobNotFound`](crate::Error::JobNotFound) for an
    /// unknown id.
    fn update_job(&self, id: &str, apply: &mut dyn FnMut(&mut BatchJob)) -> Result<()>;

    /// Snapshot of one job.
    fn get_job(&self, id: &str) -> Option<BatchJob>;

    /// Snapshots of every job, oldest first.
    fn list_jobs(&self) -> Vec<BatchJob>;
}
