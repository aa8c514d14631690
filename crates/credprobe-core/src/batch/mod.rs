//! Batch job orchestration.
//!
//! A submitted batch gets a job record in the store and one background
//! worker. The worker runs the items strictly in order and appends an
//! outcome after each one, so callers can poll progress through
//! [`BatchRunner::status`] while the job runs.
//!
//! Each check runs in its own task. A check that panics becomes an `ERROR`
//! outcome in its slot and the batch carries on. A batch always ends
//! `COMPLETED`: if the worker itself dies, a supervisor fills the remaining
//! slots with `ERROR` outcomes.

mod job;

pub use job::{BatchJob, JobStatus};

use std::future::Future;
use std::sync::Arc;

use serde_json::Value;
use tokio::task::{JoinError, JoinHandle};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::model::{CheckKind, CheckOutcome, CheckStatus, EmailItem, ProxyItem};
use crate::store::CheckStore;
use crate::verify::Checker;

/// Starts batch jobs and answers status queries.
#[derive(Clone)]
pub struct BatchRunner {
    store: Arc<dyn CheckStore>,
    checker: Arc<dyn Checker>,
}

impl std::fmt::Debug for BatchRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchRunner").finish_non_exhaustive()
    }
}

impl BatchRunner {
    /// Creates a runner over a store and a checker.
    #[must_use]
    pub fn new(store: Arc<dyn CheckStore>, checker: Arc<dyn Checker>) -> Self {
        Self { store, checker }
    }

    /// Registers a job for `items` and starts processing it in the
    /// background. Returns the job id without waiting for any check.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyBatch`] when `items` is empty, or a store error
    /// if the job cannot be registered.
    pub fn submit(&self, kind: CheckKind, items: Vec<Value>) -> Result<String> {
        if items.is_empty() {
            return Err(Error::EmptyBatch);
        }

        let id = format!("batch_{}", Uuid::new_v4().simple());
        let total = items.len();
        self.store.insert_job(BatchJob::new(&id, kind, total))?;
        tracing::info!(job_id = %id, %kind, total, "batch submitted");

        let worker = tokio::spawn(run_items(
            Arc::clone(&self.store),
            Arc::clone(&self.checker),
            id.clone(),
            kind,
            items,
        ));
        tokio::spawn(supervise(Arc::clone(&self.store), id.clone(), worker));

        Ok(id)
    }

    /// Snapshot of a job, or `None` for an unknown id.
    #[must_use]
    pub fn status(&self, id: &str) -> Option<BatchJob> {
        self.store.get_job(id)
    }

    /// Snapshots of every job.
    #[must_use]
    pub fn list(&self) -> Vec<BatchJob> {
        self.store.list_jobs()
    }
}

async fn run_items(
    store: Arc<dyn CheckStore>,
    checker: Arc<dyn Checker>,
    job_id: String,
    kind: CheckKind,
    items: Vec<Value>,
) {
    for (index, item) in items.into_iter().enumerate() {
        let outcome = process_item(&checker, kind, item).await;
        tracing::debug!(job_id = %job_id, index, status = ?outcome.status, "batch item done");

        let mut pending = Some(outcome);
        let recorded = store.update_job(&job_id, &mut |job| {
            if let Some(outcome) = pending.take() {
                job.record(outcome);
            }
        });
        if let Err(e) = recorded {
            tracing::warn!(job_id = %job_id, error = %e, "dropping batch, job record is gone");
            return;
        }
    }
}

/// Waits for the worker and completes the job, filling any slots the worker
/// left empty.
async fn supervise(store: Arc<dyn CheckStore>, job_id: String, worker: JoinHandle<()>) {
    let filler = match worker.await {
        Ok(()) => None,
        Err(err) => {
            let cause = describe_join_error(err);
            tracing::warn!(job_id = %job_id, cause = %cause, "batch worker died");
            Some(CheckOutcome::error(format!("Processing error: {cause}")))
        }
    };

    let mut succeeded = 0;
    let mut total = 0;
    let completed = store.update_job(&job_id, &mut |job| {
        if let Some(outcome) = &filler {
            while job.record(outcome.clone()) {}
        }
        job.complete();
        succeeded = job
            .results
            .iter()
            .filter(|o| o.status == CheckStatus::Success)
            .count();
        total = job.total;
    });

    match completed {
        Ok(()) => tracing::info!(job_id = %job_id, total, succeeded, "batch completed"),
        Err(e) => tracing::warn!(job_id = %job_id, error = %e, "could not complete batch"),
    }
}

async fn process_item(checker: &Arc<dyn Checker>, kind: CheckKind, item: Value) -> CheckOutcome {
    match kind {
        CheckKind::Email => {
            let item: EmailItem = match serde_json::from_value(item) {
                Ok(item) => item,
                Err(e) => return CheckOutcome::invalid(format!("Malformed item: {e}")),
            };
            let target = item.target();
            let outcome = match item.into_request() {
                Ok(request) => {
                    let checker = Arc::clone(checker);
                    isolate(async move { checker.check_email(&request).await }).await
                }
                Err(outcome) => outcome,
            };
            outcome.with_target(target)
        }
        CheckKind::Proxy => {
            let item: ProxyItem = match serde_json::from_value(item) {
                Ok(item) => item,
                Err(e) => return CheckOutcome::invalid(format!("Malformed item: {e}")),
            };
            let target = item.target();
            let outcome = match item.into_request() {
                Ok(request) => {
                    let checker = Arc::clone(checker);
                    isolate(async move { checker.check_proxy(&request).await }).await
                }
                Err(outcome) => outcome,
            };
            outcome.with_target(target)
        }
    }
}

/// Runs one check in its own task so a panic cannot take the worker down.
async fn isolate<F>(check: F) -> CheckOutcome
where
    F: Future<Output = CheckOutcome> + Send + 'static,
{
    match tokio::spawn(check).await {
        Ok(outcome) => outcome,
        Err(err) => CheckOutcome::error(format!("Processing error: {}", describe_join_error(err))),
    }
}

fn describe_join_error(err: JoinError) -> String {
    if !err.is_panic() {
        return "task cancelled".to_string();
    }
    let payload = err.into_panic();
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "check panicked".to_string()
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
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::json;
    use tokio::sync::Semaphore;

    use super::*;
    use crate::model::{EmailCheckRequest, ProxyCheckRequest};
    use crate::store::MemoryStore;

    /// Succeeds for every email, fails every proxy, panics on `boom@`.
    struct CannedChecker;

    #[async_trait]
    impl Checker for CannedChecker {
        async fn check_email(&self, request: &EmailCheckRequest) -> CheckOutcome {
            assert!(!request.address.starts_with("boom@"), "checker exploded");
            CheckOutcome::success(format!("checked {}", request.address))
        }

        async fn check_proxy(&self, request: &ProxyCheckRequest) -> CheckOutcome {
            CheckOutcome::failed(format!("proxy {} via {}", request.target(), request.kind))
        }
    }

    /// Every check waits for a permit.
    struct GatedChecker {
        gate: Arc<Semaphore>,
    }

    #[async_trait]
    impl Checker for GatedChecker {
        async fn check_email(&self, request: &EmailCheckRequest) -> CheckOutcome {
            self.gate.acquire().await.unwrap().forget();
            CheckOutcome::success(format!("checked {}", request.address))
        }

        async fn check_proxy(&self, _request: &ProxyCheckRequest) -> CheckOutcome {
            self.gate.acquire().await.unwrap().forget();
            CheckOutcome::success("HTTP proxy is working")
        }
    }

    fn runner(checker: impl Checker + 'static) -> BatchRunner {
        BatchRunner::new(Arc::new(MemoryStore::new()), Arc::new(checker))
    }

    async fn wait_until(runner: &BatchRunner, id: &str, done: impl Fn(&BatchJob) -> bool) -> BatchJob {
        for _ in 0..500 {
            let job = runner.status(id).unwrap();
            if done(&job) {
                return job;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("batch {id} did not reach the expected state");
    }

    #[tokio::test]
    async fn test_malformed_item_keeps_its_slot() {
        let runner = runner(CannedChecker);
        let id = runner
            .submit(
                CheckKind::Email,
                vec![
                    json!({"email": "a@gmail.com", "password": "x"}),
                    json!({"email": "b@gmail.com"}),
                    json!({"email": "c@gmail.com", "password": "y", "protocol": "imap"}),
                ],
            )
            .unwrap();

        let job = wait_until(&runner, &id, BatchJob::is_complete).await;
        assert_eq!(job.progress, 3);
        assert_eq!(job.total, 3);
        assert_eq!(job.results.len(), 3);
        assert_eq!(job.results[0].message, "checked a@gmail.com");
        assert_eq!(job.results[1].status, CheckStatus::Invalid);
        assert_eq!(job.results[1].message, "Email and password required");
        assert_eq!(job.results[1].target.as_deref(), Some("b@gmail.com"));
        assert_eq!(job.results[2].message, "checked c@gmail.com");
        assert!(job.completed_at.is_some());
    }

    #[tokio::test]
    async fn test_all_panicking_items_still_complete() {
        let runner = runner(CannedChecker);
        let items = (0..4)
            .map(|i| json!({"email": format!("boom@{i}.test"), "password": "x"}))
            .collect();
        let id = runner.submit(CheckKind::Email, items).unwrap();

        let job = wait_until(&runner, &id, BatchJob::is_complete).await;
        assert_eq!(job.progress, 4);
        assert!(job.results.iter().all(|o| o.status == CheckStatus::Error));
        assert_eq!(job.results[0].message, "Processing error: checker exploded");
    }

    #[tokio::test]
    async fn test_polling_after_completion_is_stable() {
        let runner = runner(CannedChecker);
        let id = runner
            .submit(CheckKind::Email, vec![json!({"email": "a@b.c", "password": "x"})])
            .unwrap();
        let first = wait_until(&runner, &id, BatchJob::is_complete).await;
        let second = runner.status(&id).unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_proxy_items_and_unknown_type() {
        let runner = runner(CannedChecker);
        let id = runner
            .submit(
                CheckKind::Proxy,
                vec![
                    json!({"host": "10.0.0.1", "port": "8080"}),
                    json!({"host": "10.0.0.2", "port": 1080, "type": "ftp"}),
                    json!("not an object"),
                ],
            )
            .unwrap();

        let job = wait_until(&runner, &id, BatchJob::is_complete).await;
        assert_eq!(job.results[0].message, "proxy 10.0.0.1:8080 via http");
        assert_eq!(job.results[0].target.as_deref(), Some("10.0.0.1:8080"));
        assert_eq!(job.results[1].status, CheckStatus::Invalid);
        assert_eq!(job.results[1].message, "Unsupported proxy type: ftp");
        assert_eq!(job.results[2].status, CheckStatus::Invalid);
        assert!(job.results[2].message.starts_with("Malformed item: "));
    }

    #[tokio::test]
    async fn test_progress_is_visible_while_running() {
        let gate = Arc::new(Semaphore::new(0));
        let runner = runner(GatedChecker {
            gate: Arc::clone(&gate),
        });
        let items = vec![
            json!({"email": "a@b.c", "password": "x"}),
            json!({"email": "d@e.f", "password": "y"}),
        ];
        let id = runner.submit(CheckKind::Email, items).unwrap();

        let job = runner.status(&id).unwrap();
        assert_eq!(job.status, JobStatus::Running);
        assert_eq!(job.progress, 0);
        assert_eq!(job.total, 2);

        gate.add_permits(1);
        let job = wait_until(&runner, &id, |job| job.progress == 1).await;
        assert_eq!(job.status, JobStatus::Running);
        assert_eq!(job.results.len(), 1);

        gate.add_permits(1);
        let job = wait_until(&runner, &id, BatchJob::is_complete).await;
        assert_eq!(job.progress, 2);
    }

    #[tokio::test]
    async fn test_empty_batch_and_unknown_job() {
        let runner = runner(CannedChecker);
        assert!(matches!(
            runner.submit(CheckKind::Email, Vec::new()),
            Err(Error::EmptyBatch)
        ));
        assert!(runner.status("batch_nope").is_none());
        assert!(runner.list().is_empty());
    }

    #[tokio::test]
    async fn test_job_ids_are_unique() {
        let runner = runner(CannedChecker);
        let item = || vec![json!({"email": "a@b.c", "password": "x"})];
        let a = runner.submit(CheckKind::Email, item()).unwrap();
        let b = runner.submit(CheckKind::Email, item()).unwrap();
        assert_ne!(a, b);
        assert!(a.starts_with("batch_"));
        assert_eq!(runner.list().len(), 2);
    }
}
