//! Check service.
//!
//! The facade the HTTP layer talks to: single checks with result
//! recording, batch submission and polling, provider lookups and the
//! dashboard figures.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::batch::{BatchJob, BatchRunner};
use crate::config::ProbeConfig;
use crate::error::Result;
use crate::model::{CheckKind, CheckOutcome, CheckRecord, CheckStatus, EmailItem, ProxyItem};
use crate::provider::{ProviderEndpoints, ProviderRegistry};
use crate::store::{CheckStore, MemoryStore};
use crate::verify::{Checker, NetworkChecker};

/// Totals over the recorded single checks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CheckStats {
    /// Recorded email checks.
    pub total_email_checks: usize,
    /// Recorded proxy checks.
    pub total_proxy_checks: usize,
    /// Both of the above.
    pub total_checks: usize,
    /// Percentage of `SUCCESS` outcomes, one decimal place.
    pub success_rate: f64,
}

/// Runs checks and keeps track of their results.
pub struct CheckService {
    registry: Arc<ProviderRegistry>,
    checker: Arc<dyn Checker>,
    store: Arc<dyn CheckStore>,
    batches: BatchRunner,
    next_record: AtomicU64,
}

impl std::fmt::Debug for CheckService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckService")
            .field("registry", &self.registry)
            .field("next_record", &self.next_record)
            .finish_non_exhaustive()
    }
}

impl CheckService {
    /// Creates a service from its parts.
    #[must_use]
    pub fn new(
        registry: Arc<ProviderRegistry>,
        checker: Arc<dyn Checker>,
        store: Arc<dyn CheckStore>,
    ) -> Self {
        let batches = BatchRunner::new(Arc::clone(&store), Arc::clone(&checker));
        Self {
            registry,
            checker,
            store,
            batches,
            next_record: AtomicU64::new(1),
        }
    }

    /// Creates a service that probes real servers and keeps results in
    /// memory.
    #[must_use]
    pub fn with_network(registry: ProviderRegistry, config: ProbeConfig) -> Self {
        let registry = Arc::new(registry);
        let checker = Arc::new(NetworkChecker::new(Arc::clone(&registry), config));
        Self::new(registry, checker, Arc::new(MemoryStore::new()))
    }

    /// The provider table in use.
    #[must_use]
    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Checks one set of email credentials and records the outcome.
    pub async fn check_email(&self, item: EmailItem) -> CheckOutcome {
        let target = item.target();
        let detail = item.protocol_name().to_ascii_lowercase();
        let outcome = match item.into_request() {
            Ok(request) => self.checker.check_email(&request).await,
            Err(outcome) => outcome,
        };
        self.record(CheckKind::Email, target, detail, &outcome);
        outcome
    }

    /// Checks one proxy and records the outcome.
    pub async fn check_proxy(&self, item: ProxyItem) -> CheckOutcome {
        let target = item.target();
        let detail = item.kind_name().to_ascii_lowercase();
        let outcome = match item.into_request() {
            Ok(request) => self.checker.check_proxy(&request).await,
            Err(outcome) => outcome,
        };
        self.record(CheckKind::Proxy, target, detail, &outcome);
        outcome
    }

    fn record(&self, kind: CheckKind, target: String, detail: String, outcome: &CheckOutcome) {
        let id = self.next_record.fetch_add(1, Ordering::Relaxed);
        tracing::info!(
            id,
            %kind,
            target = %target,
            status = ?outcome.status,
            message = %outcome.message,
            "check finished"
        );
        let record = CheckRecord {
            id,
            kind,
            target,
            detail,
            outcome: outcome.clone(),
            checked_at: Utc::now(),
        };
        if let Err(e) = self.store.put_record(record) {
            tracing::warn!(id, error = %e, "failed to store check record");
        }
    }

    /// Starts a background batch and returns its job id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyBatch`](crate::Error::EmptyBatch) when `items`
    /// is empty.
    pub fn submit_batch(&self, kind: CheckKind, items: Vec<Value>) -> Result<String> {
        self.batches.submit(kind, items)
    }

    /// Snapshot of a batch job.
    #[must_use]
    pub fn batch_status(&self, id: &str) -> Option<BatchJob> {
        self.batches.status(id)
    }

    /// Snapshots of every batch job.
    #[must_use]
    pub fn batches(&self) -> Vec<BatchJob> {
        self.batches.list()
    }

    /// Provider endpoints for an address; empty for unknown domains.
    #[must_use]
    pub fn provider_config(&self, address: &str) -> ProviderEndpoints {
        self.registry.lookup_address(address)
    }

    /// Stored single-check records, oldest first.
    #[must_use]
    pub fn results(&self) -> Vec<CheckRecord> {
        self.store.list_records()
    }

    /// Totals and success rate over the stored single checks.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn stats(&self) -> CheckStats {
        let records = self.store.list_records();
        let emails = records.iter().filter(|r| r.kind == CheckKind::Email).count();
        let total = records.len();
        let succeeded = records
            .iter()
            .filter(|r| r.outcome.status == CheckStatus::Success)
            .count();
        let success_rate = if total == 0 {
            0.0
        } else {
            (succeeded as f64 / total as f64 * 1000.0).round() / 10.0
        };

        CheckStats {
            total_email_checks: emails,
            total_proxy_checks: total - emails,
            total_checks: total,
            success_rate,
        }
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
    use async_trait::async_trait;

    use super::*;
    use crate::model::{EmailCheckRequest, PortSpec, ProxyCheckRequest};
    use crate::provider::MailProtocol;

    /// Accepts passwords equal to "good".
    struct PasswordChecker;

    #[async_trait]
    impl Checker for PasswordChecker {
        async fn check_email(&self, request: &EmailCheckRequest) -> CheckOutcome {
            if request.secret == "good" {
                let label = request.protocol.label();
                CheckOutcome::success(format!("{label} authentication successful"))
            } else {
                CheckOutcome::failed("Authentication failed - invalid credentials")
            }
        }

        async fn check_proxy(&self, request: &ProxyCheckRequest) -> CheckOutcome {
            CheckOutcome::failed(format!("Connection failed to {}", request.target()))
        }
    }

    fn service() -> CheckService {
        CheckService::new(
            Arc::new(ProviderRegistry::builtin()),
            Arc::new(PasswordChecker),
            Arc::new(MemoryStore::new()),
        )
    }

    fn email(address: &str, password: &str) -> EmailItem {
        EmailItem {
            email: Some(address.to_string()),
            password: Some(password.to_string()),
            protocol: None,
        }
    }

    #[tokio::test]
    async fn test_checks_are_recorded_in_order() {
        let service = service();
        let outcome = service.check_email(email("a@gmail.com", "good")).await;
        assert_eq!(outcome.message, "SMTP authentication successful");
        service
            .check_proxy(ProxyItem {
                host: Some("10.0.0.1".into()),
                port: Some(PortSpec::from(3128u16)),
                ..ProxyItem::default()
            })
            .await;

        let results = service.results();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, 1);
        assert_eq!(results[0].kind, CheckKind::Email);
        assert_eq!(results[0].detail, "smtp");
        assert_eq!(results[1].id, 2);
        assert_eq!(results[1].target, "10.0.0.1:3128");
        assert_eq!(results[1].detail, "http");
    }

    #[tokio::test]
    async fn test_invalid_protocol_is_recorded_as_invalid() {
        let service = service();
        let mut item = email("a@gmail.com", "good");
        item.protocol = Some("ftp".into());
        let outcome = service.check_email(item).await;
        assert_eq!(outcome.status, CheckStatus::Invalid);
        assert_eq!(outcome.message, "Unknown protocol: ftp");
        assert_eq!(service.results().len(), 1);
    }

    #[tokio::test]
    async fn test_stats_round_to_one_decimal() {
        let service = service();
        assert!(service.stats().success_rate.abs() < f64::EPSILON);

        service.check_email(email("a@gmail.com", "good")).await;
        service.check_email(email("b@gmail.com", "bad")).await;
        service
            .check_proxy(ProxyItem {
                host: Some("10.0.0.1".into()),
                port: Some(PortSpec::from(8080u16)),
                ..ProxyItem::default()
            })
            .await;

        let stats = service.stats();
        assert_eq!(stats.total_email_checks, 2);
        assert_eq!(stats.total_proxy_checks, 1);
        assert_eq!(stats.total_checks, 3);
        assert!((stats.success_rate - 33.3).abs() < f64::EPSILON);
    }

    #[test]
    fn test_provider_config() {
        let service = service();
        let endpoints = service.provider_config("someone@Outlook.com");
        assert_eq!(endpoints.len(), 3);
        assert_eq!(endpoints[&MailProtocol::Imap].port, 993);
        assert!(service.provider_config("someone@example.org").is_empty());
        assert!(service.provider_config("no-at-sign").is_empty());
    }

    #[tokio::test]
    async fn test_batches_go_through_the_runner() {
        let service = service();
        let id = service
            .submit_batch(
                CheckKind::Email,
                vec![serde_json::json!({"email": "a@gmail.com", "password": "good"})],
            )
            .unwrap();
        assert!(service.batch_status(&id).is_some());
        assert_eq!(service.batches().len(), 1);
        assert!(service.submit_batch(CheckKind::Proxy, Vec::new()).is_err());
    }
}
