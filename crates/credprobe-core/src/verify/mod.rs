//! Verification engine.
//!
//! The verifiers never fail: every problem, from a malformed request to a
//! TLS handshake error, comes back as a [`CheckOutcome`].

pub mod email;
pub mod proxy;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::ProbeConfig;
use crate::model::{CheckOutcome, EmailCheckRequest, ProxyCheckRequest};
use crate::provider::ProviderRegistry;

/// Something that can run checks.
///
/// The batch runner and service depend on this trait so tests can swap in
/// canned or misbehaving checkers.
#[async_trait]
pub trait Checker: Send + Sync {
    /// Verifies email credentials.
    async fn check_email(&self, request: &EmailCheckRequest) -> CheckOutcome;

    /// Verifies a proxy server.
    async fn check_proxy(&self, request: &ProxyCheckRequest) -> CheckOutcome;
}

/// Checker that talks to real servers.
#[derive(Debug, Clone)]
pub struct NetworkChecker {
    registry: Arc<ProviderRegistry>,
    config: ProbeConfig,
}

impl NetworkChecker {
    /// Creates a checker over the given provider table.
    #[must_use]
    pub const fn new(registry: Arc<ProviderRegistry>, config: ProbeConfig) -> Self {
        Self { registry, config }
    }
}

#[async_trait]
impl Checker for NetworkChecker {
    async fn check_email(&self, request: &EmailCheckRequest) -> CheckOutcome {
        email::verify(&self.registry, &self.config, request).await
    }

    async fn check_proxy(&self, request: &ProxyCheckRequest) -> CheckOutcome {
        proxy::verify(&self.config, request).await
    }
}
