//! `credprobe` - email credential and proxy verification service
//!
//! Serves a bearer-protected JSON API over the verification engine in
//! `credprobe-core`.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod api;
mod cli;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use credprobe_core::{CheckService, ProbeConfig, ProviderRegistry};

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "credprobe=info,credprobe_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let registry = match &args.providers {
        Some(path) => ProviderRegistry::from_file(path)
            .with_context(|| format!("failed to load provider table {}", path.display()))?,
        None => ProviderRegistry::builtin(),
    };
    info!(domains = ?registry.domains(), "provider table loaded");

    let config = ProbeConfig::default().with_timeout(Duration::from_secs(args.timeout_secs));
    let service = Arc::new(CheckService::with_network(registry, config));
    let app = api::router(service, args.api_token);

    let listener = tokio::net::TcpListener::bind(args.listen)
        .await
        .with_context(|| format!("failed to bind {}", args.listen))?;
    info!(addr = %listener.local_addr()?, "Starting credprobe");

    axum::serve(listener, app).await?;
    Ok(())
}
