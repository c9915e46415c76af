use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use filedepot::auth::{CredentialStore, StaticCredentials};
use filedepot::cli::DaemonOpts;
use filedepot::logger::{Logger, NoopLogger, TextLogger};
use filedepot::ServerState;

fn main() -> Result<()> {
    let opts = DaemonOpts::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if opts.root.exists() && !opts.root.is_dir() {
        anyhow::bail!("Error: Root path is not a directory: {}", opts.root.display());
    }
    std::fs::create_dir_all(&opts.root)
        .with_context(|| format!("Failed to create root directory: {}", opts.root.display()))?;

    // Canonicalize the path for better logging
    let canonical_root = std::fs::canonicalize(&opts.root)
        .with_context(|| format!("Failed to canonicalize root path: {}", opts.root.display()))?;

    let credentials: Arc<dyn CredentialStore> = match &opts.credentials {
        Some(path) => {
            let table = StaticCredentials::load(path)
                .with_context(|| format!("Failed to load credentials: {}", path.display()))?;
            tracing::info!(users = table.len(), path = %path.display(), "credentials loaded");
            Arc::new(table)
        }
        None => {
            tracing::warn!("no --credentials given, using built-in user table");
            Arc::new(StaticCredentials::default())
        }
    };

    let logger: Arc<dyn Logger> = match &opts.log_file {
        Some(path) => Arc::new(
            TextLogger::new(path)
                .with_context(|| format!("Failed to open log file: {}", path.display()))?,
        ),
        None => Arc::new(NoopLogger),
    };

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind = %opts.bind,
        root = %canonical_root.display(),
        "starting depotd"
    );
    if opts.bind.starts_with("0.0.0.0") {
        tracing::warn!(
            "binding to all interfaces; the protocol is unencrypted and uploads need no login"
        );
    }

    let state = Arc::new(ServerState::new(canonical_root, credentials).with_logger(logger));

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;
    rt.block_on(filedepot::serve(&opts.bind, state))
}
