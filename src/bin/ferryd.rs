use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;

use ferry::cli::DaemonOpts;
use ferry::logger::{Logger, StderrLogger, TextLogger};
use ferry::server;
use ferry::tls;

fn main() -> Result<()> {
    let opts = DaemonOpts::parse();

    if !opts.root.exists() {
        anyhow::bail!("root directory does not exist: {}", opts.root.display());
    }
    if !opts.root.is_dir() {
        anyhow::bail!("root path is not a directory: {}", opts.root.display());
    }
    let root = std::fs::canonicalize(&opts.root)
        .with_context(|| format!("canonicalize root path {}", opts.root.display()))?;

    let tls_config = tls::load_server_config(&opts.cert, &opts.key)
        .context("load TLS certificate and key")?;

    let log: Arc<dyn Logger> = match &opts.log {
        Some(path) => Arc::new(TextLogger::new(path)?),
        None => Arc::new(StderrLogger),
    };

    let threads = if opts.threads == 0 {
        num_cpus::get()
    } else {
        opts.threads
    };
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(threads)
        .enable_all()
        .build()
        .context("build tokio runtime")?;

    rt.block_on(server::serve(
        &opts.bind,
        &root,
        tls_config,
        Duration::from_secs(opts.timeout_secs),
        log,
    ))
}
