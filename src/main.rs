use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;

use ferry::cli::ClientOpts;
use ferry::client::FileClient;
use ferry::logger::StderrLogger;
use ferry::tls;

fn main() -> Result<()> {
    let opts = ClientOpts::parse();

    let tls_config = tls::load_client_config(&opts.ca)
        .with_context(|| format!("load trust anchor {}", opts.ca.display()))?;
    std::fs::create_dir_all(&opts.download_dir)
        .with_context(|| format!("create download dir {}", opts.download_dir.display()))?;

    // The client session is strictly sequential, so a single thread drives
    // one blocking call at a time.
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("build tokio runtime")?;

    let mut client = FileClient::new(
        &opts.host,
        opts.port,
        tls_config,
        opts.download_dir.clone(),
        Duration::from_secs(opts.timeout_secs),
        Arc::new(StderrLogger),
    );

    rt.block_on(async {
        client.connect().await?;
        let bytes = client.download(&opts.file_name).await?;
        client.disconnect().await?;
        println!(
            "download success: {} ({bytes} bytes)",
            opts.download_dir.join(&opts.file_name).display()
        );
        Ok(())
    })
}
