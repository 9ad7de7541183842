//! Shared CLI definitions for the ferry client and the ferryd daemon

use clap::Parser;
use std::path::PathBuf;

use crate::protocol;

/// Daemon options used by ferryd
#[derive(Clone, Debug, Parser)]
#[command(author, version, about = "ferryd - serve files over TLS WebSockets")]
pub struct DaemonOpts {
    /// Bind address (host:port)
    #[arg(long, default_value = "[::]:34094")]
    pub bind: String,

    /// Root directory to serve
    #[arg(long, default_value = "./files")]
    pub root: PathBuf,

    /// Worker threads driving the event loop (0 = auto)
    #[arg(short = 't', long, default_value_t = 4)]
    pub threads: usize,

    /// PEM certificate file
    #[arg(long)]
    pub cert: PathBuf,

    /// PEM private-key file
    #[arg(long)]
    pub key: PathBuf,

    /// Per-operation network timeout in seconds
    #[arg(long, default_value_t = protocol::DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs: u64,

    /// Append log lines to this file instead of stderr
    #[arg(long)]
    pub log: Option<PathBuf>,
}

/// Client options used by ferry
#[derive(Clone, Debug, Parser)]
#[command(author, version, about = "ferry - download a file over TLS WebSockets")]
pub struct ClientOpts {
    /// File to download, relative to the server's served root
    pub file_name: String,

    /// Server host
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Server port
    #[arg(short, long, default_value_t = protocol::DEFAULT_PORT)]
    pub port: u16,

    /// Trust-anchor certificate (PEM) used to verify the server
    #[arg(long, default_value = "./certificate/test_crt.crt")]
    pub ca: PathBuf,

    /// Directory downloads are written into
    #[arg(long, default_value = "./download")]
    pub download_dir: PathBuf,

    /// Per-operation network timeout in seconds
    #[arg(long, default_value_t = protocol::DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs: u64,
}
