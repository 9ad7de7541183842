use anyhow::Result;
use chrono::Utc;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Mutex;

/// Logging handle passed into the server and client at construction.
///
/// There is no global logger; whoever builds a session decides where its
/// events go.
pub trait Logger: Send + Sync {
    fn listening(&self, _bind: &str, _root: &Path) {}
    fn connected(&self, _peer: SocketAddr) {}
    fn request(&self, _peer: SocketAddr, _name: &str) {}
    fn served(&self, _peer: SocketAddr, _name: &str, _bytes: u64) {}
    fn refused(&self, _peer: SocketAddr, _status: &str) {}
    fn closed(&self, _peer: SocketAddr) {}
    fn downloaded(&self, _name: &str, _path: &Path, _bytes: u64) {}
    fn error(&self, _context: &str, _msg: &str) {}
}

pub struct NoopLogger;
impl Logger for NoopLogger {}

/// Timestamped lines on stderr.
pub struct StderrLogger;

impl StderrLogger {
    fn line(&self, s: &str) {
        eprintln!("[{}] {}", Utc::now().to_rfc3339(), s);
    }
}

impl Logger for StderrLogger {
    fn listening(&self, bind: &str, root: &Path) {
        self.line(&format!("LISTEN bind={} root={}", bind, root.display()));
    }
    fn connected(&self, peer: SocketAddr) {
        self.line(&format!("CONNECT peer={peer}"));
    }
    fn request(&self, peer: SocketAddr, name: &str) {
        self.line(&format!("REQUEST peer={peer} name={name}"));
    }
    fn served(&self, peer: SocketAddr, name: &str, bytes: u64) {
        self.line(&format!("SERVED peer={peer} name={name} bytes={bytes}"));
    }
    fn refused(&self, peer: SocketAddr, status: &str) {
        self.line(&format!("REFUSED peer={peer} status={status}"));
    }
    fn closed(&self, peer: SocketAddr) {
        self.line(&format!("CLOSED peer={peer}"));
    }
    fn downloaded(&self, name: &str, path: &Path, bytes: u64) {
        self.line(&format!(
            "DOWNLOADED name={name} path={} bytes={bytes}",
            path.display()
        ));
    }
    fn error(&self, context: &str, msg: &str) {
        self.line(&format!("ERROR ctx={context} msg={msg}"));
    }
}

/// Timestamped lines appended to a log file.
pub struct TextLogger {
    file: Mutex<File>,
}

impl TextLogger {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let f = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(f),
        })
    }

    fn line(&self, s: &str) {
        if let Ok(mut f) = self.file.lock() {
            let _ = writeln!(f, "[{}] {}", Utc::now().to_rfc3339(), s);
        }
    }
}

impl Logger for TextLogger {
    fn listening(&self, bind: &str, root: &Path) {
        self.line(&format!("LISTEN bind={} root={}", bind, root.display()));
    }
    fn connected(&self, peer: SocketAddr) {
        self.line(&format!("CONNECT peer={peer}"));
    }
    fn request(&self, peer: SocketAddr, name: &str) {
        self.line(&format!("REQUEST peer={peer} name={name}"));
    }
    fn served(&self, peer: SocketAddr, name: &str, bytes: u64) {
        self.line(&format!("SERVED peer={peer} name={name} bytes={bytes}"));
    }
    fn refused(&self, peer: SocketAddr, status: &str) {
        self.line(&format!("REFUSED peer={peer} status={status}"));
    }
    fn closed(&self, peer: SocketAddr) {
        self.line(&format!("CLOSED peer={peer}"));
    }
    fn downloaded(&self, name: &str, path: &Path, bytes: u64) {
        self.line(&format!(
            "DOWNLOADED name={name} path={} bytes={bytes}",
            path.display()
        ));
    }
    fn error(&self, context: &str, msg: &str) {
        self.line(&format!("ERROR ctx={context} msg={msg}"));
    }
}
