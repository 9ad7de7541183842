//! Acceptor and per-connection server session.
//!
//! The acceptor loops on one listening socket and spawns one task per
//! accepted connection; accepting is never blocked by an in-flight session.
//! Each session is a sequential state machine (TLS handshake, WebSocket
//! accept, then a request loop) whose suspension points are its awaits.

use anyhow::{bail, Context, Result};
use std::fs::File;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_rustls::TlsAcceptor;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_async, WebSocketStream};

use crate::logger::Logger;
use crate::protocol;
use crate::sandbox::resolve_under_root;
use crate::transfer::{close_ws, recv_timed, send_chunks, send_timed, text};

type WsStream = WebSocketStream<tokio_rustls::server::TlsStream<TcpStream>>;

/// Bind and serve until the task is dropped.
///
/// An accept-level failure is logged and the loop keeps accepting; no
/// session failure affects any other session or the acceptor.
pub async fn serve(
    bind: &str,
    root: &Path,
    tls: rustls::ServerConfig,
    deadline: Duration,
    log: Arc<dyn Logger>,
) -> Result<()> {
    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("bind {bind}"))?;
    log.listening(bind, root);

    let acceptor = TlsAcceptor::from(Arc::new(tls));
    let root: Arc<PathBuf> = Arc::new(root.to_path_buf());

    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                let _ = stream.set_nodelay(true);
                let session = Session {
                    peer,
                    root: root.clone(),
                    acceptor: acceptor.clone(),
                    deadline,
                    log: log.clone(),
                };
                // The spawned task owns the session, so the session lives
                // exactly as long as an operation of its own is pending and
                // is released once, when the task returns.
                tokio::spawn(session.run(stream));
            }
            Err(e) => log.error("accept", &e.to_string()),
        }
    }
}

struct Session {
    peer: SocketAddr,
    root: Arc<PathBuf>,
    acceptor: TlsAcceptor,
    deadline: Duration,
    log: Arc<dyn Logger>,
}

impl Session {
    async fn run(self, tcp: TcpStream) {
        self.log.connected(self.peer);
        match self.drive(tcp).await {
            Ok(()) => self.log.closed(self.peer),
            Err(e) => self
                .log
                .error("session", &format!("peer={} {e:#}", self.peer)),
        }
    }

    async fn drive(&self, tcp: TcpStream) -> Result<()> {
        let tls = match timeout(self.deadline, self.acceptor.accept(tcp)).await {
            Ok(s) => s.context("tls handshake")?,
            Err(_) => bail!("tls handshake timeout ({} ms)", self.deadline.as_millis()),
        };
        let mut ws = match timeout(self.deadline, accept_async(tls)).await {
            Ok(s) => s.context("websocket accept")?,
            Err(_) => bail!("websocket accept timeout ({} ms)", self.deadline.as_millis()),
        };

        // Keep-alive: the connection serves sequential requests until the
        // client closes or a request is refused.
        loop {
            let request = match recv_timed(&mut ws, self.deadline).await? {
                None => return Ok(()),
                Some(Message::Close(_)) => return Ok(()),
                Some(Message::Text(t)) => t,
                Some(_) => return self.refuse(&mut ws, protocol::INVALID_REQUEST).await,
            };

            let name = match protocol::parse_request(request.as_str()) {
                Some(n) => n.to_string(),
                None => return self.refuse(&mut ws, protocol::INVALID_REQUEST).await,
            };
            self.log.request(self.peer, &name);

            let path = match resolve_under_root(&self.root, &name) {
                Ok(p) => p,
                Err(e) => {
                    self.log.error("validate", &format!("peer={} {e}", self.peer));
                    return self.refuse(&mut ws, protocol::FILE_NOT_FOUND).await;
                }
            };

            let mut file = match File::open(&path) {
                Ok(f) => f,
                Err(e) => {
                    self.log.error(
                        "open",
                        &format!("peer={} path={} {e}", self.peer, path.display()),
                    );
                    return self.refuse(&mut ws, protocol::FILE_OPEN_ERROR).await;
                }
            };
            let size = file.metadata().context("stat served file")?.len();

            send_timed(
                &mut ws,
                text(&protocol::encode_header(&name, size)),
                self.deadline,
            )
            .await
            .context("send response header")?;

            send_chunks(&mut ws, &mut file, size, protocol::CHUNK_SIZE, self.deadline).await?;
            // The file handle is released before the end marker goes out.
            drop(file);

            send_timed(&mut ws, text(protocol::FILE_END), self.deadline)
                .await
                .context("send end marker")?;
            self.log.served(self.peer, &name, size);
        }
    }

    async fn refuse(&self, ws: &mut WsStream, status: &str) -> Result<()> {
        self.log.refused(self.peer, status);
        send_timed(ws, text(status), self.deadline)
            .await
            .with_context(|| format!("send status {status:?}"))?;
        close_ws(ws, self.deadline).await
    }
}
