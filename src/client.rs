//! Sequential client session: connect, download, disconnect.
//!
//! One operation is outstanding at a time; every network step is wrapped in
//! the configured liveness timeout and any failure aborts the whole call.

use anyhow::{bail, Context, Result};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::TlsConnector;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{client_async, WebSocketStream};

use crate::logger::Logger;
use crate::protocol;
use crate::tls::server_name_for;
use crate::transfer::{close_ws, recv_chunks, recv_timed, send_timed, text};

type WsStream = WebSocketStream<tokio_rustls::client::TlsStream<TcpStream>>;

/// A client session bound to one server endpoint.
///
/// Dropping a still-connected session tears the socket down without the
/// orderly close handshake; call [`FileClient::disconnect`] for a clean end.
pub struct FileClient {
    host: String,
    port: u16,
    tls: Arc<rustls::ClientConfig>,
    download_dir: PathBuf,
    deadline: Duration,
    log: Arc<dyn Logger>,
    ws: Option<WsStream>,
}

impl FileClient {
    pub fn new(
        host: &str,
        port: u16,
        tls: rustls::ClientConfig,
        download_dir: PathBuf,
        deadline: Duration,
        log: Arc<dyn Logger>,
    ) -> Self {
        Self {
            host: host.to_string(),
            port,
            tls: Arc::new(tls),
            download_dir,
            deadline,
            log,
            ws: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.ws.is_some()
    }

    /// TCP connect, TLS handshake (SNI + peer verification against the
    /// configured trust anchor and host name), then the WebSocket upgrade.
    /// Any step's failure leaves the session not connected.
    pub async fn connect(&mut self) -> Result<()> {
        if self.ws.is_some() {
            bail!("already connected to {}:{}", self.host, self.port);
        }

        let tcp = match timeout(
            self.deadline,
            TcpStream::connect((self.host.as_str(), self.port)),
        )
        .await
        {
            Ok(s) => s.with_context(|| format!("connect {}:{}", self.host, self.port))?,
            Err(_) => bail!("connect timeout ({} ms)", self.deadline.as_millis()),
        };
        let _ = tcp.set_nodelay(true);

        let connector = TlsConnector::from(self.tls.clone());
        let server_name = server_name_for(&self.host)?;
        let tls = match timeout(self.deadline, connector.connect(server_name, tcp)).await {
            Ok(s) => s.context("tls handshake")?,
            Err(_) => bail!("tls handshake timeout ({} ms)", self.deadline.as_millis()),
        };

        let url = format!("wss://{}:{}{}", self.host, self.port, protocol::WS_PATH);
        let (ws, _response) = match timeout(self.deadline, client_async(url, tls)).await {
            Ok(r) => r.context("websocket handshake")?,
            Err(_) => bail!("websocket handshake timeout ({} ms)", self.deadline.as_millis()),
        };

        self.ws = Some(ws);
        Ok(())
    }

    /// Download one file into the download directory, returning the byte
    /// count written. Any failure closes the connection: the server closes
    /// its end after every status it sends, and a mid-transfer failure
    /// leaves the stream unusable for further requests.
    pub async fn download(&mut self, name: &str) -> Result<u64> {
        let dir = self.download_dir.clone();
        let deadline = self.deadline;
        let log = self.log.clone();
        let ws = self.ws.as_mut().context("not connected")?;

        let result = run_download(ws, &dir, name, deadline, log.as_ref()).await;
        if result.is_err() {
            if let Some(mut ws) = self.ws.take() {
                let _ = close_ws(&mut ws, deadline).await;
            }
        }
        result
    }

    /// Orderly close handshake. Calling this while not connected (including
    /// a second time after it already succeeded) is an error and performs
    /// no network operation.
    pub async fn disconnect(&mut self) -> Result<()> {
        let mut ws = self.ws.take().context("not connected")?;
        close_ws(&mut ws, self.deadline).await.context("close handshake")
    }
}

async fn run_download(
    ws: &mut WsStream,
    dir: &Path,
    name: &str,
    deadline: Duration,
    log: &dyn Logger,
) -> Result<u64> {
    send_timed(ws, text(&protocol::encode_request(name)), deadline)
        .await
        .context("send request")?;

    let header = match recv_timed(ws, deadline)
        .await?
        .context("connection closed awaiting response header")?
    {
        Message::Text(t) => t,
        Message::Close(_) => bail!("server closed before responding"),
        other => bail!("expected text response header, got {other:?}"),
    };
    let header = header.as_str();
    if protocol::is_status(header) {
        bail!("server refused request: {header}");
    }
    let (echoed, size) =
        protocol::parse_header(header).with_context(|| format!("malformed response header: {header:?}"))?;
    if echoed != name {
        bail!("echoed file name {echoed:?} does not match requested {name:?}");
    }

    let out_path = dir.join(name);
    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    let mut out =
        File::create(&out_path).with_context(|| format!("create {}", out_path.display()))?;

    let received = recv_chunks(ws, &mut out, size, deadline).await?;

    match recv_timed(ws, deadline)
        .await?
        .context("connection closed awaiting end marker")?
    {
        Message::Text(t) if t.as_str() == protocol::FILE_END => {}
        Message::Text(t) => bail!("expected {:?}, got {:?}", protocol::FILE_END, t.as_str()),
        other => bail!("expected end marker, got {other:?}"),
    }

    log.downloaded(name, &out_path, received);
    Ok(received)
}
