//! Timeout-wrapped WebSocket operations and the chunked transfer loops.
//!
//! Every network operation in ferry goes through `send_timed`/`recv_timed`:
//! one configurable liveness timeout applies uniformly to each individual
//! read and write, and expiry fails only that operation. Chunk boundaries
//! carry no meaning on the wire; only the concatenated byte stream does.

use anyhow::{bail, Result};
use futures_util::{SinkExt, StreamExt};
use std::fs::File;
use std::io::{Read, Write};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

/// Build a text control message.
pub fn text(msg: &str) -> Message {
    Message::Text(msg.to_string().into())
}

/// Send one message, failing if the write does not complete in time.
pub async fn send_timed<S>(ws: &mut WebSocketStream<S>, msg: Message, deadline: Duration) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    match timeout(deadline, ws.send(msg)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(e.into()),
        Err(_) => bail!("write timeout ({} ms)", deadline.as_millis()),
    }
}

/// Receive the next data-bearing message, failing if none arrives in time.
///
/// Ping/pong frames are transparent to the protocol and skipped. `None`
/// means the peer ended the stream.
pub async fn recv_timed<S>(ws: &mut WebSocketStream<S>, deadline: Duration) -> Result<Option<Message>>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    loop {
        match timeout(deadline, ws.next()).await {
            Ok(Some(Ok(Message::Ping(_) | Message::Pong(_)))) => continue,
            Ok(Some(Ok(msg))) => return Ok(Some(msg)),
            Ok(Some(Err(e))) => return Err(e.into()),
            Ok(None) => return Ok(None),
            Err(_) => bail!("read timeout ({} ms)", deadline.as_millis()),
        }
    }
}

/// Orderly close handshake: send the close frame, then drain until the peer
/// acknowledges or the deadline passes.
pub async fn close_ws<S>(ws: &mut WebSocketStream<S>, deadline: Duration) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    match timeout(deadline, ws.close(None)).await {
        Ok(Ok(())) | Ok(Err(tokio_tungstenite::tungstenite::Error::ConnectionClosed)) => {}
        Ok(Err(e)) => return Err(e.into()),
        Err(_) => bail!("close timeout ({} ms)", deadline.as_millis()),
    }
    let _ = timeout(deadline, async {
        while let Some(Ok(_)) = ws.next().await {}
    })
    .await;
    Ok(())
}

/// Send exactly `size` bytes from `file` as binary messages of at most
/// `capacity` bytes each. A zero-size file sends no chunks at all.
///
/// Returns the byte count sent, which always equals `size` on success.
pub async fn send_chunks<S>(
    ws: &mut WebSocketStream<S>,
    file: &mut File,
    size: u64,
    capacity: usize,
    deadline: Duration,
) -> Result<u64>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; capacity];
    let mut sent: u64 = 0;
    while sent < size {
        // Never read past the announced size, even if the file grew.
        let want = capacity.min((size - sent) as usize);
        let n = file.read(&mut buf[..want])?;
        if n == 0 {
            bail!("file truncated during send: {sent} of {size} bytes");
        }
        send_timed(ws, Message::Binary(buf[..n].to_vec().into()), deadline).await?;
        sent += n as u64;
    }
    Ok(sent)
}

/// Receive binary messages and stream them straight to `out` until the
/// running total equals `size`. The whole file is never held in memory.
///
/// A chunk that would push the total past `size` is a protocol error; bytes
/// already flushed stay on disk regardless of outcome.
pub async fn recv_chunks<S>(
    ws: &mut WebSocketStream<S>,
    out: &mut File,
    size: u64,
    deadline: Duration,
) -> Result<u64>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut received: u64 = 0;
    while received < size {
        let msg = match recv_timed(ws, deadline).await? {
            Some(m) => m,
            None => bail!("connection ended mid-transfer: {received} of {size} bytes"),
        };
        match msg {
            Message::Binary(chunk) => {
                if received + chunk.len() as u64 > size {
                    bail!(
                        "peer sent more than the announced {size} bytes ({received} received, {} more)",
                        chunk.len()
                    );
                }
                out.write_all(&chunk)?;
                received += chunk.len() as u64;
            }
            Message::Text(t) => bail!("unexpected text message mid-transfer: {t}"),
            Message::Close(_) => bail!("peer closed mid-transfer: {received} of {size} bytes"),
            other => bail!("unexpected frame mid-transfer: {other:?}"),
        }
    }
    Ok(received)
}
