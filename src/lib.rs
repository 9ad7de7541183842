//! Ferry: secure file transfer over TLS WebSockets
//!
//! An application protocol layered over TCP, TLS and a WebSocket upgrade.
//! Text control messages negotiate one file at a time while binary frames
//! stream its content in chunks, with a per-operation liveness timeout
//! guarding every network step. The server multiplexes one task per
//! connection across a shared multi-thread runtime; the client is strictly
//! sequential.

pub mod cli;
pub mod client;
pub mod logger;
pub mod protocol;
pub mod sandbox;
pub mod server;
pub mod tls;
pub mod transfer;
