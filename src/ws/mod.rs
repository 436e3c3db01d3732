//! WebSocket connections as byte streams.
//!
//! The WebSocket protocol is handled by tokio-tungstenite; this module turns
//! its message stream into `AsyncRead + AsyncWrite`.
//!
//! # Example
//! ```ignore
//! use wsstream::ws::{connect, WsConfig};
//! use tokio::io::AsyncWriteExt;
//!
//! let (mut stream, resp) = connect("ws://127.0.0.1:8081/ws", &WsConfig::default()).await?;
//! stream.write_all(b"HELLO\n").await?;
//! stream.close().await?;
//! ```

mod client;
mod config;
mod connection;
mod deadline;
mod handshake;
mod message;
mod server;

pub use client::{connect, WsStreamBuilder};
pub use config::{WsConfig, DEFAULT_BUFFER_SIZE, DEFAULT_MAX_MESSAGE_SIZE};
pub use connection::{CloseHandle, WsReadHalf, WsStream, WsWriteHalf};
pub use handshake::HandshakeResponse;
pub use message::{CloseCode, CloseFrame};
pub use server::{Acceptor, OriginPolicy};
pub use tokio_tungstenite::tungstenite::protocol::Role;
