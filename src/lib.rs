//! # wsstream
//!
//! A WebSocket connection presented as a plain byte stream.
//!
//! `wsstream` lets code written against `tokio::io::AsyncRead` and
//! `AsyncWrite` run over WebSocket framing. tokio-tungstenite does the
//! protocol work; this crate maps messages to bytes and back.
//!
//! ## Semantics
//!
//! - **Reads** drain incoming binary and text messages in order. A read never
//!   returns bytes of two messages; control frames are skipped.
//! - **Writes** are sent as one binary message each, flushed before the write
//!   completes.
//! - **Deadlines** are absolute and apply to every later read or write.
//! - **Close** fails later operations and wakes blocked ones.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
//! use wsstream::ws::{connect, WsConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let (mut stream, resp) = connect("http://127.0.0.1:8081/ws", &WsConfig::new(1024, 1024))
//!         .await
//!         .unwrap();
//!     println!("session: {:?}", resp.cookie("sessionId"));
//!
//!     stream.write_all(b"HELLO\n").await.unwrap();
//!     let mut line = String::new();
//!     BufReader::new(&mut stream).read_line(&mut line).await.unwrap();
//! }
//! ```
//!
//! ## Modules
//!
//! - [`base`] - Error types and error context helpers
//! - [`socket`] - Transports the engine runs on
//! - [`ws`] - Client and server construction, the stream itself

pub mod base;
pub mod socket;
pub mod ws;
