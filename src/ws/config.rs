//! Connection configuration.

use serde::{Deserialize, Serialize};
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;

/// Default size of the read and write buffers.
pub const DEFAULT_BUFFER_SIZE: usize = 4096;

/// Default upper bound for one incoming message (64 MiB).
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 64 << 20;

/// Buffer sizes and limits for one WebSocket stream.
///
/// A zero buffer size falls back to [`DEFAULT_BUFFER_SIZE`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WsConfig {
    /// Capacity of the buffered reader between the engine and the transport.
    pub read_buffer_size: usize,
    /// Bytes the engine accumulates before writing to the transport.
    pub write_buffer_size: usize,
    /// Largest incoming message accepted. `None` means no limit.
    pub max_message_size: Option<usize>,
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            read_buffer_size: DEFAULT_BUFFER_SIZE,
            write_buffer_size: DEFAULT_BUFFER_SIZE,
            max_message_size: Some(DEFAULT_MAX_MESSAGE_SIZE),
        }
    }
}

impl WsConfig {
    /// Create a config with the given read and write buffer sizes.
    pub fn new(read_buffer_size: usize, write_buffer_size: usize) -> Self {
        Self {
            read_buffer_size,
            write_buffer_size,
            ..Self::default()
        }
    }

    pub fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size;
        self
    }

    pub fn with_write_buffer_size(mut self, size: usize) -> Self {
        self.write_buffer_size = size;
        self
    }

    pub fn with_max_message_size(mut self, size: Option<usize>) -> Self {
        self.max_message_size = size;
        self
    }

    /// Effective read buffer capacity.
    pub fn read_capacity(&self) -> usize {
        non_zero_or_default(self.read_buffer_size)
    }

    /// Effective write buffer size.
    pub fn write_capacity(&self) -> usize {
        non_zero_or_default(self.write_buffer_size)
    }

    /// Engine configuration derived from this config.
    pub fn to_engine(&self) -> WebSocketConfig {
        let mut config = WebSocketConfig::default();
        config.write_buffer_size = self.write_capacity();
        config.max_message_size = self.max_message_size;
        config
    }
}

fn non_zero_or_default(size: usize) -> usize {
    if size == 0 {
        DEFAULT_BUFFER_SIZE
    } else {
        size
    }
}
