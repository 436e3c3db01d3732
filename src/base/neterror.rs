use http::StatusCode;
use std::io;
use thiserror::Error;
use tokio_tungstenite::tungstenite;

#[derive(Debug, Error)]
pub enum NetError {
    // Connection Errors
    #[error("Connection closed")]
    ConnectionClosed,
    #[error("Connection reset")]
    ConnectionReset,
    #[error("Connection to {host}:{port} failed: {source}")]
    ConnectionFailedTo {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },
    #[error("Name not resolved: {domain}: {source}")]
    NameNotResolvedFor {
        domain: String,
        #[source]
        source: io::Error,
    },
    #[error("Socket not connected")]
    SocketNotConnected,
    #[error("Connection timed out")]
    TimedOut,
    #[error("Message too big")]
    MsgTooBig,
    #[error("WebSocket protocol error: {0}")]
    WsProtocolError(String),
    #[error("WebSocket handshake failed: {reason}")]
    WsHandshake {
        status: Option<StatusCode>,
        reason: String,
    },

    // URL Errors
    #[error("Invalid URL")]
    InvalidUrl,
    #[error("Disallowed URL scheme")]
    DisallowedUrlScheme,

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl NetError {
    pub fn as_i32(&self) -> i32 {
        match self {
            NetError::ConnectionClosed => -100,
            NetError::ConnectionReset => -101,
            NetError::ConnectionFailedTo { .. } => -104,
            NetError::NameNotResolvedFor { .. } => -105,
            NetError::SocketNotConnected => -112,
            NetError::TimedOut => -118,
            NetError::MsgTooBig => -142,
            NetError::WsProtocolError(_) => -145,
            NetError::WsHandshake { .. } => -173,
            NetError::InvalidUrl => -300,
            NetError::DisallowedUrlScheme => -301,
            // Generic failure
            NetError::Io(_) => -2,
        }
    }

    /// True when a deadline elapsed. The operation may be retried after the
    /// deadline is moved.
    pub fn is_timeout(&self) -> bool {
        match self {
            NetError::TimedOut => true,
            NetError::Io(e) => e.kind() == io::ErrorKind::TimedOut,
            _ => false,
        }
    }

    pub fn is_handshake(&self) -> bool {
        matches!(self, NetError::WsHandshake { .. })
    }

    /// Status code of a rejected upgrade, if the peer answered with one.
    pub fn handshake_status(&self) -> Option<StatusCode> {
        match self {
            NetError::WsHandshake { status, .. } => *status,
            _ => None,
        }
    }

    pub(crate) fn handshake(reason: impl Into<String>) -> Self {
        NetError::WsHandshake {
            status: None,
            reason: reason.into(),
        }
    }

    /// Classify an engine error raised while the upgrade was in progress.
    /// Every failure at that stage is a handshake failure.
    pub(crate) fn from_handshake(err: tungstenite::Error) -> Self {
        match err {
            tungstenite::Error::Http(resp) => NetError::WsHandshake {
                status: Some(resp.status()),
                reason: format!("peer answered {}", resp.status()),
            },
            other => NetError::handshake(other.to_string()),
        }
    }

    fn io_kind(&self) -> io::ErrorKind {
        match self {
            NetError::ConnectionClosed => io::ErrorKind::NotConnected,
            NetError::ConnectionReset => io::ErrorKind::ConnectionReset,
            NetError::ConnectionFailedTo { .. } => io::ErrorKind::ConnectionRefused,
            NetError::NameNotResolvedFor { .. } => io::ErrorKind::NotFound,
            NetError::SocketNotConnected => io::ErrorKind::NotConnected,
            NetError::TimedOut => io::ErrorKind::TimedOut,
            NetError::MsgTooBig | NetError::WsProtocolError(_) => io::ErrorKind::InvalidData,
            NetError::WsHandshake { .. } => io::ErrorKind::ConnectionAborted,
            NetError::InvalidUrl | NetError::DisallowedUrlScheme => io::ErrorKind::InvalidInput,
            NetError::Io(e) => e.kind(),
        }
    }
}

impl From<tungstenite::Error> for NetError {
    fn from(err: tungstenite::Error) -> Self {
        match err {
            tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
                NetError::ConnectionClosed
            }
            tungstenite::Error::Io(e) => match e.kind() {
                io::ErrorKind::TimedOut => NetError::TimedOut,
                io::ErrorKind::ConnectionReset => NetError::ConnectionReset,
                _ => NetError::Io(e),
            },
            tungstenite::Error::Capacity(_) => NetError::MsgTooBig,
            tungstenite::Error::Protocol(e) => NetError::WsProtocolError(e.to_string()),
            tungstenite::Error::Url(_) => NetError::InvalidUrl,
            err @ (tungstenite::Error::Http(_) | tungstenite::Error::HttpFormat(_)) => {
                NetError::from_handshake(err)
            }
            other => NetError::WsProtocolError(other.to_string()),
        }
    }
}

/// Errors leave `AsyncRead`/`AsyncWrite` as `io::Error`. The kind carries the
/// classification (`TimedOut`, `NotConnected`, ...) and the `NetError` stays
/// reachable through `get_ref`.
impl From<NetError> for io::Error {
    fn from(err: NetError) -> Self {
        match err {
            NetError::Io(e) => e,
            other => io::Error::new(other.io_kind(), other),
        }
    }
}
