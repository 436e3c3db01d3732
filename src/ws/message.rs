//! How engine messages map onto the byte stream.

use bytes::Bytes;
use tokio_tungstenite::tungstenite;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode as EngineCloseCode;

/// An incoming engine message, as seen by the stream reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Incoming {
    /// Payload of a binary or text message.
    Data(Bytes),
    /// Ping, pong or a raw frame. Never reaches the stream.
    Control,
    /// Peer started the closing handshake.
    Close(Option<CloseFrame>),
}

impl From<tungstenite::Message> for Incoming {
    fn from(msg: tungstenite::Message) -> Self {
        match msg {
            tungstenite::Message::Binary(b) => Incoming::Data(Bytes::from(b)),
            tungstenite::Message::Text(s) => Incoming::Data(Bytes::from(s.into_bytes())),
            tungstenite::Message::Ping(_)
            | tungstenite::Message::Pong(_)
            | tungstenite::Message::Frame(_) => Incoming::Control,
            tungstenite::Message::Close(frame) => Incoming::Close(frame.map(|f| CloseFrame {
                code: CloseCode(f.code.into()),
                reason: f.reason.to_string(),
            })),
        }
    }
}

/// Every write becomes exactly one binary message.
pub(crate) fn outgoing(buf: &[u8]) -> tungstenite::Message {
    tungstenite::Message::Binary(buf.to_vec())
}

/// Close frame data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseFrame {
    /// Close code (RFC 6455)
    pub code: CloseCode,
    /// Close reason (optional UTF-8 string)
    pub reason: String,
}

impl CloseFrame {
    /// Create a new close frame.
    pub fn new(code: CloseCode, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }

    pub(crate) fn into_engine(self) -> tungstenite::protocol::CloseFrame<'static> {
        tungstenite::protocol::CloseFrame {
            code: EngineCloseCode::from(self.code.0),
            reason: self.reason.into(),
        }
    }
}

/// WebSocket close codes (RFC 6455).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CloseCode(pub u16);

impl CloseCode {
    /// Normal closure
    pub const NORMAL: Self = Self(1000);
    /// Endpoint going away
    pub const GOING_AWAY: Self = Self(1001);
    /// Protocol error
    pub const PROTOCOL_ERROR: Self = Self(1002);
    /// Message too big
    pub const MESSAGE_TOO_BIG: Self = Self(1009);
    /// Internal server error
    pub const INTERNAL_ERROR: Self = Self(1011);
}

impl From<u16> for CloseCode {
    fn from(code: u16) -> Self {
        Self(code)
    }
}

impl From<CloseCode> for u16 {
    fn from(code: CloseCode) -> Self {
        code.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_messages() {
        let text = Incoming::from(tungstenite::Message::Text("hello".into()));
        assert_eq!(text, Incoming::Data(Bytes::from_static(b"hello")));

        let binary = Incoming::from(tungstenite::Message::Binary(b"data".to_vec()));
        assert_eq!(binary, Incoming::Data(Bytes::from_static(b"data")));
    }

    #[test]
    fn test_control_messages() {
        assert_eq!(
            Incoming::from(tungstenite::Message::Ping(vec![1])),
            Incoming::Control
        );
        assert_eq!(
            Incoming::from(tungstenite::Message::Pong(vec![])),
            Incoming::Control
        );
    }

    #[test]
    fn test_close_message() {
        let frame = tungstenite::protocol::CloseFrame {
            code: EngineCloseCode::Normal,
            reason: "bye".into(),
        };
        let incoming = Incoming::from(tungstenite::Message::Close(Some(frame)));
        assert_eq!(
            incoming,
            Incoming::Close(Some(CloseFrame::new(CloseCode::NORMAL, "bye")))
        );
    }

    #[test]
    fn test_outgoing_is_binary() {
        let msg = outgoing(b"HELLO\n");
        assert!(msg.is_binary());
        assert_eq!(msg.into_data(), b"HELLO\n");
    }

    #[test]
    fn test_close_codes() {
        let code: u16 = CloseCode::NORMAL.into();
        assert_eq!(code, 1000);
        let frame = CloseFrame::new(CloseCode::GOING_AWAY, "restart").into_engine();
        assert_eq!(u16::from(frame.code), 1001);
        assert_eq!(frame.reason, "restart");
    }
}
