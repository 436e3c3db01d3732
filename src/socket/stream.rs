//! Transport abstraction under the WebSocket engine.
//!
//! A `StreamSocket` is any async byte transport the engine can run on. Besides
//! read/write it may report the addresses of both endpoints, which the
//! WebSocket stream captures once at construction.
//!
//! Based on Chromium's `StreamSocket` interface (`GetLocalAddress`,
//! `GetPeerAddress`).

use std::io;
use std::net::SocketAddr;
use tokio::io::{AsyncRead, AsyncWrite, DuplexStream};
use tokio::net::TcpStream;

/// A transport that supports async read/write and, where it has them,
/// reports endpoint addresses.
///
/// Chromium equivalent: `net::StreamSocket`
pub trait StreamSocket: AsyncRead + AsyncWrite + Unpin + Send + 'static {
    /// Address of this end of the connection.
    fn local_addr(&self) -> io::Result<SocketAddr> {
        Err(io::ErrorKind::Unsupported.into())
    }

    /// Address of the remote end of the connection.
    fn peer_addr(&self) -> io::Result<SocketAddr> {
        Err(io::ErrorKind::Unsupported.into())
    }
}

impl StreamSocket for TcpStream {
    fn local_addr(&self) -> io::Result<SocketAddr> {
        TcpStream::local_addr(self)
    }

    fn peer_addr(&self) -> io::Result<SocketAddr> {
        TcpStream::peer_addr(self)
    }
}

// In-memory pipes have no addresses.
impl StreamSocket for DuplexStream {}

/// Endpoint addresses captured from a transport.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SocketAddrs {
    pub local: Option<SocketAddr>,
    pub peer: Option<SocketAddr>,
}

impl SocketAddrs {
    pub fn of<S: StreamSocket>(socket: &S) -> Self {
        Self {
            local: socket.local_addr().ok(),
            peer: socket.peer_addr().ok(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_tcp_addrs_mirror() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (client, accepted) =
            tokio::join!(TcpStream::connect(addr), listener.accept());
        let client = client.unwrap();
        let (server, _) = accepted.unwrap();

        let c = SocketAddrs::of(&client);
        let s = SocketAddrs::of(&server);
        assert_eq!(c.peer, Some(addr));
        assert_eq!(c.local, s.peer);
        assert_eq!(c.peer, s.local);
    }

    #[tokio::test]
    async fn test_duplex_has_no_addrs() {
        let (a, _b) = tokio::io::duplex(64);
        assert_eq!(SocketAddrs::of(&a), SocketAddrs::default());
    }
}
