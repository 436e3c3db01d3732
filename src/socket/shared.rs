//! Transport handle shared between the engine and close handles.
//!
//! The WebSocket engine owns its transport, but closing a stream must be able
//! to tear that transport down from outside the engine (for example while a
//! half is blocked on a peer that stopped reading). The socket therefore lives
//! behind a lock, in the manner of `tokio::io::split`; the lock is only held
//! for the duration of a single poll.

use super::stream::{SocketAddrs, StreamSocket};
use futures::task::noop_waker_ref;
use std::fmt;
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

/// Something that can shut its transport down synchronously.
pub(crate) trait Teardown: Send + Sync {
    /// Shut the transport down. Later reads see EOF and later writes fail.
    fn teardown(&self);
}

struct Inner<S> {
    socket: S,
    shut_down: bool,
}

/// A [`StreamSocket`] whose shutdown can be triggered through a [`Teardown`]
/// handle while the engine still owns it.
pub(crate) struct SharedSocket<S> {
    inner: Arc<Mutex<Inner<S>>>,
}

impl<S: StreamSocket> SharedSocket<S> {
    pub(crate) fn new(socket: S) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                socket,
                shut_down: false,
            })),
        }
    }

    pub(crate) fn addrs(&self) -> SocketAddrs {
        SocketAddrs::of(&self.lock().socket)
    }

    /// Handle that tears this transport down.
    pub(crate) fn teardown_handle(&self) -> Arc<dyn Teardown> {
        self.inner.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Inner<S>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<S> fmt::Debug for SharedSocket<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedSocket").finish_non_exhaustive()
    }
}

impl<S: StreamSocket> Teardown for Mutex<Inner<S>> {
    fn teardown(&self) {
        let mut inner = self.lock().unwrap_or_else(PoisonError::into_inner);
        if inner.shut_down {
            return;
        }
        inner.shut_down = true;
        // TCP and in-memory pipes shut down without waiting. Transports that
        // would block are left to fail their next read or write instead.
        let mut cx = Context::from_waker(noop_waker_ref());
        if let Poll::Ready(Err(e)) = Pin::new(&mut inner.socket).poll_shutdown(&mut cx) {
            tracing::debug!(error = %e, "transport shutdown failed");
        }
    }
}

impl<S: StreamSocket> AsyncRead for SharedSocket<S> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let mut inner = self.lock();
        if inner.shut_down {
            return Poll::Ready(Ok(()));
        }
        Pin::new(&mut inner.socket).poll_read(cx, buf)
    }
}

impl<S: StreamSocket> AsyncWrite for SharedSocket<S> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let mut inner = self.lock();
        if inner.shut_down {
            return Poll::Ready(Err(io::ErrorKind::NotConnected.into()));
        }
        Pin::new(&mut inner.socket).poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let mut inner = self.lock();
        if inner.shut_down {
            return Poll::Ready(Err(io::ErrorKind::NotConnected.into()));
        }
        Pin::new(&mut inner.socket).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let mut inner = self.lock();
        if inner.shut_down {
            return Poll::Ready(Ok(()));
        }
        Pin::new(&mut inner.socket).poll_shutdown(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn test_passes_bytes_through() {
        let (a, mut b) = tokio::io::duplex(64);
        let mut shared = SharedSocket::new(a);

        shared.write_all(b"ping").await.unwrap();
        let mut buf = [0u8; 4];
        b.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"ping");

        b.write_all(b"pong").await.unwrap();
        shared.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"pong");
    }

    #[tokio::test]
    async fn test_teardown_reaches_peer() {
        let (a, mut b) = tokio::io::duplex(64);
        let mut shared = SharedSocket::new(a);
        shared.teardown_handle().teardown();

        let mut out = Vec::new();
        b.read_to_end(&mut out).await.unwrap();
        assert!(out.is_empty());

        let err = shared.write(b"x").await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotConnected);
        let mut buf = [0u8; 4];
        assert_eq!(shared.read(&mut buf).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_teardown_twice() {
        let (a, _b) = tokio::io::duplex(64);
        let shared = SharedSocket::new(a);
        let handle = shared.teardown_handle();
        handle.teardown();
        handle.teardown();
    }

    #[tokio::test]
    async fn test_addrs_of_tcp() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let client = tokio::net::TcpStream::connect(addr).await.unwrap();
        let shared = SharedSocket::new(client);
        assert_eq!(shared.addrs().peer, Some(addr));
    }
}
