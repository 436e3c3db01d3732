//! WebSocket connection exposed as a byte stream.
//!
//! Incoming binary and text messages are drained one after another into
//! `AsyncRead` calls; every `AsyncWrite::poll_write` call goes out as exactly
//! one binary message.

use super::config::WsConfig;
use super::deadline::Deadline;
use super::message::{self, CloseFrame, Incoming};
use crate::base::neterror::NetError;
use crate::socket::shared::{SharedSocket, Teardown};
use crate::socket::stream::{SocketAddrs, StreamSocket};
use bytes::{Buf, Bytes};
use futures::stream::{SplitSink, SplitStream};
use futures::task::AtomicWaker;
use futures::{ready, SinkExt, StreamExt};
use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, BufReader, ReadBuf};
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::protocol::Role;
use tokio_tungstenite::{tungstenite, WebSocketStream};

/// Upper bound on sending the close frame when no write deadline is set.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// Buffered transport the engine runs on.
pub(crate) type Transport<S> = BufReader<SharedSocket<S>>;

/// Engine handle over a buffered transport.
pub(crate) type Engine<S> = WebSocketStream<Transport<S>>;

/// Wrap `socket` the way every engine of this crate expects it.
pub(crate) fn buffered_transport<S: StreamSocket>(
    socket: S,
    config: &WsConfig,
) -> Transport<S> {
    BufReader::with_capacity(config.read_capacity(), SharedSocket::new(socket))
}

/// State shared by both halves of one connection.
struct Shared {
    closed: AtomicBool,
    read_waker: AtomicWaker,
    write_waker: AtomicWaker,
    addrs: SocketAddrs,
    transport: Arc<dyn Teardown>,
}

impl fmt::Debug for Shared {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shared")
            .field("closed", &self.is_closed())
            .field("addrs", &self.addrs)
            .finish_non_exhaustive()
    }
}

impl Shared {
    fn new(addrs: SocketAddrs, transport: Arc<dyn Teardown>) -> Self {
        Self {
            closed: AtomicBool::new(false),
            read_waker: AtomicWaker::new(),
            write_waker: AtomicWaker::new(),
            addrs,
            transport,
        }
    }

    /// Mark closed and wake blocked operations. Returns false if the
    /// connection was already closed.
    fn close(&self) -> bool {
        let first = !self.closed.swap(true, Ordering::AcqRel);
        self.read_waker.wake();
        self.write_waker.wake();
        first
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Shut the transport down; the peer sees EOF.
    fn teardown(&self) {
        self.transport.teardown();
    }

    fn ensure_open(&self) -> Result<(), NetError> {
        if self.is_closed() {
            Err(NetError::ConnectionClosed)
        } else {
            Ok(())
        }
    }

    fn local_addr(&self) -> Result<SocketAddr, NetError> {
        self.addrs.local.ok_or(NetError::SocketNotConnected)
    }

    fn peer_addr(&self) -> Result<SocketAddr, NetError> {
        self.addrs.peer.ok_or(NetError::SocketNotConnected)
    }
}

fn engine_error(err: tungstenite::Error) -> io::Error {
    NetError::from(err).into()
}

/// A WebSocket connection presented as `AsyncRead + AsyncWrite`.
///
/// Message boundaries show up only as short reads: a read never returns bytes
/// from two messages, and the read that drains a message ends there. A
/// zero-length read means the peer closed the connection.
///
/// # Example
/// ```ignore
/// let (mut stream, resp) = wsstream::ws::connect("ws://127.0.0.1:8080/", &WsConfig::default()).await?;
/// stream.write_all(b"HELLO\n").await?;
/// let mut line = String::new();
/// BufReader::new(&mut stream).read_line(&mut line).await?;
/// ```
pub struct WsStream<S> {
    reader: WsReadHalf<S>,
    writer: WsWriteHalf<S>,
}

impl<S: StreamSocket> WsStream<S> {
    pub(crate) fn new(engine: Engine<S>) -> Self {
        let socket = engine.get_ref().get_ref();
        let shared = Arc::new(Shared::new(socket.addrs(), socket.teardown_handle()));
        let (sink, stream) = engine.split();

        Self {
            reader: WsReadHalf {
                stream,
                current: None,
                deadline: Deadline::default(),
                shared: shared.clone(),
            },
            writer: WsWriteHalf {
                sink,
                in_flight: None,
                deadline: Deadline::default(),
                shared,
            },
        }
    }

    /// Wrap a transport on which the WebSocket handshake already completed.
    pub async fn from_raw_socket(socket: S, role: Role, config: &WsConfig) -> Self {
        let transport = buffered_transport(socket, config);
        let engine =
            WebSocketStream::from_raw_socket(transport, role, Some(config.to_engine())).await;
        Self::new(engine)
    }

    /// Close the connection.
    ///
    /// Blocked or later reads and writes fail with `ConnectionClosed`. A close
    /// frame is sent on a best-effort basis, bounded by the write deadline or
    /// one second when none is set, after which the transport is shut down
    /// whether or not the frame went out.
    pub async fn close(&mut self) -> Result<(), NetError> {
        self.writer.close_with(None).await
    }

    /// Close the connection, telling the peer why.
    pub async fn close_with(&mut self, frame: CloseFrame) -> Result<(), NetError> {
        self.writer.close_with(Some(frame)).await
    }

    /// Split into halves that can be driven from different tasks.
    pub fn split(self) -> (WsReadHalf<S>, WsWriteHalf<S>) {
        (self.reader, self.writer)
    }
}

impl<S> WsStream<S> {
    /// Address of this end of the transport.
    pub fn local_addr(&self) -> Result<SocketAddr, NetError> {
        self.reader.shared.local_addr()
    }

    /// Address of the peer.
    pub fn peer_addr(&self) -> Result<SocketAddr, NetError> {
        self.reader.shared.peer_addr()
    }

    /// Set both deadlines. Stops at the first failure, leaving the write
    /// deadline untouched if the read deadline could not be set.
    pub fn set_deadline(&mut self, deadline: Option<Instant>) -> Result<(), NetError> {
        self.set_read_deadline(deadline)?;
        self.set_write_deadline(deadline)
    }

    /// Deadline for future reads. `None` means reads never time out.
    pub fn set_read_deadline(&mut self, deadline: Option<Instant>) -> Result<(), NetError> {
        self.reader.set_read_deadline(deadline)
    }

    /// Deadline for future writes. `None` means writes never time out.
    pub fn set_write_deadline(&mut self, deadline: Option<Instant>) -> Result<(), NetError> {
        self.writer.set_write_deadline(deadline)
    }

    /// Current read deadline, if any.
    pub fn read_deadline(&self) -> Option<Instant> {
        self.reader.deadline.get()
    }

    /// Current write deadline, if any.
    pub fn write_deadline(&self) -> Option<Instant> {
        self.writer.deadline.get()
    }

    /// Handle that closes this connection from anywhere.
    pub fn close_handle(&self) -> CloseHandle {
        CloseHandle {
            shared: self.reader.shared.clone(),
        }
    }

    /// Whether the connection was closed locally.
    pub fn is_closed(&self) -> bool {
        self.reader.shared.is_closed()
    }
}

impl<S: StreamSocket> AsyncRead for WsStream<S> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().reader).poll_read(cx, buf)
    }
}

impl<S: StreamSocket> AsyncWrite for WsStream<S> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.get_mut().writer).poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().writer).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().writer).poll_shutdown(cx)
    }
}

/// Read side of a [`WsStream`].
pub struct WsReadHalf<S> {
    stream: SplitStream<Engine<S>>,
    // Unread remainder of the message being drained.
    current: Option<Bytes>,
    deadline: Deadline,
    shared: Arc<Shared>,
}

impl<S> WsReadHalf<S> {
    pub fn local_addr(&self) -> Result<SocketAddr, NetError> {
        self.shared.local_addr()
    }

    pub fn peer_addr(&self) -> Result<SocketAddr, NetError> {
        self.shared.peer_addr()
    }

    pub fn set_read_deadline(&mut self, deadline: Option<Instant>) -> Result<(), NetError> {
        self.shared.ensure_open()?;
        self.deadline.set(deadline);
        Ok(())
    }

    pub fn close_handle(&self) -> CloseHandle {
        CloseHandle {
            shared: self.shared.clone(),
        }
    }
}

impl<S: StreamSocket> AsyncRead for WsReadHalf<S> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        this.shared.read_waker.register(cx.waker());
        if this.shared.is_closed() {
            this.current = None;
            return Poll::Ready(Err(NetError::ConnectionClosed.into()));
        }
        if buf.remaining() == 0 {
            return Poll::Ready(Ok(()));
        }

        loop {
            if let Some(message) = this.current.as_mut() {
                let n = message.len().min(buf.remaining());
                buf.put_slice(&message[..n]);
                message.advance(n);
                if message.is_empty() {
                    // End of message: back to idle, the next read fetches a new one.
                    this.current = None;
                }
                return Poll::Ready(Ok(()));
            }

            if this.deadline.poll_elapsed(cx).is_ready() {
                return Poll::Ready(Err(NetError::TimedOut.into()));
            }

            match ready!(this.stream.poll_next_unpin(cx)) {
                None => return Poll::Ready(Ok(())),
                Some(Err(e)) => return Poll::Ready(Err(engine_error(e))),
                Some(Ok(msg)) => match Incoming::from(msg) {
                    Incoming::Data(data) if data.is_empty() => {
                        tracing::trace!("skipping empty message");
                    }
                    Incoming::Data(data) => this.current = Some(data),
                    Incoming::Control => {
                        tracing::trace!("skipping control message");
                    }
                    Incoming::Close(frame) => {
                        tracing::debug!(?frame, "peer closed WebSocket stream");
                        return Poll::Ready(Ok(()));
                    }
                },
            }
        }
    }
}

/// The write whose message is queued in the engine but not yet flushed,
/// identified by its buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct InFlight {
    addr: usize,
    len: usize,
}

impl InFlight {
    fn of(buf: &[u8]) -> Self {
        Self {
            addr: buf.as_ptr() as usize,
            len: buf.len(),
        }
    }
}

/// Write side of a [`WsStream`].
pub struct WsWriteHalf<S> {
    sink: SplitSink<Engine<S>, tungstenite::Message>,
    in_flight: Option<InFlight>,
    deadline: Deadline,
    shared: Arc<Shared>,
}

impl<S> WsWriteHalf<S> {
    pub fn local_addr(&self) -> Result<SocketAddr, NetError> {
        self.shared.local_addr()
    }

    pub fn peer_addr(&self) -> Result<SocketAddr, NetError> {
        self.shared.peer_addr()
    }

    pub fn set_write_deadline(&mut self, deadline: Option<Instant>) -> Result<(), NetError> {
        self.shared.ensure_open()?;
        self.deadline.set(deadline);
        Ok(())
    }

    pub fn close_handle(&self) -> CloseHandle {
        CloseHandle {
            shared: self.shared.clone(),
        }
    }
}

impl<S: StreamSocket> WsWriteHalf<S> {
    /// Close the connection; see [`WsStream::close`].
    pub async fn close(&mut self) -> Result<(), NetError> {
        self.close_with(None).await
    }

    pub(crate) async fn close_with(&mut self, frame: Option<CloseFrame>) -> Result<(), NetError> {
        if !self.shared.close() {
            return Ok(());
        }
        tracing::debug!(peer = ?self.shared.addrs.peer, "closing WebSocket stream");
        self.in_flight = None;

        let msg = tungstenite::Message::Close(frame.map(CloseFrame::into_engine));
        let grace = Instant::now() + CLOSE_TIMEOUT;
        let until = self.deadline.get().map_or(grace, |at| at.min(grace));
        let sent = tokio::time::timeout_at(until, self.sink.send(msg)).await;
        self.shared.teardown();

        match sent {
            Err(_) => {
                tracing::debug!("close frame not sent before the deadline");
                Ok(())
            }
            Ok(Ok(()))
            | Ok(Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed)) => {
                Ok(())
            }
            Ok(Err(e)) => Err(e.into()),
        }
    }
}

impl<S: StreamSocket> AsyncWrite for WsWriteHalf<S> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        this.shared.write_waker.register(cx.waker());
        if this.shared.is_closed() {
            this.in_flight = None;
            return Poll::Ready(Err(NetError::ConnectionClosed.into()));
        }
        if this.deadline.poll_elapsed(cx).is_ready() {
            this.in_flight = None;
            return Poll::Ready(Err(NetError::TimedOut.into()));
        }

        // A write abandoned before its flush finished left a message queued.
        // Send it out before this buffer becomes a message of its own.
        let current = InFlight::of(buf);
        if this.in_flight.is_some_and(|pending| pending != current) {
            let flushed = ready!(this.sink.poll_flush_unpin(cx));
            this.in_flight = None;
            flushed.map_err(engine_error)?;
        }

        // A pending write is re-polled with the same buffer; only queue it once.
        if this.in_flight.is_none() {
            ready!(this.sink.poll_ready_unpin(cx)).map_err(engine_error)?;
            this.sink
                .start_send_unpin(message::outgoing(buf))
                .map_err(engine_error)?;
            this.in_flight = Some(current);
        }

        let flushed = ready!(this.sink.poll_flush_unpin(cx));
        this.in_flight = None;
        flushed.map_err(engine_error)?;
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        this.shared.write_waker.register(cx.waker());
        if this.shared.is_closed() {
            return Poll::Ready(Err(NetError::ConnectionClosed.into()));
        }
        if this.deadline.poll_elapsed(cx).is_ready() {
            return Poll::Ready(Err(NetError::TimedOut.into()));
        }
        let flushed = ready!(this.sink.poll_flush_unpin(cx));
        this.in_flight = None;
        Poll::Ready(flushed.map_err(engine_error))
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        this.shared.write_waker.register(cx.waker());
        if this.shared.is_closed() {
            return Poll::Ready(Ok(()));
        }
        if this.deadline.poll_elapsed(cx).is_ready() {
            return Poll::Ready(Err(NetError::TimedOut.into()));
        }
        match ready!(this.sink.poll_close_unpin(cx)) {
            Ok(())
            | Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                Poll::Ready(Ok(()))
            }
            Err(e) => Poll::Ready(Err(engine_error(e))),
        }
    }
}

/// Closes a connection from any task, including while its halves are
/// blocked in a read or write.
#[derive(Debug, Clone)]
pub struct CloseHandle {
    shared: Arc<Shared>,
}

impl CloseHandle {
    /// Mark the connection closed, wake blocked operations and shut the
    /// transport down. No close frame is sent; the peer sees the connection
    /// end.
    pub fn close(&self) {
        if self.shared.close() {
            self.shared.teardown();
            tracing::debug!(peer = ?self.shared.addrs.peer, "WebSocket stream closed by handle");
        }
    }

    /// Whether the connection was closed.
    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }
}
