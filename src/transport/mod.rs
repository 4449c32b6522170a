//! Raw transport contract.
//!
//! # Responsibilities
//! - Define the channel pair a session consumes: lifecycle/data events in,
//!   ciphertext out
//! - Carry the `encrypted` marker used to reject double wrapping
//! - Hold bytes received before a session took ownership
//!
//! # Design Decisions
//! - Explicit composition: anything that feeds [`TransportEvent`]s through
//!   a [`TransportHandle`] and drains outbound ciphertext is a transport;
//!   the session never reaches into the peer object
//! - Unbounded channels: the session is the only producer of outbound
//!   ciphertext and processes inbound events one at a time, so ordering is
//!   the channel's FIFO ordering

use bytes::Bytes;
use tokio::net::TcpStream;
use tokio::sync::mpsc;

pub mod tcp;

/// Lifecycle and data notifications from the raw transport.
#[derive(Debug)]
pub enum TransportEvent {
    /// The underlying connection is open.
    Open,
    /// Bytes arrived from the wire.
    Data(Bytes),
    /// The peer closed the connection.
    Closed,
    /// The connection failed; the message is the driver's error text.
    Error(String),
}

/// One end of a raw byte connection, as seen by a session.
pub struct Transport {
    /// Marker distinguishing transports that already carry a secure
    /// channel. Wrapping such a transport again is a contract violation.
    pub encrypted: bool,

    pub(crate) outbound: mpsc::UnboundedSender<Bytes>,
    pub(crate) events: mpsc::UnboundedReceiver<TransportEvent>,
    pub(crate) buffered: Vec<Bytes>,
}

impl Transport {
    /// Create an unconnected transport and the handle that drives it.
    ///
    /// This is the contract seam: the TCP driver uses it internally, and
    /// tests or alternative byte-stream providers use it directly.
    pub fn channel() -> (Self, TransportHandle) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        (
            Self {
                encrypted: false,
                outbound: outbound_tx,
                events: events_rx,
                buffered: Vec::new(),
            },
            TransportHandle {
                events: events_tx,
                outbound: outbound_rx,
            },
        )
    }

    /// Dial `host:port` on a background task.
    ///
    /// Emits `Open` once the socket connects, or `Error` if the dial
    /// fails.
    pub fn connect(host: &str, port: u16) -> Self {
        tcp::connect(host.to_string(), port)
    }

    /// Wrap an already-open socket.
    pub fn from_stream(stream: TcpStream) -> Self {
        tcp::from_stream(stream)
    }

    /// Record bytes this transport received before a session took
    /// ownership. They are replayed through the ingestion path ahead of
    /// live inbound data.
    pub fn preload(&mut self, bytes: impl Into<Bytes>) {
        self.buffered.push(bytes.into());
    }
}

/// Driver-side handle feeding a [`Transport`].
pub struct TransportHandle {
    events: mpsc::UnboundedSender<TransportEvent>,
    outbound: mpsc::UnboundedReceiver<Bytes>,
}

impl TransportHandle {
    /// Report the connection open. Returns false once the session is gone.
    pub fn open(&self) -> bool {
        self.events.send(TransportEvent::Open).is_ok()
    }

    /// Deliver inbound bytes. Returns false once the session is gone.
    pub fn deliver(&self, bytes: impl Into<Bytes>) -> bool {
        self.events.send(TransportEvent::Data(bytes.into())).is_ok()
    }

    /// Report the peer closing the connection.
    pub fn close(&self) {
        let _ = self.events.send(TransportEvent::Closed);
    }

    /// Report a connection failure.
    pub fn error(&self, message: impl Into<String>) {
        let _ = self.events.send(TransportEvent::Error(message.into()));
    }

    /// Next ciphertext chunk the session wants on the wire.
    pub async fn next_outbound(&mut self) -> Option<Bytes> {
        self.outbound.recv().await
    }

    /// Non-blocking variant of [`next_outbound`](Self::next_outbound).
    pub fn try_next_outbound(&mut self) -> Option<Bytes> {
        self.outbound.try_recv().ok()
    }
}
