//! Session state, events and error definitions.

use bytes::Bytes;
use thiserror::Error;

use crate::engine::{EngineError, PackagingError};

/// Lifecycle state of a secure session.
///
/// Transitions are monotonic; `Closed` and `Failed` are absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Constructed, no transport bound yet.
    Idle,
    /// Transport connect in flight.
    Connecting,
    /// Engine created, key exchange in progress.
    Handshaking,
    /// Secure channel established; data flows both ways.
    Secure,
    /// Terminal: the connection ended cleanly.
    Closed,
    /// Terminal: the session died on an unrecoverable error.
    Failed,
}

impl SessionState {
    /// Whether this state accepts no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Closed | SessionState::Failed)
    }

    /// Whether writes issued now must wait for the secure channel.
    pub fn queues_writes(&self) -> bool {
        matches!(
            self,
            SessionState::Idle | SessionState::Connecting | SessionState::Handshaking
        )
    }
}

/// Events a session emits to its caller.
#[derive(Debug)]
pub enum SessionEvent {
    /// The underlying transport is open.
    Connect,
    /// The handshake completed; queued writes have been flushed.
    Secure,
    /// Decrypted application data.
    Data(Bytes),
    /// The session ended cleanly.
    Close,
    /// The session failed. Emitted exactly once, instead of `Close`.
    Error(SessionError),
}

/// Fatal session errors, carried by [`SessionEvent::Error`].
#[derive(Debug, Error)]
pub enum SessionError {
    /// The raw transport failed (connect or mid-session I/O).
    #[error("transport error: {0}")]
    Transport(String),

    /// The TLS engine reported an unrecoverable condition.
    #[error(transparent)]
    Tls(#[from] EngineError),

    /// Attempted to wrap a transport that already carries a secure
    /// channel.
    #[error("cannot wrap a secure stream in another secure stream")]
    AlreadySecure,
}

/// Per-write failures, reported only through that write's completion.
#[derive(Debug, Clone, Error)]
pub enum WriteError {
    /// The payload could not be packaged into a record. The session
    /// remains usable.
    #[error(transparent)]
    Packaging(#[from] PackagingError),

    /// The session was already terminal when the write was issued.
    #[error("session is not writable")]
    NotWritable,

    /// The session closed after the write was queued but before it could
    /// be flushed.
    #[error("session closed before the write was sent")]
    SessionClosed,
}
