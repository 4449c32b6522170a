//! TLS engine contract.
//!
//! # Responsibilities
//! - Define the engine interface the session drives (client role only)
//! - Define the event variants the session dispatches on
//! - Define engine-side error types
//!
//! # Design Decisions
//! - One `EngineEvent` enum instead of free-standing callbacks, so the
//!   session consumes engine output at a single exhaustive match
//! - `OutboundRecord`s produced while finishing the handshake precede
//!   `HandshakeComplete` in a returned batch, so the final flight reaches
//!   the wire before flushed application writes

use bytes::Bytes;
use thiserror::Error;

pub mod rustls;

pub use self::rustls::RustlsEngineFactory;

/// Output of a single engine step.
///
/// `ingest` may produce zero events (pure handshake records), or several
/// in one batch. Order within a batch is significant.
#[derive(Debug)]
pub enum EngineEvent {
    /// The handshake finished; application data may flow.
    HandshakeComplete,
    /// Ciphertext ready to be written to the raw transport.
    OutboundRecord(Bytes),
    /// Decrypted application data for the caller's readable side.
    InboundPlaintext(Bytes),
    /// The peer closed the secure channel.
    Closed,
    /// Unrecoverable engine failure.
    Error(EngineError),
}

/// Errors reported by a TLS engine. All of these are fatal to the
/// session when surfaced through dispatch.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// The engine could not be constructed from the session options.
    #[error("invalid TLS configuration: {0}")]
    Config(String),

    /// The handshake failed (bad certificate chain, alert, protocol
    /// violation before establishment).
    #[error("TLS handshake failed: {0}")]
    Handshake(String),

    /// The leaf certificate's common name does not match the expected
    /// hostname.
    #[error("certificate common name {presented:?} does not match hostname {expected:?}")]
    CertificateNameMismatch {
        /// Common name presented by the peer.
        presented: String,
        /// Hostname the session was configured to expect.
        expected: String,
    },

    /// Inbound data could not be decoded after establishment.
    #[error("TLS protocol error: {0}")]
    Protocol(String),
}

/// A single write's plaintext failed to convert into a record.
///
/// Local to that write; the session stays usable.
#[derive(Debug, Clone, Error)]
#[error("failed to package data into a TLS record: {0}")]
pub struct PackagingError(pub String);

/// A TLS engine driving one secure channel, client role.
///
/// The session owns exactly one engine, created when the transport
/// reports itself open and never reused across reconnects.
pub trait TlsEngine: Send + std::fmt::Debug {
    /// Begin the handshake. Returns the initial outbound flight.
    fn start_handshake(&mut self) -> Vec<EngineEvent>;

    /// Feed inbound ciphertext from the transport.
    fn ingest(&mut self, ciphertext: &[u8]) -> Vec<EngineEvent>;

    /// Package application plaintext into ciphertext records.
    fn package(&mut self, plaintext: &[u8]) -> Result<Bytes, PackagingError>;

    /// Close the secure channel, returning a final record (close alert)
    /// to flush to the transport, if the engine produces one.
    fn close(&mut self) -> Option<Bytes> {
        None
    }
}

/// Creates the engine for a session once its transport is open.
pub trait EngineFactory: Send + 'static {
    /// Build the engine. Called exactly once per session.
    fn create(&mut self) -> Result<Box<dyn TlsEngine>, EngineError>;
}
