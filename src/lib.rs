//! Secure Stream Adapter Library
//!
//! A drop-in secure byte stream: callers get connect/write/read/close,
//! the crate handles handshake sequencing and record framing over a
//! plaintext transport.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌─────────────────────────────────────────────┐
//!                        │                SECURE SESSION                │
//!                        │                                             │
//!   write(bytes) ────────┼─▶ pending queue ──(Secure)──▶ package       │
//!                        │                                  │          │
//!   events ◀─────────────┼── connect/secure/data/close/error│          │
//!                        │         ▲                        ▼          │
//!                        │   ┌─────┴─────┐  verify   ┌────────────┐    │
//!                        │   │  engine   │◀─────────▶│   verify   │    │
//!                        │   │  (TLS)    │  verdicts │   policy   │    │
//!                        │   └─────┬─────┘           └────────────┘    │
//!                        │         │ ciphertext records                │
//!                        │         ▼                                   │
//!                        │   ┌───────────┐                             │
//!   wire ◀───────────────┼───┤ transport ├◀────────────────────────────┼── wire
//!                        │   └───────────┘                             │
//!                        └─────────────────────────────────────────────┘
//! ```

// Core subsystems
pub mod config;
pub mod engine;
pub mod session;
pub mod transport;
pub mod verify;

// Cross-cutting concerns
pub mod observability;

pub use config::SessionOptions;
pub use engine::{EngineError, EngineEvent, EngineFactory, PackagingError, TlsEngine};
pub use session::{
    SecureStream, SessionError, SessionEvent, SessionState, WriteError, WriteReceipt,
};
pub use transport::{Transport, TransportEvent, TransportHandle};
pub use verify::VerifyPolicy;
