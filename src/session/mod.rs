//! Secure session state machine and lifecycle tracking.
//!
//! # Responsibilities
//! - Track session state (Idle → Connecting → Handshaking → Secure →
//!   Closed/Failed)
//! - Queue writes issued before the secure channel exists, flush them
//!   FIFO at the Secure transition
//! - Pump bytes both ways between the raw transport and the TLS engine
//! - Emit lifecycle events and generate unique session IDs for tracing
//!
//! # Design Decisions
//! - The session runs as a single-owner tokio task; transport events and
//!   caller commands arrive over channels and are handled as discrete,
//!   non-reentrant steps
//! - Engine output is consumed at one dispatch point (exhaustive match
//!   over [`EngineEvent`])
//! - Terminal states are absorbing: exactly one terminal event is ever
//!   emitted (`Close` for Closed, `Error` for Failed)

use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::config::SessionOptions;
use crate::engine::{EngineEvent, EngineFactory, TlsEngine};
use crate::observability::metrics;
use crate::transport::TransportEvent;

pub mod handle;
pub(crate) mod pending;
pub mod types;

pub use handle::{SecureStream, WriteReceipt};
pub use types::{SessionError, SessionEvent, SessionState, WriteError};

use handle::Command;
use pending::{PendingWriteQueue, WriteCompletion};

/// Global atomic counter for session IDs.
/// Relaxed ordering is sufficient since we only need uniqueness.
static SESSION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u64);

impl SessionId {
    /// Generate a new unique session ID.
    pub fn new() -> Self {
        Self(SESSION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// The adapter entity: owns the engine, the pending-write queue and the
/// transport's channel ends.
pub(crate) struct SecureSession {
    id: SessionId,
    state: SessionState,
    options: SessionOptions,
    factory: Box<dyn EngineFactory>,
    engine: Option<Box<dyn TlsEngine>>,
    pending: PendingWriteQueue,
    /// Ciphertext to the raw transport.
    outbound: mpsc::UnboundedSender<Bytes>,
    /// Bytes the transport held before this session took ownership.
    buffered: Vec<Bytes>,
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl SecureSession {
    pub(crate) fn new(
        options: SessionOptions,
        factory: Box<dyn EngineFactory>,
        outbound: mpsc::UnboundedSender<Bytes>,
        buffered: Vec<Bytes>,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> Self {
        Self {
            id: SessionId::new(),
            state: SessionState::Idle,
            options,
            factory,
            engine: None,
            pending: PendingWriteQueue::default(),
            outbound,
            buffered,
            events,
        }
    }

    /// Bind to the transport: the session now waits for it to open.
    pub(crate) fn bind(&mut self) {
        debug_assert_eq!(self.state, SessionState::Idle);
        self.state = SessionState::Connecting;
        metrics::record_session_opened();
        tracing::debug!(session_id = %self.id, "session bound to transport");
    }

    pub(crate) fn state(&self) -> SessionState {
        self.state
    }

    pub(crate) fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    pub(crate) fn on_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Open => self.handle_open(),
            TransportEvent::Data(bytes) => self.handle_data(bytes),
            TransportEvent::Closed => self.enter_closed(),
            TransportEvent::Error(message) => {
                self.enter_failed(SessionError::Transport(message));
            }
        }
    }

    pub(crate) fn on_command(&mut self, command: Command) {
        match command {
            Command::Write {
                payload,
                completion,
            } => self.handle_write(payload, completion),
            Command::Close => self.handle_close(),
        }
    }

    /// Transport is open: create the engine and start the handshake.
    fn handle_open(&mut self) {
        if self.state != SessionState::Connecting {
            tracing::trace!(session_id = %self.id, state = ?self.state, "ignoring transport open");
            return;
        }

        self.emit(SessionEvent::Connect);

        let engine = match self.factory.create() {
            Ok(engine) => engine,
            Err(e) => {
                self.enter_failed(SessionError::from(e));
                return;
            }
        };
        self.engine = Some(engine);
        self.state = SessionState::Handshaking;
        if self.options.debug {
            tracing::debug!(session_id = %self.id, "handshaking");
        }

        // Bytes the transport buffered before we took ownership replay
        // through the same ingestion path as live data, ahead of it.
        let buffered = std::mem::take(&mut self.buffered);
        for chunk in buffered {
            self.handle_data(chunk);
            if self.state.is_terminal() {
                return;
            }
        }

        let events = self
            .engine
            .as_mut()
            .expect("engine installed above")
            .start_handshake();
        self.dispatch(events);
    }

    /// Inbound ciphertext goes to the engine, never to the caller.
    fn handle_data(&mut self, bytes: Bytes) {
        if self.state.is_terminal() {
            return;
        }
        let Some(engine) = self.engine.as_mut() else {
            // Arrived before the engine existed; replay at init.
            self.buffered.push(bytes);
            return;
        };
        if self.options.debug {
            tracing::debug!(session_id = %self.id, len = bytes.len(), "ciphertext in");
        }
        let events = engine.ingest(&bytes);
        self.dispatch(events);
    }

    /// The single dispatch point for engine output.
    fn dispatch(&mut self, events: Vec<EngineEvent>) {
        for event in events {
            if self.state.is_terminal() {
                break;
            }
            match event {
                EngineEvent::OutboundRecord(record) => self.send_record(record),
                EngineEvent::HandshakeComplete => self.handle_handshake_complete(),
                EngineEvent::InboundPlaintext(plaintext) => self.handle_plaintext(plaintext),
                EngineEvent::Closed => {
                    if self.options.debug {
                        tracing::debug!(session_id = %self.id, "peer closed secure channel");
                    }
                    self.enter_closed();
                }
                EngineEvent::Error(e) => self.enter_failed(SessionError::Tls(e)),
            }
        }
    }

    /// Secure transition: drain the queue exactly once, FIFO.
    fn handle_handshake_complete(&mut self) {
        if self.state != SessionState::Handshaking {
            return;
        }
        self.state = SessionState::Secure;
        metrics::record_handshake_complete();

        let queued = self.pending.len();
        tracing::debug!(session_id = %self.id, queued_writes = queued, "secure channel established");
        if queued > 0 {
            metrics::record_pending_flushed(queued);
        }

        // Each payload is packaged before the next entry is considered.
        for (payload, completion) in self.pending.drain() {
            if self.state.is_terminal() {
                let _ = completion.send(Err(WriteError::SessionClosed));
                continue;
            }
            self.write_now(payload, completion);
        }

        self.emit(SessionEvent::Secure);
    }

    fn handle_plaintext(&mut self, plaintext: Bytes) {
        if self.state != SessionState::Secure {
            tracing::warn!(session_id = %self.id, "dropping plaintext outside secure state");
            return;
        }
        metrics::record_plaintext_in(plaintext.len());
        if self.options.debug {
            tracing::debug!(session_id = %self.id, len = plaintext.len(), "plaintext in");
        }
        self.emit(SessionEvent::Data(plaintext));
    }

    fn handle_write(&mut self, payload: Bytes, completion: WriteCompletion) {
        if self.state.queues_writes() {
            self.pending.push(payload, completion);
            return;
        }
        if self.state == SessionState::Secure {
            self.write_now(payload, completion);
        } else {
            let _ = completion.send(Err(WriteError::NotWritable));
        }
    }

    /// Package one payload and hand the record to the transport. The
    /// completion fires only after the payload reached `package`.
    fn write_now(&mut self, payload: Bytes, completion: WriteCompletion) {
        let result = match self.engine.as_mut() {
            Some(engine) => engine.package(&payload),
            None => {
                let _ = completion.send(Err(WriteError::NotWritable));
                return;
            }
        };

        match result {
            Ok(record) => {
                metrics::record_plaintext_out(payload.len());
                if self.options.debug {
                    tracing::debug!(session_id = %self.id, len = payload.len(), "write packaged");
                }
                self.send_record(record);
                let _ = completion.send(Ok(()));
            }
            Err(e) => {
                // Local to this write; the session stays usable.
                tracing::warn!(session_id = %self.id, error = %e, "packaging failed");
                let _ = completion.send(Err(WriteError::Packaging(e)));
            }
        }
    }

    fn send_record(&mut self, record: Bytes) {
        if record.is_empty() {
            return;
        }
        if self.outbound.send(record).is_err() {
            self.enter_failed(SessionError::Transport("transport writer is gone".into()));
        }
    }

    fn handle_close(&mut self) {
        if self.state.is_terminal() {
            // Idempotent: no second terminal event.
            return;
        }
        if let Some(final_record) = self.engine.as_mut().and_then(|e| e.close()) {
            // Best effort; the transport may already be gone.
            let _ = self.outbound.send(final_record);
        }
        self.enter_closed();
    }

    fn enter_closed(&mut self) {
        if self.state.is_terminal() {
            return;
        }
        self.state = SessionState::Closed;
        self.pending.fail_all(WriteError::SessionClosed);
        metrics::record_session_closed();
        tracing::debug!(session_id = %self.id, "session closed");
        self.emit(SessionEvent::Close);
    }

    fn enter_failed(&mut self, error: SessionError) {
        if self.state.is_terminal() {
            return;
        }
        if self.state == SessionState::Handshaking {
            metrics::record_handshake_failure();
        }
        self.state = SessionState::Failed;
        self.pending.fail_all(WriteError::SessionClosed);
        metrics::record_session_closed();
        tracing::warn!(session_id = %self.id, error = %error, "session failed");
        self.emit(SessionEvent::Error(error));
    }

    fn emit(&self, event: SessionEvent) {
        // The caller may have dropped its event receiver; that is fine.
        let _ = self.events.send(event);
    }
}

/// Single-owner task driving one session.
pub(crate) async fn run(
    mut session: SecureSession,
    mut transport_events: mpsc::UnboundedReceiver<TransportEvent>,
    mut commands: mpsc::UnboundedReceiver<Command>,
) {
    loop {
        tokio::select! {
            event = transport_events.recv() => match event {
                Some(event) => session.on_transport_event(event),
                // Driver task is gone; treat it as a close.
                None => session.on_transport_event(TransportEvent::Closed),
            },
            command = commands.recv() => match command {
                Some(command) => session.on_command(command),
                // Handle dropped; shut the session down.
                None => session.on_command(Command::Close),
            },
        }
        if session.is_terminal() {
            break;
        }
    }

    // Writes that raced with shutdown fail instead of disappearing.
    commands.close();
    while let Ok(command) = commands.try_recv() {
        if let Command::Write { completion, .. } = command {
            let _ = completion.send(Err(WriteError::NotWritable));
        }
    }
}
