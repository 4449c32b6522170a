//! Public session surface.
//!
//! [`SecureStream`] is the caller-facing handle: construction dials or
//! wraps a transport and spawns the session task; `write`/`close` enqueue
//! commands; `next_event` yields the session's readable side and
//! lifecycle events.
//!
//! Constructors must run inside a tokio runtime.

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};

use crate::config::SessionOptions;
use crate::engine::{EngineFactory, RustlsEngineFactory};
use crate::transport::Transport;

use super::pending::WriteCompletion;
use super::types::{SessionError, SessionEvent, WriteError};
use super::SecureSession;

/// Caller requests processed by the session task.
pub(crate) enum Command {
    Write {
        payload: Bytes,
        completion: WriteCompletion,
    },
    Close,
}

/// Handle to a running secure session.
#[derive(Debug)]
pub struct SecureStream {
    commands: mpsc::UnboundedSender<Command>,
    events: mpsc::UnboundedReceiver<SessionEvent>,
}

impl SecureStream {
    /// Dial `host:port` and establish a secure channel over it.
    ///
    /// Returns immediately; the connect and handshake proceed in the
    /// background. Writes may be issued right away and are queued until
    /// the channel is secure.
    pub fn connect(host: &str, port: u16, options: SessionOptions) -> Self {
        let server_name = options
            .servername
            .clone()
            .unwrap_or_else(|| host.to_string());
        let factory = RustlsEngineFactory::new(options.clone(), server_name);
        let transport = Transport::connect(host, port);
        Self::spawn(transport, options, Box::new(factory))
    }

    /// Wrap an already-open transport with the default engine.
    ///
    /// Fails fast if the transport already carries a secure channel.
    pub fn wrap(transport: Transport, options: SessionOptions) -> Result<Self, SessionError> {
        // A wrapped transport has no dial hostname to fall back to; with
        // no servername configured, verification is skipped anyway.
        let server_name = options
            .servername
            .clone()
            .unwrap_or_else(|| "localhost".to_string());
        let factory = RustlsEngineFactory::new(options.clone(), server_name);
        Self::wrap_with_engine(transport, options, Box::new(factory))
    }

    /// Wrap a transport with a caller-supplied engine factory.
    ///
    /// The seam for tests and alternative engines.
    pub fn wrap_with_engine(
        transport: Transport,
        options: SessionOptions,
        factory: Box<dyn EngineFactory>,
    ) -> Result<Self, SessionError> {
        if transport.encrypted {
            return Err(SessionError::AlreadySecure);
        }
        Ok(Self::spawn(transport, options, factory))
    }

    fn spawn(
        transport: Transport,
        options: SessionOptions,
        factory: Box<dyn EngineFactory>,
    ) -> Self {
        let Transport {
            outbound,
            events: transport_events,
            buffered,
            ..
        } = transport;

        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let mut session = SecureSession::new(options, factory, outbound, buffered, events_tx);
        session.bind();
        tokio::spawn(super::run(session, transport_events, commands_rx));

        Self {
            commands: commands_tx,
            events: events_rx,
        }
    }

    /// Queue a write. The receipt resolves once the payload has been
    /// packaged (or failed), never synchronously.
    pub fn write(&self, payload: impl Into<Bytes>) -> WriteReceipt {
        let (tx, rx) = oneshot::channel();
        let command = Command::Write {
            payload: payload.into(),
            completion: tx,
        };
        if let Err(mpsc::error::SendError(command)) = self.commands.send(command) {
            // Session task already exited.
            if let Command::Write { completion, .. } = command {
                let _ = completion.send(Err(WriteError::NotWritable));
            }
        }
        WriteReceipt { inner: rx }
    }

    /// Close the session. Idempotent; a no-op once terminal.
    pub fn close(&self) {
        let _ = self.commands.send(Command::Close);
    }

    /// Next lifecycle or data event. `None` once the session task is gone
    /// and all events were consumed.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        self.events.recv().await
    }
}

/// Awaitable completion of a single write.
pub struct WriteReceipt {
    inner: oneshot::Receiver<Result<(), WriteError>>,
}

impl WriteReceipt {
    /// Wait for the write's outcome.
    pub async fn completion(self) -> Result<(), WriteError> {
        self.inner.await.unwrap_or(Err(WriteError::SessionClosed))
    }
}
