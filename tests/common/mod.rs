//! Shared utilities for integration testing: a scripted TLS engine plus
//! event/outbound helpers with timeouts.

use std::time::Duration;

use bytes::Bytes;
use secure_stream::engine::{EngineError, EngineEvent, EngineFactory, PackagingError, TlsEngine};
use secure_stream::{SecureStream, SessionEvent, SessionOptions, TransportHandle, VerifyPolicy};

/// Wire vocabulary of the scripted engine.
pub const CLIENT_HELLO: &[u8] = b"CLIENT_HELLO";
pub const FINISHED: &[u8] = b"FINISHED";
#[allow(dead_code)]
pub const ALERT: &[u8] = b"ALERT";
#[allow(dead_code)]
pub const CLOSE_NOTIFY: &[u8] = b"CLOSE_NOTIFY";

/// Deterministic engine for driving sessions in tests.
///
/// The handshake completes when the server's hello frame arrives; the
/// certificate decision goes through the verify policy exactly like a
/// real engine's verification callback. Records are `REC `-tagged
/// frames. A `poison` payload refuses to package.
#[derive(Debug)]
pub struct MockEngine {
    policy: VerifyPolicy,
    established: bool,
}

impl MockEngine {
    pub fn new(policy: VerifyPolicy) -> Self {
        Self {
            policy,
            established: false,
        }
    }

    /// Factory handing out one engine with this policy.
    pub fn factory(policy: VerifyPolicy) -> Box<dyn EngineFactory> {
        Box::new(MockEngineFactory { policy })
    }
}

impl TlsEngine for MockEngine {
    fn start_handshake(&mut self) -> Vec<EngineEvent> {
        vec![EngineEvent::OutboundRecord(Bytes::from_static(CLIENT_HELLO))]
    }

    fn ingest(&mut self, ciphertext: &[u8]) -> Vec<EngineEvent> {
        if ciphertext == CLOSE_NOTIFY {
            return vec![EngineEvent::Closed];
        }

        if let Some(cn) = ciphertext.strip_prefix(b"SERVER_HELLO cn=" as &[u8]) {
            let cn = String::from_utf8_lossy(cn).to_string();
            return match self.policy.check(0, true, Some(&cn)) {
                Ok(()) => {
                    self.established = true;
                    vec![
                        EngineEvent::OutboundRecord(Bytes::from_static(FINISHED)),
                        EngineEvent::HandshakeComplete,
                    ]
                }
                Err(e) => vec![
                    EngineEvent::OutboundRecord(Bytes::from_static(ALERT)),
                    EngineEvent::Error(e),
                ],
            };
        }

        if self.established {
            if let Some(payload) = ciphertext.strip_prefix(b"REC " as &[u8]) {
                return vec![EngineEvent::InboundPlaintext(Bytes::copy_from_slice(payload))];
            }
        }

        // Handshake record producing no application data.
        Vec::new()
    }

    fn package(&mut self, plaintext: &[u8]) -> Result<Bytes, PackagingError> {
        if plaintext == b"poison" {
            return Err(PackagingError("refusing to package poison".into()));
        }
        let mut record = b"REC ".to_vec();
        record.extend_from_slice(plaintext);
        Ok(record.into())
    }

    fn close(&mut self) -> Option<Bytes> {
        Some(Bytes::from_static(CLOSE_NOTIFY))
    }
}

struct MockEngineFactory {
    policy: VerifyPolicy,
}

impl EngineFactory for MockEngineFactory {
    fn create(&mut self) -> Result<Box<dyn TlsEngine>, EngineError> {
        Ok(Box::new(MockEngine::new(self.policy.clone())))
    }
}

/// Session options that never consult the process environment.
pub fn options() -> SessionOptions {
    SessionOptions {
        reject_unauthorized: true,
        servername: None,
        debug: false,
        ca_path: None,
    }
}

/// Policy that enforces nothing.
pub fn accept_all() -> VerifyPolicy {
    VerifyPolicy {
        reject_unauthorized: false,
        expected_hostname: None,
    }
}

/// Policy that expects this hostname on the leaf certificate.
#[allow(dead_code)]
pub fn expect_hostname(name: &str) -> VerifyPolicy {
    VerifyPolicy {
        reject_unauthorized: true,
        expected_hostname: Some(name.to_string()),
    }
}

/// Server hello frame presenting this common name.
pub fn server_hello(cn: &str) -> Vec<u8> {
    format!("SERVER_HELLO cn={cn}").into_bytes()
}

/// Application data frame.
#[allow(dead_code)]
pub fn record(payload: &str) -> Vec<u8> {
    format!("REC {payload}").into_bytes()
}

/// Next session event, failing the test after a second of silence.
pub async fn expect_event(stream: &mut SecureStream) -> SessionEvent {
    tokio::time::timeout(Duration::from_secs(1), stream.next_event())
        .await
        .expect("timed out waiting for session event")
        .expect("session event stream ended")
}

/// Next ciphertext chunk the session put on the wire.
pub async fn expect_outbound(handle: &mut TransportHandle) -> Bytes {
    tokio::time::timeout(Duration::from_secs(1), handle.next_outbound())
        .await
        .expect("timed out waiting for outbound data")
        .expect("transport outbound channel closed")
}

/// Give the session task a moment to drain already-sent commands.
#[allow(dead_code)]
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}
