//! Default TLS engine backed by rustls.
//!
//! # Responsibilities
//! - Adapt `rustls::ClientConnection` to the [`TlsEngine`] contract
//! - Build the client config from session options at engine-init time
//! - Plug the hostname policy in as a certificate verifier
//!
//! Chain validation is delegated to rustls/webpki; the policy layer only
//! applies the common-name check on the leaf. When the policy enforces
//! nothing, a skip-everything verifier is installed instead.

use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::sync::Arc;

use bytes::Bytes;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::client::WebPkiServerVerifier;
use rustls::crypto::CryptoProvider;
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{
    CertificateError, ClientConfig, ClientConnection, DigitallySignedStruct, OtherError,
    RootCertStore, SignatureScheme,
};

use crate::config::SessionOptions;
use crate::engine::{EngineError, EngineEvent, EngineFactory, PackagingError, TlsEngine};
use crate::verify::VerifyPolicy;

/// Builds a [`RustlsEngine`] for one session.
///
/// Config construction (trust anchors, verifier wiring) is deferred to
/// `create` so the engine only comes into being once the transport is
/// open.
pub struct RustlsEngineFactory {
    options: SessionOptions,
    server_name: String,
}

impl RustlsEngineFactory {
    /// Remember the options and the hostname used for SNI.
    pub fn new(options: SessionOptions, server_name: impl Into<String>) -> Self {
        Self {
            options,
            server_name: server_name.into(),
        }
    }

    fn client_config(&self) -> Result<ClientConfig, EngineError> {
        let policy = VerifyPolicy::from_options(&self.options);
        let provider = Arc::new(rustls::crypto::ring::default_provider());

        let builder = ClientConfig::builder_with_provider(provider.clone())
            .with_safe_default_protocol_versions()
            .map_err(|e| EngineError::Config(e.to_string()))?;

        let config = if policy.enforces() {
            let roots = Arc::new(load_root_store(&self.options)?);
            let webpki = WebPkiServerVerifier::builder_with_provider(roots, provider)
                .build()
                .map_err(|e| EngineError::Config(e.to_string()))?;
            builder
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(PolicyVerifier {
                    inner: webpki,
                    policy,
                }))
                .with_no_client_auth()
        } else {
            builder
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(SkipVerification::new(&provider)))
                .with_no_client_auth()
        };

        Ok(config)
    }
}

impl EngineFactory for RustlsEngineFactory {
    fn create(&mut self) -> Result<Box<dyn TlsEngine>, EngineError> {
        let config = Arc::new(self.client_config()?);
        let name = ServerName::try_from(self.server_name.clone())
            .map_err(|_| EngineError::Config(format!("invalid server name {:?}", self.server_name)))?;
        let conn = ClientConnection::new(config, name)
            .map_err(|e| EngineError::Config(e.to_string()))?;

        Ok(Box::new(RustlsEngine {
            conn,
            established: false,
        }))
    }
}

/// Client-side TLS engine over `rustls::ClientConnection`.
#[derive(Debug)]
pub struct RustlsEngine {
    conn: ClientConnection,
    established: bool,
}

impl RustlsEngine {
    /// Move queued ciphertext out of the connection.
    fn drain_outbound(&mut self, events: &mut Vec<EngineEvent>) {
        let mut out = Vec::new();
        while self.conn.wants_write() {
            if self.conn.write_tls(&mut out).is_err() {
                break;
            }
        }
        if !out.is_empty() {
            events.push(EngineEvent::OutboundRecord(out.into()));
        }
    }

    /// Process buffered records. Returns false once a terminal event was
    /// pushed.
    fn advance(&mut self, events: &mut Vec<EngineEvent>) -> bool {
        let state = match self.conn.process_new_packets() {
            Ok(state) => state,
            Err(err) => {
                // Flush the queued alert before reporting.
                self.drain_outbound(events);
                let mapped = self.map_error(err);
                events.push(EngineEvent::Error(mapped));
                return false;
            }
        };

        // Handshake responses (and the final flight) go out before the
        // completion event, so flushed writes cannot overtake them.
        self.drain_outbound(events);

        if !self.established && !self.conn.is_handshaking() {
            self.established = true;
            events.push(EngineEvent::HandshakeComplete);
        }

        let pending = state.plaintext_bytes_to_read();
        if pending > 0 {
            let mut plaintext = vec![0u8; pending];
            if let Err(err) = self.conn.reader().read_exact(&mut plaintext) {
                events.push(EngineEvent::Error(EngineError::Protocol(err.to_string())));
                return false;
            }
            events.push(EngineEvent::InboundPlaintext(plaintext.into()));
        }

        if state.peer_has_closed() {
            events.push(EngineEvent::Closed);
            return false;
        }

        true
    }

    fn map_error(&self, err: rustls::Error) -> EngineError {
        if let Some(own) = policy_error(&err) {
            return own;
        }
        if self.established {
            EngineError::Protocol(err.to_string())
        } else {
            EngineError::Handshake(err.to_string())
        }
    }
}

impl TlsEngine for RustlsEngine {
    fn start_handshake(&mut self) -> Vec<EngineEvent> {
        let mut events = Vec::new();
        self.drain_outbound(&mut events);
        events
    }

    fn ingest(&mut self, ciphertext: &[u8]) -> Vec<EngineEvent> {
        let mut events = Vec::new();
        let mut cursor = io::Cursor::new(ciphertext);

        while (cursor.position() as usize) < ciphertext.len() {
            match self.conn.read_tls(&mut cursor) {
                Ok(0) => break,
                Ok(_) => {
                    if !self.advance(&mut events) {
                        break;
                    }
                }
                Err(err) => {
                    events.push(EngineEvent::Error(EngineError::Protocol(err.to_string())));
                    break;
                }
            }
        }

        events
    }

    fn package(&mut self, plaintext: &[u8]) -> Result<Bytes, PackagingError> {
        self.conn
            .writer()
            .write_all(plaintext)
            .map_err(|e| PackagingError(e.to_string()))?;

        let mut out = Vec::new();
        while self.conn.wants_write() {
            self.conn
                .write_tls(&mut out)
                .map_err(|e| PackagingError(e.to_string()))?;
        }
        Ok(out.into())
    }

    fn close(&mut self) -> Option<Bytes> {
        self.conn.send_close_notify();
        let mut out = Vec::new();
        while self.conn.wants_write() {
            if self.conn.write_tls(&mut out).is_err() {
                break;
            }
        }
        if out.is_empty() {
            None
        } else {
            Some(out.into())
        }
    }
}

/// Wrap a policy rejection so it survives the trip through rustls.
fn reject(err: EngineError) -> rustls::Error {
    rustls::Error::InvalidCertificate(CertificateError::Other(OtherError(Arc::new(err))))
}

/// Recover a policy rejection smuggled through [`reject`].
fn policy_error(err: &rustls::Error) -> Option<EngineError> {
    if let rustls::Error::InvalidCertificate(CertificateError::Other(other)) = err {
        if let Some(own) = other.0.downcast_ref::<EngineError>() {
            return Some(own.clone());
        }
    }
    None
}

/// Verifier layering the hostname policy over webpki chain validation.
#[derive(Debug)]
struct PolicyVerifier {
    inner: Arc<WebPkiServerVerifier>,
    policy: VerifyPolicy,
}

impl ServerCertVerifier for PolicyVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        self.inner
            .verify_server_cert(end_entity, intermediates, server_name, ocsp_response, now)?;

        // One policy decision per certificate, leaf at depth 0.
        for (depth, cert) in std::iter::once(end_entity)
            .chain(intermediates.iter())
            .enumerate()
        {
            let common_name = if depth == 0 {
                subject_common_name(cert)
            } else {
                None
            };
            self.policy
                .check(depth, true, common_name.as_deref())
                .map_err(reject)?;
        }

        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls12_signature(message, cert, dss)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls13_signature(message, cert, dss)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.inner.supported_verify_schemes()
    }
}

/// Verifier installed when the policy enforces nothing.
#[derive(Debug)]
struct SkipVerification {
    schemes: Vec<SignatureScheme>,
}

impl SkipVerification {
    fn new(provider: &CryptoProvider) -> Self {
        Self {
            schemes: provider.signature_verification_algorithms.supported_schemes(),
        }
    }
}

impl ServerCertVerifier for SkipVerification {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        tracing::debug!("server certificate verification skipped");
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.schemes.clone()
    }
}

/// Default trust anchors plus any extra CAs from the options.
fn load_root_store(options: &SessionOptions) -> Result<RootCertStore, EngineError> {
    let mut roots = RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    if let Some(path) = &options.ca_path {
        let file = File::open(path)
            .map_err(|e| EngineError::Config(format!("cannot open CA file {path}: {e}")))?;
        let mut reader = BufReader::new(file);
        for cert in rustls_pemfile::certs(&mut reader) {
            let cert =
                cert.map_err(|e| EngineError::Config(format!("unreadable CA file {path}: {e}")))?;
            roots
                .add(cert)
                .map_err(|e| EngineError::Config(format!("bad CA certificate in {path}: {e}")))?;
        }
    }

    Ok(roots)
}

/// Subject CN of a DER-encoded certificate, if it parses and has one.
fn subject_common_name(cert: &CertificateDer<'_>) -> Option<String> {
    use x509_parser::prelude::*;

    let (_, parsed) = X509Certificate::from_der(cert.as_ref()).ok()?;
    let cn = parsed
        .subject()
        .iter_common_name()
        .next()
        .and_then(|cn| cn.as_str().ok())
        .map(str::to_string);
    cn
}
