//! Metrics collection.
//!
//! # Metrics
//! - `secure_stream_sessions_total` (counter): sessions constructed
//! - `secure_stream_active_sessions` (gauge): sessions not yet terminal
//! - `secure_stream_handshakes_total` (counter): completed handshakes
//! - `secure_stream_handshake_failures_total` (counter): handshakes that
//!   died before the secure transition
//! - `secure_stream_plaintext_bytes_in_total` / `_out_total` (counters):
//!   decrypted bytes delivered / application bytes packaged
//! - `secure_stream_pending_writes_flushed_total` (counter): writes that
//!   waited for the secure transition
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; no exporter is wired
//!   here (that belongs to the host process)

use metrics::{counter, gauge};

/// Record a session being bound to a transport.
pub fn record_session_opened() {
    counter!("secure_stream_sessions_total").increment(1);
    gauge!("secure_stream_active_sessions").increment(1.0);
}

/// Record a session reaching a terminal state.
pub fn record_session_closed() {
    gauge!("secure_stream_active_sessions").decrement(1.0);
}

/// Record a completed handshake.
pub fn record_handshake_complete() {
    counter!("secure_stream_handshakes_total").increment(1);
}

/// Record a handshake that failed before the secure transition.
pub fn record_handshake_failure() {
    counter!("secure_stream_handshake_failures_total").increment(1);
}

/// Record decrypted bytes delivered to the caller.
pub fn record_plaintext_in(len: usize) {
    counter!("secure_stream_plaintext_bytes_in_total").increment(len as u64);
}

/// Record application bytes handed to the engine for packaging.
pub fn record_plaintext_out(len: usize) {
    counter!("secure_stream_plaintext_bytes_out_total").increment(len as u64);
}

/// Record queued writes flushed at the secure transition.
pub fn record_pending_flushed(count: usize) {
    counter!("secure_stream_pending_writes_flushed_total").increment(count as u64);
}
