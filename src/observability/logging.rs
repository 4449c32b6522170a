//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber for binaries and ad-hoc use
//! - Respect `RUST_LOG` when set, fall back to a sane default
//!
//! Library consumers that already install a subscriber should not call
//! [`init`]; sessions log through `tracing` regardless.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// `debug` lowers the default filter to debug level for this crate.
/// A second call is a no-op (the first subscriber wins).
pub fn init(debug: bool) {
    let default_filter = if debug {
        "secure_stream=debug"
    } else {
        "secure_stream=info"
    };

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
