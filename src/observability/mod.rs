//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Session, transport and engine produce:
//!     → logging.rs (structured log events, session ID as field)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → Log aggregation (stdout via the subscriber, or the host's)
//!     → Whatever metrics recorder the host process installs
//! ```
//!
//! # Design Decisions
//! - Structured logging via tracing; the session ID flows as a field
//! - Metrics go through the `metrics` facade only; installing a
//!   recorder/exporter is the host process's business
//! - The per-session `debug` option gates record-level diagnostics,
//!   decoupled from the subscriber's filter

pub mod logging;
pub mod metrics;
