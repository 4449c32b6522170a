//! Session option management.
//!
//! # Data Flow
//! ```text
//! defaults (env toggle applied)
//!     → optional TOML file (loader.rs)
//!     → caller overrides at construction
//!     → SessionOptions (validated, immutable)
//!     → moved into the session, never mutated after
//! ```
//!
//! # Design Decisions
//! - Options are immutable once a session is constructed; there is no
//!   hot reload
//! - All fields have defaults so a bare `SessionOptions::default()` works
//! - The env toggle only moves the default; explicit options win

pub mod loader;
pub mod schema;

pub use loader::{load_options, ConfigError};
pub use schema::{reject_unauthorized_default, SessionOptions, REJECT_UNAUTHORIZED_ENV};
