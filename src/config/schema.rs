//! Session option definitions.
//!
//! This module defines the construction-time options for a secure session.
//! Options are merged once (defaults, optional file, caller overrides) and
//! stay immutable for the session's lifetime. All types derive Serde traits
//! for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Environment toggle that disables certificate-name enforcement
/// process-wide. Set to `"0"` to disable; any other value (or unset)
/// leaves enforcement on. Per-session options still override.
pub const REJECT_UNAUTHORIZED_ENV: &str = "SECURE_STREAM_REJECT_UNAUTHORIZED";

/// Options for a secure session.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionOptions {
    /// Reject peers whose certificate fails verification.
    ///
    /// Defaults to true unless the process-wide env toggle disables it.
    pub reject_unauthorized: bool,

    /// Expected server hostname, used for SNI and for the common-name
    /// check on the leaf certificate. When unset, name verification is
    /// skipped.
    pub servername: Option<String>,

    /// Emit per-record diagnostics for this session.
    pub debug: bool,

    /// Path to a PEM file with extra trust anchors.
    pub ca_path: Option<String>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            reject_unauthorized: reject_unauthorized_default(),
            servername: None,
            debug: false,
            ca_path: None,
        }
    }
}

/// Resolve the process-wide default for `reject_unauthorized`.
pub fn reject_unauthorized_default() -> bool {
    std::env::var(REJECT_UNAUTHORIZED_ENV).as_deref() != Ok("0")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_toggle_disables_enforcement() {
        std::env::set_var(REJECT_UNAUTHORIZED_ENV, "0");
        assert!(!reject_unauthorized_default());
        std::env::set_var(REJECT_UNAUTHORIZED_ENV, "1");
        assert!(reject_unauthorized_default());
        std::env::remove_var(REJECT_UNAUTHORIZED_ENV);
        assert!(reject_unauthorized_default());
    }

    #[test]
    fn test_parse_minimal_toml() {
        let options: SessionOptions = toml::from_str("servername = \"example.com\"").unwrap();
        assert_eq!(options.servername.as_deref(), Some("example.com"));
        assert!(!options.debug);
        assert!(options.ca_path.is_none());
    }
}
