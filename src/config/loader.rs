//! Option loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::SessionOptions;

/// Error type for option loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// File contents were not valid TOML for [`SessionOptions`].
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Load session option defaults from a TOML file.
pub fn load_options(path: &Path) -> Result<SessionOptions, ConfigError> {
    let content = fs::read_to_string(path)?;
    let options: SessionOptions = toml::from_str(&content)?;
    Ok(options)
}
