//! Settings error types.

use std::path::PathBuf;

use thiserror::Error;

/// Why a settings file could not be turned into [`ChorusSettings`].
///
/// [`ChorusSettings`]: crate::ChorusSettings
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The file exists but could not be read.
    #[error("cannot read settings file {}", path.display())]
    Read {
        /// File that was being read.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The file is not JSON, or a key holds the wrong type.
    #[error("invalid settings in {}", path.display())]
    Invalid {
        /// File that was being parsed.
        path: PathBuf,
        /// Parse or shape error.
        #[source]
        source: serde_json::Error,
    },
    /// Compiled defaults could not be encoded for merging.
    #[error("cannot encode default settings")]
    Defaults(#[source] serde_json::Error),
}

impl SettingsError {
    /// The settings file involved, if any.
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            Self::Read { path, .. } | Self::Invalid { path, .. } => Some(path),
            Self::Defaults(_) => None,
        }
    }
}

/// Result type for settings operations.
pub type Result<T> = std::result::Result<T, SettingsError>;
