//! Error types for the ck-core crate.
//!
//! This module provides the [`ConfigError`] type for configuration loading and
//! validation failures.

use camino::Utf8PathBuf;

/// Errors that can occur during configuration loading and validation.
///
/// # Examples
///
/// ```
/// use ck_core::ConfigError;
/// use camino::Utf8PathBuf;
///
/// let error = ConfigError::RelativeRoot(Utf8PathBuf::from("site/src"));
/// assert!(error.to_string().contains("site/src"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A watched root is not an absolute path.
    #[error("watched root must be absolute: {0}")]
    RelativeRoot(Utf8PathBuf),

    /// A configuration option has an invalid value.
    #[error("invalid configuration option '{option}': {reason}")]
    InvalidOption {
        /// The name of the invalid option.
        option: String,
        /// Explanation of why the option is invalid.
        reason: String,
    },

    /// The configuration file could not be read.
    #[error("failed to read configuration {path}: {source}")]
    Read {
        /// The configuration file path.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse the configuration file.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ConfigError {
    /// Creates a new [`ConfigError::InvalidOption`] error.
    #[must_use]
    pub fn invalid_option(option: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidOption {
            option: option.into(),
            reason: reason.into(),
        }
    }
}
