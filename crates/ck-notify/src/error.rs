//! Error types for the ck-notify crate.
//!
//! - [`NotifyError`]: watcher setup, event parsing, and channel failures
//! - [`BridgeError`]: a notification could not be delivered to the build tool

use camino::Utf8PathBuf;

/// Errors that can occur while receiving editor events.
///
/// # Error Recovery Strategy
///
/// - **Watcher errors** ([`NotifyError::Watcher`]): Fatal - propagate immediately
/// - **Path not found** ([`NotifyError::PathNotFound`]): Fatal - roots must exist
/// - **Channel closed** ([`NotifyError::ChannelClosed`]): Fatal - communication broken
/// - **Non-UTF-8 path** ([`NotifyError::NonUtf8Path`]): Recoverable - skip the event
/// - **Invalid event** ([`NotifyError::InvalidEvent`]): Recoverable - skip the line
/// - **I/O errors** ([`NotifyError::Io`]): Fatal - propagate immediately
///
/// # Examples
///
/// ```
/// use ck_notify::NotifyError;
///
/// let err = NotifyError::invalid_event("open /a.js", "unknown event kind 'open'");
/// assert!(err.is_recoverable());
/// ```
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// Failed to initialize or operate the filesystem watcher.
    #[error("filesystem watcher error: {0}")]
    Watcher(#[from] notify::Error),

    /// A path to watch does not exist.
    #[error("path does not exist: {0}")]
    PathNotFound(Utf8PathBuf),

    /// The event channel was closed unexpectedly.
    #[error("event channel closed unexpectedly")]
    ChannelClosed,

    /// A path, or an inbound line carrying one, is not valid UTF-8.
    #[error("path is not valid UTF-8: {}", _0.display())]
    NonUtf8Path(std::path::PathBuf),

    /// An inbound event line could not be parsed.
    #[error("invalid editor event '{line}': {reason}")]
    InvalidEvent {
        /// The offending input.
        line: String,
        /// Why it was rejected.
        reason: String,
    },

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl NotifyError {
    /// Creates a new [`NotifyError::PathNotFound`] error.
    #[inline]
    pub fn path_not_found(path: impl Into<Utf8PathBuf>) -> Self {
        Self::PathNotFound(path.into())
    }

    /// Creates a [`NotifyError::NonUtf8Path`] for an undecodable event line.
    ///
    /// Invalid sequences are replaced with U+FFFD so the line can be logged.
    pub fn non_utf8_line(line: &[u8]) -> Self {
        Self::NonUtf8Path(std::path::PathBuf::from(
            String::from_utf8_lossy(line).trim_end().to_owned(),
        ))
    }

    /// Creates a new [`NotifyError::InvalidEvent`] error.
    #[inline]
    pub fn invalid_event(line: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidEvent {
            line: line.into(),
            reason: reason.into(),
        }
    }

    /// Returns `true` if processing can continue with the next event.
    #[inline]
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::NonUtf8Path(_) | Self::InvalidEvent { .. })
    }

    /// Returns `true` if this error is fatal (event processing should stop).
    #[inline]
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }
}

/// A notification could not be delivered to the build tool.
///
/// Delivery is best-effort: the caller logs these and moves on.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// The bridge program could not be started.
    #[error("failed to run {program}: {source}")]
    Spawn {
        /// The program that was run.
        program: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The bridge program ran but reported failure.
    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        /// The program that was run.
        program: String,
        /// Exit status description.
        status: String,
        /// Trimmed standard error output.
        stderr: String,
    },
}

impl BridgeError {
    /// Returns the program that failed.
    #[must_use]
    pub fn program(&self) -> &str {
        match self {
            Self::Spawn { program, .. } | Self::Failed { program, .. } => program,
        }
    }
}
