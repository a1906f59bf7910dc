//! Editor event types.
//!
//! An [`EditorEvent`] is what the host editor reports: a file was focused or
//! saved. Events are delivered zero or more times per user action with no
//! ordering or deduplication guarantee; deduplication happens downstream in
//! the [`NotificationDebouncer`](crate::NotificationDebouncer).
//!
//! # Event Flow
//!
//! ```text
//! host callback / stdin line / filesystem change
//!        │
//!        ▼
//!   EditorEvent created
//!        │
//!        ▼
//!   NotificationGate::handle
//! ```

use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::error::NotifyError;

/// What happened to the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A text view showing the file gained focus.
    Focused,
    /// The file was written to disk.
    Saved,
}

impl EventKind {
    /// Returns the short wire name (`focus` or `save`).
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Focused => "focus",
            Self::Saved => "save",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for EventKind {
    type Err = NotifyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "focus" | "focused" => Ok(Self::Focused),
            "save" | "saved" => Ok(Self::Saved),
            other => Err(NotifyError::invalid_event(
                s,
                format!("unknown event kind '{other}'"),
            )),
        }
    }
}

/// A file event reported by the editor.
///
/// # Examples
///
/// ```
/// use ck_notify::{EditorEvent, EventKind};
///
/// let event: EditorEvent = "save /Users/me/Sites/blog/css/site.scss".parse()?;
/// assert_eq!(event.kind, EventKind::Saved);
/// assert_eq!(event.extension(), Some("scss"));
/// # Ok::<(), ck_notify::NotifyError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorEvent {
    /// The path of the file the event refers to.
    pub path: Utf8PathBuf,

    /// What happened to the file.
    pub kind: EventKind,

    /// When the event was received.
    ///
    /// This is the instant the debouncer compares against.
    pub timestamp: Instant,
}

impl EditorEvent {
    /// Creates an event stamped with the current instant.
    #[inline]
    #[must_use]
    pub fn new(path: impl Into<Utf8PathBuf>, kind: EventKind) -> Self {
        Self::with_timestamp(path, kind, Instant::now())
    }

    /// Creates an event with a specific timestamp.
    #[inline]
    #[must_use]
    pub fn with_timestamp(path: impl Into<Utf8PathBuf>, kind: EventKind, timestamp: Instant) -> Self {
        Self {
            path: path.into(),
            kind,
            timestamp,
        }
    }

    /// Creates a [`EventKind::Focused`] event stamped now.
    #[inline]
    #[must_use]
    pub fn focused(path: impl Into<Utf8PathBuf>) -> Self {
        Self::new(path, EventKind::Focused)
    }

    /// Creates a [`EventKind::Saved`] event stamped now.
    #[inline]
    #[must_use]
    pub fn saved(path: impl Into<Utf8PathBuf>) -> Self {
        Self::new(path, EventKind::Saved)
    }

    /// Returns the file extension, if any.
    #[inline]
    #[must_use]
    pub fn extension(&self) -> Option<&str> {
        self.path.extension()
    }

    /// Returns the file name without the directory path.
    #[inline]
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name()
    }

    /// Returns the event path.
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Parses a raw `<kind> <path>` line as read from a byte stream.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::NonUtf8Path`] if the line is not valid UTF-8,
    /// or [`NotifyError::InvalidEvent`] if it does not parse. Both are
    /// recoverable: the caller skips the line.
    ///
    /// # Examples
    ///
    /// ```
    /// use ck_notify::{EditorEvent, NotifyError};
    ///
    /// assert!(EditorEvent::from_bytes(b"focus /proj/a.js\n").is_ok());
    /// assert!(matches!(
    ///     EditorEvent::from_bytes(b"focus /proj/\xff.js"),
    ///     Err(NotifyError::NonUtf8Path(_))
    /// ));
    /// ```
    pub fn from_bytes(line: &[u8]) -> Result<Self, NotifyError> {
        std::str::from_utf8(line)
            .map_err(|_| NotifyError::non_utf8_line(line))?
            .parse()
    }
}

/// Parses a `<kind> <path>` line.
///
/// The kind is the first whitespace-separated word; the path is the rest of
/// the line with surrounding whitespace trimmed, so it may contain spaces.
impl FromStr for EditorEvent {
    type Err = NotifyError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let trimmed = line.trim();
        let Some((kind, path)) = trimmed.split_once(char::is_whitespace) else {
            return Err(NotifyError::invalid_event(trimmed, "expected '<kind> <path>'"));
        };

        let path = path.trim();
        if path.is_empty() {
            return Err(NotifyError::invalid_event(trimmed, "missing path"));
        }

        Ok(Self::new(path, kind.parse()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_event_kind_parse() {
        assert_eq!("focus".parse::<EventKind>().unwrap(), EventKind::Focused);
        assert_eq!("Focused".parse::<EventKind>().unwrap(), EventKind::Focused);
        assert_eq!("save".parse::<EventKind>().unwrap(), EventKind::Saved);
        assert_eq!("SAVED".parse::<EventKind>().unwrap(), EventKind::Saved);
        assert!("open".parse::<EventKind>().is_err());
    }

    #[test]
    fn test_event_kind_display() {
        assert_eq!(EventKind::Focused.to_string(), "focus");
        assert_eq!(EventKind::Saved.to_string(), "save");
    }

    #[test]
    fn test_event_parse_line() {
        let event: EditorEvent = "focus /Users/me/Sites/blog/index.html".parse().unwrap();
        assert_eq!(event.kind, EventKind::Focused);
        assert_eq!(event.path, "/Users/me/Sites/blog/index.html");
    }

    #[test]
    fn test_event_parse_path_with_spaces() {
        let event: EditorEvent = "  save   /Users/me/My Sites/a b.js  \n".parse().unwrap();
        assert_eq!(event.kind, EventKind::Saved);
        assert_eq!(event.path, "/Users/me/My Sites/a b.js");
    }

    #[test]
    fn test_event_parse_errors() {
        assert!("".parse::<EditorEvent>().is_err());
        assert!("save".parse::<EditorEvent>().is_err());
        assert!("save    ".parse::<EditorEvent>().is_err());
        assert!("touch /a.js".parse::<EditorEvent>().is_err());
    }

    #[test]
    fn test_event_from_bytes() {
        let event = EditorEvent::from_bytes(b"save /proj/css/site.scss\r\n").unwrap();
        assert_eq!(event.kind, EventKind::Saved);
        assert_eq!(event.path, "/proj/css/site.scss");

        let err = EditorEvent::from_bytes(b"focus /proj/\xff\xfe.js").unwrap_err();
        assert!(matches!(err, NotifyError::NonUtf8Path(_)));
        assert!(err.is_recoverable());

        let err = EditorEvent::from_bytes(b"open /proj/a.js").unwrap_err();
        assert!(matches!(err, NotifyError::InvalidEvent { .. }));
    }

    #[test]
    fn test_event_accessors() {
        let event = EditorEvent::saved("/proj/css/site.scss");
        assert_eq!(event.extension(), Some("scss"));
        assert_eq!(event.file_name(), Some("site.scss"));
        assert_eq!(event.path().as_str(), "/proj/css/site.scss");

        let no_ext = EditorEvent::focused("/proj/Makefile");
        assert_eq!(no_ext.extension(), None);
    }

    #[test]
    fn test_event_with_timestamp() {
        let t0 = Instant::now();
        let later = t0 + Duration::from_secs(2);
        let event = EditorEvent::with_timestamp("/proj/a.js", EventKind::Focused, later);
        assert_eq!(event.timestamp, later);
    }
}
