//! The notification gate: filter, debounce, forward.
//!
//! [`NotificationGate::handle`] runs one editor event through the whole
//! decision pipeline:
//!
//! ```text
//! EditorEvent ──► normalize ──► WatchedRoots ──► FileFilter ──► Debouncer ──► Bridge
//!                                   │                │              │           │
//!                                   ▼                ▼              ▼           ▼
//!                        Ignored(OutsideRoots) Ignored(Filtered) Suppressed  Forwarded /
//!                                                                            BridgeFailed
//! ```
//!
//! The gate only takes `&self`; wrap it in an `Arc` and call it from as many
//! threads as the host delivers events on.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use camino::Utf8PathBuf;
use ck_core::{normalize_path, resolve_path, Config, ConfigError};
use serde::{Deserialize, Serialize};

use crate::bridge::{bridge_from_config, Bridge, BridgeRequest};
use crate::debounce::NotificationDebouncer;
use crate::events::EditorEvent;
use crate::filter::{filter_from_config, AcceptAllFilter, CompositeFilter, FileFilter, WatchedRoots};

/// Why an event was not forwarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IgnoreReason {
    /// The path is empty or outside every watched root.
    OutsideRoots,
    /// The path was rejected by the additional file filter.
    Filtered,
}

/// What the gate did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The bridge accepted the notification.
    Forwarded,
    /// The path was notified within the cooldown window.
    Suppressed,
    /// The path is not relevant.
    Ignored(IgnoreReason),
    /// The bridge was called and failed. The cooldown entry stays in place.
    BridgeFailed,
}

impl Outcome {
    /// Returns `true` if a notification went out successfully.
    #[inline]
    #[must_use]
    pub const fn is_forwarded(self) -> bool {
        matches!(self, Self::Forwarded)
    }

    /// Returns a short label for logs and summaries.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Forwarded => "forwarded",
            Self::Suppressed => "suppressed",
            Self::Ignored(IgnoreReason::OutsideRoots) => "ignored (outside roots)",
            Self::Ignored(IgnoreReason::Filtered) => "ignored (filtered)",
            Self::BridgeFailed => "bridge failed",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Counts of gate outcomes since creation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateStats {
    /// Events forwarded to the bridge successfully.
    pub forwarded: u64,
    /// Events suppressed by the debouncer.
    pub suppressed: u64,
    /// Events ignored as irrelevant.
    pub ignored: u64,
    /// Events whose bridge call failed.
    pub failed: u64,
}

impl GateStats {
    /// Returns the total number of events handled.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.forwarded + self.suppressed + self.ignored + self.failed
    }
}

#[derive(Debug, Default)]
struct Counters {
    forwarded: AtomicU64,
    suppressed: AtomicU64,
    ignored: AtomicU64,
    failed: AtomicU64,
}

impl Counters {
    fn record(&self, outcome: Outcome) {
        let counter = match outcome {
            Outcome::Forwarded => &self.forwarded,
            Outcome::Suppressed => &self.suppressed,
            Outcome::Ignored(_) => &self.ignored,
            Outcome::BridgeFailed => &self.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> GateStats {
        GateStats {
            forwarded: self.forwarded.load(Ordering::Relaxed),
            suppressed: self.suppressed.load(Ordering::Relaxed),
            ignored: self.ignored.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Decides whether each editor event becomes a build tool notification.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use ck_notify::{EditorEvent, LogBridge, NotificationDebouncer, NotificationGate, Outcome, WatchedRoots};
///
/// let gate = NotificationGate::new(
///     WatchedRoots::new(["/Sites/blog"]),
///     Arc::new(NotificationDebouncer::default()),
///     LogBridge,
/// );
///
/// let event = EditorEvent::focused("/Sites/blog/index.html");
/// assert_eq!(gate.handle(&event), Outcome::Forwarded);
/// assert_eq!(gate.handle(&event), Outcome::Suppressed);
/// ```
pub struct NotificationGate<B, F = AcceptAllFilter> {
    roots: WatchedRoots,
    filter: F,
    debouncer: Arc<NotificationDebouncer>,
    bridge: B,
    resolve_symlinks: bool,
    counters: Counters,
}

impl<B: Bridge> NotificationGate<B> {
    /// Creates a gate with no extra filter and lexical path normalization.
    #[must_use]
    pub fn new(roots: WatchedRoots, debouncer: Arc<NotificationDebouncer>, bridge: B) -> Self {
        Self {
            roots,
            filter: AcceptAllFilter,
            debouncer,
            bridge,
            resolve_symlinks: false,
            counters: Counters::default(),
        }
    }
}

impl NotificationGate<Box<dyn Bridge>, CompositeFilter> {
    /// Builds a gate, its bridge, and its debouncer from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidOption`] if the bridge cannot be built.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let bridge = bridge_from_config(&config.bridge)?;
        let debouncer = Arc::new(NotificationDebouncer::from_config(&config.debounce));
        Ok(Self::from_config_with_bridge(config, bridge, debouncer))
    }
}

impl<B: Bridge> NotificationGate<B, CompositeFilter> {
    /// Builds a gate from configuration around an existing bridge and debouncer.
    #[must_use]
    pub fn from_config_with_bridge(
        config: &Config,
        bridge: B,
        debouncer: Arc<NotificationDebouncer>,
    ) -> Self {
        NotificationGate::new(WatchedRoots::from_config(config), debouncer, bridge)
            .with_filter(filter_from_config(config))
            .resolve_symlinks(config.filter.resolve_symlinks)
    }
}

impl<B: Bridge, F: FileFilter> NotificationGate<B, F> {
    /// Replaces the extra file filter applied after the root check.
    #[must_use]
    pub fn with_filter<G: FileFilter>(self, filter: G) -> NotificationGate<B, G> {
        NotificationGate {
            roots: self.roots,
            filter,
            debouncer: self.debouncer,
            bridge: self.bridge,
            resolve_symlinks: self.resolve_symlinks,
            counters: self.counters,
        }
    }

    /// Replaces the watched roots.
    ///
    /// Used when event paths come from a source that already canonicalized
    /// them, such as the filesystem watcher.
    #[must_use]
    pub fn with_roots(mut self, roots: WatchedRoots) -> Self {
        self.roots = roots;
        self
    }

    /// Resolves symlinks in event paths before checking them.
    #[must_use]
    pub fn resolve_symlinks(mut self, resolve: bool) -> Self {
        self.resolve_symlinks = resolve;
        self
    }

    /// Handles one editor event.
    ///
    /// The event's timestamp is the instant given to the debouncer. A bridge
    /// failure is logged and reported as [`Outcome::BridgeFailed`]; the path
    /// stays in its cooldown so an unavailable build tool is not hammered.
    pub fn handle(&self, event: &EditorEvent) -> Outcome {
        let outcome = self.decide(event);
        self.counters.record(outcome);
        outcome
    }

    fn decide(&self, event: &EditorEvent) -> Outcome {
        if event.path.as_str().is_empty() {
            tracing::debug!(kind = %event.kind, "Ignoring event with empty path");
            return Outcome::Ignored(IgnoreReason::OutsideRoots);
        }

        let path = self.normalize(event);

        if !self.roots.should_process(&path) {
            tracing::debug!(path = %path, kind = %event.kind, "Ignoring path outside watched roots");
            return Outcome::Ignored(IgnoreReason::OutsideRoots);
        }

        if !self.filter.should_process(&path) {
            tracing::debug!(path = %path, kind = %event.kind, "Ignoring filtered path");
            return Outcome::Ignored(IgnoreReason::Filtered);
        }

        if !self.debouncer.should_notify(&path, event.timestamp) {
            tracing::debug!(path = %path, kind = %event.kind, "Suppressed repeat notification");
            return Outcome::Suppressed;
        }

        let request = BridgeRequest::for_event(event, &path);
        match self.bridge.notify(&request) {
            Ok(()) => {
                tracing::info!(path = %path, kind = %event.kind, "Notified build tool");
                Outcome::Forwarded
            }
            Err(error) => {
                tracing::warn!(
                    path = %path,
                    kind = %event.kind,
                    program = error.program(),
                    error = %error,
                    "Build tool notification failed"
                );
                Outcome::BridgeFailed
            }
        }
    }

    fn normalize(&self, event: &EditorEvent) -> Utf8PathBuf {
        if self.resolve_symlinks {
            resolve_path(&event.path)
        } else {
            normalize_path(&event.path)
        }
    }

    /// Returns the watched roots.
    #[must_use]
    pub fn roots(&self) -> &WatchedRoots {
        &self.roots
    }

    /// Returns the shared debouncer handle.
    #[must_use]
    pub fn debouncer(&self) -> &Arc<NotificationDebouncer> {
        &self.debouncer
    }

    /// Returns outcome counts since the gate was created.
    #[must_use]
    pub fn stats(&self) -> GateStats {
        self.counters.snapshot()
    }
}

impl<B, F> fmt::Debug for NotificationGate<B, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationGate")
            .field("roots", &self.roots)
            .field("resolve_symlinks", &self.resolve_symlinks)
            .field("debouncer", &self.debouncer)
            .finish_non_exhaustive()
    }
}
