//! Per-path notification debouncing.
//!
//! When the editor is in the background and the user brings it forward by
//! picking a file, the host reports two focus events for the same file
//! within the same instant. Forwarding both would fire two scripting events
//! at the build tool. [`NotificationDebouncer`] remembers every path it let
//! through and suppresses that path again until the cooldown (10 seconds by
//! default) has passed.
//!
//! # Expiry
//!
//! Entries are never removed by a timer. Whether an entry is still live is
//! decided when the path is looked up. To keep long sessions from
//! accumulating stale paths, expired entries are swept opportunistically
//! from inside [`NotificationDebouncer::should_notify`] at most once per
//! sweep interval.
//!
//! # Concurrency
//!
//! Lookup, comparison, and insertion happen under one [`Mutex`], so two
//! racing calls for the same path can never both return `true`.
//!
//! # Examples
//!
//! ```
//! use ck_notify::NotificationDebouncer;
//! use camino::Utf8Path;
//! use std::time::{Duration, Instant};
//!
//! let debouncer = NotificationDebouncer::default();
//! let path = Utf8Path::new("/proj/a.js");
//! let t0 = Instant::now();
//!
//! assert!(debouncer.should_notify(path, t0));
//! assert!(!debouncer.should_notify(path, t0 + Duration::from_secs(2)));
//! assert!(debouncer.should_notify(path, t0 + Duration::from_secs(11)));
//! ```

use std::time::{Duration, Instant};

use camino::{Utf8Path, Utf8PathBuf};
use ck_core::{DebounceConfig, FxHashMap};
use parking_lot::Mutex;

/// Default cooldown before a path may be notified again.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(10);

/// Default minimum time between sweeps of expired entries.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Default)]
struct DebounceState {
    /// Last notification instant per path.
    entries: FxHashMap<Utf8PathBuf, Instant>,

    /// When expired entries were last swept. `None` until the first call.
    last_sweep: Option<Instant>,
}

/// Tracks recently notified paths and suppresses repeats within a cooldown.
///
/// The debouncer is owned by whoever forwards notifications and shared by
/// handle (`Arc<NotificationDebouncer>`); it is never global state. All
/// methods take `&self`.
#[derive(Debug)]
pub struct NotificationDebouncer {
    cooldown: Duration,
    sweep_interval: Duration,
    state: Mutex<DebounceState>,
}

impl NotificationDebouncer {
    /// Creates a debouncer with the given cooldown.
    #[must_use]
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            state: Mutex::new(DebounceState::default()),
        }
    }

    /// Creates a debouncer from configuration.
    #[must_use]
    pub fn from_config(config: &DebounceConfig) -> Self {
        Self::new(config.cooldown()).with_sweep_interval(config.sweep_interval())
    }

    /// Sets the minimum time between sweeps of expired entries.
    #[must_use]
    pub fn with_sweep_interval(mut self, sweep_interval: Duration) -> Self {
        self.sweep_interval = sweep_interval;
        self
    }

    /// Returns the cooldown window.
    #[inline]
    #[must_use]
    pub const fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Decides whether `path` should be notified at `now`, and records it if so.
    ///
    /// Returns `true` when there is no entry for `path` or the entry is at
    /// least one cooldown old; the entry is then set to `now` before the lock
    /// is released. Returns `false`, leaving state untouched, while an entry
    /// is live.
    ///
    /// A `now` earlier than the recorded instant (events delivered out of
    /// order) counts as no time elapsed.
    pub fn should_notify(&self, path: &Utf8Path, now: Instant) -> bool {
        let mut state = self.state.lock();
        self.maybe_sweep(&mut state, now);

        if let Some(&recorded) = state.entries.get(path) {
            if !self.is_expired(recorded, now) {
                tracing::trace!(
                    path = %path,
                    elapsed_ms = now.saturating_duration_since(recorded).as_millis(),
                    "Suppressing repeat notification"
                );
                return false;
            }
        }

        state.entries.insert(path.to_path_buf(), now);
        true
    }

    /// Removes entries whose cooldown has passed at `now`.
    ///
    /// Returns the number of entries removed.
    pub fn purge_expired(&self, now: Instant) -> usize {
        let mut state = self.state.lock();
        self.sweep(&mut state, now)
    }

    /// Drops the entry for `path`, so the next event for it is notified.
    ///
    /// Returns `true` if an entry existed.
    pub fn forget(&self, path: &Utf8Path) -> bool {
        self.state.lock().entries.remove(path).is_some()
    }

    /// Returns the number of entries still inside their cooldown at `now`.
    #[must_use]
    pub fn live_count(&self, now: Instant) -> usize {
        self.state
            .lock()
            .entries
            .values()
            .filter(|&&recorded| !self.is_expired(recorded, now))
            .count()
    }

    /// Returns the number of stored entries, expired or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    /// Returns `true` if no entries are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.lock().entries.is_empty()
    }

    /// Removes every entry.
    pub fn clear(&self) {
        self.state.lock().entries.clear();
    }

    #[inline]
    fn is_expired(&self, recorded: Instant, now: Instant) -> bool {
        now.saturating_duration_since(recorded) >= self.cooldown
    }

    fn maybe_sweep(&self, state: &mut DebounceState, now: Instant) {
        match state.last_sweep {
            None => state.last_sweep = Some(now),
            Some(last) if now.saturating_duration_since(last) >= self.sweep_interval => {
                let removed = self.sweep(state, now);
                if removed > 0 {
                    tracing::debug!(removed, remaining = state.entries.len(), "Swept expired entries");
                }
            }
            Some(_) => {}
        }
    }

    fn sweep(&self, state: &mut DebounceState, now: Instant) -> usize {
        let before = state.entries.len();
        state
            .entries
            .retain(|_, recorded| !self.is_expired(*recorded, now));
        state.last_sweep = Some(now);
        before - state.entries.len()
    }
}

impl Default for NotificationDebouncer {
    fn default() -> Self {
        Self::new(DEFAULT_COOLDOWN)
    }
}
