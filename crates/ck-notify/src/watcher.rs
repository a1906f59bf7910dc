//! Filesystem watcher producing save events.
//!
//! When the bridge is not driven by editor callbacks, file writes under the
//! watched roots stand in for "saved" events. [`FileWatcher`] runs the
//! synchronous `notify` watcher on a blocking thread and streams
//! [`EditorEvent`]s to async code.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Blocking Thread (spawn_blocking)             │
//! │  ┌──────────────────┐    ┌────────────────┐    ┌────────────┐  │
//! │  │ RecommendedWatcher│ -> │ Debouncer      │ -> │ Callback   │  │
//! │  │ (notify)         │    │ (100ms window) │    │ (filtering)│  │
//! │  └──────────────────┘    └────────────────┘    └─────┬──────┘  │
//! └──────────────────────────────────────────────────────│─────────┘
//!                                          blocking_send │
//!                                                        ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Async Runtime (tokio)                        │
//! │  FileWatcher (shutdown ctrl) ── mpsc::Receiver<EditorEvent>     │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The 100ms window only batches bursts of raw filesystem events into one
//! change per file. It is unrelated to the per-path notification cooldown.

use std::time::Duration;

use camino::Utf8PathBuf;
use ck_core::WatchConfig;
use notify::RecursiveMode;
use notify_debouncer_mini::{new_debouncer, DebounceEventResult, Debouncer};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::error::NotifyError;
use crate::events::EditorEvent;
use crate::filter::FileFilter;

/// Default channel capacity for file events.
const DEFAULT_CHANNEL_CAPACITY: usize = 100;

/// A watcher over one or more directories that streams save events.
///
/// Dropping the watcher sends the shutdown signal; [`FileWatcher::shutdown`]
/// also waits for the blocking task to finish.
///
/// # Examples
///
/// ```no_run
/// use ck_notify::{AcceptAllFilter, FileWatcher};
/// use ck_core::WatchConfig;
/// use camino::Utf8PathBuf;
///
/// # async fn example() -> Result<(), ck_notify::NotifyError> {
/// let roots = vec![Utf8PathBuf::from("/Users/me/Sites/blog")];
/// let mut watcher = FileWatcher::new(&roots, &WatchConfig::default(), AcceptAllFilter).await?;
///
/// while let Some(event) = watcher.recv().await {
///     println!("Saved: {}", event.path);
/// }
/// # Ok(())
/// # }
/// ```
pub struct FileWatcher {
    /// Shutdown signal sender. `None` after shutdown is initiated.
    shutdown_tx: Option<oneshot::Sender<()>>,

    /// Handle to the blocking watcher task.
    task_handle: Option<JoinHandle<Result<(), NotifyError>>>,

    /// Event receiver for async consumption.
    event_rx: mpsc::Receiver<EditorEvent>,

    /// Canonicalized watched directories.
    watch_paths: Vec<Utf8PathBuf>,
}

impl std::fmt::Debug for FileWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileWatcher")
            .field("watch_paths", &self.watch_paths)
            .field("is_running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl FileWatcher {
    /// Starts watching the given directories.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::PathNotFound`] if a path doesn't exist and
    /// [`NotifyError::Io`] if it cannot be canonicalized. Failures of the
    /// underlying watcher surface from [`FileWatcher::shutdown`].
    #[allow(clippy::unused_async)] // Async for API consistency with shutdown()
    pub async fn new<F: FileFilter>(
        paths: &[Utf8PathBuf],
        config: &WatchConfig,
        filter: F,
    ) -> Result<Self, NotifyError> {
        Self::with_capacity(paths, config, filter, DEFAULT_CHANNEL_CAPACITY).await
    }

    /// Starts watching with a custom event channel capacity.
    #[allow(clippy::unused_async)] // Async for API consistency with shutdown()
    pub async fn with_capacity<F: FileFilter>(
        paths: &[Utf8PathBuf],
        config: &WatchConfig,
        filter: F,
        channel_capacity: usize,
    ) -> Result<Self, NotifyError> {
        let mut watch_paths = Vec::with_capacity(paths.len());
        for path in paths {
            if !path.exists() {
                return Err(NotifyError::path_not_found(path.as_path()));
            }
            watch_paths.push(path.canonicalize_utf8()?);
        }

        let (event_tx, event_rx) = mpsc::channel(channel_capacity);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let task_paths = watch_paths.clone();
        let debounce_ms = config.debounce_ms;
        let recursive = config.recursive;

        let task_handle = tokio::task::spawn_blocking(move || {
            run_watcher_loop(
                &task_paths,
                debounce_ms,
                recursive,
                event_tx,
                shutdown_rx,
                filter,
            )
        });

        Ok(Self {
            shutdown_tx: Some(shutdown_tx),
            task_handle: Some(task_handle),
            event_rx,
            watch_paths,
        })
    }

    /// Receives the next save event.
    ///
    /// Returns `None` once the watcher has stopped.
    pub async fn recv(&mut self) -> Option<EditorEvent> {
        self.event_rx.recv().await
    }

    /// Returns the canonicalized watched directories.
    #[must_use]
    pub fn watch_paths(&self) -> &[Utf8PathBuf] {
        &self.watch_paths
    }

    /// Returns `true` while the blocking task is alive.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.shutdown_tx.is_some() && self.task_handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stops the watcher and waits for the blocking task.
    ///
    /// # Errors
    ///
    /// Returns the watcher thread's error, or [`NotifyError::ChannelClosed`]
    /// if the thread panicked.
    pub async fn shutdown(mut self) -> Result<(), NotifyError> {
        if let Some(tx) = self.shutdown_tx.take() {
            // Receiver may already be gone if the task exited early
            let _ = tx.send(());
        }

        if let Some(handle) = self.task_handle.take() {
            match handle.await {
                Ok(result) => result?,
                Err(_join_error) => return Err(NotifyError::ChannelClosed),
            }
        }

        Ok(())
    }
}

impl Drop for FileWatcher {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Converts a raw notify path into a save event, or `None` to skip it.
fn save_event<F: FileFilter>(path: std::path::PathBuf, filter: &F) -> Option<EditorEvent> {
    let utf8_path = match Utf8PathBuf::try_from(path) {
        Ok(p) => p,
        Err(e) => {
            let error = NotifyError::NonUtf8Path(e.into_path_buf());
            tracing::warn!(error = %error, "Skipping file event");
            return None;
        }
    };

    // Directory mtime changes accompany every file write
    if utf8_path.is_dir() {
        return None;
    }

    if !filter.should_process(&utf8_path) {
        tracing::trace!(path = %utf8_path, "Filtered out file event");
        return None;
    }

    Some(EditorEvent::saved(utf8_path))
}

/// Runs the notify watcher in a blocking context until shutdown.
#[allow(clippy::needless_pass_by_value)] // Channels must be owned for the blocking task lifetime
fn run_watcher_loop<F: FileFilter>(
    paths: &[Utf8PathBuf],
    debounce_ms: u64,
    recursive: bool,
    event_tx: mpsc::Sender<EditorEvent>,
    shutdown_rx: oneshot::Receiver<()>,
    filter: F,
) -> Result<(), NotifyError> {
    let timeout = Duration::from_millis(debounce_ms);

    let tx = event_tx;
    let mut debouncer: Debouncer<notify::RecommendedWatcher> =
        new_debouncer(timeout, move |res: DebounceEventResult| match res {
            Ok(events) => {
                for event in events {
                    let Some(editor_event) = save_event(event.path, &filter) else {
                        continue;
                    };
                    if tx.blocking_send(editor_event).is_err() {
                        tracing::debug!("Event channel closed, stopping watcher");
                        break;
                    }
                }
            }
            Err(error) => tracing::warn!(error = %error, "Debouncer error"),
        })?;

    let mode = if recursive {
        RecursiveMode::Recursive
    } else {
        RecursiveMode::NonRecursive
    };

    for path in paths {
        debouncer.watcher().watch(path.as_std_path(), mode)?;
        tracing::info!(path = %path, recursive, "Watching directory");
    }

    let _ = shutdown_rx.blocking_recv();

    tracing::info!(paths = paths.len(), "File watcher stopped");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;
    use crate::filter::{AcceptAllFilter, ExtensionFilter};
    use camino::Utf8Path;
    use std::fs;
    use tempfile::TempDir;

    fn create_temp_dir() -> (TempDir, Utf8PathBuf) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = Utf8Path::from_path(temp_dir.path())
            .expect("Invalid path")
            .to_path_buf();
        (temp_dir, path)
    }

    #[tokio::test]
    async fn test_watcher_creation() {
        let (_temp_dir, path) = create_temp_dir();

        let watcher = FileWatcher::new(&[path], &WatchConfig::default(), AcceptAllFilter)
            .await
            .expect("Watcher should be created");

        assert!(watcher.is_running());
        assert_eq!(watcher.watch_paths().len(), 1);
        watcher.shutdown().await.expect("Shutdown failed");
    }

    #[tokio::test]
    async fn test_watcher_path_not_found() {
        let path = Utf8PathBuf::from("/nonexistent/path/that/does/not/exist");

        let result = FileWatcher::new(&[path], &WatchConfig::default(), AcceptAllFilter).await;

        match result {
            Err(NotifyError::PathNotFound(_)) => {}
            other => panic!("Expected PathNotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_watcher_multiple_roots() {
        let (_a, path_a) = create_temp_dir();
        let (_b, path_b) = create_temp_dir();

        let watcher = FileWatcher::with_capacity(
            &[path_a.clone(), path_b],
            &WatchConfig::default(),
            AcceptAllFilter,
            10,
        )
        .await
        .expect("Failed to create watcher");

        assert_eq!(watcher.watch_paths().len(), 2);
        let canonical_a = path_a.canonicalize_utf8().expect("canonicalize");
        assert_eq!(watcher.watch_paths()[0], canonical_a);
        watcher.shutdown().await.expect("Shutdown failed");
    }

    #[tokio::test]
    async fn test_watcher_receives_save_events() {
        let (temp_dir, path) = create_temp_dir();

        let config = WatchConfig {
            debounce_ms: 50,
            recursive: true,
        };

        let mut watcher = FileWatcher::new(&[path], &config, ExtensionFilter::new(&["scss"]))
            .await
            .expect("Failed to create watcher");

        fs::write(temp_dir.path().join("site.scss"), "body {}").expect("Failed to write file");

        let event = tokio::time::timeout(Duration::from_secs(2), watcher.recv()).await;

        watcher.shutdown().await.expect("Shutdown failed");

        // Timing-dependent on some CI filesystems
        if let Ok(Some(event)) = event {
            assert_eq!(event.kind, EventKind::Saved);
            assert_eq!(event.file_name(), Some("site.scss"));
        }
    }

    #[test]
    fn test_save_event_filters() {
        let (temp_dir, path) = create_temp_dir();
        let file = path.join("app.js");
        fs::write(&file, "").expect("Failed to write file");

        let filter = ExtensionFilter::new(&["js"]);
        let event = save_event(file.clone().into_std_path_buf(), &filter).expect("accepted");
        assert_eq!(event.path, file);
        assert_eq!(event.kind, EventKind::Saved);

        // Directories and filtered files are skipped
        assert!(save_event(temp_dir.path().to_path_buf(), &AcceptAllFilter).is_none());
        assert!(save_event(path.join("a.css").into_std_path_buf(), &filter).is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_save_event_skips_non_utf8_path() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let path = std::path::PathBuf::from(OsStr::from_bytes(b"/proj/\xff\xfe.js"));
        assert!(save_event(path, &AcceptAllFilter).is_none());
    }
}
