//! Editor event gating and build tool notification.
//!
//! This crate decides which editor events reach the build tool and delivers
//! them. Every event passes through the same pipeline:
//!
//! ```text
//!  EditorEvent ──► WatchedRoots ──► FileFilter ──► NotificationDebouncer ──► Bridge
//!                  (path filter)    (extensions)   (10s per-path cooldown)    (osascript,
//!                                                                              command, log)
//! ```
//!
//! Events come from two places: lines written by the editor integration
//! (`focus <path>` or `save <path>`, parsed into [`EditorEvent`] with `str::parse`)
//! and, optionally, a [`FileWatcher`] that turns file writes into save
//! events.
//!
//! # Crate Dependencies
//!
//! ```text
//! ck-cli ──► ck-notify ──► ck-core
//! ```
//!
//! # Usage
//!
//! ```
//! use std::sync::Arc;
//! use camino::Utf8PathBuf;
//! use ck_notify::{
//!     EditorEvent, LogBridge, NotificationDebouncer, NotificationGate, Outcome, WatchedRoots,
//! };
//!
//! let roots = WatchedRoots::new([Utf8PathBuf::from("/Sites/blog")]);
//! let gate = NotificationGate::new(roots, Arc::new(NotificationDebouncer::default()), LogBridge);
//!
//! let event = EditorEvent::focused("/Sites/blog/css/site.scss");
//! assert_eq!(gate.handle(&event), Outcome::Forwarded);
//!
//! // A second event for the same file inside the cooldown is dropped
//! assert_eq!(gate.handle(&event), Outcome::Suppressed);
//! ```
//!
//! # Modules
//!
//! - [`error`]: Error types for watching and delivery
//! - [`events`]: Editor event types and line parsing
//! - [`filter`]: Watched roots and file filters
//! - [`debounce`]: Per-path notification cooldown
//! - [`bridge`]: Delivery to the build tool
//! - [`gate`]: The full decision pipeline
//! - [`watcher`]: Filesystem watcher producing save events

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod bridge;
pub mod debounce;
pub mod error;
pub mod events;
pub mod filter;
pub mod gate;
pub mod watcher;

pub use bridge::{
    bridge_from_config, AppleScriptBridge, Bridge, BridgeRequest, CommandBridge, LogBridge,
};
pub use debounce::{NotificationDebouncer, DEFAULT_COOLDOWN, DEFAULT_SWEEP_INTERVAL};
pub use error::{BridgeError, NotifyError};
pub use events::{EditorEvent, EventKind};
pub use filter::{
    filter_from_config, AcceptAllFilter, CompositeFilter, ExtensionFilter, FileFilter,
    WatchedRoots,
};
pub use gate::{GateStats, IgnoreReason, NotificationGate, Outcome};
pub use watcher::FileWatcher;
