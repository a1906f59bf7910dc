//! Core types, errors, and utilities for codekit-bridge.
//!
//! This crate provides the foundational pieces used across the workspace:
//!
//! - [`Config`] and its sections, loaded from JSON with defaults everywhere
//! - [`ConfigError`] for configuration loading and validation failures
//! - Path normalization and the [`is_path_a_child_of_path`] containment check
//! - Type aliases for `FxHashMap`/`FxHashSet` (faster than std)
//!
//! # Crate Dependencies
//!
//! ```text
//! ck-cli ──► ck-notify ──► ck-core
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod hash;
pub mod path;

pub use config::{
    BridgeConfig, BridgeKind, Config, DebounceConfig, DEFAULT_APPLICATION, DEFAULT_COOLDOWN_MS,
    FilterConfig, WatchConfig,
};
pub use error::ConfigError;
pub use hash::{FxHashMap, FxHashSet};
pub use path::{is_path_a_child_of_path, normalize_path, resolve_path};
