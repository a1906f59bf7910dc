//! Configuration structures for codekit-bridge.
//!
//! This module provides configuration types for every component:
//!
//! - [`DebounceConfig`] - Per-path cooldown for outbound notifications
//! - [`BridgeConfig`] - How notifications reach the build tool
//! - [`FilterConfig`] - Which edited files are relevant
//! - [`WatchConfig`] - Filesystem watcher settings (debouncing, recursion)
//! - [`Config`] - Root configuration combining all settings
//!
//! All configuration types implement [`Default`], and every field is optional
//! when deserializing, so a configuration file only needs the values that
//! differ from the defaults.

use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::hash::FxHashSet;
use crate::path::{normalize_path, resolve_path};

/// Default cooldown before the same path may be notified again.
pub const DEFAULT_COOLDOWN_MS: u64 = 10_000;

/// Default name of the scripted build tool application.
pub const DEFAULT_APPLICATION: &str = "CodeKit";

/// How notifications are delivered to the build tool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum BridgeKind {
    /// Send an AppleScript event through `osascript`.
    #[default]
    #[serde(rename = "applescript")]
    AppleScript,
    /// Run a configured external command.
    #[serde(rename = "command")]
    Command,
    /// Only log what would have been sent.
    #[serde(rename = "log")]
    Log,
}

impl BridgeKind {
    /// Returns the configuration name of this bridge kind.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::AppleScript => "applescript",
            Self::Command => "command",
            Self::Log => "log",
        }
    }
}

/// Configuration for the notification debouncer.
///
/// # Examples
///
/// ```
/// use ck_core::DebounceConfig;
/// use std::time::Duration;
///
/// let config = DebounceConfig::default();
/// assert_eq!(config.cooldown(), Duration::from_secs(10));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct DebounceConfig {
    /// Cooldown window in milliseconds.
    ///
    /// A path notified within this window is not notified again.
    pub cooldown_ms: u64,

    /// Minimum time between sweeps of expired entries, in milliseconds.
    ///
    /// Sweeps only bound memory use; expiry is decided at lookup time.
    pub sweep_interval_ms: u64,
}

impl DebounceConfig {
    /// Returns the cooldown window as a [`Duration`].
    #[inline]
    #[must_use]
    pub const fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    /// Returns the sweep interval as a [`Duration`].
    #[inline]
    #[must_use]
    pub const fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            cooldown_ms: DEFAULT_COOLDOWN_MS,
            sweep_interval_ms: 60_000,
        }
    }
}

/// Configuration for the outbound bridge.
///
/// # Examples
///
/// ```
/// use ck_core::{BridgeConfig, BridgeKind};
///
/// let config = BridgeConfig::default();
/// assert_eq!(config.kind, BridgeKind::AppleScript);
/// assert_eq!(config.application, "CodeKit");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Delivery mechanism.
    pub kind: BridgeKind,

    /// Application name addressed by AppleScript events.
    pub application: String,

    /// Program and leading arguments for [`BridgeKind::Command`].
    ///
    /// The event kind and the path are appended as the final two arguments.
    pub command: Vec<String>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            kind: BridgeKind::AppleScript,
            application: DEFAULT_APPLICATION.to_owned(),
            command: Vec::new(),
        }
    }
}

/// Configuration for deciding which files are relevant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Resolve symlinks in roots and event paths before comparing them.
    pub resolve_symlinks: bool,

    /// File extensions to forward (without the leading dot).
    ///
    /// Empty means every extension is forwarded.
    pub extensions: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            resolve_symlinks: true,
            extensions: Vec::new(),
        }
    }
}

/// Configuration for the filesystem watcher.
///
/// # Examples
///
/// ```
/// use ck_core::WatchConfig;
///
/// let config = WatchConfig::default();
/// assert_eq!(config.debounce_ms, 100);
/// assert!(config.recursive);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Debounce window in milliseconds.
    ///
    /// Multiple file changes within this window are batched into a single event.
    pub debounce_ms: u64,

    /// Whether to watch subdirectories recursively.
    pub recursive: bool,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 100,
            recursive: true,
        }
    }
}

/// Root configuration for codekit-bridge.
///
/// # Examples
///
/// ```
/// use ck_core::Config;
///
/// let config = Config::from_json(r#"{"roots": ["/Users/me/Sites/blog"]}"#)?;
/// assert_eq!(config.roots.len(), 1);
/// assert_eq!(config.debounce.cooldown_ms, 10_000);
/// config.validate()?;
/// # Ok::<(), ck_core::ConfigError>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Watched root directories. Empty means every path is relevant.
    pub roots: Vec<Utf8PathBuf>,

    /// Notification debouncer configuration.
    pub debounce: DebounceConfig,

    /// Outbound bridge configuration.
    pub bridge: BridgeConfig,

    /// Relevance filter configuration.
    pub filter: FilterConfig,

    /// Filesystem watcher configuration.
    pub watch: WatchConfig,
}

impl Config {
    /// Parses a configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a JSON configuration file.
    pub fn from_file(path: &Utf8Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json(&contents)?;
        tracing::debug!(path = %path, roots = config.roots.len(), "Loaded configuration");
        Ok(config)
    }

    /// Checks that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::RelativeRoot`] for a relative watched root and
    /// [`ConfigError::InvalidOption`] for zero durations, an empty
    /// application name, or a missing command for [`BridgeKind::Command`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(root) = self.roots.iter().find(|root| !root.is_absolute()) {
            return Err(ConfigError::RelativeRoot(root.clone()));
        }

        if self.debounce.cooldown_ms == 0 {
            return Err(ConfigError::invalid_option(
                "debounce.cooldown_ms",
                "must be greater than zero",
            ));
        }

        if self.debounce.sweep_interval_ms == 0 {
            return Err(ConfigError::invalid_option(
                "debounce.sweep_interval_ms",
                "must be greater than zero",
            ));
        }

        if self.watch.debounce_ms == 0 {
            return Err(ConfigError::invalid_option(
                "watch.debounce_ms",
                "must be greater than zero",
            ));
        }

        match self.bridge.kind {
            BridgeKind::AppleScript if self.bridge.application.trim().is_empty() => {
                Err(ConfigError::invalid_option(
                    "bridge.application",
                    "must name the application to script",
                ))
            }
            BridgeKind::Command if self.bridge.command.is_empty() => Err(
                ConfigError::invalid_option("bridge.command", "required when kind is 'command'"),
            ),
            _ => Ok(()),
        }
    }

    /// Returns the watched roots, normalized and without duplicates.
    ///
    /// Roots are resolved through symlinks when
    /// [`FilterConfig::resolve_symlinks`] is set. Order is preserved.
    #[must_use]
    pub fn normalized_roots(&self) -> Vec<Utf8PathBuf> {
        let mut seen = FxHashSet::default();
        self.roots
            .iter()
            .map(|root| {
                if self.filter.resolve_symlinks {
                    resolve_path(root)
                } else {
                    normalize_path(root)
                }
            })
            .filter(|root| seen.insert(root.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debounce_config_defaults() {
        let config = DebounceConfig::default();
        assert_eq!(config.cooldown_ms, 10_000);
        assert_eq!(config.cooldown(), Duration::from_secs(10));
        assert_eq!(config.sweep_interval(), Duration::from_secs(60));
    }

    #[test]
    fn test_bridge_config_defaults() {
        let config = BridgeConfig::default();
        assert_eq!(config.kind, BridgeKind::AppleScript);
        assert_eq!(config.application, "CodeKit");
        assert!(config.command.is_empty());
    }

    #[test]
    fn test_filter_config_defaults() {
        let config = FilterConfig::default();
        assert!(config.resolve_symlinks);
        assert!(config.extensions.is_empty());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed = Config::from_json(&json).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_config_deserialize_with_missing_fields() {
        let json = r#"{"debounce": {"cooldown_ms": 2500}, "bridge": {"kind": "log"}}"#;
        let config = Config::from_json(json).unwrap();
        assert_eq!(config.debounce.cooldown_ms, 2500);
        assert_eq!(config.debounce.sweep_interval_ms, 60_000);
        assert_eq!(config.bridge.kind, BridgeKind::Log);
        assert_eq!(config.bridge.application, "CodeKit");
        assert_eq!(config.watch.debounce_ms, 100);
    }

    #[test]
    fn test_bridge_kind_serialization() {
        assert_eq!(
            serde_json::to_string(&BridgeKind::AppleScript).unwrap(),
            r#""applescript""#
        );
        assert_eq!(
            serde_json::to_string(&BridgeKind::Command).unwrap(),
            r#""command""#
        );
        assert_eq!(serde_json::to_string(&BridgeKind::Log).unwrap(), r#""log""#);
        assert_eq!(BridgeKind::Command.label(), "command");
    }

    #[test]
    fn test_validate_default_is_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_relative_root() {
        let config = Config {
            roots: vec![Utf8PathBuf::from("/abs"), Utf8PathBuf::from("rel/site")],
            ..Config::default()
        };
        match config.validate() {
            Err(ConfigError::RelativeRoot(root)) => assert_eq!(root, "rel/site"),
            other => panic!("Expected RelativeRoot, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_rejects_zero_cooldown() {
        let mut config = Config::default();
        config.debounce.cooldown_ms = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidOption { option, .. }) if option == "debounce.cooldown_ms"
        ));
    }

    #[test]
    fn test_validate_requires_command() {
        let mut config = Config::default();
        config.bridge.kind = BridgeKind::Command;
        assert!(config.validate().is_err());

        config.bridge.command = vec!["codekit-notify".to_owned()];
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_requires_application() {
        let mut config = Config::default();
        config.bridge.application = "  ".to_owned();
        assert!(config.validate().is_err());

        config.bridge.kind = BridgeKind::Log;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_normalized_roots_dedup() {
        let config = Config {
            roots: vec![
                Utf8PathBuf::from("/sites/blog/"),
                Utf8PathBuf::from("/sites/shop"),
                Utf8PathBuf::from("/sites/./blog"),
            ],
            filter: FilterConfig {
                resolve_symlinks: false,
                extensions: Vec::new(),
            },
            ..Config::default()
        };
        assert_eq!(
            config.normalized_roots(),
            vec![
                Utf8PathBuf::from("/sites/blog"),
                Utf8PathBuf::from("/sites/shop"),
            ]
        );
    }

    #[test]
    fn test_from_file_missing() {
        let result = Config::from_file(Utf8Path::new("/nonexistent/codekit-bridge.json"));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_from_file() {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp directory");
        let path = Utf8Path::from_path(temp_dir.path())
            .expect("Invalid path")
            .join("bridge.json");
        std::fs::write(&path, r#"{"roots": ["/sites/blog"], "filter": {"extensions": ["scss"]}}"#)
            .expect("Failed to write config");

        let config = Config::from_file(&path).expect("Failed to load config");
        assert_eq!(config.roots, vec![Utf8PathBuf::from("/sites/blog")]);
        assert_eq!(config.filter.extensions, vec!["scss"]);
        assert!(config.filter.resolve_symlinks);
    }
}
