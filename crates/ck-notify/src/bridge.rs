//! Outbound notifications to the build tool.
//!
//! The [`Bridge`] trait is the seam between the decision logic and whatever
//! actually reaches the build tool. Delivery is best-effort: a failed call is
//! reported to the caller once and never retried here.
//!
//! | Bridge                | Delivery                                        |
//! |-----------------------|-------------------------------------------------|
//! | [`AppleScriptBridge`] | `osascript -e 'tell application "CodeKit" ...'` |
//! | [`CommandBridge`]     | `<program> <args...> <kind> <path>`             |
//! | [`LogBridge`]         | logs the request, sends nothing                 |

use std::process::{Command, Stdio};

use camino::{Utf8Path, Utf8PathBuf};
use ck_core::{BridgeConfig, BridgeKind, ConfigError};

use crate::error::BridgeError;
use crate::events::{EditorEvent, EventKind};

/// Program used to deliver AppleScript events.
const OSASCRIPT: &str = "osascript";

/// A notification to deliver to the build tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeRequest {
    /// Normalized path of the file.
    pub path: Utf8PathBuf,

    /// What happened to the file.
    pub kind: EventKind,
}

impl BridgeRequest {
    /// Creates a new request.
    #[must_use]
    pub fn new(path: impl Into<Utf8PathBuf>, kind: EventKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    /// Creates a request for an editor event, using `path` in place of the
    /// event's raw path.
    #[must_use]
    pub fn for_event(event: &EditorEvent, path: &Utf8Path) -> Self {
        Self::new(path, event.kind)
    }
}

/// Delivers notifications to the build tool.
///
/// Implementations must be [`Send`] and [`Sync`]; the gate calls them from
/// whichever thread handled the event.
pub trait Bridge: Send + Sync + 'static {
    /// Delivers one notification.
    fn notify(&self, request: &BridgeRequest) -> Result<(), BridgeError>;
}

impl<B: Bridge + ?Sized> Bridge for Box<B> {
    fn notify(&self, request: &BridgeRequest) -> Result<(), BridgeError> {
        (**self).notify(request)
    }
}

impl<B: Bridge + ?Sized> Bridge for std::sync::Arc<B> {
    fn notify(&self, request: &BridgeRequest) -> Result<(), BridgeError> {
        (**self).notify(request)
    }
}

/// Sends AppleScript events to a scriptable application.
///
/// Focus events select the project that contains the file; save events ask
/// the application to refresh that project.
///
/// # Examples
///
/// ```
/// use ck_notify::{AppleScriptBridge, BridgeRequest, EventKind};
///
/// let bridge = AppleScriptBridge::new("CodeKit");
/// let script = bridge.script(&BridgeRequest::new("/Sites/blog/a.js", EventKind::Focused));
/// assert_eq!(
///     script,
///     r#"tell application "CodeKit" to select project containing path "/Sites/blog/a.js""#,
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppleScriptBridge {
    application: String,
}

impl AppleScriptBridge {
    /// Creates a bridge addressing the named application.
    #[must_use]
    pub fn new(application: impl Into<String>) -> Self {
        Self {
            application: application.into(),
        }
    }

    /// Returns the AppleScript source sent for `request`.
    #[must_use]
    pub fn script(&self, request: &BridgeRequest) -> String {
        let verb = match request.kind {
            EventKind::Focused => "select",
            EventKind::Saved => "refresh",
        };
        format!(
            "tell application \"{}\" to {verb} project containing path \"{}\"",
            escape_applescript(&self.application),
            escape_applescript(request.path.as_str()),
        )
    }
}

impl Bridge for AppleScriptBridge {
    fn notify(&self, request: &BridgeRequest) -> Result<(), BridgeError> {
        let mut command = Command::new(OSASCRIPT);
        command.arg("-e").arg(self.script(request));
        run(command, OSASCRIPT)
    }
}

/// Runs an external program for every notification.
///
/// The configured arguments are followed by the event kind (`focus` or
/// `save`) and the path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandBridge {
    program: String,
    args: Vec<String>,
}

impl CommandBridge {
    /// Creates a bridge from a program and its leading arguments.
    #[must_use]
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Creates a bridge from an argv-style list. Returns `None` when empty.
    #[must_use]
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self::new(program.clone(), args.to_vec()))
    }

    /// Returns the full argument list passed for `request`.
    #[must_use]
    pub fn arguments(&self, request: &BridgeRequest) -> Vec<String> {
        let mut args = self.args.clone();
        args.push(request.kind.label().to_owned());
        args.push(request.path.to_string());
        args
    }
}

impl Bridge for CommandBridge {
    fn notify(&self, request: &BridgeRequest) -> Result<(), BridgeError> {
        let mut command = Command::new(&self.program);
        command.args(self.arguments(request));
        run(command, &self.program)
    }
}

/// Logs requests instead of delivering them.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogBridge;

impl Bridge for LogBridge {
    fn notify(&self, request: &BridgeRequest) -> Result<(), BridgeError> {
        tracing::info!(path = %request.path, kind = %request.kind, "Would notify build tool");
        Ok(())
    }
}

/// Builds the bridge described by the configuration.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidOption`] when the command bridge is selected
/// without a command.
pub fn bridge_from_config(config: &BridgeConfig) -> Result<Box<dyn Bridge>, ConfigError> {
    let bridge: Box<dyn Bridge> = match config.kind {
        BridgeKind::Command => Box::new(CommandBridge::from_argv(&config.command).ok_or_else(
            || ConfigError::invalid_option("bridge.command", "required when kind is 'command'"),
        )?),
        BridgeKind::Log => Box::new(LogBridge),
        // Unknown future kinds fall back to AppleScript, the historical transport
        _ => Box::new(AppleScriptBridge::new(config.application.clone())),
    };
    tracing::debug!(kind = config.kind.label(), "Configured bridge");
    Ok(bridge)
}

/// Escapes a string for use inside an AppleScript string literal.
fn escape_applescript(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Runs a bridge command to completion, mapping failure to [`BridgeError`].
fn run(mut command: Command, program: &str) -> Result<(), BridgeError> {
    command.stdin(Stdio::null());

    let output = command.output().map_err(|source| BridgeError::Spawn {
        program: program.to_owned(),
        source,
    })?;

    if output.status.success() {
        return Ok(());
    }

    Err(BridgeError::Failed {
        program: program.to_owned(),
        status: output.status.to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
    })
}
