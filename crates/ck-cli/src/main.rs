//! CLI entry point for the editor to CodeKit bridge.
//!
//! This binary receives editor events (a file was focused or saved), drops
//! the ones outside the watched project roots, suppresses repeats for the
//! same file within the cooldown window, and forwards the rest to CodeKit.
//!
//! # Usage
//!
//! ```bash
//! codekit-bridge [OPTIONS] <COMMAND>
//!
//! # Read `focus <path>` / `save <path>` lines from the editor integration
//! codekit-bridge --root ~/Sites/blog listen
//!
//! # Treat file writes under the roots as saves
//! codekit-bridge --root ~/Sites/blog --root ~/Sites/shop watch
//!
//! # Send a single event
//! codekit-bridge --root ~/Sites/blog notify ~/Sites/blog/css/site.scss --kind save
//!
//! # Test the path containment rule
//! codekit-bridge check /proj/src/a.js /proj
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

use std::future::Future;
use std::io::Write;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use ck_core::{is_path_a_child_of_path, BridgeKind, Config};
use ck_notify::{
    filter_from_config, Bridge, CompositeFilter, EditorEvent, EventKind, FileWatcher, GateStats,
    NotificationGate, Outcome, WatchedRoots,
};
use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{bail, eyre};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::task::JoinSet;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Gate type built from configuration.
type ConfiguredGate = NotificationGate<Box<dyn Bridge>, CompositeFilter>;

// =============================================================================
// CLI ARGUMENT TYPES
// =============================================================================

/// Forwards editor focus and save events to CodeKit.
///
/// Events for files outside the watched roots are ignored, and each file is
/// notified at most once per cooldown window.
#[derive(Parser)]
#[command(name = "codekit-bridge", version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Command to execute.
    #[command(subcommand)]
    command: Commands,

    /// JSON configuration file.
    #[arg(short, long, global = true, env = "CODEKIT_BRIDGE_CONFIG")]
    config: Option<Utf8PathBuf>,

    /// Project root to watch. Repeatable.
    ///
    /// Replaces the roots from the configuration file. Relative roots are
    /// taken from the current directory.
    #[arg(
        short,
        long = "root",
        global = true,
        env = "CODEKIT_BRIDGE_ROOTS",
        value_delimiter = ','
    )]
    roots: Vec<Utf8PathBuf>,

    /// Per-file cooldown in milliseconds (default 10000).
    #[arg(long, global = true)]
    cooldown_ms: Option<u64>,

    /// How notifications reach the build tool.
    #[arg(long, global = true, value_enum)]
    bridge: Option<BridgeArg>,

    /// Program (and leading arguments) run by the command bridge. Repeatable.
    #[arg(long = "bridge-command", global = true, allow_hyphen_values = true)]
    bridge_command: Vec<String>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Read events from stdin, one `focus <path>` or `save <path>` per line.
    Listen {
        /// Print the final outcome counts as JSON.
        #[arg(long)]
        json_stats: bool,
    },

    /// Watch every root and forward file writes as save events.
    Watch {
        /// Print the final outcome counts as JSON.
        #[arg(long)]
        json_stats: bool,
    },

    /// Handle a single event and print its outcome.
    Notify {
        /// File the event is about.
        path: Utf8PathBuf,

        /// Event kind.
        #[arg(short, long, value_enum, default_value_t = KindArg::Focus)]
        kind: KindArg,
    },

    /// Print whether a path lies inside a parent directory.
    Check {
        /// Path to test.
        candidate: Utf8PathBuf,

        /// Directory that should contain it.
        parent: Utf8PathBuf,
    },
}

/// Bridge selection.
#[derive(Clone, Copy, ValueEnum)]
enum BridgeArg {
    /// AppleScript via `osascript`.
    Applescript,
    /// An external program.
    Command,
    /// Log only.
    Log,
}

impl From<BridgeArg> for BridgeKind {
    fn from(arg: BridgeArg) -> Self {
        match arg {
            BridgeArg::Applescript => Self::AppleScript,
            BridgeArg::Command => Self::Command,
            BridgeArg::Log => Self::Log,
        }
    }
}

/// Event kind for `notify`.
#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    /// The file was focused.
    Focus,
    /// The file was saved.
    Save,
}

impl From<KindArg> for EventKind {
    fn from(arg: KindArg) -> Self {
        match arg {
            KindArg::Focus => Self::Focused,
            KindArg::Save => Self::Saved,
        }
    }
}

// =============================================================================
// INITIALIZATION FUNCTIONS
// =============================================================================

/// Initializes the tracing subscriber for logging.
///
/// Respects the `RUST_LOG` environment variable if set. Otherwise, uses
/// `debug` level if `--verbose` is set, or `info` level by default.
/// Logs go to stderr so stdout only carries command output.
fn init_tracing(verbose: bool, no_color: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if verbose { "debug" } else { "info" };
        EnvFilter::new(format!("{level},mio=warn,notify=warn"))
    });

    // Check if colors should be disabled (flag or NO_COLOR env var)
    let use_ansi = !no_color && std::env::var("NO_COLOR").is_err();

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(use_ansi)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

/// Builds a [`Config`] from the configuration file and CLI overrides.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or if the merged
/// configuration is invalid.
fn build_config(cli: &Cli) -> color_eyre::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    if !cli.roots.is_empty() {
        config.roots = cli
            .roots
            .iter()
            .map(|root| absolutize(root))
            .collect::<color_eyre::Result<_>>()?;
    }
    if let Some(cooldown_ms) = cli.cooldown_ms {
        config.debounce.cooldown_ms = cooldown_ms;
    }
    if let Some(bridge) = cli.bridge {
        config.bridge.kind = bridge.into();
    }
    if !cli.bridge_command.is_empty() {
        config.bridge.command.clone_from(&cli.bridge_command);
    }

    config.validate()?;
    Ok(config)
}

/// Joins a relative path onto the current directory.
fn absolutize(path: &Utf8Path) -> color_eyre::Result<Utf8PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = Utf8PathBuf::try_from(std::env::current_dir()?)
        .map_err(|e| eyre!("Current directory is not valid UTF-8: {}", e))?;
    Ok(cwd.join(path))
}

// =============================================================================
// COMMAND IMPLEMENTATIONS
// =============================================================================

/// Reads editor events from stdin until EOF or Ctrl-C.
///
/// Each event is handled on the blocking pool so that events arriving close
/// together race through the gate the way concurrent host callbacks would.
///
/// # Errors
///
/// Returns an error if stdin fails or a handler task panics.
async fn run_listen(config: &Config, json_stats: bool) -> color_eyre::Result<()> {
    let gate = Arc::new(NotificationGate::from_config(config)?);
    info!(
        roots = gate.roots().len(),
        cooldown_ms = config.debounce.cooldown_ms,
        bridge = config.bridge.kind.label(),
        "Listening for editor events on stdin"
    );

    let mut tasks = JoinSet::new();
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl-C, shutting down");
    };

    pump_events(BufReader::new(tokio::io::stdin()), &gate, &mut tasks, shutdown).await?;
    finish(tasks, &gate, json_stats).await
}

/// Dispatches one event per input line until EOF or `shutdown` completes.
///
/// Lines are read as raw bytes. A line that is not valid UTF-8 or does not
/// parse is logged and skipped; later lines are still handled.
///
/// # Errors
///
/// Returns an error if reading fails or a handler task panics.
async fn pump_events<R, S>(
    reader: R,
    gate: &Arc<ConfiguredGate>,
    tasks: &mut JoinSet<Outcome>,
    shutdown: S,
) -> color_eyre::Result<()>
where
    R: AsyncBufRead + Unpin,
    S: Future<Output = ()>,
{
    let mut lines = reader.split(b'\n');
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            line = lines.next_segment() => {
                let Some(line) = line? else {
                    info!("Input closed");
                    break;
                };
                if line.iter().all(u8::is_ascii_whitespace) {
                    continue;
                }
                match EditorEvent::from_bytes(&line) {
                    Ok(event) => dispatch(tasks, gate, event),
                    Err(e) if e.is_fatal() => return Err(e.into()),
                    Err(e) => warn!(error = %e, "Skipping malformed event"),
                }
            }
            () = &mut shutdown => break,
        }

        while let Some(result) = tasks.try_join_next() {
            result?;
        }
    }

    Ok(())
}

/// Builds the gate for `watch`, rooted at the watcher's canonical paths.
///
/// The watcher reports canonicalized paths, so the gate must compare them
/// against canonicalized roots even when symlink resolution is disabled.
fn gate_for_watch(
    config: &Config,
    watch_paths: &[Utf8PathBuf],
) -> color_eyre::Result<ConfiguredGate> {
    Ok(NotificationGate::from_config(config)?.with_roots(WatchedRoots::new(watch_paths)))
}

/// Watches the configured roots and forwards file writes as saves.
///
/// # Errors
///
/// Returns an error if no roots are configured, a root cannot be watched, or
/// a handler task panics.
async fn run_watch(config: &Config, json_stats: bool) -> color_eyre::Result<()> {
    if config.roots.is_empty() {
        bail!("watch needs at least one --root");
    }

    let roots = config.normalized_roots();
    let mut watcher = FileWatcher::new(&roots, &config.watch, filter_from_config(config)).await?;
    let gate = Arc::new(gate_for_watch(config, watcher.watch_paths())?);
    info!(roots = roots.len(), "Watching for saves");

    let mut tasks = JoinSet::new();

    loop {
        tokio::select! {
            event = watcher.recv() => {
                let Some(event) = event else {
                    warn!("File watcher stopped unexpectedly");
                    break;
                };
                dispatch(&mut tasks, &gate, event);
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl-C, shutting down");
                break;
            }
        }

        while let Some(result) = tasks.try_join_next() {
            result?;
        }
    }

    watcher.shutdown().await?;
    finish(tasks, &gate, json_stats).await
}

/// Handles a single event and prints the outcome.
///
/// # Errors
///
/// Returns an error if the configuration is unusable or the bridge failed.
fn run_notify(config: &Config, path: &Utf8Path, kind: KindArg) -> color_eyre::Result<()> {
    let gate = NotificationGate::from_config(config)?;
    let event = EditorEvent::new(absolutize(path)?, kind.into());
    let outcome = gate.handle(&event);

    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle, "{outcome}")?;

    if outcome == Outcome::BridgeFailed {
        bail!("Build tool notification failed for {}", event.path);
    }
    Ok(())
}

/// Prints `true` if `candidate` lies inside `parent`, `false` otherwise.
fn run_check(candidate: &Utf8Path, parent: &Utf8Path) -> color_eyre::Result<()> {
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle, "{}", is_path_a_child_of_path(candidate, parent))?;
    Ok(())
}

/// Runs one event through the gate on the blocking pool.
fn dispatch(tasks: &mut JoinSet<Outcome>, gate: &Arc<ConfiguredGate>, event: EditorEvent) {
    let gate = Arc::clone(gate);
    tasks.spawn_blocking(move || gate.handle(&event));
}

/// Waits for in-flight events, then prints the outcome counts.
async fn finish(
    mut tasks: JoinSet<Outcome>,
    gate: &ConfiguredGate,
    json_stats: bool,
) -> color_eyre::Result<()> {
    while let Some(result) = tasks.join_next().await {
        result?;
    }
    print_stats_summary(&gate.stats(), json_stats)
}

// =============================================================================
// OUTPUT HELPERS
// =============================================================================

/// Prints a summary of gate outcomes.
fn print_stats_summary(stats: &GateStats, json: bool) -> color_eyre::Result<()> {
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();

    if json {
        let content = serde_json::to_string_pretty(stats)
            .map_err(|e| eyre!("Failed to serialize JSON: {}", e))?;
        writeln!(handle, "{content}")?;
        return Ok(());
    }

    writeln!(handle)?;
    writeln!(handle, "Notification Summary")?;
    writeln!(handle, "====================")?;
    writeln!(handle, "Events handled:  {}", stats.total())?;
    writeln!(handle, "  Forwarded:     {}", stats.forwarded)?;
    writeln!(handle, "  Suppressed:    {} (within cooldown)", stats.suppressed)?;
    writeln!(handle, "  Ignored:       {} (outside roots or filtered)", stats.ignored)?;
    writeln!(handle, "  Bridge failed: {}", stats.failed)?;
    Ok(())
}

// =============================================================================
// MAIN ENTRY POINT
// =============================================================================

/// Application entry point.
#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    // 1. Install color-eyre FIRST (before any potential panics)
    color_eyre::install()?;

    // 2. Parse CLI arguments
    let cli = Cli::parse();

    // 3. Initialize tracing (handles --no-color for log output)
    init_tracing(cli.verbose, cli.no_color);

    // 4. Route to appropriate command
    match &cli.command {
        Commands::Check { candidate, parent } => run_check(candidate, parent),
        Commands::Listen { json_stats } => {
            let config = build_config(&cli)?;
            run_listen(&config, *json_stats).await
        }
        Commands::Watch { json_stats } => {
            let config = build_config(&cli)?;
            run_watch(&config, *json_stats).await
        }
        Commands::Notify { path, kind } => {
            let config = build_config(&cli)?;
            run_notify(&config, path, *kind)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).expect("arguments should parse")
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_build_config_overrides() {
        let cli = parse(&[
            "codekit-bridge",
            "--root",
            "/Sites/blog",
            "--root",
            "/Sites/shop",
            "--cooldown-ms",
            "2500",
            "--bridge",
            "log",
            "listen",
        ]);

        let config = build_config(&cli).expect("valid config");
        assert_eq!(config.roots.len(), 2);
        assert_eq!(config.debounce.cooldown_ms, 2_500);
        assert_eq!(config.bridge.kind, BridgeKind::Log);
    }

    #[test]
    fn test_build_config_rejects_zero_cooldown() {
        let cli = parse(&["codekit-bridge", "--cooldown-ms", "0", "listen"]);
        assert!(build_config(&cli).is_err());
    }

    #[test]
    fn test_build_config_command_bridge() {
        let cli = parse(&["codekit-bridge", "--bridge", "command", "listen"]);
        assert!(build_config(&cli).is_err());

        let cli = parse(&[
            "codekit-bridge",
            "--bridge",
            "command",
            "--bridge-command",
            "notify-tool",
            "--bridge-command",
            "--quiet",
            "listen",
        ]);
        let config = build_config(&cli).expect("valid config");
        assert_eq!(config.bridge.command, vec!["notify-tool", "--quiet"]);
    }

    #[test]
    fn test_absolutize() {
        let absolute = Utf8Path::new("/Sites/blog");
        assert_eq!(absolutize(absolute).expect("absolute"), absolute);

        let relative = absolutize(Utf8Path::new("blog")).expect("relative");
        assert!(relative.is_absolute());
        assert!(relative.ends_with("blog"));
    }

    #[test]
    fn test_notify_kind_default() {
        let cli = parse(&["codekit-bridge", "notify", "/Sites/blog/a.js"]);
        match cli.command {
            Commands::Notify { kind, .. } => {
                assert_eq!(EventKind::from(kind), EventKind::Focused);
            }
            _ => panic!("Expected notify command"),
        }
    }

    fn log_gate(roots: Vec<Utf8PathBuf>) -> ConfiguredGate {
        let mut config = Config::default();
        config.roots = roots;
        config.bridge.kind = BridgeKind::Log;
        config.filter.resolve_symlinks = false;
        NotificationGate::from_config(&config).expect("valid config")
    }

    #[tokio::test]
    async fn test_pump_events_skips_bad_lines() {
        let gate = Arc::new(log_gate(vec![Utf8PathBuf::from("/proj")]));
        let mut tasks = JoinSet::new();
        let input: &[u8] =
            b"focus /proj/a.js\nfocus /proj/\xff\xfe.js\n\nopen /proj/c.js\nfocus /proj/b.js\n";

        pump_events(input, &gate, &mut tasks, std::future::pending())
            .await
            .expect("input should be consumed");
        while let Some(result) = tasks.join_next().await {
            result.expect("handler panicked");
        }

        let stats = gate.stats();
        assert_eq!(stats.forwarded, 2);
        assert_eq!(stats.total(), 2);
    }

    #[tokio::test]
    async fn test_pump_events_stops_on_shutdown() {
        let gate = Arc::new(log_gate(vec![Utf8PathBuf::from("/proj")]));
        let mut tasks = JoinSet::new();
        // Writer stays open, so only the shutdown future can end the loop
        let (_writer, reader) = tokio::io::duplex(64);

        pump_events(BufReader::new(reader), &gate, &mut tasks, async {})
            .await
            .expect("shutdown should end the loop");
        assert_eq!(gate.stats().total(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_gate_for_watch_uses_canonical_roots() {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp directory");
        let base = Utf8Path::from_path(temp_dir.path()).expect("Invalid path");
        let real = base.join("real");
        std::fs::create_dir(&real).expect("Failed to create dir");
        let link = base.join("link");
        std::os::unix::fs::symlink(&real, &link).expect("Failed to create symlink");

        let mut config = Config::default();
        config.roots = vec![link];
        config.bridge.kind = BridgeKind::Log;
        config.filter.resolve_symlinks = false;

        // The watcher reports paths under the canonical root
        let canonical = real.canonicalize_utf8().expect("Failed to canonicalize");
        let gate = gate_for_watch(&config, std::slice::from_ref(&canonical)).expect("valid config");
        assert_eq!(
            gate.handle(&EditorEvent::saved(canonical.join("site.scss"))),
            Outcome::Forwarded
        );
    }
}
