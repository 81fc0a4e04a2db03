//! Tracing initialization.
//! Builds a subscriber with EnvFilter, compact or JSON formatting on stderr, and optional file logging.
//!
//! Behavior:
//! - Log level is driven by LogLevel (no RUST_LOG override here).
//! - stdout is left to command output; logs always go to stderr.
//! - If `log_file` is provided and passes safety checks, a non-blocking file layer is added.
//!
//! Implementation notes:
//! - File logging uses tracing_appender::non_blocking; the returned guard must be held until exit.
//! - We refuse file logging if any ancestor of the file path is a symlink.

use anyhow::Result;
use chrono::Local;
use datum::LogLevel;
use datum::config::{default_log_path, path_has_symlink_ancestor};
use datum::output as out;
use std::fmt as stdfmt;
use std::fs::{File, OpenOptions};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt as tsfmt;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::{Layer, Layered, SubscriberExt};
use tracing_subscriber::registry::Registry;
use tracing_subscriber::util::SubscriberInitExt;

type Filtered = Layered<EnvFilter, Registry>;
type BoxedLayer = Box<dyn Layer<Filtered> + Send + Sync>;

/// Human-friendly timestamp formatter (DD/MM/YY HH:MM:SS)
struct LocalHumanTime;
impl FormatTime for LocalHumanTime {
    fn format_time(&self, w: &mut tsfmt::format::Writer<'_>) -> stdfmt::Result {
        write!(w, "{}", Local::now().format("%d/%m/%y %H:%M:%S"))
    }
}

fn env_filter_for(lvl: LogLevel) -> EnvFilter {
    let directive = match lvl {
        LogLevel::Quiet => "error",
        LogLevel::Normal => "info",
        LogLevel::Info => "debug",
        LogLevel::Debug => "trace",
    };
    EnvFilter::new(directive)
}

fn fmt_layer<W>(json: bool, ansi: bool, writer: W) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let base = tsfmt::layer()
        .with_timer(LocalHumanTime)
        .with_level(true)
        .with_target(true)
        .with_ansi(ansi)
        .with_writer(writer);
    if json {
        base.json().boxed()
    } else {
        base.compact().boxed()
    }
}

fn open_append(path: &Path) -> std::io::Result<File> {
    let mut opts = OpenOptions::new();
    opts.create(true).append(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        opts.mode(0o600);
    }
    opts.open(path)
}

/// Try to open the log file: refuse symlinked ancestors, create the parent, open for append.
fn maybe_open_log_file(path: &Path) -> Option<File> {
    match path_has_symlink_ancestor(path) {
        Ok(false) => {}
        Ok(true) => {
            out::print_warn(&format!(
                "Refusing to enable file logging: ancestor of {} is a symlink",
                path.display()
            ));
            return None;
        }
        Err(e) => {
            out::print_warn(&format!("Cannot check log path {}: {e}", path.display()));
            return None;
        }
    }
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    match open_append(path) {
        Ok(f) => Some(f),
        Err(e) => {
            out::print_warn(&format!("Failed to open log file {}: {e}", path.display()));
            None
        }
    }
}

/// Initialize tracing. Returns a WorkerGuard when a file layer is active.
pub fn init_tracing(lvl: LogLevel, log_file: Option<&Path>, json: bool) -> Result<Option<WorkerGuard>> {
    let stderr_ansi = atty::is(atty::Stream::Stderr);
    let mut layers: Vec<BoxedLayer> = vec![fmt_layer(json, stderr_ansi, std::io::stderr)];
    let mut guard = None;

    if let Some(path) = log_file {
        if let Some(file) = maybe_open_log_file(path) {
            let (writer, g) = tracing_appender::non_blocking(file);
            layers.push(fmt_layer(json, false, writer));
            guard = Some(g);
        } else if let Some(def) = default_log_path().filter(|d| d != path) {
            out::print_info(&format!(
                "Logs continue on stderr. The default log path may work instead: {}",
                def.display()
            ));
        }
    }

    Registry::default()
        .with(env_filter_for(lvl))
        .with(layers)
        .try_init()?;
    Ok(guard)
}
