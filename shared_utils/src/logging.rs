//! Logging Module
//!
//! One `tracing` subscriber per process with two sinks:
//! - a plain-text log file (daily rotation) that keeps the full record of a
//!   batch, including every texture compiler command line
//! - an optional stderr sink, usually at a quieter level so it does not
//!   fight with the progress bar
//!
//! `RUST_LOG` replaces the crate-level defaults when set.
//!
//! ```no_run
//! use shared_utils::logging::{init_logging, LogConfig};
//! use tracing::Level;
//!
//! let config = LogConfig::default().with_stderr_level(Some(Level::WARN));
//! init_logging("tx_convert", config)?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::{Context, Result};
use std::cmp::Reverse;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::Level;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Directory for `<program>.log.<date>` files
    pub log_dir: PathBuf,
    /// Rotated files kept per program
    pub keep_files: usize,
    pub file_level: Level,
    /// `None` disables the stderr sink
    pub stderr_level: Option<Level>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_dir: std::env::temp_dir().join("tx_convert_logs"),
            keep_files: 7,
            file_level: Level::INFO,
            stderr_level: Some(Level::WARN),
        }
    }
}

impl LogConfig {
    pub fn with_log_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.log_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn with_file_level(mut self, level: Level) -> Self {
        self.file_level = level;
        self
    }

    pub fn with_stderr_level(mut self, level: Option<Level>) -> Self {
        self.stderr_level = level;
        self
    }

    /// Most verbose level any sink accepts.
    fn max_level(&self) -> Level {
        match self.stderr_level {
            Some(level) if level > self.file_level => level,
            _ => self.file_level,
        }
    }
}

fn default_directives(program: &str, level: Level) -> String {
    let target = program.replace('-', "_");
    format!("{target}={level},shared_utils={level}")
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(program: &str, config: LogConfig) -> Result<()> {
    fs::create_dir_all(&config.log_dir)
        .with_context(|| format!("Cannot create log directory {}", config.log_dir.display()))?;

    let appender = RollingFileAppender::new(Rotation::DAILY, &config.log_dir, format!("{program}.log"));
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(program, config.max_level())));

    let file_sink = fmt::layer()
        .with_writer(appender)
        .with_ansi(false)
        .with_thread_ids(true)
        .with_filter(LevelFilter::from_level(config.file_level));

    let stderr_sink = config.stderr_level.map(|level| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .compact()
            .with_filter(LevelFilter::from_level(level))
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(file_sink)
        .with(stderr_sink)
        .try_init()
        .context("A tracing subscriber is already installed")?;

    let removed = prune_logs(&config.log_dir, program, config.keep_files);
    tracing::debug!(
        dir = %config.log_dir.display(),
        removed,
        "Logging initialized"
    );
    Ok(())
}

/// Delete all but the newest `keep` log files of `program`; returns how
/// many were removed. Unreadable entries are left alone.
fn prune_logs(dir: &Path, program: &str, keep: usize) -> usize {
    let prefix = format!("{program}.log");
    let Ok(entries) = fs::read_dir(dir) else {
        return 0;
    };

    let mut logs: Vec<(SystemTime, PathBuf)> = entries
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().starts_with(&prefix))
        .filter_map(|e| {
            let modified = e.metadata().ok()?.modified().ok()?;
            Some((modified, e.path()))
        })
        .collect();
    logs.sort_by_key(|(modified, _)| Reverse(*modified));

    logs.iter()
        .skip(keep)
        .filter(|(_, path)| match fs::remove_file(path) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Cannot remove old log");
                false
            }
        })
        .count()
}

/// Record one texture compiler run in the log file.
///
/// Successful runs log the captured output at debug level only; failures
/// keep it at error level. `exit_code` is `None` for killed processes.
pub fn log_external_tool(tool: &str, args: &[String], output: &str, exit_code: Option<i32>, duration: Duration) {
    let command_line = std::iter::once(tool)
        .chain(args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ");
    let secs = duration.as_secs_f64();

    match exit_code {
        Some(0) => {
            tracing::info!(tool, command = %command_line, secs, "Texture compiler finished");
            if !output.is_empty() {
                tracing::debug!(tool, output, "Texture compiler output");
            }
        }
        Some(code) => tracing::error!(tool, command = %command_line, secs, code, output, "Texture compiler failed"),
        None => tracing::error!(tool, command = %command_line, secs, output, "Texture compiler was killed"),
    }
}
