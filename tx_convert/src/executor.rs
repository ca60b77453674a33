//! Conversion executor
//!
//! Runs one external compiler invocation, captures both streams in full and
//! folds every outcome (exit status, launch failure, timeout, cancellation)
//! into a [`ConversionResult`]. Nothing here returns an error: a failing
//! texture must never abort its siblings.

use crate::aces_config::AcesVersion;
use crate::color_space::TextureItem;
use crate::commands::{BuildOutcome, CommandBuilder, Invocation};
use crate::options::{Backend, ConversionOptions};
use crate::scheduler::Converter;
use serde::Serialize;
use shared_utils::{log_external_tool, CancelToken, ToolProcess};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversionResult {
    pub success: bool,
    /// Not attempted (already converted, cancelled)
    pub skipped: bool,
    pub source: PathBuf,
    pub output_path: Option<PathBuf>,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub message: String,
}

impl ConversionResult {
    pub fn succeeded(source: &Path, output: &Path, stdout: String, stderr: String) -> Self {
        Self {
            success: true,
            skipped: false,
            source: source.to_path_buf(),
            output_path: Some(output.to_path_buf()),
            stdout,
            stderr,
            exit_code: Some(0),
            message: String::new(),
        }
    }

    pub fn failed(source: &Path, output: Option<&Path>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            skipped: false,
            source: source.to_path_buf(),
            output_path: output.map(Path::to_path_buf),
            stdout: String::new(),
            stderr: String::new(),
            exit_code: None,
            message: message.into(),
        }
    }

    pub fn skipped(source: &Path, reason: impl Into<String>) -> Self {
        Self {
            success: false,
            skipped: true,
            source: source.to_path_buf(),
            output_path: None,
            stdout: String::new(),
            stderr: String::new(),
            exit_code: None,
            message: reason.into(),
        }
    }

    pub fn cancelled(source: &Path) -> Self {
        Self::skipped(source, "cancelled")
    }

    pub fn is_failure(&self) -> bool {
        !self.success && !self.skipped
    }
}

/// Run one invocation to completion.
///
/// Log order: start line, captured stdout (if any), captured stderr (if
/// any), then exactly one outcome line.
pub fn execute(
    invocation: &Invocation,
    source: &Path,
    timeout: Option<Duration>,
    cancel: &CancelToken,
    log: &dyn Fn(String),
) -> ConversionResult {
    let tool = invocation.tool_name();
    let output = invocation.output_path.as_path();

    if cancel.is_cancelled() {
        log(format!("⏹️ Cancelled before start: {}", source.display()));
        return ConversionResult::cancelled(source);
    }

    log(format!("🔄 {} {}", tool, source.display()));
    debug!(command = %invocation, "Launching texture compiler");

    let mut cmd = Command::new(&invocation.program);
    cmd.args(&invocation.args);
    cmd.envs(invocation.env.iter().map(|(k, v)| (k.as_str(), v.as_str())));

    let outcome = match ToolProcess::spawn(&mut cmd).and_then(|p| p.wait_with_output(timeout, cancel)) {
        Ok(outcome) => outcome,
        Err(e) => {
            let reason = format!("{:#}", e);
            log(format!("❌ Failed: {} → {} ({})", source.display(), output.display(), reason));
            return ConversionResult::failed(source, Some(output), reason);
        }
    };

    log_external_tool(
        tool,
        &invocation.args,
        &format!("{}{}", outcome.stdout, outcome.stderr),
        outcome.exit_code(),
        outcome.duration,
    );

    let stdout = outcome.stdout.trim().to_string();
    let stderr = outcome.stderr.trim().to_string();
    if !stdout.is_empty() {
        log(format!("{} output: {}", tool, stdout));
    }
    if !stderr.is_empty() {
        log(format!("{} errors: {}", tool, stderr));
    }

    if outcome.cancelled {
        log(format!("⏹️ Cancelled: {}", source.display()));
        return ConversionResult {
            stdout,
            stderr,
            ..ConversionResult::cancelled(source)
        };
    }

    if outcome.success() {
        log(format!("✅ Converted: {} → {}", source.display(), output.display()));
        return ConversionResult::succeeded(source, output, stdout, stderr);
    }

    let reason = if outcome.timed_out {
        format!("timed out after {:.0?}", outcome.duration)
    } else {
        match outcome.exit_code() {
            Some(code) => format!("exit code {}", code),
            None => "terminated by signal".to_string(),
        }
    };
    log(format!("❌ Failed: {} → {} ({})", source.display(), output.display(), reason));

    ConversionResult {
        stdout,
        stderr,
        exit_code: outcome.exit_code(),
        ..ConversionResult::failed(source, Some(output), reason)
    }
}

/// Converter that builds a command per texture and runs it as a child process.
pub struct ProcessConverter {
    builder: Box<dyn CommandBuilder>,
    options: ConversionOptions,
    aces: AcesVersion,
    cancel: CancelToken,
}

impl ProcessConverter {
    pub fn new(builder: Box<dyn CommandBuilder>, options: ConversionOptions, aces: AcesVersion) -> Self {
        Self {
            builder,
            options,
            aces,
            cancel: CancelToken::new(),
        }
    }

    pub fn backend(&self) -> Backend {
        self.builder.backend()
    }

    /// Share a cancellation token so running children are killed on cancel.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }
}

impl Converter for ProcessConverter {
    fn convert(&self, item: &TextureItem, log: &dyn Fn(String)) -> ConversionResult {
        match self.builder.build(item, &self.options, self.aces) {
            BuildOutcome::AlreadyConverted => {
                log(format!("⏭️ Skipped (already converted): {}", item.source_path().display()));
                ConversionResult::skipped(item.source_path(), "already converted")
            }
            BuildOutcome::Command(invocation) => {
                if !item.renderer_hint().is_empty() {
                    debug!(path = %item.source_path().display(), hint = item.renderer_hint(), "Renderer hint");
                }
                execute(&invocation, item.source_path(), self.options.timeout, &self.cancel, log)
            }
        }
    }
}
