//! External tool process wrapper
//!
//! Texture compilers (maketx, txmake, imaketx) can be chatty on both streams.
//! Piping stdout and stderr but reading only one of them deadlocks once the
//! other pipe buffer (~64KB) fills up, so both streams are drained by
//! dedicated threads while the caller waits on the child.
//!
//! The wait loop also honours an optional timeout and a [`CancelToken`];
//! either one kills the child. On unix the child leads its own process group
//! and the whole group is killed, so wrapper scripts and forked helpers go
//! with it. Output still held open by an escaped descendant is collected for
//! at most [`DRAIN_GRACE`] after the child is gone.
//!
//! ```ignore
//! use shared_utils::tool_process::{CancelToken, ToolProcess};
//! use std::process::Command;
//! use std::time::Duration;
//!
//! let mut cmd = Command::new("maketx");
//! cmd.arg("-v").arg("diffuse.png");
//!
//! let process = ToolProcess::spawn(&mut cmd)?;
//! let outcome = process.wait_with_output(Some(Duration::from_secs(600)), &CancelToken::new())?;
//! ```

use anyhow::{Context, Result};
use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// How long pipe output is still collected once the child has exited.
pub const DRAIN_GRACE: Duration = Duration::from_secs(2);

/// Cooperative cancellation flag shared between a batch coordinator, its
/// workers and whoever requested the stop (e.g. a Ctrl-C handler).
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Fully captured result of a finished (or killed) tool run.
#[derive(Debug)]
pub struct ToolOutcome {
    /// `None` when the child was killed by us or by a signal
    pub status: Option<ExitStatus>,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
    pub timed_out: bool,
    pub cancelled: bool,
}

impl ToolOutcome {
    pub fn success(&self) -> bool {
        self.status.map(|s| s.success()).unwrap_or(false)
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.status.and_then(|s| s.code())
    }
}

pub struct ToolProcess {
    child: Child,
    started: Instant,
    stdout: Drain,
    stderr: Drain,
}

impl ToolProcess {
    /// Spawn the configured command with both output streams piped and drained.
    pub fn spawn(cmd: &mut Command) -> Result<Self> {
        debug!(command = ?cmd, "Spawning external tool");

        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        own_process_group(cmd);

        let mut child = cmd
            .spawn()
            .with_context(|| format!("Failed to launch {:?}", cmd.get_program()))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow::anyhow!("Failed to capture tool stdout"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| anyhow::anyhow!("Failed to capture tool stderr"))?;

        Ok(Self {
            child,
            started: Instant::now(),
            stdout: Drain::start(stdout),
            stderr: Drain::start(stderr),
        })
    }

    /// Wait for exit, killing the child on timeout or cancellation.
    pub fn wait_with_output(
        mut self,
        timeout: Option<Duration>,
        cancel: &CancelToken,
    ) -> Result<ToolOutcome> {
        let mut timed_out = false;
        let mut cancelled = false;

        let status = loop {
            if let Some(status) = self
                .child
                .try_wait()
                .context("Failed to check tool status")?
            {
                break Some(status);
            }

            if cancel.is_cancelled() {
                cancelled = true;
            } else if timeout.is_some_and(|t| self.started.elapsed() >= t) {
                timed_out = true;
            }

            if cancelled || timed_out {
                warn!(
                    pid = self.child.id(),
                    timed_out,
                    cancelled,
                    "Killing external tool"
                );
                self.kill()?;
                self.child.wait().context("Failed to reap killed tool")?;
                break None;
            }

            thread::sleep(POLL_INTERVAL);
        };

        let deadline = Instant::now() + DRAIN_GRACE;
        let stdout = self.stdout.collect(deadline);
        let stderr = self.stderr.collect(deadline);

        Ok(ToolOutcome {
            status,
            stdout,
            stderr,
            duration: self.started.elapsed(),
            timed_out,
            cancelled,
        })
    }

    /// Kill the child and, on unix, every process in its group.
    pub fn kill(&mut self) -> Result<()> {
        kill_process_group(&self.child);
        match self.child.kill() {
            Ok(()) => Ok(()),
            // already exited
            Err(e) if e.kind() == std::io::ErrorKind::InvalidInput => Ok(()),
            Err(e) => Err(e).context("Failed to kill external tool"),
        }
    }
}

#[cfg(unix)]
fn own_process_group(cmd: &mut Command) {
    use std::os::unix::process::CommandExt;
    cmd.process_group(0);
}

#[cfg(not(unix))]
fn own_process_group(_cmd: &mut Command) {}

#[cfg(unix)]
fn kill_process_group(child: &Child) {
    let Ok(pgid) = libc::pid_t::try_from(child.id()) else {
        return;
    };
    // the child is not reaped yet, so its pid still names our group
    let ret = unsafe { libc::kill(-pgid, libc::SIGKILL) };
    if ret != 0 {
        debug!(pgid, error = %std::io::Error::last_os_error(), "Process group already gone");
    }
}

#[cfg(not(unix))]
fn kill_process_group(_child: &Child) {}

/// Pipe reader thread. Bytes land in a shared buffer as they arrive so a
/// pipe that never reaches EOF still yields what was written.
struct Drain {
    buffer: Arc<Mutex<Vec<u8>>>,
    done: Receiver<()>,
}

impl Drain {
    fn start<R: Read + Send + 'static>(mut pipe: R) -> Self {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let (tx, done) = mpsc::channel();
        let sink = Arc::clone(&buffer);
        thread::spawn(move || {
            let mut chunk = [0u8; 8192];
            loop {
                match pipe.read(&mut chunk) {
                    Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                    Ok(0) | Err(_) => break,
                    Ok(n) => match sink.lock() {
                        Ok(mut buf) => buf.extend_from_slice(&chunk[..n]),
                        Err(_) => break,
                    },
                }
            }
            let _ = tx.send(());
        });
        Self { buffer, done }
    }

    /// Wait for EOF until `deadline`, then take whatever was read.
    fn collect(self, deadline: Instant) -> String {
        let wait = deadline.saturating_duration_since(Instant::now());
        if self.done.recv_timeout(wait).is_err() {
            warn!("Tool output pipe still open after exit; keeping partial output");
        }
        match self.buffer.lock() {
            Ok(buf) => String::from_utf8_lossy(&buf).into_owned(),
            Err(_) => String::new(),
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> Command {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(script);
        cmd
    }

    #[test]
    fn test_captures_both_streams() {
        let process = ToolProcess::spawn(&mut sh("echo out; echo err 1>&2")).unwrap();
        let outcome = process.wait_with_output(None, &CancelToken::new()).unwrap();

        assert!(outcome.success());
        assert_eq!(outcome.exit_code(), Some(0));
        assert_eq!(outcome.stdout.trim(), "out");
        assert_eq!(outcome.stderr.trim(), "err");
        assert!(!outcome.timed_out);
        assert!(!outcome.cancelled);
    }

    #[test]
    fn test_nonzero_exit_is_failure() {
        let process = ToolProcess::spawn(&mut sh("exit 3")).unwrap();
        let outcome = process.wait_with_output(None, &CancelToken::new()).unwrap();

        assert!(!outcome.success());
        assert_eq!(outcome.exit_code(), Some(3));
    }

    #[test]
    fn test_large_stderr_does_not_deadlock() {
        // well past a pipe buffer on both streams
        let script = "i=0; while [ $i -lt 4000 ]; do echo 'xxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxx'; \
                      echo 'yyyyyyyyyyyyyyyyyyyyyyyyyyyyyyyy' 1>&2; i=$((i+1)); done";
        let process = ToolProcess::spawn(&mut sh(script)).unwrap();
        let outcome = process
            .wait_with_output(Some(Duration::from_secs(30)), &CancelToken::new())
            .unwrap();

        assert!(outcome.success());
        assert!(outcome.stdout.len() > 64 * 1024);
        assert!(outcome.stderr.len() > 64 * 1024);
    }

    #[test]
    fn test_timeout_kills_child() {
        let process = ToolProcess::spawn(&mut sh("exec sleep 10")).unwrap();
        let outcome = process
            .wait_with_output(Some(Duration::from_millis(100)), &CancelToken::new())
            .unwrap();

        assert!(outcome.timed_out);
        assert!(!outcome.success());
        assert!(outcome.duration < Duration::from_secs(5));
    }

    #[test]
    fn test_timeout_kills_wrapped_tool() {
        // no exec: sleep is a grandchild holding both pipes
        let process = ToolProcess::spawn(&mut sh("sleep 4; echo done")).unwrap();
        let waited = Instant::now();
        let outcome = process
            .wait_with_output(Some(Duration::from_millis(100)), &CancelToken::new())
            .unwrap();

        assert!(outcome.timed_out);
        assert!(!outcome.stdout.contains("done"));
        assert!(waited.elapsed() < Duration::from_secs(3));
    }

    #[test]
    fn test_detached_helper_does_not_block_exit() {
        let process = ToolProcess::spawn(&mut sh("sleep 5 & echo converted")).unwrap();
        let waited = Instant::now();
        let outcome = process.wait_with_output(None, &CancelToken::new()).unwrap();

        assert!(outcome.success());
        assert_eq!(outcome.stdout.trim(), "converted");
        assert!(waited.elapsed() < DRAIN_GRACE + Duration::from_secs(2));
    }

    #[test]
    fn test_cancel_kills_child() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let process = ToolProcess::spawn(&mut sh("exec sleep 10")).unwrap();
        let outcome = process.wait_with_output(None, &cancel).unwrap();

        assert!(outcome.cancelled);
        assert!(!outcome.success());
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let result = ToolProcess::spawn(&mut Command::new("nonexistent_tool_xyz_123"));
        assert!(result.is_err());
    }

    #[test]
    fn test_cancel_token_is_shared_between_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }
}
