//! Process execution for betapub.
//!
//! This crate runs the external package-manager invocations with output
//! capture and an optional wall-clock bound.
//!
//! # Example
//!
//! ```ignore
//! use betapub_process::run_command_in_dir;
//!
//! let result = run_command_in_dir("npm", &["--version"], std::path::Path::new(".")).expect("run");
//! assert!(result.success);
//! ```

use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, Output, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Result of a command execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResult {
    /// Whether the command succeeded (exit code 0)
    pub success: bool,
    /// Exit code (if available)
    pub exit_code: Option<i32>,
    /// Standard output
    pub stdout: String,
    /// Standard error
    pub stderr: String,
    /// Whether the command was killed for exceeding its timeout
    #[serde(default)]
    pub timed_out: bool,
    /// Duration of execution
    pub duration_ms: u64,
}

impl CommandResult {
    /// Create a result from a process output
    pub fn from_output(output: &Output, duration: Duration) -> Self {
        Self {
            success: output.status.success(),
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            timed_out: false,
            duration_ms: duration.as_millis() as u64,
        }
    }

    /// Both output streams, stderr last, for error messages that need everything npm printed.
    pub fn combined_output(&self) -> String {
        match (self.stdout.trim(), self.stderr.trim()) {
            ("", err) => err.to_string(),
            (out, "") => out.to_string(),
            (out, err) => format!("{out}\n{err}"),
        }
    }
}

/// Run a command in a specific directory. The child gets an empty stdin.
pub fn run_command_in_dir(program: &str, args: &[&str], dir: &Path) -> Result<CommandResult> {
    let start = Instant::now();

    let output = Command::new(program)
        .args(args)
        .current_dir(dir)
        .stdin(Stdio::null())
        .output()
        .with_context(|| {
            format!(
                "failed to run command: {} {:?} in {}",
                program,
                args,
                dir.display()
            )
        })?;

    Ok(CommandResult::from_output(&output, start.elapsed()))
}

/// Run a command in a directory, killing it once `timeout` elapses.
///
/// With `timeout == None` this is [`run_command_in_dir`]. Output streams are
/// drained on helper threads so a chatty child cannot block on a full pipe.
pub fn run_command_with_timeout(
    program: &str,
    args: &[&str],
    dir: &Path,
    timeout: Option<Duration>,
) -> Result<CommandResult> {
    let Some(timeout) = timeout else {
        return run_command_in_dir(program, args, dir);
    };

    let start = Instant::now();
    let mut child = Command::new(program)
        .args(args)
        .current_dir(dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| {
            format!(
                "failed to spawn command: {} {:?} in {}",
                program,
                args,
                dir.display()
            )
        })?;

    let stdout_reader = drain(child.stdout.take());
    let stderr_reader = drain(child.stderr.take());

    let deadline = start + timeout;
    let (exit_code, timed_out) = loop {
        match child.try_wait().context("failed to poll command")? {
            Some(status) => break (status.code(), false),
            None if Instant::now() >= deadline => {
                kill(&mut child);
                break (None, true);
            }
            None => thread::sleep(Duration::from_millis(50)),
        }
    };

    // Grandchildren of a killed child can keep the pipes open, so readers are
    // only joined after a normal exit.
    let (stdout, stderr) = if timed_out {
        (
            String::new(),
            format!(
                "command timed out after {}",
                humantime::format_duration(timeout)
            ),
        )
    } else {
        (collect(stdout_reader), collect(stderr_reader))
    };

    Ok(CommandResult {
        success: !timed_out && exit_code == Some(0),
        exit_code,
        stdout,
        stderr,
        timed_out,
        duration_ms: start.elapsed().as_millis() as u64,
    })
}

fn drain<R: Read + Send + 'static>(stream: Option<R>) -> Option<JoinHandle<Vec<u8>>> {
    stream.map(|mut s| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = s.read_to_end(&mut buf);
            buf
        })
    })
}

fn collect(handle: Option<JoinHandle<Vec<u8>>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .map(|bytes| String::from_utf8_lossy(&bytes).to_string())
        .unwrap_or_default()
}

fn kill(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

/// Check if a command exists in PATH
pub fn command_exists(program: &str) -> bool {
    which::which(program).is_ok()
}
