//! Running VCS command-line tools.

use std::io;
use std::path::Path;
use std::process::Command;
use tracing::debug;

/// Captured result of one finished command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when the process was killed by a signal
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// A successful run printing `stdout`
    pub fn ok(stdout: impl Into<String>) -> Self {
        CommandOutput {
            status: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// A failed run with `code` printing `stderr`
    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        CommandOutput {
            status: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// stdout and stderr together, trimmed
    pub fn combined(&self) -> String {
        let mut text = self.stdout.trim().to_string();
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str(stderr);
        }
        text
    }
}

/// Process invocation seam
///
/// Adapters only describe which program to run with which arguments. The
/// runner decides how that happens, so tests can substitute canned output
/// for real tools.
pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args` in `cwd` to completion.
    ///
    /// A missing executable must surface as an `io::ErrorKind::NotFound`
    /// error, which callers treat as "not installed".
    fn run(&self, program: &str, args: &[&str], cwd: &Path) -> io::Result<CommandOutput>;
}

/// Runs real processes through `std::process::Command`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[&str], cwd: &Path) -> io::Result<CommandOutput> {
        debug!(program, ?args, cwd = %cwd.display(), "running command");
        let output = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .env("LC_ALL", "C")
            .env("GIT_TERMINAL_PROMPT", "0")
            .output()?;

        let result = CommandOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        debug!(program, status = ?result.status, "command finished");
        Ok(result)
    }
}
