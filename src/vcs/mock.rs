use crate::vcs::runner::{CommandOutput, CommandRunner};
use std::collections::{HashMap, HashSet};
use std::io;
use std::path::Path;
use std::sync::Mutex;

/// Command runner replaying canned output, for tests without VCS tools.
///
/// Responses are keyed by the full command line, program and arguments
/// joined by single spaces. Any command without a response behaves as if
/// its program were not installed.
pub struct MockRunner {
    responses: HashMap<String, CommandOutput>,
    failures: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

impl MockRunner {
    /// Create a runner with no responses
    pub fn new() -> Self {
        MockRunner {
            responses: HashMap::new(),
            failures: HashSet::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Respond to `command` with exit code 0 and `stdout`
    pub fn add(&mut self, command: impl Into<String>, stdout: impl Into<String>) {
        self.responses
            .insert(command.into(), CommandOutput::ok(stdout));
    }

    /// Respond to `command` with an arbitrary output
    pub fn add_output(&mut self, command: impl Into<String>, output: CommandOutput) {
        self.responses.insert(command.into(), output);
    }

    /// Make `command` fail to spawn with a permission error
    pub fn add_spawn_failure(&mut self, command: impl Into<String>) {
        self.failures.insert(command.into());
    }

    /// Builder-style variant of [`MockRunner::add`]
    pub fn with(mut self, command: impl Into<String>, stdout: impl Into<String>) -> Self {
        self.add(command, stdout);
        self
    }

    /// Builder-style variant of [`MockRunner::add_output`]
    pub fn with_output(mut self, command: impl Into<String>, output: CommandOutput) -> Self {
        self.add_output(command, output);
        self
    }

    /// Every command line run so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }
}

impl Default for MockRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRunner for MockRunner {
    fn run(&self, program: &str, args: &[&str], _cwd: &Path) -> io::Result<CommandOutput> {
        let mut line = program.to_string();
        for arg in args {
            line.push(' ');
            line.push_str(arg);
        }
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(line.clone());
        }

        if self.failures.contains(&line) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("cannot spawn {}", line),
            ));
        }
        self.responses.get(&line).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no canned response for: {}", line),
            )
        })
    }
}
