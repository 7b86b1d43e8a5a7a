use crate::style::{Style, Violation};
use crate::vcs::{Unavailable, Vcs};
use thiserror::Error;

/// Unified error type for dunamai operations
#[derive(Error, Debug)]
pub enum DunamaiError {
    #[error("Unable to detect version control system. {}", describe_attempts(.attempts))]
    VcsNotDetected { attempts: Vec<(Vcs, Unavailable)> },

    #[error("{vcs} is unavailable: {reason}")]
    VcsUnavailable { vcs: Vcs, reason: Unavailable },

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Version '{version}' does not conform to the {style} style: {violation}")]
    InvalidVersion {
        version: String,
        style: Style,
        violation: Violation,
    },

    #[error("Version '{version}' does not match pattern '{pattern}'")]
    UnparsableVersion { version: String, pattern: String },

    #[error("This is a shallow repository, so the version may be incorrect (strict mode)")]
    ShallowRepository,

    #[error("Pattern '{pattern}' did not match any tags from [{}]", join_tags(.tags))]
    NoMatchingTag { pattern: String, tags: Vec<String> },

    #[error("{vcs} command `{command}` failed with {}: {output}", describe_status(.status))]
    Command {
        vcs: Vcs,
        command: String,
        status: Option<i32>,
        output: String,
    },

    #[error("Unable to read {what} from {vcs} output: {output}")]
    UnexpectedOutput {
        vcs: Vcs,
        what: &'static str,
        output: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience type alias for Results in dunamai
pub type Result<T> = std::result::Result<T, DunamaiError>;

impl DunamaiError {
    /// Create a configuration error with context
    pub fn config(msg: impl Into<String>) -> Self {
        DunamaiError::InvalidConfiguration(msg.into())
    }

    pub(crate) fn unexpected(vcs: Vcs, what: &'static str, output: impl Into<String>) -> Self {
        DunamaiError::UnexpectedOutput {
            vcs,
            what,
            output: output.into(),
        }
    }

    /// Whether a different VCS might still succeed after this failure.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, DunamaiError::VcsUnavailable { .. })
    }
}

fn describe_attempts(attempts: &[(Vcs, Unavailable)]) -> String {
    if attempts.is_empty() {
        return "No VCS was attempted".to_string();
    }
    let parts: Vec<String> = attempts
        .iter()
        .map(|(vcs, reason)| format!("{}: {}", vcs, reason))
        .collect();
    format!("Checked: {}", parts.join("; "))
}

fn join_tags(tags: &[String]) -> String {
    tags.join(", ")
}

fn describe_status(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("exit code {}", code),
        None => "no exit code".to_string(),
    }
}
