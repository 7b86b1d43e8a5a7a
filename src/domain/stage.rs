//! Pre-release stage attached to a version.
//!
//! The name is stored exactly as it appeared in the tag ("alpha", "RC",
//! "post"). Each serializer normalizes it for its own style.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Pre-release label with an optional revision number, like "rc" and 5
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Stage {
    /// Label, never empty
    pub name: String,
    /// Revision number following the label, if any
    pub revision: Option<u64>,
}

impl Stage {
    /// Create a stage without a revision
    pub fn new(name: impl Into<String>) -> Self {
        Stage {
            name: name.into(),
            revision: None,
        }
    }

    /// Set the revision number
    pub fn with_revision(mut self, revision: u64) -> Self {
        self.revision = Some(revision);
        self
    }

    /// Whether this label is one of PEP 440's post/dev markers rather
    /// than a real pre-release
    pub fn is_post_or_dev(&self) -> bool {
        matches!(self.name.to_ascii_lowercase().as_str(), "post" | "dev")
    }

    /// PEP 440 spelling of the label: alpha→a, beta→b, c/pre/preview→rc,
    /// everything lower-cased.
    pub fn pep440_name(&self) -> String {
        let lower = self.name.to_ascii_lowercase();
        match lower.as_str() {
            "alpha" => "a".to_string(),
            "beta" => "b".to_string(),
            "c" | "pre" | "preview" => "rc".to_string(),
            _ => lower,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.revision {
            Some(revision) => write!(f, "{}{}", self.name, revision),
            None => write!(f, "{}", self.name),
        }
    }
}
