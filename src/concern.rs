use serde::{Deserialize, Serialize};
use std::fmt;

/// Non-fatal conditions noticed while reading VCS state.
///
/// They ride along on a `Version` so the caller can report them. Under
/// strict mode the shallow-clone concern becomes an error instead.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Concern {
    /// The repository history is truncated, so the distance may be too small
    ShallowRepository,
}

impl Concern {
    /// Short machine-friendly identifier
    pub fn code(&self) -> &'static str {
        match self {
            Concern::ShallowRepository => "shallow-repository",
        }
    }
}

impl fmt::Display for Concern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Concern::ShallowRepository => write!(
                f,
                "This is a shallow repository, so Dunamai may not produce the correct version"
            ),
        }
    }
}
