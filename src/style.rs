//! Versioning styles and their grammar validators.
//!
//! Each style has exactly one validator. It backs the standalone `check`
//! command and the post-hoc check that runs after a version is rendered,
//! so both paths always agree on what is valid.

use crate::error::{DunamaiError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// A versioning specification with its own grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Style {
    /// PEP 440, the Python packaging version scheme
    Pep440,
    /// Semantic Versioning 2.0.0
    #[value(name = "semver")]
    SemVer,
    /// The Haskell Package Versioning Policy
    Pvp,
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Style::Pep440 => write!(f, "PEP 440"),
            Style::SemVer => write!(f, "Semantic Versioning"),
            Style::Pvp => write!(f, "PVP"),
        }
    }
}

impl FromStr for Style {
    type Err = DunamaiError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "pep440" => Ok(Style::Pep440),
            "semver" => Ok(Style::SemVer),
            "pvp" => Ok(Style::Pvp),
            other => Err(DunamaiError::config(format!(
                "Unknown style '{}' (expected pep440, semver or pvp)",
                other
            ))),
        }
    }
}

/// The grammar rule a version string broke.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// Nothing to validate
    Empty,
    /// The epoch before `!` is not a non-negative integer
    InvalidEpoch(String),
    /// The release segment is not dot-separated non-negative integers
    InvalidRelease(String),
    /// Text after the release segment that the style does not allow
    UnexpectedSuffix(String),
    /// PEP 440 local segment with bad characters or a dot at either end
    InvalidLocal(String),
    /// Wrong number of release components
    ComponentCount { expected: &'static str, found: usize },
    /// Numeric identifier written with a leading zero
    LeadingZero(String),
    /// An identifier between separators is empty
    EmptyIdentifier(String),
    /// An identifier contains a character outside the allowed set
    InvalidCharacter { identifier: String, character: char },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::Empty => write!(f, "version is empty"),
            Violation::InvalidEpoch(epoch) => {
                write!(f, "epoch '{}' is not a non-negative integer", epoch)
            }
            Violation::InvalidRelease(release) => write!(
                f,
                "release segment '{}' must be dot-separated non-negative integers",
                release
            ),
            Violation::UnexpectedSuffix(suffix) => write!(
                f,
                "unexpected segment '{}' after the release (allowed: a/b/rc N, .postN, .devN)",
                suffix
            ),
            Violation::InvalidLocal(local) => write!(
                f,
                "local segment '{}' may only contain ASCII letters, digits and dots and cannot start or end with a dot",
                local
            ),
            Violation::ComponentCount { expected, found } => write!(
                f,
                "expected {} release components but found {}",
                expected, found
            ),
            Violation::LeadingZero(identifier) => {
                write!(f, "leading zero in numeric identifier '{}'", identifier)
            }
            Violation::EmptyIdentifier(part) => {
                write!(f, "empty identifier in '{}'", part)
            }
            Violation::InvalidCharacter {
                identifier,
                character,
            } => write!(
                f,
                "character '{}' is not allowed in identifier '{}'",
                character, identifier
            ),
        }
    }
}

static PEP440_PUBLIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<release>\d+(?:\.\d+)*)(?P<suffix>.*)$").expect("static regex")
});

static PEP440_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(?:a|b|rc)\d+)?(?:\.post\d+)?(?:\.dev\d+)?$").expect("static regex")
});

/// Validate `version` against the grammar of `style`.
///
/// Fails with [`DunamaiError::InvalidVersion`] naming the first rule that
/// the string breaks.
pub fn check_version(version: &str, style: Style) -> Result<()> {
    let outcome = match style {
        Style::Pep440 => check_pep440(version),
        Style::SemVer => check_semver(version),
        Style::Pvp => check_pvp(version),
    };
    outcome.map_err(|violation| DunamaiError::InvalidVersion {
        version: version.to_string(),
        style,
        violation,
    })
}

fn check_pep440(version: &str) -> std::result::Result<(), Violation> {
    if version.is_empty() {
        return Err(Violation::Empty);
    }

    let (public, local) = match version.split_once('+') {
        Some((public, local)) => (public, Some(local)),
        None => (version, None),
    };

    let public = match public.split_once('!') {
        Some((epoch, rest)) => {
            if epoch.is_empty() || !epoch.bytes().all(|b| b.is_ascii_digit()) {
                return Err(Violation::InvalidEpoch(epoch.to_string()));
            }
            rest
        }
        None => public,
    };

    let caps = PEP440_PUBLIC
        .captures(public)
        .ok_or_else(|| Violation::InvalidRelease(public.to_string()))?;
    let suffix = caps.name("suffix").map_or("", |m| m.as_str());
    if !PEP440_SUFFIX.is_match(suffix) {
        return Err(Violation::UnexpectedSuffix(suffix.to_string()));
    }

    if let Some(local) = local {
        let valid = !local.is_empty()
            && !local.starts_with('.')
            && !local.ends_with('.')
            && local.chars().all(|c| c.is_ascii_alphanumeric() || c == '.');
        if !valid {
            return Err(Violation::InvalidLocal(local.to_string()));
        }
    }

    Ok(())
}

fn check_semver(version: &str) -> std::result::Result<(), Violation> {
    if version.is_empty() {
        return Err(Violation::Empty);
    }

    let (rest, metadata) = match version.split_once('+') {
        Some((rest, metadata)) => (rest, Some(metadata)),
        None => (version, None),
    };
    let (core, pre) = match rest.split_once('-') {
        Some((core, pre)) => (core, Some(pre)),
        None => (rest, None),
    };

    let components: Vec<&str> = core.split('.').collect();
    if components.len() != 3 {
        return Err(Violation::ComponentCount {
            expected: "exactly 3",
            found: components.len(),
        });
    }
    for component in &components {
        if component.is_empty() || !component.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Violation::InvalidRelease(core.to_string()));
        }
        if component.len() > 1 && component.starts_with('0') {
            return Err(Violation::LeadingZero(component.to_string()));
        }
    }

    if let Some(pre) = pre {
        check_identifiers(pre, true)?;
    }
    if let Some(metadata) = metadata {
        check_identifiers(metadata, false)?;
    }

    Ok(())
}

/// Dot-separated SemVer identifiers. Leading zeros only matter for the
/// numeric identifiers of a pre-release.
fn check_identifiers(part: &str, numeric_rules: bool) -> std::result::Result<(), Violation> {
    for identifier in part.split('.') {
        if identifier.is_empty() {
            return Err(Violation::EmptyIdentifier(part.to_string()));
        }
        if let Some(character) = identifier
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '-'))
        {
            return Err(Violation::InvalidCharacter {
                identifier: identifier.to_string(),
                character,
            });
        }
        let numeric = identifier.bytes().all(|b| b.is_ascii_digit());
        if numeric_rules && numeric && identifier.len() > 1 && identifier.starts_with('0') {
            return Err(Violation::LeadingZero(identifier.to_string()));
        }
    }
    Ok(())
}

fn check_pvp(version: &str) -> std::result::Result<(), Violation> {
    if version.is_empty() {
        return Err(Violation::Empty);
    }

    let mut parts = version.split('-');
    let core = parts.next().unwrap_or_default();
    let components: Vec<&str> = core.split('.').collect();
    if components
        .iter()
        .any(|c| c.is_empty() || !c.bytes().all(|b| b.is_ascii_digit()))
    {
        return Err(Violation::InvalidRelease(core.to_string()));
    }
    if components.len() < 2 {
        return Err(Violation::ComponentCount {
            expected: "at least 2",
            found: components.len(),
        });
    }

    for tag in parts {
        if tag.is_empty() {
            return Err(Violation::EmptyIdentifier(version.to_string()));
        }
        if let Some(character) = tag.chars().find(|c| !c.is_ascii_alphanumeric()) {
            return Err(Violation::InvalidCharacter {
                identifier: tag.to_string(),
                character,
            });
        }
    }

    Ok(())
}
