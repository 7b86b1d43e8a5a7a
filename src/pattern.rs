//! Tag pattern matching.
//!
//! A pattern is a regular expression with a mandatory `base` group and the
//! optional groups `stage`, `revision`, `tagged_metadata` and `epoch`.

use crate::domain::Stage;
use crate::error::{DunamaiError, Result};
use regex::{Captures, Regex};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Expression behind the `default` preset.
pub const DEFAULT_PATTERN: &str = r"^v((?P<epoch>\d+)!)?(?P<base>\d+(\.\d+)*)([-._]?((?P<stage>[a-zA-Z]+)[-._]?(?P<revision>\d+)?))?(\+(?P<tagged_metadata>.+))?$";

/// A tag pattern: one of the presets or a custom regular expression.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Pattern {
    /// `v` followed by the version, like `v1.2.3rc1+linux`
    #[default]
    Default,
    /// Same as [`Pattern::Default`] with the `v` optional
    DefaultUnprefixed,
    /// A user-supplied expression
    Custom(String),
}

impl Pattern {
    /// Expression text with `prefix` spliced right after the start anchor.
    ///
    /// Custom patterns only take the prefix when they begin with `^`.
    pub fn regex(&self, prefix: Option<&str>) -> String {
        let source = match self {
            Pattern::Default => DEFAULT_PATTERN.to_string(),
            Pattern::DefaultUnprefixed => DEFAULT_PATTERN.replacen("^v", "^v?", 1),
            Pattern::Custom(source) => source.clone(),
        };
        match prefix {
            Some(prefix) if source.starts_with('^') => {
                source.replacen('^', &format!("^{}", prefix), 1)
            }
            _ => source,
        }
    }

    /// Compile the pattern, requiring a `base` capture group.
    pub fn compile(&self, prefix: Option<&str>) -> Result<CompiledPattern> {
        let source = self.regex(prefix);
        let regex = Regex::new(&source).map_err(|e| {
            DunamaiError::config(format!("Pattern '{}' is not a valid regex: {}", source, e))
        })?;
        if !regex.capture_names().any(|name| name == Some("base")) {
            return Err(DunamaiError::config(format!(
                "Pattern '{}' did not include required capture group 'base'",
                source
            )));
        }
        Ok(CompiledPattern { regex })
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Default => write!(f, "default"),
            Pattern::DefaultUnprefixed => write!(f, "default-unprefixed"),
            Pattern::Custom(source) => write!(f, "{}", source),
        }
    }
}

impl FromStr for Pattern {
    type Err = DunamaiError;

    /// Accepts a preset name or a regex with a `base` group.
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "default" => Ok(Pattern::Default),
            "default-unprefixed" => Ok(Pattern::DefaultUnprefixed),
            custom => {
                let pattern = Pattern::Custom(custom.to_string());
                pattern.compile(None)?;
                Ok(pattern)
            }
        }
    }
}

/// A compiled pattern ready to match tags
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    regex: Regex,
}

/// Structured fields extracted from a tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagMatch {
    pub tag: String,
    pub base: Vec<u64>,
    pub stage: Option<Stage>,
    pub tagged_metadata: Option<String>,
    pub epoch: Option<u64>,
}

impl CompiledPattern {
    /// Match a tag. A `base` that is not dot-separated integers counts as
    /// no match.
    pub fn match_tag(&self, tag: &str) -> Option<TagMatch> {
        let caps = self.regex.captures(tag)?;

        let base = group(&caps, "base")?
            .split('.')
            .map(|part| part.parse::<u64>().ok())
            .collect::<Option<Vec<u64>>>()?;

        // A revision without a stage is dropped along with it.
        let stage = group(&caps, "stage").map(|name| Stage {
            name: name.to_string(),
            revision: group(&caps, "revision").and_then(|r| r.parse().ok()),
        });

        Some(TagMatch {
            tag: tag.to_string(),
            base,
            stage,
            tagged_metadata: group(&caps, "tagged_metadata").map(str::to_string),
            epoch: group(&caps, "epoch").and_then(|e| e.parse().ok()),
        })
    }
}

/// Present-but-empty groups count as absent.
fn group<'t>(caps: &Captures<'t>, name: &str) -> Option<&'t str> {
    caps.name(name)
        .map(|m| m.as_str())
        .filter(|text| !text.is_empty())
}

/// Outcome of picking a tag out of a newest-first candidate list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSelection {
    pub matched: Option<TagMatch>,
    /// Newer candidates that were tried and did not match
    pub newer_unmatched: Vec<String>,
}

/// Pick the first candidate matching `pattern`. With `latest_tag`, only
/// the newest candidate is considered.
pub fn select_tag(candidates: &[String], pattern: &CompiledPattern, latest_tag: bool) -> TagSelection {
    let mut selection = TagSelection::default();
    let limit = if latest_tag { 1 } else { candidates.len() };

    for tag in candidates.iter().take(limit) {
        match pattern.match_tag(tag) {
            Some(matched) => {
                selection.matched = Some(matched);
                break;
            }
            None => selection.newer_unmatched.push(tag.clone()),
        }
    }

    if let Some(matched) = &selection.matched {
        debug!(tag = %matched.tag, "matched tag");
    }
    if !selection.newer_unmatched.is_empty() {
        debug!(
            tags = ?selection.newer_unmatched,
            "newer tags did not match the pattern"
        );
    }
    selection
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_match(tag: &str) -> Option<TagMatch> {
        Pattern::Default.compile(None).unwrap().match_tag(tag)
    }

    fn fields(tag: &str) -> Option<(Vec<u64>, Option<String>, Option<u64>, Option<String>, Option<u64>)> {
        default_match(tag).map(|m| {
            (
                m.base,
                m.stage.as_ref().map(|s| s.name.clone()),
                m.stage.and_then(|s| s.revision),
                m.tagged_metadata,
                m.epoch,
            )
        })
    }

    #[test]
    fn test_preset_regex_text() {
        assert_eq!(Pattern::Default.regex(None), DEFAULT_PATTERN);
        assert_eq!(
            Pattern::DefaultUnprefixed.regex(None),
            DEFAULT_PATTERN.replacen("^v", "^v?", 1)
        );
        assert_eq!(
            Pattern::Default.regex(Some("foo-")),
            DEFAULT_PATTERN.replacen('^', "^foo-", 1)
        );
    }

    #[test]
    fn test_custom_prefix_only_with_anchor() {
        let unanchored = Pattern::Custom(r"(?P<base>\d+)".to_string());
        assert_eq!(unanchored.regex(Some("foo-")), r"(?P<base>\d+)");
        let anchored = Pattern::Custom(r"^(?P<base>\d+)".to_string());
        assert_eq!(anchored.regex(Some("foo-")), r"^foo-(?P<base>\d+)");
    }

    #[test]
    fn test_from_str() {
        assert_eq!("default".parse::<Pattern>().unwrap(), Pattern::Default);
        assert_eq!(
            "default-unprefixed".parse::<Pattern>().unwrap(),
            Pattern::DefaultUnprefixed
        );
        assert_eq!(
            r"(?P<base>\d+)".parse::<Pattern>().unwrap(),
            Pattern::Custom(r"(?P<base>\d+)".to_string())
        );
    }

    #[test]
    fn test_missing_base_group_is_configuration_error() {
        let err = r"v(?P<stage>\d+)".parse::<Pattern>().unwrap_err();
        assert!(matches!(err, DunamaiError::InvalidConfiguration(_)));
        assert!(err.to_string().contains("'base'"));

        let err = Pattern::Custom("(".to_string()).compile(None).unwrap_err();
        assert!(matches!(err, DunamaiError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_default_pattern_fields() {
        assert_eq!(fields("v0.1.0"), Some((vec![0, 1, 0], None, None, None, None)));
        assert_eq!(fields("av0.1.0"), None);

        assert_eq!(
            fields("v0.1.0a"),
            Some((vec![0, 1, 0], Some("a".into()), None, None, None))
        );
        assert_eq!(
            fields("v0.1.0a1"),
            Some((vec![0, 1, 0], Some("a".into()), Some(1), None, None))
        );
        assert_eq!(fields("v0.1.0a1b"), None);
        assert_eq!(fields("v0.1.0-1.a"), None);

        assert_eq!(
            fields("v0.1.0-alpha.123"),
            Some((vec![0, 1, 0], Some("alpha".into()), Some(123), None, None))
        );
        assert_eq!(fields("v0.1.0-1.alpha"), None);
        assert_eq!(fields("v0.1.0-alpha.1.post.4"), None);

        for tag in ["v0.1.0a2", "v0.1.0-a-2", "v0.1.0.a.2", "v0.1.0_a_2"] {
            assert_eq!(
                fields(tag),
                Some((vec![0, 1, 0], Some("a".into()), Some(2), None, None)),
                "{}",
                tag
            );
        }

        assert_eq!(
            fields("v0.1.0rc.4+specifier"),
            Some((
                vec![0, 1, 0],
                Some("rc".into()),
                Some(4),
                Some("specifier".into()),
                None
            ))
        );
        assert_eq!(fields("v1"), Some((vec![1], None, None, None, None)));
        assert_eq!(
            fields("v1b2"),
            Some((vec![1], Some("b".into()), Some(2), None, None))
        );
        assert_eq!(fields("v1!2"), Some((vec![2], None, None, None, Some(1))));
    }

    #[test]
    fn test_base_equals_tag_without_v() {
        for tag in ["v1", "v1.2", "v0.10.3", "v2024.1.15"] {
            let matched = default_match(tag).unwrap();
            let base: Vec<String> = matched.base.iter().map(u64::to_string).collect();
            assert_eq!(base.join("."), &tag[1..]);
        }
    }

    #[test]
    fn test_unprefixed_and_prefixed() {
        let unprefixed = Pattern::DefaultUnprefixed.compile(None).unwrap();
        assert!(unprefixed.match_tag("1.2.3").is_some());
        assert!(unprefixed.match_tag("v1.2.3").is_some());

        let prefixed = Pattern::Default.compile(Some("foo-")).unwrap();
        assert_eq!(prefixed.match_tag("foo-v1.2.3").unwrap().base, vec![1, 2, 3]);
        assert!(prefixed.match_tag("v1.2.3").is_none());
    }

    #[test]
    fn test_empty_optional_groups_and_revision_without_stage() {
        let pattern = Pattern::Custom(
            r"^(?P<base>\d+\.\d+)(?P<stage>[a-z]*)(?P<revision>\d*)(?P<tagged_metadata>.*)$".to_string(),
        )
        .compile(None)
        .unwrap();
        let matched = pattern.match_tag("1.2").unwrap();
        assert_eq!(matched.stage, None);
        assert_eq!(matched.tagged_metadata, None);

        let revision_only = Pattern::Custom(r"^(?P<base>\d+)(-(?P<stage>[a-z]+))?\.(?P<revision>\d+)$".to_string())
            .compile(None)
            .unwrap();
        let matched = revision_only.match_tag("1.5").unwrap();
        assert_eq!(matched.base, vec![1]);
        assert_eq!(matched.stage, None);
    }

    #[test]
    fn test_non_numeric_base_is_no_match() {
        let pattern = Pattern::Custom(r"^(?P<base>[a-z.]+)$".to_string())
            .compile(None)
            .unwrap();
        assert!(pattern.match_tag("abc").is_none());
    }

    #[test]
    fn test_select_tag_first_match_wins() {
        let pattern = Pattern::Default.compile(None).unwrap();
        let candidates = vec![
            "release".to_string(),
            "v0.2.0".to_string(),
            "v0.1.0".to_string(),
        ];
        let selection = select_tag(&candidates, &pattern, false);
        assert_eq!(selection.matched.unwrap().tag, "v0.2.0");
        assert_eq!(selection.newer_unmatched, vec!["release".to_string()]);
    }

    #[test]
    fn test_select_tag_latest_only() {
        let pattern = Pattern::Default.compile(None).unwrap();
        let candidates = vec!["release".to_string(), "v0.2.0".to_string()];
        let selection = select_tag(&candidates, &pattern, true);
        assert!(selection.matched.is_none());

        let selection = select_tag(&candidates[1..], &pattern, true);
        assert_eq!(selection.matched.unwrap().base, vec![0, 2, 0]);
    }

    #[test]
    fn test_select_tag_empty() {
        let pattern = Pattern::Default.compile(None).unwrap();
        assert_eq!(select_tag(&[], &pattern, false), TagSelection::default());
    }
}
