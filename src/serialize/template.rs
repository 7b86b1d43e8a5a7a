//! `{placeholder}` templates for custom version formats.

use crate::domain::Version;
use crate::error::{DunamaiError, Result};
use crate::serialize::SerializeOptions;

/// Every name a template may reference
pub const PLACEHOLDERS: &[&str] = &[
    "base",
    "stage",
    "revision",
    "distance",
    "commit",
    "dirty",
    "tagged_metadata",
    "epoch",
    "branch",
    "branch_escaped",
    "timestamp",
    "major",
    "minor",
    "patch",
];

/// Render `format` for `version`. `{{` and `}}` produce literal braces.
pub fn render(format: &str, version: &Version, options: &SerializeOptions) -> Result<String> {
    let mut out = String::with_capacity(format.len());
    let mut chars = format.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut name = String::new();
                let mut closed = false;
                for c in chars.by_ref() {
                    if c == '}' {
                        closed = true;
                        break;
                    }
                    name.push(c);
                }
                if !closed {
                    return Err(DunamaiError::config(format!(
                        "Unclosed placeholder in format '{}'",
                        format
                    )));
                }
                out.push_str(&value(&name, version, options)?);
            }
            '}' => {
                return Err(DunamaiError::config(format!(
                    "Single '}}' in format '{}' (use '}}}}' for a literal brace)",
                    format
                )));
            }
            other => out.push(other),
        }
    }

    Ok(out)
}

fn value(name: &str, version: &Version, options: &SerializeOptions) -> Result<String> {
    let part = |i: usize| version.base.get(i).map(u64::to_string).unwrap_or_default();
    let rendered = match name {
        "base" => version.base_string(),
        "stage" => version
            .stage
            .as_ref()
            .map(|s| s.name.clone())
            .unwrap_or_default(),
        "revision" => version
            .stage
            .as_ref()
            .and_then(|s| s.revision)
            .map(|r| r.to_string())
            .unwrap_or_default(),
        "distance" => version.distance.to_string(),
        "commit" => match &version.commit {
            Some(commit) => format!(
                "{}{}",
                options.commit_prefix.as_deref().unwrap_or(""),
                commit
            ),
            None => String::new(),
        },
        "dirty" => {
            if version.dirty == Some(true) {
                "dirty".to_string()
            } else {
                "clean".to_string()
            }
        }
        "tagged_metadata" => version.tagged_metadata.clone().unwrap_or_default(),
        "epoch" => version.epoch.map(|e| e.to_string()).unwrap_or_default(),
        "branch" => version.branch.clone().unwrap_or_default(),
        "branch_escaped" => escape_branch(
            version.branch.as_deref().unwrap_or(""),
            options.escape_with.as_deref().unwrap_or(""),
        ),
        "timestamp" => version
            .timestamp
            .map(|t| t.format("%Y%m%d%H%M%S").to_string())
            .unwrap_or_default(),
        "major" => part(0),
        "minor" => part(1),
        "patch" => part(2),
        unknown => {
            return Err(DunamaiError::config(format!(
                "Unknown placeholder '{{{}}}' (available: {})",
                unknown,
                PLACEHOLDERS.join(", ")
            )))
        }
    };
    Ok(rendered)
}

/// Replace every non-alphanumeric character of `branch` with `replacement`
pub fn escape_branch(branch: &str, replacement: &str) -> String {
    let mut out = String::with_capacity(branch.len());
    for c in branch.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c);
        } else {
            out.push_str(replacement);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    const ALL: &str =
        "{base},{stage},{revision},{distance},{commit},{dirty},{branch},{branch_escaped},{timestamp}";

    fn opts() -> SerializeOptions {
        SerializeOptions::default()
    }

    #[test]
    fn test_empty_fields() {
        let v = Version::new([0, 1, 0]);
        assert_eq!(render(ALL, &v, &opts()).unwrap(), "0.1.0,,,0,,clean,,,");
    }

    #[test]
    fn test_all_fields() {
        let v = Version::new([1])
            .with_stage("a", Some(2))
            .with_distance(3)
            .with_commit("abc")
            .with_dirty(true)
            .with_branch("a/b")
            .with_timestamp(Utc.with_ymd_and_hms(2001, 2, 3, 4, 5, 6).unwrap());
        assert_eq!(
            render(ALL, &v, &opts()).unwrap(),
            "1,a,2,3,abc,dirty,a/b,ab,20010203040506"
        );
    }

    #[test]
    fn test_distance_and_commit_example() {
        let v = Version::new([0, 2, 0]).with_distance(7).with_commit("g29045e8");
        assert_eq!(
            render("v{base}+{distance}.{commit}", &v, &opts()).unwrap(),
            "v0.2.0+7.g29045e8"
        );
    }

    #[test]
    fn test_major_minor_patch() {
        let v = Version::new([4, 5]);
        assert_eq!(
            render("{major}|{minor}|{patch}", &v, &opts()).unwrap(),
            "4|5|"
        );
    }

    #[test]
    fn test_escape_with() {
        let v = Version::new([1, 0, 0]).with_branch("feature/new-ui");
        let options = SerializeOptions {
            escape_with: Some("_".to_string()),
            ..opts()
        };
        assert_eq!(
            render("{branch_escaped}", &v, &options).unwrap(),
            "feature_new_ui"
        );
        assert_eq!(render("{branch_escaped}", &v, &opts()).unwrap(), "featurenewui");
    }

    #[test]
    fn test_literal_braces() {
        let v = Version::new([1, 0, 0]);
        assert_eq!(render("{{{base}}}", &v, &opts()).unwrap(), "{1.0.0}");
    }

    #[test]
    fn test_unknown_and_malformed_placeholders() {
        let v = Version::new([1, 0, 0]);
        let err = render("{nope}", &v, &opts()).unwrap_err();
        assert!(matches!(err, DunamaiError::InvalidConfiguration(_)));
        assert!(err.to_string().contains("{nope}"));

        assert!(render("{base", &v, &opts()).is_err());
        assert!(render("base}", &v, &opts()).is_err());
    }
}
