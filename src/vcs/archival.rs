//! Archival files written by `git archive` and `hg archive`.
//!
//! Source exports carry no repository, so the version comes from a small
//! file expanded at export time: `.git_archival.json` with `export-subst`
//! placeholders, or the `.hg_archival.txt` that Mercurial always writes.

use crate::error::Result;
use crate::vcs::{RawFacts, VcsOptions};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::debug;

pub const GIT_ARCHIVAL_FILE: &str = ".git_archival.json";
pub const HG_ARCHIVAL_FILE: &str = ".hg_archival.txt";

static GIT_DESCRIBE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<tag>.+)-(?P<distance>\d+)-g(?P<hash>[0-9a-f]+)$").expect("static regex")
});

/// Search `start` and its parents for `file_name`.
///
/// The search stops at the first directory containing `metadata_dir`,
/// since anything above a live repository is not part of this export.
pub fn find_upward(start: &Path, file_name: &str, metadata_dir: &str) -> Option<PathBuf> {
    let mut dir = Some(start);
    while let Some(current) = dir {
        let candidate = current.join(file_name);
        if candidate.is_file() {
            return Some(candidate);
        }
        if current.join(metadata_dir).exists() {
            return None;
        }
        dir = current.parent();
    }
    None
}

#[derive(Debug, Deserialize)]
struct GitArchival {
    #[serde(rename = "hash-full")]
    hash_full: String,
    #[serde(rename = "hash-short", default)]
    hash_short: Option<String>,
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(default)]
    refs: Option<String>,
    #[serde(default)]
    describe: Option<String>,
}

impl GitArchival {
    fn is_unexpanded(&self) -> bool {
        [
            Some(&self.hash_full),
            self.hash_short.as_ref(),
            self.timestamp.as_ref(),
            self.refs.as_ref(),
            self.describe.as_ref(),
        ]
        .into_iter()
        .flatten()
        .any(|value| value.contains("$Format:"))
    }
}

/// Read the contents of a `.git_archival.json`.
///
/// Returns `None` when the placeholders were never expanded, which is what
/// a plain checkout of the repository looks like.
pub fn read_git_archival(text: &str, options: &VcsOptions) -> Result<Option<RawFacts>> {
    let data: GitArchival = serde_json::from_str(text)?;
    if data.is_unexpanded() {
        debug!("git archival file is not expanded");
        return Ok(None);
    }

    let short = data
        .hash_short
        .clone()
        .unwrap_or_else(|| data.hash_full.chars().take(7).collect());
    let mut facts = RawFacts {
        commit: Some(options.commit_id(&data.hash_full, &short)),
        dirty: Some(false),
        timestamp: data.timestamp.as_deref().and_then(parse_timestamp),
        ..Default::default()
    };

    let mut ref_tags = Vec::new();
    for item in data.refs.as_deref().unwrap_or("").split(',') {
        let item = item.trim();
        if let Some(branch) = item.strip_prefix("HEAD -> ") {
            facts.branch = Some(branch.to_string());
        } else if let Some(tag) = item.strip_prefix("tag: ") {
            ref_tags.push(tag.to_string());
        }
    }

    let describe = data.describe.as_deref().map(str::trim).unwrap_or("");
    if !describe.is_empty() {
        let (tag, distance) = match GIT_DESCRIBE.captures(describe) {
            Some(caps) => (
                caps["tag"].to_string(),
                caps["distance"].parse::<u64>().unwrap_or(0),
            ),
            None => (describe.to_string(), 0),
        };
        let described = facts.clone().with_selection(vec![tag], options)?;
        if described.matched.is_some() {
            return Ok(Some(RawFacts {
                distance,
                ..described
            }));
        }
    }

    Ok(Some(facts.with_selection(ref_tags, options)?))
}

/// Read the contents of a `.hg_archival.txt`.
pub fn read_hg_archival(text: &str, options: &VcsOptions) -> Result<Option<RawFacts>> {
    let data: HashMap<&str, &str> = text
        .lines()
        .filter_map(|line| line.split_once(':'))
        .map(|(key, value)| (key.trim(), value.trim()))
        .collect();

    let Some(node) = data.get("node") else {
        return Ok(None);
    };
    let short: String = node.chars().take(12).collect();
    let facts = RawFacts {
        commit: Some(options.commit_id(node, &short)),
        dirty: Some(false),
        branch: data.get("branch").map(|b| b.to_string()),
        ..Default::default()
    };

    if let Some(tag) = data.get("tag") {
        return Ok(Some(facts.with_selection(vec![tag.to_string()], options)?));
    }

    let distance = data
        .get("latesttagdistance")
        .and_then(|d| d.parse::<u64>().ok())
        .unwrap_or(0);
    match data.get("latesttag") {
        // The null revision counts as one of the commits.
        Some(&"null") | None => Ok(Some(RawFacts {
            distance: distance.saturating_sub(1),
            ..facts
        })),
        Some(tag) => {
            let facts = facts.with_selection(vec![tag.to_string()], options)?;
            Ok(Some(RawFacts { distance, ..facts }))
        }
    }
}

pub(crate) fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text.trim())
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::fs;
    use tempfile::TempDir;

    fn options() -> VcsOptions {
        VcsOptions::default()
    }

    #[test]
    fn test_unexpanded_git_archival_is_ignored() {
        let text = r#"{
            "hash-full": "$Format:%H$",
            "hash-short": "$Format:%h$",
            "timestamp": "$Format:%cI$",
            "refs": "$Format:%D$",
            "describe": "$Format:%(describe:tags=true)$"
        }"#;
        assert_eq!(read_git_archival(text, &options()).unwrap(), None);
    }

    #[test]
    fn test_git_archival_with_describe() {
        let text = r#"{
            "hash-full": "29045e8d8b8e0b3e4f4fdbc0d8a4a6ed3b3c0a11",
            "hash-short": "29045e8",
            "timestamp": "2024-01-02T03:04:05+01:00",
            "refs": "HEAD -> main, origin/main",
            "describe": "v0.2.0-7-g29045e8"
        }"#;
        let facts = read_git_archival(text, &options()).unwrap().unwrap();
        assert_eq!(facts.tag(), Some("v0.2.0"));
        assert_eq!(facts.matched.as_ref().unwrap().base, vec![0, 2, 0]);
        assert_eq!(facts.distance, 7);
        assert_eq!(facts.commit.as_deref(), Some("29045e8"));
        assert_eq!(facts.branch.as_deref(), Some("main"));
        assert_eq!(
            facts.timestamp,
            Some(Utc.with_ymd_and_hms(2024, 1, 2, 2, 4, 5).unwrap())
        );
    }

    #[test]
    fn test_git_archival_bare_describe_and_full_commit() {
        let text = r#"{
            "hash-full": "29045e8d8b8e0b3e4f4fdbc0d8a4a6ed3b3c0a11",
            "hash-short": "29045e8",
            "timestamp": "2024-01-02T03:04:05Z",
            "refs": "HEAD -> main, tag: v1.0.0",
            "describe": "v1.0.0"
        }"#;
        let opts = VcsOptions {
            full_commit: true,
            ..options()
        };
        let facts = read_git_archival(text, &opts).unwrap().unwrap();
        assert_eq!(facts.tag(), Some("v1.0.0"));
        assert_eq!(facts.distance, 0);
        assert_eq!(
            facts.commit.as_deref(),
            Some("29045e8d8b8e0b3e4f4fdbc0d8a4a6ed3b3c0a11")
        );
    }

    #[test]
    fn test_git_archival_tags_from_refs() {
        let text = r#"{
            "hash-full": "abcdef0123",
            "refs": "HEAD -> dev, tag: release, tag: v0.3.0",
            "describe": ""
        }"#;
        let facts = read_git_archival(text, &options()).unwrap().unwrap();
        assert_eq!(facts.tag(), Some("v0.3.0"));
        assert_eq!(facts.newer_unmatched, vec!["release".to_string()]);
        assert_eq!(facts.commit.as_deref(), Some("abcdef0"));
        assert_eq!(facts.timestamp, None);
    }

    #[test]
    fn test_git_archival_invalid_json() {
        assert!(read_git_archival("{not json", &options()).is_err());
    }

    #[test]
    fn test_hg_archival_on_tag() {
        let text = "repo: 0123\nnode: 1234567890abcdef1234567890abcdef12345678\nbranch: default\ntag: v0.1.0\n";
        let facts = read_hg_archival(text, &options()).unwrap().unwrap();
        assert_eq!(facts.tag(), Some("v0.1.0"));
        assert_eq!(facts.distance, 0);
        assert_eq!(facts.commit.as_deref(), Some("1234567890ab"));
        assert_eq!(facts.branch.as_deref(), Some("default"));
    }

    #[test]
    fn test_hg_archival_latest_tag() {
        let text = "node: 1234567890abcdef\nbranch: stable\nlatesttag: v0.2.0\nlatesttagdistance: 3\nchangessincelatesttag: 3\n";
        let facts = read_hg_archival(text, &options()).unwrap().unwrap();
        assert_eq!(facts.tag(), Some("v0.2.0"));
        assert_eq!(facts.distance, 3);
    }

    #[test]
    fn test_hg_archival_null_tag() {
        let text = "node: 1234567890abcdef\nbranch: default\nlatesttag: null\nlatesttagdistance: 5\n";
        let facts = read_hg_archival(text, &options()).unwrap().unwrap();
        assert!(facts.matched.is_none());
        assert_eq!(facts.distance, 4);
    }

    #[test]
    fn test_find_upward_stops_at_metadata_dir() {
        let root = TempDir::new().unwrap();
        let nested = root.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();
        fs::write(root.path().join(GIT_ARCHIVAL_FILE), "{}").unwrap();

        assert_eq!(
            find_upward(&nested, GIT_ARCHIVAL_FILE, ".git"),
            Some(root.path().join(GIT_ARCHIVAL_FILE))
        );

        fs::create_dir(root.path().join("a").join(".git")).unwrap();
        assert_eq!(find_upward(&nested, GIT_ARCHIVAL_FILE, ".git"), None);
    }
}
