//! Darcs adapter.

use crate::error::Result;
use crate::vcs::{parse_count, Backend, Context, RawFacts, Unavailable, Vcs, VcsOptions};
use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;
use std::sync::LazyLock;

static PATCH_HASH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"hash='([^']+)'").expect("static regex"));
static PATCH_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"date='(\d{14})'").expect("static regex"));

/// Darcs backend
#[derive(Debug, Clone, Copy, Default)]
pub struct Darcs;

/// Hash and date of the newest patch in `darcs log --xml-output`
pub fn parse_last_patch(xml: &str) -> Option<(String, Option<DateTime<Utc>>)> {
    let hash = PATCH_HASH.captures(xml)?[1].to_string();
    let date = PATCH_DATE
        .captures(xml)
        .and_then(|caps| NaiveDateTime::parse_from_str(&caps[1], "%Y%m%d%H%M%S").ok())
        .map(|naive| naive.and_utc());
    Some((hash, date))
}

impl Backend for Darcs {
    fn vcs(&self) -> Vcs {
        Vcs::Darcs
    }

    fn probe(&self, ctx: &Context<'_>) -> std::result::Result<(), Unavailable> {
        ctx.probe("darcs", &["log", "--last", "1"])
    }

    fn collect(&self, ctx: &Context<'_>, options: &VcsOptions) -> Result<RawFacts> {
        let status = ctx.run_codes(Vcs::Darcs, "darcs", &["status"], &[0, 1])?;
        let dirty = !status.combined().contains("No changes!");

        let xml = ctx.run(Vcs::Darcs, "darcs", &["log", "--last", "1", "--xml-output"])?;
        let Some((hash, timestamp)) = parse_last_patch(&xml) else {
            return Ok(RawFacts::empty_repository(None));
        };
        let short: String = hash.chars().take(7).collect();
        let facts = RawFacts {
            commit: Some(options.commit_id(&hash, &short)),
            dirty: Some(dirty),
            timestamp,
            ..Default::default()
        };

        let tags = ctx.run(Vcs::Darcs, "darcs", &["show", "tags"])?;
        let tags = tags
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        let facts = facts.with_selection(tags, options)?;

        let distance = match facts.tag() {
            Some(tag) => {
                let count = ctx.run(Vcs::Darcs, "darcs", &["log", "--from-tag", tag, "--count"])?;
                // The count includes the tag patch itself.
                parse_count(Vcs::Darcs, "distance", &count)?.saturating_sub(1)
            }
            None => {
                let count = ctx.run(Vcs::Darcs, "darcs", &["log", "--count"])?;
                parse_count(Vcs::Darcs, "patch count", &count)?
            }
        };
        Ok(RawFacts { distance, ..facts })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vcs::{from_vcs_with, CommandOutput, MockRunner};
    use chrono::TimeZone;
    use std::path::Path;

    const XML: &str = "<changelog>\n<patch author='me' date='20240102030405' local_date='x' inverted='False' hash='0000000000-abcdef1234567890'>\n<name>add file</name>\n</patch>\n</changelog>\n";

    fn repo() -> MockRunner {
        MockRunner::new()
            .with("darcs log --last 1", "patch abc")
            .with_output("darcs status", CommandOutput { status: Some(1), stdout: "No changes!\n".to_string(), stderr: String::new() })
            .with("darcs log --last 1 --xml-output", XML)
    }

    #[test]
    fn test_parse_last_patch() {
        let (hash, date) = parse_last_patch(XML).unwrap();
        assert_eq!(hash, "0000000000-abcdef1234567890");
        assert_eq!(date, Some(Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()));
        assert_eq!(parse_last_patch("<changelog>\n</changelog>"), None);
    }

    #[test]
    fn test_collect_with_tag() {
        let runner = repo()
            .with("darcs show tags", "v0.2.0\nv0.1.0\n")
            .with("darcs log --from-tag v0.2.0 --count", "3\n");
        let options = VcsOptions {
            full_commit: true,
            ..VcsOptions::default()
        };
        let version = from_vcs_with(&runner, Vcs::Darcs, &options, Path::new("/repo")).unwrap();
        assert_eq!(version.base, vec![0, 2, 0]);
        assert_eq!(version.distance, 2);
        assert_eq!(version.dirty, Some(false));
        assert_eq!(version.commit.as_deref(), Some("0000000000-abcdef1234567890"));
        assert_eq!(version.branch, None);
    }

    #[test]
    fn test_collect_without_tags_dirty() {
        let runner = repo()
            .with("darcs status", "M ./foo.txt -1 +1\n")
            .with("darcs show tags", "")
            .with("darcs log --count", "6\n");
        let version = from_vcs_with(&runner, Vcs::Darcs, &VcsOptions::default(), Path::new("/repo")).unwrap();
        assert_eq!(version.base, vec![0, 0, 0]);
        assert_eq!(version.distance, 6);
        assert_eq!(version.dirty, Some(true));
        assert_eq!(version.commit.as_deref(), Some("0000000"));
    }

    #[test]
    fn test_empty_repository() {
        let runner = repo().with("darcs log --last 1 --xml-output", "<changelog>\n</changelog>\n");
        let version = from_vcs_with(&runner, Vcs::Darcs, &VcsOptions::default(), Path::new("/repo")).unwrap();
        assert_eq!(version.distance, 0);
        assert_eq!(version.commit, None);
    }
}
